//! 集成测试公共工具：临时 SQLite + 完整 ServerState

#![allow(dead_code)]

use std::sync::Arc;

use delivery_server::db::DbService;
use delivery_server::emr::StaticPrescriptionSource;
use delivery_server::{Config, CurrentUser, Role, ServerState};
use shared::models::{
    CompletedDelivery, Coordinates, Delivery, LoyaltyProgram, LoyaltyProgramCreate, Order,
    OrderCreate, PrescriptionSnapshot, RedeemCode,
};
use tempfile::TempDir;

pub const NAIROBI: Coordinates = Coordinates {
    latitude: -1.2921,
    longitude: 36.8219,
};

pub struct TestEnv {
    // 保持临时目录存活
    pub dir: TempDir,
    pub state: ServerState,
    pub emr: StaticPrescriptionSource,
}

pub async fn setup() -> TestEnv {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = Config::with_work_dir(dir.path().to_string_lossy().to_string());
    let db = DbService::new(&config.database_path())
        .await
        .expect("open test database");
    let emr = StaticPrescriptionSource::new();
    let state = ServerState::from_parts(config, db, Arc::new(emr.clone()));
    TestEnv { dir, state, emr }
}

pub fn patient(id: i64) -> CurrentUser {
    CurrentUser {
        id,
        name: format!("patient-{id}"),
        role: Role::Patient,
        approved: false,
    }
}

pub fn agent(id: i64) -> CurrentUser {
    CurrentUser {
        id,
        name: format!("agent-{id}"),
        role: Role::Agent,
        approved: true,
    }
}

pub fn staff(id: i64) -> CurrentUser {
    CurrentUser {
        id,
        name: format!("staff-{id}"),
        role: Role::Staff,
        approved: true,
    }
}

pub fn order_request(delivery_mode: &str) -> OrderCreate {
    OrderCreate {
        appointment_id: Some(501),
        delivery_mode: Some(delivery_mode.to_string()),
        time_slot: Some("morning".into()),
        latitude: NAIROBI.latitude,
        longitude: NAIROBI.longitude,
        address: "Kenyatta Ave 12".into(),
        reach_out_phone: Some("+254700000000".into()),
        date_of_depletion: Some("2026-11-01".into()),
    }
}

pub fn prescription() -> PrescriptionSnapshot {
    PrescriptionSnapshot {
        prescription_id: "rx-77".into(),
        regimen: "TDF/3TC/DTG".into(),
        instruction: Some("One tablet daily after breakfast".into()),
        doctor: Some("Dr. Otieno".into()),
        prescribed_at: Some("2026-09-30".into()),
    }
}

pub async fn program(
    state: &ServerState,
    name: &str,
    unit_point: i64,
    entry_points: i64,
    is_default: bool,
) -> LoyaltyProgram {
    state
        .ledger
        .create_program(LoyaltyProgramCreate {
            name: name.into(),
            description: None,
            unit_point,
            point_rate: 0.5,
            entry_points,
            is_default,
        })
        .await
        .expect("create program")
}

pub async fn new_order(state: &ServerState, patient_id: i64) -> Order {
    state
        .coordinator
        .create_order(patient_id, order_request("home"))
        .await
        .expect("create order")
}

/// 下单 → 接单 → 出发
pub async fn in_progress_delivery(state: &ServerState, patient_id: i64, agent_id: i64) -> Delivery {
    let order = new_order(state, patient_id).await;
    let delivery = state
        .coordinator
        .accept(agent_id, order.id)
        .await
        .expect("accept order");
    state
        .coordinator
        .start(agent_id, delivery.id, NAIROBI)
        .await
        .expect("start delivery")
}

/// 完整走完一单并签收
pub async fn complete_delivery(
    state: &ServerState,
    patient_id: i64,
    agent_id: i64,
) -> CompletedDelivery {
    let delivery = in_progress_delivery(state, patient_id, agent_id).await;
    state
        .coordinator
        .redeem_code(
            patient_id,
            RedeemCode {
                code: delivery.code,
                review: "On time".into(),
                rating: 5,
            },
        )
        .await
        .expect("redeem code")
}
