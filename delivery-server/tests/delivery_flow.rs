//! 配送生命周期集成测试
//!
//! 使用临时 SQLite 文件 + 完整 ServerState

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use delivery_server::core::error::ErrorKind;
use delivery_server::db::repository;
use delivery_server::delivery::{CodeGenerator, DeliveryCoordinator};
use delivery_server::emr::PrescriptionSource;
use delivery_server::DeliveryError;
use shared::models::{
    Coordinates, DeliveryStatus, OrderState, PrescriptionSnapshot, PromotionOutcome, RedeemCode,
};

fn redeem(code: &str) -> RedeemCode {
    RedeemCode {
        code: code.into(),
        review: "Thanks".into(),
        rating: 4,
    }
}

#[tokio::test]
async fn completed_delivery_awards_unit_points() {
    let env = setup().await;
    let state = &env.state;
    program(state, "Bronze", 50, 0, true).await;

    let completed = complete_delivery(state, 1, 100).await;
    assert_eq!(completed.feedback.points_awarded, 50);
    assert_eq!(completed.feedback.rating, 5);
    assert_eq!(state.ledger.total_points(1).await.unwrap(), 50);

    let delivery = repository::delivery::find_by_id(&state.db.pool, completed.feedback.delivery_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(delivery.status, DeliveryStatus::Delivered);
    let detail = state
        .coordinator
        .order_detail(&patient(1), delivery.order_id)
        .await
        .unwrap();
    assert_eq!(detail.state, OrderState::Delivered);
}

#[tokio::test]
async fn accept_binds_agent_code_and_prescription() {
    let env = setup().await;
    let state = &env.state;
    env.emr.insert(1, prescription());

    let order = new_order(state, 1).await;
    let delivery = state.coordinator.accept(100, order.id).await.unwrap();

    assert_eq!(delivery.agent_id, 100);
    assert_eq!(delivery.patient_id, 1);
    assert_eq!(delivery.status, DeliveryStatus::Accepted);
    assert_eq!(delivery.code.len(), 32);
    assert!(delivery.time_started.is_none());
    assert_eq!(
        delivery.instruction.as_deref(),
        Some("One tablet daily after breakfast")
    );
    let snapshot: PrescriptionSnapshot =
        serde_json::from_str(delivery.prescription.as_deref().unwrap()).unwrap();
    assert_eq!(snapshot, prescription());

    let detail = state.coordinator.order_detail(&patient(1), order.id).await.unwrap();
    assert_eq!(detail.state, OrderState::Accepted);
}

#[tokio::test]
async fn accept_without_prescription_proceeds() {
    let env = setup().await;
    let order = new_order(&env.state, 1).await;
    let delivery = env.state.coordinator.accept(100, order.id).await.unwrap();
    assert!(delivery.prescription.is_none());
    assert!(delivery.instruction.is_none());
}

#[tokio::test]
async fn emr_outage_blocks_acceptance_without_writing() {
    let env = setup().await;
    let state = &env.state;
    let order = new_order(state, 1).await;
    env.emr.set_failing(true);

    let err = state.coordinator.accept(100, order.id).await.unwrap_err();
    assert!(matches!(err, DeliveryError::Emr(_)));
    assert_eq!(err.kind(), ErrorKind::Fatal);
    assert!(
        repository::delivery::find_by_order(&state.db.pool, order.id)
            .await
            .unwrap()
            .is_none()
    );

    env.emr.set_failing(false);
    assert!(state.coordinator.accept(100, order.id).await.is_ok());
}

#[tokio::test]
async fn accept_unknown_order_is_not_found() {
    let env = setup().await;
    let err = env.state.coordinator.accept(100, 424242).await.unwrap_err();
    assert!(matches!(err, DeliveryError::OrderNotFound(424242)));
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn concurrent_accept_exactly_one_wins() {
    let env = setup().await;
    let state = env.state.clone();
    let order_id = new_order(&state, 1).await.id;

    let mut handles = Vec::new();
    for agent_id in 100..110 {
        let coordinator = state.coordinator.clone();
        handles.push(tokio::spawn(async move {
            coordinator.accept(agent_id, order_id).await
        }));
    }

    let mut winners = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => winners += 1,
            Err(e) => assert_eq!(e.kind(), ErrorKind::Conflict, "unexpected error: {e}"),
        }
    }
    assert_eq!(winners, 1);
}

#[tokio::test]
async fn second_accept_is_conflict() {
    let env = setup().await;
    let order = new_order(&env.state, 1).await;
    env.state.coordinator.accept(100, order.id).await.unwrap();
    let err = env.state.coordinator.accept(101, order.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn start_is_idempotent_and_keeps_time_started() {
    let env = setup().await;
    let state = &env.state;
    let order = new_order(state, 1).await;
    let delivery = state.coordinator.accept(100, order.id).await.unwrap();

    let first = state.coordinator.start(100, delivery.id, NAIROBI).await.unwrap();
    assert_eq!(first.status, DeliveryStatus::InProgress);
    let started_at = first.time_started.expect("time_started set");
    assert_eq!(first.position(), Some(NAIROBI));

    let again = state
        .coordinator
        .start(100, delivery.id, Coordinates::new(-1.3, 36.9))
        .await
        .unwrap();
    assert_eq!(again.status, DeliveryStatus::InProgress);
    assert_eq!(again.time_started, Some(started_at));
}

#[tokio::test]
async fn only_assigned_agent_drives_delivery() {
    let env = setup().await;
    let state = &env.state;
    let order = new_order(state, 1).await;
    let delivery = state.coordinator.accept(100, order.id).await.unwrap();

    let err = state.coordinator.start(999, delivery.id, NAIROBI).await.unwrap_err();
    assert!(matches!(err, DeliveryError::NotAssignedAgent(_)));
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let err = state.coordinator.cancel(999, delivery.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
}

#[tokio::test]
async fn malformed_coordinates_are_rejected() {
    let env = setup().await;
    let state = &env.state;
    let order = new_order(state, 1).await;
    let delivery = state.coordinator.accept(100, order.id).await.unwrap();

    let err = state
        .coordinator
        .start(100, delivery.id, Coordinates::new(95.0, 10.0))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let mut bad = order_request("home");
    bad.longitude = f64::INFINITY;
    let err = state.coordinator.create_order(1, bad).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn cancel_guards() {
    let env = setup().await;
    let state = &env.state;
    let order = new_order(state, 1).await;
    let delivery = state.coordinator.accept(100, order.id).await.unwrap();

    // 未出发不可取消
    let err = state.coordinator.cancel(100, delivery.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    state.coordinator.start(100, delivery.id, NAIROBI).await.unwrap();
    let canceled = state.coordinator.cancel(100, delivery.id).await.unwrap();
    assert_eq!(canceled.status, DeliveryStatus::Canceled);

    // 终态上的取消是 no-op
    let again = state.coordinator.cancel(100, delivery.id).await.unwrap();
    assert_eq!(again.status, DeliveryStatus::Canceled);
    assert_eq!(again.updated_at, canceled.updated_at);

    let err = state
        .coordinator
        .redeem_code(1, redeem(&delivery.code))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let err = state.coordinator.start(100, delivery.id, NAIROBI).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    // 取消不会让订单重新开放
    let unclaimed = state.coordinator.list_unclaimed(None).await.unwrap();
    assert!(unclaimed.iter().all(|o| o.id != order.id));
    let detail = state.coordinator.order_detail(&patient(1), order.id).await.unwrap();
    assert_eq!(detail.state, OrderState::Canceled);
}

#[tokio::test]
async fn cancel_after_delivery_is_noop() {
    let env = setup().await;
    let state = &env.state;
    let completed = complete_delivery(state, 1, 100).await;
    let delivery = state
        .coordinator
        .cancel(100, completed.feedback.delivery_id)
        .await
        .unwrap();
    assert_eq!(delivery.status, DeliveryStatus::Delivered);
}

#[tokio::test]
async fn code_is_single_use() {
    let env = setup().await;
    let state = &env.state;
    program(state, "Bronze", 50, 0, true).await;

    let coordinator = DeliveryCoordinator::new(
        state.db.clone(),
        state.hub.clone(),
        state.resolver.clone(),
        Arc::new(env.emr.clone()) as Arc<dyn PrescriptionSource>,
        CodeGenerator::new(3).with_sampler(|| "abc123".to_string()),
    );

    let order = new_order(state, 1).await;
    let delivery = coordinator.accept(100, order.id).await.unwrap();
    assert_eq!(delivery.code, "abc123");
    coordinator.start(100, delivery.id, NAIROBI).await.unwrap();

    let first = coordinator.redeem_code(1, redeem("abc123")).await.unwrap();
    assert_eq!(first.feedback.points_awarded, 50);

    let err = coordinator.redeem_code(1, redeem("abc123")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let stored = repository::feedback::find_by_delivery(&state.db.pool, delivery.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.id, first.feedback.id);
    assert_eq!(stored.points_awarded, 50);
    assert_eq!(state.ledger.total_points(1).await.unwrap(), 50);

    // 同一个码不会再签发给新订单
    let other = new_order(state, 2).await;
    let err = coordinator.accept(100, other.id).await.unwrap_err();
    assert!(matches!(err, DeliveryError::CodeSpaceExhausted(_)));
    assert_eq!(err.kind(), ErrorKind::Fatal);
}

#[tokio::test]
async fn redeem_rejections() {
    let env = setup().await;
    let state = &env.state;
    let order = new_order(state, 1).await;
    let delivery = state.coordinator.accept(100, order.id).await.unwrap();

    // 未出发
    let err = state
        .coordinator
        .redeem_code(1, redeem(&delivery.code))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    state.coordinator.start(100, delivery.id, NAIROBI).await.unwrap();

    let err = state
        .coordinator
        .redeem_code(1, redeem("not-a-code"))
        .await
        .unwrap_err();
    assert!(matches!(err, DeliveryError::CodeNotFound));
    assert_eq!(err.kind(), ErrorKind::NotFound);

    // 别人的码
    let err = state
        .coordinator
        .redeem_code(2, redeem(&delivery.code))
        .await
        .unwrap_err();
    assert!(matches!(err, DeliveryError::CodeNotOwned));
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let mut bad_rating = redeem(&delivery.code);
    bad_rating.rating = 6;
    let err = state.coordinator.redeem_code(1, bad_rating).await.unwrap_err();
    assert!(matches!(err, DeliveryError::InvalidRating(6)));

    // 以上失败都不应消耗配送码
    assert!(state.coordinator.redeem_code(1, redeem(&delivery.code)).await.is_ok());
}

#[tokio::test]
async fn delivery_without_program_awards_zero() {
    let env = setup().await;
    let completed = complete_delivery(&env.state, 1, 100).await;
    assert_eq!(completed.feedback.points_awarded, 0);
    assert_eq!(completed.promotion, PromotionOutcome::Unchanged);
    assert_eq!(env.state.ledger.total_points(1).await.unwrap(), 0);
}

#[tokio::test]
async fn unclaimed_listing_filters_by_mode() {
    let env = setup().await;
    let state = &env.state;
    let home = state
        .coordinator
        .create_order(1, order_request("home"))
        .await
        .unwrap();
    let pickup = state
        .coordinator
        .create_order(2, order_request("pickup"))
        .await
        .unwrap();
    let claimed = new_order(state, 3).await;
    state.coordinator.accept(100, claimed.id).await.unwrap();

    let all: Vec<i64> = state
        .coordinator
        .list_unclaimed(None)
        .await
        .unwrap()
        .into_iter()
        .map(|o| o.id)
        .collect();
    assert!(all.contains(&home.id));
    assert!(all.contains(&pickup.id));
    assert!(!all.contains(&claimed.id));

    let pickups = state.coordinator.list_unclaimed(Some("pickup")).await.unwrap();
    assert_eq!(pickups.len(), 1);
    assert_eq!(pickups[0].id, pickup.id);
}

#[tokio::test]
async fn order_visibility() {
    let env = setup().await;
    let state = &env.state;
    let order = new_order(state, 1).await;

    assert!(state.coordinator.order_detail(&patient(2), order.id).await.is_err());
    // 未认领时已审核配送员可见
    assert!(state.coordinator.order_detail(&agent(100), order.id).await.is_ok());

    state.coordinator.accept(100, order.id).await.unwrap();
    assert!(state.coordinator.order_detail(&agent(101), order.id).await.is_err());
    assert!(state.coordinator.order_detail(&staff(1), order.id).await.is_ok());

    let mine = state.coordinator.orders_for(&patient(1)).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].state, OrderState::Accepted);
    let assigned = state.coordinator.orders_for(&agent(100)).await.unwrap();
    assert_eq!(assigned.len(), 1);
    assert_eq!(assigned[0].order.id, order.id);
}

#[tokio::test]
async fn viewer_receives_positions_in_publish_order() {
    let env = setup().await;
    let state = &env.state;
    let delivery = in_progress_delivery(state, 1, 100).await;

    let (mut sub, position) = state
        .coordinator
        .join_stream(&patient(1), delivery.id)
        .await
        .unwrap();
    assert_eq!(position, Some(NAIROBI));

    let path = [(-1.2925, 36.8225), (-1.2930, 36.8230), (-1.2935, 36.8240)];
    for (lat, lng) in path {
        state
            .coordinator
            .publish_position(100, delivery.id, Coordinates::new(lat, lng))
            .await
            .unwrap();
    }

    for (lat, lng) in path {
        let update = tokio::time::timeout(Duration::from_secs(2), sub.recv())
            .await
            .expect("update in time")
            .unwrap();
        assert_eq!(update.delivery_id, delivery.id);
        assert_eq!(update.coordinates, Coordinates::new(lat, lng));
    }

    // 最新位置已落库
    let stored = state.coordinator.stored_position(delivery.id).await.unwrap();
    assert_eq!(stored, Some(Coordinates::new(-1.2935, 36.8240)));

    drop(sub);
    assert_eq!(state.hub.topic_count(), 0);
}

#[tokio::test]
async fn stream_requires_in_progress_participant() {
    let env = setup().await;
    let state = &env.state;
    let order = new_order(state, 1).await;
    let delivery = state.coordinator.accept(100, order.id).await.unwrap();

    let err = state
        .coordinator
        .join_stream(&patient(1), delivery.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    state.coordinator.start(100, delivery.id, NAIROBI).await.unwrap();
    let err = state
        .coordinator
        .join_stream(&patient(2), delivery.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    assert!(state.coordinator.join_stream(&staff(9), delivery.id).await.is_ok());
    let err = state.coordinator.join_stream(&patient(1), 777).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn publishing_after_cancel_is_rejected() {
    let env = setup().await;
    let state = &env.state;
    let delivery = in_progress_delivery(state, 1, 100).await;

    let err = state
        .coordinator
        .publish_position(101, delivery.id, NAIROBI)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    state.coordinator.cancel(100, delivery.id).await.unwrap();
    let err = state
        .coordinator
        .publish_position(100, delivery.id, NAIROBI)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}
