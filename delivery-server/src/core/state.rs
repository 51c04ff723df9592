//! Server State
//!
//! 所有 handler 共享的服务句柄，clone 开销为几个 Arc。

use std::sync::Arc;
use std::time::Duration;

use crate::auth::JwtService;
use crate::core::{Config, Result, ServerError};
use crate::db::DbService;
use crate::delivery::{CodeGenerator, DeliveryCoordinator};
use crate::emr::{self, PrescriptionSource};
use crate::live::LocationHub;
use crate::loyalty::{EnrollmentResolver, LoyaltyLedger};

/// 服务器状态
///
/// | 字段 | 说明 |
/// |------|------|
/// | db | 读连接池 + 单连接写池 |
/// | jwt_service | 令牌校验 |
/// | hub | 配送位置 topic 注册表 |
/// | coordinator | 订单/配送状态迁移 |
/// | ledger | 积分账本与兑换 |
/// | resolver | 等级解析与晋级 |
#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub db: DbService,
    pub jwt_service: Arc<JwtService>,
    pub hub: LocationHub,
    pub coordinator: DeliveryCoordinator,
    pub ledger: LoyaltyLedger,
    pub resolver: EnrollmentResolver,
}

impl ServerState {
    /// 初始化：打开数据库、应用迁移、装配服务
    pub async fn initialize(config: &Config) -> Result<Self> {
        let db_path = config.database_path();
        tracing::info!(path = %db_path.display(), "Opening database");
        let db = DbService::new(&db_path).await?;

        let emr = emr::from_config(
            config.emr_base_url.as_deref(),
            Duration::from_millis(config.emr_timeout_ms),
        )
        .map_err(|e| ServerError::Config(e.to_string()))?;

        Ok(Self::from_parts(config.clone(), db, emr))
    }

    /// 用现成的组件装配（测试可注入 EMR 实现）
    pub fn from_parts(config: Config, db: DbService, emr: Arc<dyn PrescriptionSource>) -> Self {
        let jwt_service = Arc::new(JwtService::with_config(config.jwt.clone()));
        let hub = LocationHub::new(config.live_channel_capacity);
        let resolver = EnrollmentResolver::new(db.clone());
        let ledger = LoyaltyLedger::new(db.clone());
        let coordinator = DeliveryCoordinator::new(
            db.clone(),
            hub.clone(),
            resolver.clone(),
            emr,
            CodeGenerator::new(config.code_max_attempts),
        );

        Self {
            config,
            db,
            jwt_service,
            hub,
            coordinator,
            ledger,
            resolver,
        }
    }
}
