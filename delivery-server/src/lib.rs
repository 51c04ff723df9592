//! Delivery Server - 药品配送履约与积分引擎
//!
//! # 架构概述
//!
//! - **配送** (`delivery`): 订单 → 配送 → 行程 → 签收 的状态机与编排
//! - **积分** (`loyalty`): 积分账本、等级注册与晋级
//! - **实时位置** (`live`): 按配送单划分 topic 的位置广播
//! - **数据库** (`db`): SQLite (sqlx) 存储与迁移
//! - **认证** (`auth`): JWT 身份
//! - **HTTP API** (`api`): RESTful + WebSocket 接口
//!
//! # 模块结构
//!
//! ```text
//! delivery-server/src/
//! ├── core/          # 配置、状态、服务器
//! ├── auth/          # JWT 认证
//! ├── db/            # 连接池、仓储
//! ├── delivery/      # 配送码、生命周期、协调器
//! ├── loyalty/       # 积分账本、等级
//! ├── live/          # 实时位置 topic 注册表
//! ├── emr/           # 外部 EMR 处方接口
//! ├── api/           # HTTP 路由和处理器
//! ├── routes/        # 路由组装与中间件
//! └── utils/         # 日志
//! ```

pub mod api;
pub mod auth;
pub mod core;
pub mod db;
pub mod delivery;
pub mod emr;
pub mod live;
pub mod loyalty;
pub mod routes;
pub mod utils;

// Re-export 公共类型
pub use auth::{CurrentUser, JwtService, Role};
pub use core::{Config, Server, ServerState};
pub use delivery::{DeliveryCoordinator, DeliveryError};
pub use live::LocationHub;
pub use loyalty::{EnrollmentResolver, LoyaltyError, LoyaltyLedger};

// Re-export unified error types from shared
pub use shared::error::{AppError, AppResult, ErrorBody, ErrorCode};

// Re-export logger functions
pub use utils::logger::init_logger;
