//! Delivery Module - 订单履约
//!
//! - [`lifecycle`] - 订单状态机（纯判定）
//! - [`code`] - 配送码生成
//! - [`DeliveryCoordinator`] - 事务编排

pub mod code;
pub mod coordinator;
pub mod error;
pub mod lifecycle;

pub use code::CodeGenerator;
pub use coordinator::DeliveryCoordinator;
pub use error::{DeliveryError, DeliveryResult};
pub use lifecycle::{LifecycleError, Step, Transition};
