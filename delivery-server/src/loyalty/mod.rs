//! Loyalty Module - 积分账本与等级注册
//!
//! - [`LoyaltyLedger`] - 积分汇总、兑换、计划与奖励管理
//! - [`EnrollmentResolver`] - 当前等级解析与晋级

pub mod enrollment;
pub mod error;
pub mod ledger;

pub use enrollment::{EnrollmentResolver, select_tier, should_promote};
pub use error::{LoyaltyError, LoyaltyResult};
pub use ledger::{LoyaltyLedger, check_redemption};
