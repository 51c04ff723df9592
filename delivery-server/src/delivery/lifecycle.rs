//! Order lifecycle state machine
//!
//! ```text
//! Requested ──accept──▶ Accepted ──start──▶ InProgress ──redeem──▶ Delivered
//!                                              │
//!                                              └──cancel──▶ Canceled
//! ```
//!
//! 纯函数，不访问存储。协调器先读出当前状态，再由这里判定能否迁移，
//! 最后用 compare-and-set 写回；写入 0 行说明状态已被并发修改。

use shared::error::{AppError, ErrorCode};
use shared::models::OrderState;
use thiserror::Error;

use crate::core::error::ErrorKind;

/// 触发迁移的动作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Accept,
    Start,
    Redeem,
    Cancel,
}

/// 迁移判定结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// 需要写入新状态
    Advance(OrderState),
    /// 已处于目标状态（或终态上的取消），不写库
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("Order has already been accepted")]
    AlreadyAccepted,

    #[error("Delivery has not been started")]
    NotStarted,

    #[error("Delivery is not in progress")]
    NotInProgress,

    #[error("Invalid code, the code has been used")]
    AlreadyDelivered,

    #[error("Delivery has been canceled")]
    Canceled,

    #[error("Order has no delivery yet")]
    NotAccepted,
}

impl LifecycleError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AlreadyAccepted | Self::AlreadyDelivered | Self::Canceled => ErrorKind::Conflict,
            Self::NotStarted | Self::NotInProgress | Self::NotAccepted => ErrorKind::Validation,
        }
    }
}

impl From<LifecycleError> for AppError {
    fn from(err: LifecycleError) -> Self {
        let code = match err {
            LifecycleError::AlreadyAccepted => ErrorCode::OrderAlreadyAccepted,
            LifecycleError::NotStarted | LifecycleError::NotAccepted => {
                ErrorCode::DeliveryNotStarted
            }
            LifecycleError::NotInProgress => ErrorCode::DeliveryNotInProgress,
            LifecycleError::AlreadyDelivered => ErrorCode::DeliveryCodeUsed,
            LifecycleError::Canceled => ErrorCode::DeliveryCanceled,
        };
        AppError::with_message(code, err.to_string())
    }
}

/// 判定 `state` 上执行 `transition` 的结果
pub fn apply(state: OrderState, transition: Transition) -> Result<Step, LifecycleError> {
    use OrderState::*;

    match (transition, state) {
        (Transition::Accept, Requested) => Ok(Step::Advance(Accepted)),
        (Transition::Accept, _) => Err(LifecycleError::AlreadyAccepted),

        (Transition::Start, Requested) => Err(LifecycleError::NotAccepted),
        (Transition::Start, Accepted) => Ok(Step::Advance(InProgress)),
        (Transition::Start, InProgress) => Ok(Step::Unchanged),
        (Transition::Start, Delivered) => Err(LifecycleError::AlreadyDelivered),
        (Transition::Start, Canceled) => Err(LifecycleError::Canceled),

        (Transition::Redeem, InProgress) => Ok(Step::Advance(Delivered)),
        (Transition::Redeem, Delivered) => Err(LifecycleError::AlreadyDelivered),
        (Transition::Redeem, Canceled) => Err(LifecycleError::Canceled),
        (Transition::Redeem, Accepted) => Err(LifecycleError::NotStarted),
        (Transition::Redeem, Requested) => Err(LifecycleError::NotAccepted),

        (Transition::Cancel, InProgress) => Ok(Step::Advance(Canceled)),
        // 终态上的取消是 no-op
        (Transition::Cancel, Delivered | Canceled) => Ok(Step::Unchanged),
        // 未出发的配送不可取消，订单也不会重新开放
        (Transition::Cancel, Accepted) => Err(LifecycleError::NotStarted),
        (Transition::Cancel, Requested) => Err(LifecycleError::NotAccepted),
    }
}
