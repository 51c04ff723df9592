//! Delivery 错误类型

use shared::error::{AppError, ErrorCode};
use thiserror::Error;

use crate::core::error::ErrorKind;
use crate::db::repository::RepoError;
use crate::emr::EmrError;
use crate::loyalty::LoyaltyError;

use super::lifecycle::LifecycleError;

/// 配送协调器错误
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Order {0} not found")]
    OrderNotFound(i64),

    #[error("Delivery {0} not found")]
    DeliveryNotFound(i64),

    #[error("Invalid code, please scan again or type manually")]
    CodeNotFound,

    #[error("Invalid code, the code has been used")]
    CodeAlreadyUsed,

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error("Coordinates out of range: ({latitude}, {longitude})")]
    InvalidCoordinates { latitude: f64, longitude: f64 },

    #[error("Rating must be between 1 and 5, got {0}")]
    InvalidRating(i32),

    #[error("Address is required")]
    MissingAddress,

    #[error("Delivery {0} is assigned to another agent")]
    NotAssignedAgent(i64),

    #[error("Not allowed to access delivery {0}")]
    NotParticipant(i64),

    #[error("Code does not belong to your orders")]
    CodeNotOwned,

    #[error("Unable to issue a unique delivery code after {0} attempts")]
    CodeSpaceExhausted(u32),

    #[error(transparent)]
    Emr(#[from] EmrError),

    #[error(transparent)]
    Loyalty(#[from] LoyaltyError),

    #[error("Storage error: {0}")]
    Repo(#[from] RepoError),
}

impl From<sqlx::Error> for DeliveryError {
    fn from(err: sqlx::Error) -> Self {
        DeliveryError::Repo(err.into())
    }
}

impl DeliveryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::OrderNotFound(_) | Self::DeliveryNotFound(_) | Self::CodeNotFound => {
                ErrorKind::NotFound
            }
            Self::CodeAlreadyUsed => ErrorKind::Conflict,
            Self::Lifecycle(e) => e.kind(),
            Self::InvalidCoordinates { .. } | Self::InvalidRating(_) | Self::MissingAddress => {
                ErrorKind::Validation
            }
            Self::NotAssignedAgent(_)
            | Self::NotParticipant(_)
            | Self::CodeNotOwned => ErrorKind::Forbidden,
            Self::CodeSpaceExhausted(_) | Self::Emr(_) => ErrorKind::Fatal,
            Self::Loyalty(e) => e.kind(),
            Self::Repo(RepoError::NotFound(_)) => ErrorKind::NotFound,
            Self::Repo(RepoError::Duplicate(_)) => ErrorKind::Conflict,
            Self::Repo(RepoError::Validation(_)) => ErrorKind::Validation,
            Self::Repo(RepoError::Database(_)) => ErrorKind::Fatal,
        }
    }
}

impl From<DeliveryError> for AppError {
    fn from(err: DeliveryError) -> Self {
        let message = err.to_string();
        match err {
            DeliveryError::OrderNotFound(id) => {
                AppError::with_message(ErrorCode::OrderNotFound, message).with_detail("order_id", id)
            }
            DeliveryError::DeliveryNotFound(id) => {
                AppError::with_message(ErrorCode::DeliveryNotFound, message)
                    .with_detail("delivery_id", id)
            }
            DeliveryError::CodeNotFound => AppError::new(ErrorCode::DeliveryCodeNotFound),
            DeliveryError::CodeAlreadyUsed => AppError::new(ErrorCode::DeliveryCodeUsed),
            DeliveryError::Lifecycle(e) => e.into(),
            DeliveryError::InvalidCoordinates { .. } => {
                AppError::with_message(ErrorCode::InvalidCoordinates, message)
            }
            DeliveryError::InvalidRating(_) => {
                AppError::with_message(ErrorCode::InvalidRating, message)
            }
            DeliveryError::MissingAddress => AppError::validation(message),
            DeliveryError::NotAssignedAgent(_) => {
                AppError::with_message(ErrorCode::NotAssignedAgent, message)
            }
            DeliveryError::NotParticipant(_) => AppError::forbidden(message),
            DeliveryError::CodeNotOwned => AppError::with_message(ErrorCode::NotOrderOwner, message),
            DeliveryError::CodeSpaceExhausted(_) => {
                AppError::with_message(ErrorCode::CodeSpaceExhausted, message)
            }
            DeliveryError::Emr(_) => AppError::with_message(ErrorCode::EmrUnavailable, message),
            DeliveryError::Loyalty(e) => e.into(),
            DeliveryError::Repo(e) => e.into(),
        }
    }
}

pub type DeliveryResult<T> = Result<T, DeliveryError>;
