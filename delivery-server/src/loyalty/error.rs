//! Loyalty 错误类型

use shared::error::{AppError, ErrorCode};
use thiserror::Error;

use crate::core::error::ErrorKind;
use crate::db::repository::RepoError;

#[derive(Debug, Error)]
pub enum LoyaltyError {
    #[error("Insufficient points: balance {balance}, reward costs {required}")]
    InsufficientPoints { balance: i64, required: i64 },

    #[error("Reward belongs to program {reward_program}, current program is {current_program}")]
    ProgramMismatch {
        reward_program: i64,
        current_program: i64,
    },

    #[error("Patient {0} has no active loyalty enrollment")]
    NoActiveEnrollment(i64),

    #[error("Reward {0} not found")]
    RewardNotFound(i64),

    #[error("Reward {0} has reached its redemption limit")]
    RewardLimitReached(i64),

    #[error("Loyalty program {0} not found")]
    ProgramNotFound(i64),

    #[error("{0}")]
    Invalid(String),

    #[error("Storage error: {0}")]
    Repo(#[from] RepoError),
}

impl From<sqlx::Error> for LoyaltyError {
    fn from(err: sqlx::Error) -> Self {
        LoyaltyError::Repo(err.into())
    }
}

impl LoyaltyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InsufficientPoints { .. }
            | Self::ProgramMismatch { .. }
            | Self::NoActiveEnrollment(_)
            | Self::RewardLimitReached(_)
            | Self::Invalid(_) => ErrorKind::Validation,
            Self::RewardNotFound(_) | Self::ProgramNotFound(_) => ErrorKind::NotFound,
            Self::Repo(RepoError::NotFound(_)) => ErrorKind::NotFound,
            Self::Repo(RepoError::Duplicate(_)) => ErrorKind::Conflict,
            Self::Repo(RepoError::Validation(_)) => ErrorKind::Validation,
            Self::Repo(RepoError::Database(_)) => ErrorKind::Fatal,
        }
    }
}

impl From<LoyaltyError> for AppError {
    fn from(err: LoyaltyError) -> Self {
        let message = err.to_string();
        match err {
            LoyaltyError::InsufficientPoints { balance, required } => {
                AppError::with_message(ErrorCode::InsufficientPoints, message)
                    .with_detail("balance", balance)
                    .with_detail("required", required)
            }
            LoyaltyError::ProgramMismatch { .. } => {
                AppError::with_message(ErrorCode::ProgramMismatch, message)
            }
            LoyaltyError::NoActiveEnrollment(_) => {
                AppError::with_message(ErrorCode::NoActiveEnrollment, message)
            }
            LoyaltyError::RewardNotFound(_) => {
                AppError::with_message(ErrorCode::RewardNotFound, message)
            }
            LoyaltyError::RewardLimitReached(_) => {
                AppError::with_message(ErrorCode::RewardLimitReached, message)
            }
            LoyaltyError::ProgramNotFound(_) => {
                AppError::with_message(ErrorCode::ProgramNotFound, message)
            }
            LoyaltyError::Invalid(msg) => AppError::validation(msg),
            LoyaltyError::Repo(e) => e.into(),
        }
    }
}

pub type LoyaltyResult<T> = Result<T, LoyaltyError>;
