//! Repository Module
//!
//! Free async functions per table. Each function takes any SQLite executor,
//! so the same call runs against a pool or inside a transaction.

pub mod delivery;
pub mod enrollment;
pub mod feedback;
pub mod order;
pub mod program;
pub mod redemption;
pub mod reward;

use thiserror::Error;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => RepoError::NotFound("row".into()),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                RepoError::Duplicate(db_err.message().to_string())
            }
            sqlx::Error::Database(db_err) if db_err.is_check_violation() => {
                RepoError::Validation(db_err.message().to_string())
            }
            _ => RepoError::Database(err.to_string()),
        }
    }
}

impl From<RepoError> for shared::error::AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(msg) => shared::error::AppError::not_found(msg),
            RepoError::Duplicate(msg) => shared::error::AppError::conflict(msg),
            RepoError::Validation(msg) => shared::error::AppError::validation(msg),
            RepoError::Database(msg) => shared::error::AppError::database(msg),
        }
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;
