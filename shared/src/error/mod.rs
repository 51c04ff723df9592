//! Unified error system
//!
//! - [`ErrorCode`]: 数字错误码，客户端据此分支
//! - [`ErrorCategory`]: 按号段划分的错误类别
//! - [`AppError`]: 携带错误码、消息与附加信息的错误
//! - [`ErrorBody`]: 错误响应的 JSON 结构
//!
//! # Example
//!
//! ```
//! use shared::error::{AppError, ErrorBody, ErrorCode};
//!
//! let err = AppError::with_message(ErrorCode::InsufficientPoints, "Balance 40 < 50")
//!     .with_detail("balance", 40);
//!
//! let body = ErrorBody::from(&err);
//! assert_eq!(body.code.code(), 5001);
//! ```

mod category;
mod codes;
mod http;
mod types;

pub use category::ErrorCategory;
pub use codes::{ErrorCode, InvalidErrorCode};
pub use types::{AppError, AppResult, ErrorBody};
