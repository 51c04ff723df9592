//! Data models
//!
//! Shared between delivery-server and clients (via API).
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are `i64` snowflakes, all timestamps are Unix millis.

pub mod delivery;
pub mod loyalty;
pub mod order;

// Re-exports
pub use delivery::*;
pub use loyalty::*;
pub use order::*;
