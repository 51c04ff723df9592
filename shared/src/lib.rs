//! Shared types for the delivery engine
//!
//! Domain models, the live position stream protocol, the unified error
//! system and small utilities used by the server and its clients.

pub mod error;
pub mod live;
pub mod models;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};
