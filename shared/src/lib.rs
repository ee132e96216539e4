//! Shared types for the canteen ordering core
//!
//! Domain models, the unified error system and small utilities used by the
//! server and by device clients talking to its API.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use axum::Json;
pub use http;
pub use serde::{Deserialize, Serialize};

pub use error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
