//! Data models
//!
//! Shared between canteen-server and device clients (via API).
//! Documents serialize with camelCase field names so every backend stores
//! the same shape.

pub mod analytics;
pub mod auth;
pub mod menu;
pub mod order;
pub mod rating;
pub mod table;

// Re-exports
pub use analytics::*;
pub use auth::*;
pub use menu::*;
pub use order::*;
pub use rating::*;
pub use table::*;
