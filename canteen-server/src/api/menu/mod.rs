//! Menu API 模块

mod handler;

use axum::{
    Router,
    routing::{delete, get, patch},
};

use crate::core::CanteenState;

pub use handler::MenuItemView;

pub fn router() -> Router<CanteenState> {
    Router::new()
        .route("/api/menu", get(handler::list))
        .route("/api/menu/{id}", get(handler::get_by_id))
}

pub fn admin_router() -> Router<CanteenState> {
    Router::new()
        .route("/api/admin/menu/{id}", patch(handler::update_override))
        .route("/api/admin/menu/{id}/override", delete(handler::reset_override))
}
