//! Table API 模块

mod handler;

use axum::{
    Router,
    routing::{get, put},
};

use crate::core::CanteenState;

pub fn router() -> Router<CanteenState> {
    Router::new()
        .route("/api/tables", get(handler::list))
        .route("/api/tables/{table}/order", get(handler::current_order))
}

pub fn admin_router() -> Router<CanteenState> {
    Router::new().route("/api/admin/tables/{table}", put(handler::set_enabled))
}
