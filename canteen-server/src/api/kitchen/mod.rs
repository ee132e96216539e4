//! Kitchen PIN API 模块

mod handler;

use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::core::CanteenState;

pub fn router() -> Router<CanteenState> {
    Router::new().route("/api/kitchen/verify", post(handler::verify))
}

pub fn admin_router() -> Router<CanteenState> {
    Router::new()
        .route("/api/admin/kitchen/pins", get(handler::list).post(handler::add))
        .route("/api/admin/kitchen/pins/{pin}", delete(handler::remove))
}
