//! Order API 模块
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /api/orders | GET | 全部订单 (最新在前) |
//! | /api/orders | POST | 下单 |
//! | /api/orders/stream | GET | 订单列表 SSE 推送 |
//! | /api/orders/{id} | GET | 单个订单 |
//! | /api/orders/{id}/status | PUT | 状态流转 (厨房 PIN 或管理员会话) |

mod handler;

use axum::{
    Router,
    routing::{get, put},
};

use crate::core::CanteenState;

pub fn router() -> Router<CanteenState> {
    Router::new()
        .route("/api/orders", get(handler::list).post(handler::place))
        .route("/api/orders/stream", get(handler::stream))
        .route("/api/orders/{id}", get(handler::get_by_id))
}

/// 需要 [`require_staff`](crate::auth::require_staff) 的路由
pub fn staff_router() -> Router<CanteenState> {
    Router::new().route("/api/orders/{id}/status", put(handler::update_status))
}
