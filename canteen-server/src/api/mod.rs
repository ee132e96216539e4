//! API 路由模块
//!
//! # 结构
//!
//! - [`health`] - 健康检查
//! - [`menu`] - 菜单查询与覆盖
//! - [`tables`] - 桌台配置
//! - [`orders`] - 下单、状态流转、订单流 (SSE)
//! - [`ratings`] - 订单评价
//! - [`admin`] - 管理员登录、会话、登录日志
//! - [`kitchen`] - 厨房 PIN
//! - [`analytics`] - 管理端统计
//! - [`scans`] - 扫码计数
//! - [`qr`] - 扫码点餐链接
//!
//! `/api/admin/*` 下除登录相关接口外都要求 `x-admin-token` 会话令牌。
//! 订单状态流转要求管理员会话或 `x-kitchen-pin` 厨房 PIN。

pub mod admin;
pub mod analytics;
pub mod health;
pub mod kitchen;
pub mod menu;
pub mod orders;
pub mod qr;
pub mod ratings;
pub mod scans;
pub mod tables;

use axum::{Router, middleware};
use http::{HeaderName, HeaderValue};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::auth::{require_admin_session, require_staff};
use crate::core::CanteenState;

/// 最大并发请求数
const MAX_CONCURRENT_REQUESTS: usize = 256;

// Re-export common types for handlers
pub use crate::utils::AppResult;

/// Custom request ID generator
#[derive(Clone)]
struct XRequestId;

impl MakeRequestId for XRequestId {
    fn make_request_id<B>(&mut self, _request: &http::Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// 完整应用: 路由 + 中间件 + 状态
///
/// HTTP 服务器和进程内测试 (tower oneshot) 共用。
pub fn build_app(state: CanteenState) -> Router {
    let request_id = HeaderName::from_static("x-request-id");
    router(state)
        // CORS - 点餐页和管理端来自不同源
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(SetRequestIdLayer::new(request_id, XRequestId))
        .layer(ConcurrencyLimitLayer::new(MAX_CONCURRENT_REQUESTS))
}

/// 完整路由 (已绑定状态，不含中间件)
pub fn router(state: CanteenState) -> Router {
    let public = Router::new()
        .merge(health::router())
        .merge(menu::router())
        .merge(tables::router())
        .merge(orders::router())
        .merge(ratings::router())
        .merge(admin::router())
        .merge(kitchen::router())
        .merge(scans::router())
        .merge(qr::router());

    let protected = Router::new()
        .merge(menu::admin_router())
        .merge(tables::admin_router())
        .merge(ratings::admin_router())
        .merge(admin::admin_router())
        .merge(kitchen::admin_router())
        .merge(analytics::admin_router())
        .merge(scans::admin_router())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_admin_session,
        ));

    let staff = orders::staff_router()
        .route_layer(middleware::from_fn_with_state(state.clone(), require_staff));

    public.merge(staff).merge(protected).with_state(state)
}
