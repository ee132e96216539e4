//! 健康检查路由
//!
//! | 路径 | 方法 | 说明 | 认证 |
//! |------|------|------|------|
//! | /health | GET | 简单健康检查 | 无 |
//!
//! ```json
//! { "status": "ok", "version": "0.1.0", "backend": "local" }
//! ```

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::core::CanteenState;
use crate::store::BackendKind;

/// 健康检查路由 - 公共路由 (无需认证)
pub fn router() -> Router<CanteenState> {
    Router::new().route("/health", get(health))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    /// local | remote
    backend: &'static str,
    environment: String,
}

async fn health(State(state): State<CanteenState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        backend: match state.store.kind() {
            BackendKind::Local => "local",
            BackendKind::Remote => "remote",
        },
        environment: state.config.environment.clone(),
    })
}
