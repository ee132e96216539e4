//! Admin API 模块
//!
//! | 路径 | 方法 | 说明 | 认证 |
//! |------|------|------|------|
//! | /api/admin/login | POST | 邮箱 + 密码 + PIN 登录 | 无 |
//! | /api/admin/logout | POST | 退出登录 | 令牌 |
//! | /api/admin/refresh | POST | 会话续期 | 令牌 |
//! | /api/admin/lock-state | GET | 锁定状态 (登录页) | 无 |
//! | /api/admin/session | GET | 会话检查 | 会话 |
//! | /api/admin/login-logs | GET | 登录日志 | 会话 |

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::CanteenState;

pub use handler::{LogoutResponse, RefreshResponse, SessionResponse};

pub fn router() -> Router<CanteenState> {
    Router::new()
        .route("/api/admin/login", post(handler::login))
        .route("/api/admin/logout", post(handler::logout))
        .route("/api/admin/refresh", post(handler::refresh))
        .route("/api/admin/lock-state", get(handler::lock_state))
}

pub fn admin_router() -> Router<CanteenState> {
    Router::new()
        .route("/api/admin/session", get(handler::session))
        .route("/api/admin/login-logs", get(handler::login_logs))
}
