//! Admin API Handlers

use axum::{Json, extract::State};
use http::HeaderMap;
use serde::Serialize;
use shared::models::{AdminLogin, LockState, LoginAttempt, LoginLogEntry};

use crate::auth::admin_token;
use crate::core::CanteenState;
use crate::utils::{AppError, AppResult, ErrorCode};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutResponse {
    pub logged_out: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub expires_at: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub valid: bool,
}

/// 调用方来源: 请求体 `ip` 优先，其次 `x-forwarded-for` 的第一个地址
fn origin(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// POST /api/admin/login
pub async fn login(
    State(state): State<CanteenState>,
    headers: HeaderMap,
    Json(mut attempt): Json<LoginAttempt>,
) -> AppResult<Json<AdminLogin>> {
    if attempt.ip.as_deref().is_none_or(|ip| ip.trim().is_empty()) {
        attempt.ip = origin(&headers);
    }
    Ok(Json(state.auth.verify_admin_credentials(attempt).await?))
}

/// POST /api/admin/logout
pub async fn logout(
    State(state): State<CanteenState>,
    headers: HeaderMap,
) -> AppResult<Json<LogoutResponse>> {
    let token = admin_token(&headers).unwrap_or_default();
    let origin = origin(&headers);
    let logged_out = state.auth.logout_admin(&token, origin.as_deref()).await?;
    Ok(Json(LogoutResponse { logged_out }))
}

/// POST /api/admin/refresh
///
/// 会话已过期时返回 SessionExpired，客户端应当登出。
pub async fn refresh(
    State(state): State<CanteenState>,
    headers: HeaderMap,
) -> AppResult<Json<RefreshResponse>> {
    let token = admin_token(&headers).ok_or_else(AppError::not_authenticated)?;
    let expires_at = state
        .auth
        .refresh_admin_session(&token)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::SessionExpired))?;
    Ok(Json(RefreshResponse { expires_at }))
}

/// GET /api/admin/lock-state
pub async fn lock_state(State(state): State<CanteenState>) -> AppResult<Json<LockState>> {
    Ok(Json(state.auth.lock_state().await?))
}

/// GET /api/admin/session - 中间件已校验，到这里一定有效
pub async fn session() -> Json<SessionResponse> {
    Json(SessionResponse { valid: true })
}

/// GET /api/admin/login-logs - 登录日志 (最新在前)
pub async fn login_logs(State(state): State<CanteenState>) -> AppResult<Json<Vec<LoginLogEntry>>> {
    Ok(Json(state.login_log.list().await?))
}
