//! 管理员会话与厨房端中间件
//!
//! 管理接口要求请求头 `x-admin-token` 携带有效会话令牌。
//! 订单状态流转还接受厨房端 `x-kitchen-pin`。

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::core::CanteenState;
use crate::security_log;
use crate::utils::{AppError, ErrorCode};

/// Admin session header
pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";
/// Kitchen device PIN header
pub const KITCHEN_PIN_HEADER: &str = "x-kitchen-pin";

/// 认证中间件 - 要求有效的管理员会话
///
/// # 跳过认证
///
/// - `OPTIONS *` (CORS 预检)
///
/// # 错误
///
/// | 情况 | 错误码 |
/// |------|--------|
/// | 无令牌 | NotAuthenticated (401) |
/// | 令牌不匹配或已过期 | SessionExpired (401) |
pub async fn require_admin_session(
    State(state): State<CanteenState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if req.method() == http::Method::OPTIONS {
        return Ok(next.run(req).await);
    }

    let Some(token) = admin_token(req.headers()) else {
        security_log!("WARN", "admin_token_missing", uri = req.uri().to_string());
        return Err(AppError::not_authenticated());
    };

    if !state.auth.validate_admin_session(&token).await? {
        security_log!("WARN", "admin_session_invalid", uri = req.uri().to_string());
        return Err(AppError::new(ErrorCode::SessionExpired));
    }

    Ok(next.run(req).await)
}

/// 厨房或管理员 - 有效管理员会话或有效厨房 PIN 二者之一
///
/// 两个请求头都带时先看管理员令牌，令牌无效不再回退到 PIN。
///
/// | 情况 | 错误码 |
/// |------|--------|
/// | 两者都没有 | NotAuthenticated (401) |
/// | 令牌不匹配或已过期 | SessionExpired (401) |
/// | PIN 不在集合中 | InvalidCredentials (401) |
pub async fn require_staff(
    State(state): State<CanteenState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if req.method() == http::Method::OPTIONS {
        return Ok(next.run(req).await);
    }

    if let Some(token) = admin_token(req.headers()) {
        if !state.auth.validate_admin_session(&token).await? {
            security_log!("WARN", "admin_session_invalid", uri = req.uri().to_string());
            return Err(AppError::new(ErrorCode::SessionExpired));
        }
        return Ok(next.run(req).await);
    }

    let Some(pin) = header_value(req.headers(), KITCHEN_PIN_HEADER) else {
        security_log!("WARN", "staff_credentials_missing", uri = req.uri().to_string());
        return Err(AppError::not_authenticated());
    };

    if !state.kitchen.verify_kitchen_pin(&pin).await? {
        security_log!("WARN", "kitchen_pin_rejected", uri = req.uri().to_string());
        return Err(AppError::invalid_credentials());
    }

    Ok(next.run(req).await)
}

/// Token from the admin header, if present
pub fn admin_token(headers: &http::HeaderMap) -> Option<String> {
    header_value(headers, ADMIN_TOKEN_HEADER)
}

fn header_value(headers: &http::HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|h| h.to_str().ok())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}
