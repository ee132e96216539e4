//! Admin auth and login log models

use serde::{Deserialize, Serialize};

/// Origin identifier used when the caller has none
pub const DEFAULT_ORIGIN: &str = "local-device";

/// Persisted admin auth slot (single session)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdminAuthState {
    pub failed_attempts: u32,
    /// Unix millis, 0 = unlocked
    pub lock_until: i64,
    pub session: Option<AdminSession>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminSession {
    pub token: String,
    pub expires_at: i64,
}

/// Query view of the lockout state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockState {
    pub lock_until: i64,
    pub attempts_left: u32,
}

/// Admin login payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginAttempt {
    pub email: String,
    pub password: String,
    pub pin: String,
    /// Origin identifier (IP or device label)
    #[serde(default)]
    pub ip: Option<String>,
}

/// Successful login result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminLogin {
    pub token: String,
    pub expires_at: i64,
}

/// Login log action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginAction {
    AdminLoginSuccess,
    AdminLoginFailed,
    AdminLoginLocked,
    AdminLogout,
}

impl LoginAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AdminLoginSuccess => "admin_login_success",
            Self::AdminLoginFailed => "admin_login_failed",
            Self::AdminLoginLocked => "admin_login_locked",
            Self::AdminLogout => "admin_logout",
        }
    }
}

/// Login log entry (登录日志), append-only
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginLogEntry {
    pub id: String,
    pub action: LoginAction,
    #[serde(default)]
    pub email: String,
    pub ip_address: String,
    pub ok: bool,
    pub created_at: i64,
}

/// Kitchen PIN payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinRequest {
    pub pin: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_state_tolerates_missing_fields() {
        let state: AdminAuthState = serde_json::from_str("{}").unwrap();
        assert_eq!(state, AdminAuthState::default());

        let state: AdminAuthState =
            serde_json::from_str(r#"{"failedAttempts":2,"lockUntil":0}"#).unwrap();
        assert_eq!(state.failed_attempts, 2);
        assert!(state.session.is_none());
    }

    #[test]
    fn test_login_action_wire_format() {
        for action in [
            LoginAction::AdminLoginSuccess,
            LoginAction::AdminLoginFailed,
            LoginAction::AdminLoginLocked,
            LoginAction::AdminLogout,
        ] {
            let json = serde_json::to_string(&action).unwrap();
            assert_eq!(json, format!("\"{}\"", action.as_str()));
        }
    }
}
