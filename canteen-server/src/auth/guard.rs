//! Admin Auth Guard - 管理员登录守卫
//!
//! 三因素登录 (邮箱 / 密码 / PIN)，失败 3 次锁定 30 分钟，会话 15 分钟。
//! 认证状态每次调用都从存储重新读取，超时在访问时惰性判断。

use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use rand::RngCore;
use shared::models::{AdminAuthState, AdminLogin, AdminSession, LockState, LoginAction, LoginAttempt};
use shared::util::{minutes_to_millis, now_millis};

use super::{LOCKOUT_MINUTES, MAX_ATTEMPTS, SESSION_MINUTES};
use crate::audit::LoginLog;
use crate::core::AdminCredentials;
use crate::security_log;
use crate::store::{Collection, Store, encode, read_or_default, settings_keys};
use crate::utils::{AppError, AppResult, ErrorCode};

/// Configured credentials, password kept only as an argon2 hash
struct HashedCredentials {
    email: String,
    password_hash: String,
    pin: String,
}

impl HashedCredentials {
    fn new(credentials: &AdminCredentials) -> AppResult<Self> {
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(credentials.password.as_bytes(), &salt)
            .map_err(|e| AppError::internal(format!("Failed to hash admin password: {}", e)))?
            .to_string();
        Ok(Self {
            email: credentials.email.trim().to_lowercase(),
            password_hash,
            pin: credentials.pin.clone(),
        })
    }

    /// 三个因素都检查，不提前返回
    fn matches(&self, attempt: &LoginAttempt) -> bool {
        let email_ok = attempt.email.trim().to_lowercase() == self.email;
        let pin_ok = attempt.pin == self.pin;
        let password_ok = PasswordHash::new(&self.password_hash)
            .map(|parsed| {
                Argon2::default()
                    .verify_password(attempt.password.as_bytes(), &parsed)
                    .is_ok()
            })
            .unwrap_or(false);
        email_ok && password_ok && pin_ok
    }
}

#[derive(Clone)]
pub struct AdminAuthGuard {
    store: Arc<dyn Store>,
    credentials: Arc<HashedCredentials>,
    log: LoginLog,
}

impl std::fmt::Debug for AdminAuthGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminAuthGuard")
            .field("email", &self.credentials.email)
            .finish_non_exhaustive()
    }
}

impl AdminAuthGuard {
    pub fn new(store: Arc<dyn Store>, credentials: &AdminCredentials, log: LoginLog) -> AppResult<Self> {
        Ok(Self {
            store,
            credentials: Arc::new(HashedCredentials::new(credentials)?),
            log,
        })
    }

    /// Verify an admin login attempt
    ///
    /// 错误信息不区分是哪个因素错误。
    pub async fn verify_admin_credentials(&self, attempt: LoginAttempt) -> AppResult<AdminLogin> {
        self.verify_admin_credentials_at(attempt, now_millis()).await
    }

    pub async fn verify_admin_credentials_at(
        &self,
        attempt: LoginAttempt,
        now: i64,
    ) -> AppResult<AdminLogin> {
        let mut state = self.load_state().await?;
        let origin = attempt.ip.as_deref();

        if now < state.lock_until {
            self.log
                .append(LoginAction::AdminLoginLocked, &attempt.email, origin, false, now)
                .await?;
            security_log!("WARN", "admin_login_locked", lock_until = state.lock_until);
            return Err(locked(state.lock_until));
        }

        if !self.credentials.matches(&attempt) {
            let attempts = state.failed_attempts + 1;
            let now_locked = attempts >= MAX_ATTEMPTS;
            if now_locked {
                state.lock_until = now + minutes_to_millis(LOCKOUT_MINUTES);
                state.failed_attempts = 0;
            } else {
                state.lock_until = 0;
                state.failed_attempts = attempts;
            }
            self.save_state(&state).await?;
            self.log
                .append(LoginAction::AdminLoginFailed, &attempt.email, origin, false, now)
                .await?;

            if now_locked {
                security_log!("WARN", "admin_locked_out", lock_until = state.lock_until);
                return Err(locked(state.lock_until));
            }
            security_log!("WARN", "admin_login_failed", attempts = attempts);
            return Err(AppError::invalid_credentials()
                .with_detail("attemptsLeft", MAX_ATTEMPTS - attempts));
        }

        let session = AdminSession {
            token: new_session_token(),
            expires_at: now + minutes_to_millis(SESSION_MINUTES),
        };
        let state = AdminAuthState {
            failed_attempts: 0,
            lock_until: 0,
            session: Some(session.clone()),
        };
        self.save_state(&state).await?;
        self.log
            .append(LoginAction::AdminLoginSuccess, &attempt.email, origin, true, now)
            .await?;
        security_log!("INFO", "admin_login_success", expires_at = session.expires_at);

        Ok(AdminLogin {
            token: session.token,
            expires_at: session.expires_at,
        })
    }

    /// Is `token` the current, unexpired session
    pub async fn validate_admin_session(&self, token: &str) -> AppResult<bool> {
        self.validate_admin_session_at(token, now_millis()).await
    }

    pub async fn validate_admin_session_at(&self, token: &str, now: i64) -> AppResult<bool> {
        let state = self.load_state().await?;
        Ok(matches!(
            &state.session,
            Some(session) if !token.is_empty() && session.token == token && now < session.expires_at
        ))
    }

    /// Extend the session by another window
    ///
    /// 已过期的会话不能续期 (调用方应视为强制登出)。返回新的过期时间。
    pub async fn refresh_admin_session(&self, token: &str) -> AppResult<Option<i64>> {
        self.refresh_admin_session_at(token, now_millis()).await
    }

    pub async fn refresh_admin_session_at(&self, token: &str, now: i64) -> AppResult<Option<i64>> {
        let mut state = self.load_state().await?;
        let Some(session) = state.session.as_mut() else {
            return Ok(None);
        };
        if token.is_empty() || session.token != token || now >= session.expires_at {
            return Ok(None);
        }
        session.expires_at = now + minutes_to_millis(SESSION_MINUTES);
        let expires_at = session.expires_at;
        self.save_state(&state).await?;
        Ok(Some(expires_at))
    }

    /// Clear the session if `token` owns it
    pub async fn logout_admin(&self, token: &str, origin: Option<&str>) -> AppResult<bool> {
        self.logout_admin_at(token, origin, now_millis()).await
    }

    pub async fn logout_admin_at(&self, token: &str, origin: Option<&str>, now: i64) -> AppResult<bool> {
        let mut state = self.load_state().await?;
        let owns = state
            .session
            .as_ref()
            .is_some_and(|s| !token.is_empty() && s.token == token);
        if !owns {
            return Ok(false);
        }
        state.session = None;
        self.save_state(&state).await?;
        self.log
            .append(LoginAction::AdminLogout, &self.credentials.email, origin, true, now)
            .await?;
        security_log!("INFO", "admin_logout", email = self.credentials.email.clone());
        Ok(true)
    }

    /// Lockout view for the login screen
    pub async fn lock_state(&self) -> AppResult<LockState> {
        self.lock_state_at(now_millis()).await
    }

    pub async fn lock_state_at(&self, now: i64) -> AppResult<LockState> {
        let state = self.load_state().await?;
        let attempts_left = if now < state.lock_until {
            0
        } else {
            MAX_ATTEMPTS.saturating_sub(state.failed_attempts)
        };
        Ok(LockState {
            lock_until: state.lock_until,
            attempts_left,
        })
    }

    async fn load_state(&self) -> AppResult<AdminAuthState> {
        Ok(read_or_default(self.store.as_ref(), Collection::Settings, settings_keys::ADMIN_AUTH)
            .await?
            .unwrap_or_default())
    }

    async fn save_state(&self, state: &AdminAuthState) -> AppResult<()> {
        self.store
            .put(Collection::Settings, settings_keys::ADMIN_AUTH, encode(state)?)
            .await?;
        Ok(())
    }
}

fn locked(lock_until: i64) -> AppError {
    AppError::new(ErrorCode::AccountLocked)
        .with_detail("lockUntil", lock_until)
        .with_detail("attemptsLeft", 0)
}

/// `session_` + 32 random bytes (hex)
fn new_session_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("session_{}", hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::ChangeBus;
    use crate::store::LocalStore;

    const T0: i64 = 1_768_458_600_000;

    fn guard() -> (AdminAuthGuard, LoginLog) {
        let store: Arc<dyn Store> = Arc::new(LocalStore::open_in_memory(ChangeBus::new()).unwrap());
        let log = LoginLog::new(store.clone());
        let guard = AdminAuthGuard::new(store, &AdminCredentials::default(), log.clone()).unwrap();
        (guard, log)
    }

    fn good() -> LoginAttempt {
        LoginAttempt {
            email: "OWNER@agmhotel.app".into(),
            password: "AGM@2026".into(),
            pin: "202601".into(),
            ip: Some("192.168.1.20".into()),
        }
    }

    fn wrong_pin() -> LoginAttempt {
        LoginAttempt {
            pin: "000000".into(),
            ..good()
        }
    }

    #[tokio::test]
    async fn test_successful_login_creates_session() {
        let (guard, log) = guard();
        let login = guard.verify_admin_credentials_at(good(), T0).await.unwrap();

        assert!(login.token.starts_with("session_"));
        assert_eq!(login.token.len(), "session_".len() + 64);
        assert_eq!(login.expires_at, T0 + minutes_to_millis(15));
        assert!(guard.validate_admin_session_at(&login.token, T0 + 1).await.unwrap());
        assert!(!guard.validate_admin_session_at("session_other", T0 + 1).await.unwrap());

        let entries = log.list().await.unwrap();
        assert_eq!(entries[0].action, LoginAction::AdminLoginSuccess);
        assert_eq!(entries[0].ip_address, "192.168.1.20");
    }

    #[tokio::test]
    async fn test_failure_reports_attempts_left() {
        let (guard, _) = guard();
        let err = guard.verify_admin_credentials_at(wrong_pin(), T0).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidCredentials);
        assert_eq!(err.detail("attemptsLeft"), Some(&serde_json::json!(2)));
        assert_eq!(guard.lock_state_at(T0).await.unwrap().attempts_left, 2);
    }

    #[tokio::test]
    async fn test_three_failures_lock_for_thirty_minutes() {
        let (guard, log) = guard();
        for _ in 0..2 {
            let err = guard.verify_admin_credentials_at(wrong_pin(), T0).await.unwrap_err();
            assert_eq!(err.code, ErrorCode::InvalidCredentials);
        }
        let err = guard.verify_admin_credentials_at(wrong_pin(), T0).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::AccountLocked);
        let lock_until = T0 + minutes_to_millis(30);
        assert_eq!(err.detail("lockUntil"), Some(&serde_json::json!(lock_until)));

        // 锁定期内即使凭据正确也拒绝，且不消耗次数
        let err = guard
            .verify_admin_credentials_at(good(), T0 + minutes_to_millis(10))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::AccountLocked);
        let lock = guard.lock_state_at(T0 + minutes_to_millis(10)).await.unwrap();
        assert_eq!(lock, LockState { lock_until, attempts_left: 0 });
        assert_eq!(log.list().await.unwrap()[0].action, LoginAction::AdminLoginLocked);

        // 锁定到期后成功登录，计数清零
        let after = lock_until + 1;
        assert_eq!(guard.lock_state_at(after).await.unwrap().attempts_left, 3);
        guard.verify_admin_credentials_at(good(), after).await.unwrap();
        assert_eq!(
            guard.lock_state_at(after).await.unwrap(),
            LockState { lock_until: 0, attempts_left: 3 }
        );
    }

    #[tokio::test]
    async fn test_session_expiry_and_refresh() {
        let (guard, _) = guard();
        let login = guard.verify_admin_credentials_at(good(), T0).await.unwrap();

        let halfway = T0 + minutes_to_millis(10);
        let extended = guard.refresh_admin_session_at(&login.token, halfway).await.unwrap();
        assert_eq!(extended, Some(halfway + minutes_to_millis(15)));
        assert!(guard.validate_admin_session_at(&login.token, T0 + minutes_to_millis(20)).await.unwrap());

        let expired = halfway + minutes_to_millis(15);
        assert!(!guard.validate_admin_session_at(&login.token, expired).await.unwrap());
        assert_eq!(guard.refresh_admin_session_at(&login.token, expired).await.unwrap(), None);
        assert_eq!(guard.refresh_admin_session_at("nope", halfway).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_logout_requires_matching_token() {
        let (guard, log) = guard();
        let login = guard.verify_admin_credentials_at(good(), T0).await.unwrap();

        assert!(!guard.logout_admin_at("session_wrong", None, T0 + 1).await.unwrap());
        assert!(guard.validate_admin_session_at(&login.token, T0 + 2).await.unwrap());

        assert!(guard.logout_admin_at(&login.token, None, T0 + 3).await.unwrap());
        assert!(!guard.validate_admin_session_at(&login.token, T0 + 4).await.unwrap());

        let entries = log.list().await.unwrap();
        assert_eq!(entries[0].action, LoginAction::AdminLogout);
        assert_eq!(entries[0].email, "owner@agmhotel.app");
    }

    #[tokio::test]
    async fn test_corrupt_auth_state_treated_as_unlocked() {
        let (guard, _) = guard();
        guard
            .store
            .put(Collection::Settings, settings_keys::ADMIN_AUTH, serde_json::json!({"lockUntil": "soon"}))
            .await
            .unwrap();
        assert_eq!(
            guard.lock_state_at(T0).await.unwrap(),
            LockState { lock_until: 0, attempts_left: 3 }
        );
        guard.verify_admin_credentials_at(good(), T0).await.unwrap();
    }
}
