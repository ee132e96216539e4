//! 登录日志 - Append-only
//!
//! 管理员登录成功、失败、锁定、登出都会追加一条 [`LoginLogEntry`]，
//! 条目 id 由存储分配，没有修改和删除接口。

use std::sync::Arc;

use serde_json::Value;
use shared::models::{DEFAULT_ORIGIN, LoginAction, LoginLogEntry};

use crate::message::{Subscription, spawn_listener};
use crate::store::{Collection, Store, decode_all, encode};
use crate::utils::AppResult;

const WATCH: &[Collection] = &[Collection::LoginLogs];

#[derive(Clone)]
pub struct LoginLog {
    store: Arc<dyn Store>,
}

impl std::fmt::Debug for LoginLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginLog").finish_non_exhaustive()
    }
}

impl LoginLog {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Append one entry, returns it with its storage id
    pub async fn append(
        &self,
        action: LoginAction,
        email: &str,
        origin: Option<&str>,
        ok: bool,
        now: i64,
    ) -> AppResult<LoginLogEntry> {
        let mut entry = LoginLogEntry {
            id: String::new(),
            action,
            email: email.trim().to_lowercase(),
            ip_address: origin
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .unwrap_or(DEFAULT_ORIGIN)
                .to_string(),
            ok,
            created_at: now,
        };

        let mut doc = encode(&entry)?;
        if let Value::Object(map) = &mut doc {
            map.remove("id");
        }
        entry.id = self.store.insert(Collection::LoginLogs, doc).await?;
        Ok(entry)
    }

    /// All entries, newest first
    pub async fn list(&self) -> AppResult<Vec<LoginLogEntry>> {
        let docs = self.store.list(Collection::LoginLogs).await?;
        let mut entries: Vec<LoginLogEntry> = decode_all(Collection::LoginLogs, docs);
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(entries)
    }

    pub async fn listen_login_logs<C>(&self, callback: C) -> Subscription
    where
        C: Fn(Vec<LoginLogEntry>) + Send + Sync + 'static,
    {
        let log = self.clone();
        spawn_listener(
            self.store.as_ref(),
            "login_logs",
            WATCH,
            move || {
                let log = log.clone();
                async move { log.list().await }
            },
            callback,
        )
        .await
    }
}
