//! 订阅句柄
//!
//! 每个 `listen_*` 返回一个 [`Subscription`]：
//! - 返回前先同步投递一次初始值
//! - 之后每次被监听的 collection 变更，重新计算并投递
//! - drop 或 `unsubscribe()` 取消后台任务，之后不再回调

use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use shared::error::AppResult;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::store::{Collection, Store};

/// Handle to a live listener
#[derive(Debug)]
pub struct Subscription {
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Stop the listener
    pub fn unsubscribe(self) {
        drop(self);
    }

    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.token.cancel();
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Spawn a listener that recomputes a value on every change to `watched`
/// and hands it to `callback`.
///
/// `compute` failures are logged and skipped; callback panics are caught so
/// one bad subscriber never stops delivery.
pub async fn spawn_listener<T, F, Fut, C>(
    store: &dyn Store,
    name: &'static str,
    watched: &'static [Collection],
    compute: F,
    callback: C,
) -> Subscription
where
    T: Send + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = AppResult<T>> + Send,
    C: Fn(T) + Send + Sync + 'static,
{
    // 先订阅，再计算初始值，避免漏掉中间的变更
    let mut rx = store.subscribe();
    let token = CancellationToken::new();
    let callback = Arc::new(callback);

    deliver(name, &token, &callback, compute().await);

    let task_token = token.clone();
    let handle = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = task_token.cancelled() => break,
                msg = rx.recv() => match msg {
                    Ok(change) if watched.contains(&change.collection) => {}
                    Ok(_) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(listener = name, skipped, "Listener lagged, recomputing");
                    }
                    Err(RecvError::Closed) => break,
                },
            }
            // 合并积压的变更，只重算一次
            while rx.try_recv().is_ok() {}
            let value = compute().await;
            deliver(name, &task_token, &callback, value);
        }
        tracing::debug!(listener = name, "Listener stopped");
    });

    Subscription {
        token,
        handle: Some(handle),
    }
}

fn deliver<T, C>(name: &str, token: &CancellationToken, callback: &Arc<C>, value: AppResult<T>)
where
    C: Fn(T) + Send + Sync + 'static,
{
    if token.is_cancelled() {
        return;
    }
    match value {
        Ok(value) => {
            if catch_unwind(AssertUnwindSafe(|| callback(value))).is_err() {
                tracing::error!(listener = name, "Subscriber callback panicked");
            }
        }
        Err(e) => {
            tracing::warn!(listener = name, error = %e, "Failed to compute listener value");
        }
    }
}
