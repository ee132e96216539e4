//! 变更总线核心实现
//!
//! # 架构
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                   ChangeBus                      │
//! │  ┌───────────────────────────────────────────┐  │
//! │  │  broadcast::Sender<StoreChange>           │  │
//! │  └───────────────────────────────────────────┘  │
//! └────────────────────────┬────────────────────────┘
//!                          │ subscribe()
//!     ┌────────────────────┼────────────────────┐
//!     ▼                    ▼                    ▼
//! listen_orders     listen_merged_menu    SSE stream ...
//! ```
//!
//! LocalStore 在每次写事务提交后发布；RemoteStore 把 live query
//! 通知转发到同一条总线，所以其他设备的写入也能到达订阅者。

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::store::StoreChange;

/// Default capacity of the broadcast channel
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// 变更总线 - 负责存储变更的扇出
#[derive(Debug, Clone)]
pub struct ChangeBus {
    tx: broadcast::Sender<StoreChange>,
    /// 关闭信号令牌
    shutdown_token: CancellationToken,
}

impl ChangeBus {
    /// 创建默认容量的变更总线
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// 创建指定容量的变更总线
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// 发布变更 (无订阅者时静默丢弃)
    pub fn publish(&self, change: StoreChange) {
        tracing::trace!(
            collection = %change.collection,
            key = %change.key,
            kind = ?change.kind,
            "Store change published"
        );
        let _ = self.tx.send(change);
    }

    /// 订阅变更
    pub fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.tx.subscribe()
    }

    /// 当前订阅者数量
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// 获取关闭令牌 (用于监控关闭信号)
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown_token
    }

    /// 关闭总线，后台转发任务随之退出
    pub fn shutdown(&self) {
        tracing::info!("Shutting down change bus");
        self.shutdown_token.cancel();
    }
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new()
    }
}
