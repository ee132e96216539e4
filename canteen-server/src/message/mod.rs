//! 变更总线与订阅
//!
//! - [`ChangeBus`]: 存储变更的 broadcast 扇出
//! - [`Subscription`]: `listen_*` 返回的句柄，drop 即取消

pub mod bus;
pub mod subscription;

pub use bus::{ChangeBus, DEFAULT_CHANNEL_CAPACITY};
pub use subscription::{Subscription, spawn_listener};
