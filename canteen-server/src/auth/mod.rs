//! 认证模块
//!
//! - [`AdminAuthGuard`] - 管理员三因素登录、锁定与会话
//! - [`KitchenPins`] - 厨房端 PIN 集合
//! - [`require_admin_session`] - 校验 `x-admin-token` 的中间件
//! - [`require_staff`] - 管理员会话或厨房 PIN

pub mod guard;
pub mod kitchen;
pub mod middleware;

pub use guard::AdminAuthGuard;
pub use kitchen::{FACTORY_PIN, KitchenPins};
pub use middleware::{
    ADMIN_TOKEN_HEADER, KITCHEN_PIN_HEADER, admin_token, require_admin_session, require_staff,
};

/// 连续失败多少次后锁定
pub const MAX_ATTEMPTS: u32 = 3;
/// 锁定时长 (分钟)
pub const LOCKOUT_MINUTES: i64 = 30;
/// 会话时长 (分钟)
pub const SESSION_MINUTES: i64 = 15;
