//! Canteen Server - 扫码点餐食堂核心
//!
//! # 架构概述
//!
//! 顾客扫描桌上的二维码下单，厨房按状态流转订单，管理员维护菜单、
//! 桌台和 PIN，并查看统计。所有持久化都经过 [`store::Store`]，
//! 启动时在本地 redb 和远程 SurrealDB 之间选定一个后端。
//!
//! # 模块结构
//!
//! ```text
//! canteen-server/src/
//! ├── core/          # 配置、状态、错误、HTTP 服务器
//! ├── store/         # 存储适配器 (redb / SurrealDB)
//! ├── message/       # 变更总线、订阅
//! ├── catalog/       # 菜单目录 + 覆盖
//! ├── orders/        # 订单生命周期
//! ├── auth/          # 管理员登录、厨房 PIN、会话中间件
//! ├── audit/         # 登录审计日志
//! ├── api/           # HTTP 路由和处理器
//! └── utils/         # 日志、时区
//! ```

pub mod analytics;
pub mod api;
pub mod assets;
pub mod audit;
pub mod auth;
pub mod catalog;
pub mod core;
pub mod message;
pub mod orders;
pub mod qr;
pub mod ratings;
pub mod scans;
pub mod store;
pub mod tables;
pub mod utils;

// Re-export 公共类型
pub use crate::core::{CanteenState, Config, Server, ServerError};
pub use message::{ChangeBus, Subscription};
pub use store::{BackendKind, Collection, LocalStore, RemoteStore, Store};
pub use utils::{AppError, AppResult};

// Re-export unified error types from shared
pub use utils::{ApiResponse, ErrorCategory, ErrorCode};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

// Security logging macro - 支持 tracing 格式说明符
#[macro_export]
macro_rules! security_log {
    ($level:expr, $event:expr, $($key:ident = $value:expr),*) => {
        tracing::info!(
            target: "security",
            level = $level,
            event = $event,
            $($key = $value),*
        );
    };
}

/// 设置运行环境: 加载 `.env`，初始化日志
///
/// 必须在读取配置之前调用。
pub fn setup_environment() -> Result<(), Box<dyn std::error::Error>> {
    // .env 不存在不是错误
    let _ = dotenv::dotenv();

    let log_level = std::env::var("LOG_LEVEL").ok();
    let log_dir = std::env::var("LOG_DIR").ok().filter(|d| !d.trim().is_empty());
    init_logger_with_file(log_level.as_deref(), log_dir.as_deref());
    Ok(())
}

pub fn print_banner() {
    println!(
        r#"
   ______            __
  / ____/___ _____  / /____  ___  ____
 / /   / __ `/ __ \/ __/ _ \/ _ \/ __ \
/ /___/ /_/ / / / / /_/  __/  __/ / / /
\____/\__,_/_/ /_/\__/\___/\___/_/ /_/
    "#
    );
}
