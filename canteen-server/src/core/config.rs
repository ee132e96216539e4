use std::path::PathBuf;

use chrono_tz::Tz;

use crate::store::{BackendKind, RemoteStoreConfig};
use crate::utils::time::{DEFAULT_TIMEZONE, parse_timezone};
use crate::utils::{AppError, AppResult};
#[cfg(test)]
use crate::utils::ErrorCode;

/// 管理员凭据 (开发环境默认值)
#[derive(Debug, Clone)]
pub struct AdminCredentials {
    /// 小写比较
    pub email: String,
    pub password: String,
    pub pin: String,
}

impl Default for AdminCredentials {
    fn default() -> Self {
        Self {
            email: "owner@agmhotel.app".to_string(),
            password: "AGM@2026".to_string(),
            pin: "202601".to_string(),
        }
    }
}

/// 服务器配置 - 食堂点餐核心的所有配置项
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖 (启动时先加载 `.env`)：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | ./data | 工作目录 (redb 文件) |
/// | HTTP_PORT | 3000 | HTTP 服务端口 |
/// | ENVIRONMENT | development | 运行环境 |
/// | LOG_LEVEL | info | 日志级别 |
/// | LOG_DIR | - | 日志目录 (按天滚动) |
/// | TIMEZONE | Asia/Kolkata | 业务时区 |
/// | STORE_BACKEND | local | local / remote (设置了 REMOTE_STORE_URL 时默认 remote) |
/// | REMOTE_STORE_URL | - | SurrealDB 地址 (ws://host:port) |
/// | REMOTE_STORE_NAMESPACE | canteen | |
/// | REMOTE_STORE_DATABASE | orders | |
/// | REMOTE_STORE_USER / REMOTE_STORE_PASS | - | Root 登录 |
/// | ADMIN_EMAIL / ADMIN_PASSWORD / ADMIN_PIN | 开发默认值 | 管理员凭据 |
/// | PUBLIC_BASE_URL | http://localhost:5173 | 扫码点餐链接前缀 |
/// | ASSET_BASE_URL | /assets/menu | 菜品图片前缀 |
/// | ORDER_ESTIMATED_MINUTES | 15 | 预计出餐时间 |
/// | CHANGE_CHANNEL_CAPACITY | 1024 | 变更总线容量 |
///
/// # 示例
///
/// ```ignore
/// STORE_BACKEND=remote REMOTE_STORE_URL=ws://127.0.0.1:8000 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录
    pub work_dir: String,
    /// HTTP API 服务端口
    pub http_port: u16,
    /// 运行环境: development | staging | production
    pub environment: String,
    pub log_level: String,
    pub log_dir: Option<String>,
    /// 业务时区
    pub timezone: Tz,
    /// 存储后端 (启动时选定一次)
    pub backend: BackendKind,
    /// 远程存储连接参数 (backend = Remote 时必有)
    pub remote: Option<RemoteStoreConfig>,
    pub admin: AdminCredentials,
    pub public_base_url: String,
    pub asset_base_url: String,
    pub estimated_minutes: u32,
    pub change_channel_capacity: usize,
}


impl Config {
    /// 从环境变量加载配置
    ///
    /// 未设置的项使用默认值；`STORE_BACKEND=remote` 但缺少
    /// `REMOTE_STORE_URL` 时返回配置错误。
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 从任意键值来源加载配置 (测试时传入 HashMap)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let env_var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
            value.and_then(|v| v.parse().ok()).unwrap_or(default)
        }

        let timezone = match env_var("TIMEZONE") {
            Some(name) => parse_timezone(&name)?,
            None => DEFAULT_TIMEZONE,
        };

        let remote_url = env_var("REMOTE_STORE_URL");
        let backend = match env_var("STORE_BACKEND").map(|v| v.to_lowercase()).as_deref() {
            Some("local") => BackendKind::Local,
            Some("remote") => BackendKind::Remote,
            Some(other) => {
                return Err(AppError::config(format!(
                    "STORE_BACKEND must be 'local' or 'remote', got '{}'",
                    other
                )));
            }
            None if remote_url.is_some() => BackendKind::Remote,
            None => BackendKind::Local,
        };

        let remote = match (backend, remote_url) {
            (BackendKind::Remote, Some(url)) => Some(RemoteStoreConfig {
                url,
                namespace: env_var("REMOTE_STORE_NAMESPACE").unwrap_or_else(|| "canteen".into()),
                database: env_var("REMOTE_STORE_DATABASE").unwrap_or_else(|| "orders".into()),
                username: env_var("REMOTE_STORE_USER"),
                password: env_var("REMOTE_STORE_PASS"),
            }),
            (BackendKind::Remote, None) => {
                return Err(AppError::config(
                    "Remote store is not configured. Set REMOTE_STORE_URL (e.g. ws://127.0.0.1:8000) or use STORE_BACKEND=local",
                ));
            }
            (BackendKind::Local, _) => None,
        };

        let defaults = AdminCredentials::default();
        let admin = AdminCredentials {
            email: env_var("ADMIN_EMAIL")
                .unwrap_or(defaults.email)
                .to_lowercase(),
            password: env_var("ADMIN_PASSWORD").unwrap_or(defaults.password),
            pin: env_var("ADMIN_PIN").unwrap_or(defaults.pin),
        };

        Ok(Self {
            work_dir: env_var("WORK_DIR").unwrap_or_else(|| "./data".into()),
            http_port: parse_or(env_var("HTTP_PORT"), 3000),
            environment: env_var("ENVIRONMENT").unwrap_or_else(|| "development".into()),
            log_level: env_var("LOG_LEVEL").unwrap_or_else(|| "info".into()),
            log_dir: env_var("LOG_DIR"),
            timezone,
            backend,
            remote,
            admin,
            public_base_url: env_var("PUBLIC_BASE_URL")
                .unwrap_or_else(|| "http://localhost:5173".into())
                .trim_end_matches('/')
                .to_string(),
            asset_base_url: env_var("ASSET_BASE_URL")
                .unwrap_or_else(|| "/assets/menu".into())
                .trim_end_matches('/')
                .to_string(),
            estimated_minutes: parse_or(env_var("ORDER_ESTIMATED_MINUTES"), 15),
            change_channel_capacity: parse_or(env_var("CHANGE_CHANNEL_CAPACITY"), 1024),
        })
    }

    /// 测试用配置 (本地后端，开发凭据)
    pub fn for_tests() -> Self {
        Self {
            work_dir: "./data".into(),
            http_port: 0,
            environment: "test".into(),
            log_level: "debug".into(),
            log_dir: None,
            timezone: DEFAULT_TIMEZONE,
            backend: BackendKind::Local,
            remote: None,
            admin: AdminCredentials::default(),
            public_base_url: "http://localhost:5173".into(),
            asset_base_url: "/assets/menu".into(),
            estimated_minutes: 15,
            change_channel_capacity: 1024,
        }
    }

    /// redb 文件路径
    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("canteen.redb")
    }

    /// 确保工作目录存在
    pub fn ensure_work_dir(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.work_dir)
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// 是否开发环境
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}
