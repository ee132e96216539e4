use std::sync::Arc;

use crate::analytics::AnalyticsService;
use crate::assets::AssetResolver;
use crate::audit::LoginLog;
use crate::auth::{AdminAuthGuard, KitchenPins};
use crate::catalog::{CatalogMode, MenuCatalog};
use crate::core::{Config, Result, ServerError};
use crate::message::ChangeBus;
use crate::orders::OrderEngine;
use crate::ratings::RatingService;
use crate::scans::ScanCounter;
use crate::store::{BackendKind, LocalStore, RemoteStore, Store};
use crate::tables::TableRegistry;
use crate::utils::AppError;

/// 服务器状态 - 持有所有服务的共享引用
///
/// 所有服务内部都是 `Arc`，clone 只是浅拷贝。
///
/// | 字段 | 说明 |
/// |------|------|
/// | config | 配置项 (不可变) |
/// | bus | 存储变更总线 |
/// | store | 启动时选定的存储后端 |
/// | catalog | 菜单目录 |
/// | tables | 桌台配置 |
/// | orders | 订单生命周期 |
/// | ratings | 评价 |
/// | auth | 管理员登录、锁定、会话 |
/// | kitchen | 厨房 PIN |
/// | login_log | 登录审计日志 |
/// | scans | 扫码计数 |
/// | analytics | 管理端统计 |
/// | assets | 菜品图片地址 |
#[derive(Clone)]
pub struct CanteenState {
    pub config: Config,
    pub bus: ChangeBus,
    pub store: Arc<dyn Store>,
    pub catalog: MenuCatalog,
    pub tables: TableRegistry,
    pub orders: OrderEngine,
    pub ratings: RatingService,
    pub auth: AdminAuthGuard,
    pub kitchen: KitchenPins,
    pub login_log: LoginLog,
    pub scans: ScanCounter,
    pub analytics: AnalyticsService,
    pub assets: AssetResolver,
}

impl std::fmt::Debug for CanteenState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CanteenState")
            .field("backend", &self.store.kind())
            .field("catalog", &self.catalog)
            .field("orders", &self.orders)
            .finish_non_exhaustive()
    }
}

impl CanteenState {
    /// 初始化服务器状态
    ///
    /// 按配置打开存储后端 (只选一次)。打开失败是唯一的致命错误。
    pub async fn initialize(config: &Config) -> Result<Self> {
        let bus = ChangeBus::with_capacity(config.change_channel_capacity);

        let store: Arc<dyn Store> = match config.backend {
            BackendKind::Local => {
                config.ensure_work_dir()?;
                let path = config.database_path();
                tracing::info!(path = %path.display(), "Opening local store");
                Arc::new(LocalStore::open(&path, bus.clone())?)
            }
            BackendKind::Remote => {
                let remote = config.remote.as_ref().ok_or_else(|| {
                    ServerError::Config(AppError::config(
                        "Remote store selected but REMOTE_STORE_URL is missing",
                    ))
                })?;
                tracing::info!(
                    url = %remote.url,
                    namespace = %remote.namespace,
                    database = %remote.database,
                    "Connecting remote store"
                );
                Arc::new(RemoteStore::connect(remote, bus.clone()).await?)
            }
        };

        Self::with_store(config.clone(), store, bus)
    }

    /// 用已打开的存储组装所有服务 (测试也走这里)
    pub fn with_store(config: Config, store: Arc<dyn Store>, bus: ChangeBus) -> Result<Self> {
        let tables = TableRegistry::new(store.clone());
        let orders = OrderEngine::new(
            store.clone(),
            tables.clone(),
            config.timezone,
            config.estimated_minutes,
        );
        let ratings = RatingService::new(store.clone(), orders.clone());
        let scans = ScanCounter::new(store.clone());
        let login_log = LoginLog::new(store.clone());
        let auth = AdminAuthGuard::new(store.clone(), &config.admin, login_log.clone())?;
        let analytics = AnalyticsService::new(
            store.clone(),
            orders.clone(),
            ratings.clone(),
            scans.clone(),
            config.timezone,
        );
        let catalog = MenuCatalog::new(store.clone(), CatalogMode::for_backend(store.kind()));

        tracing::info!(
            backend = ?store.kind(),
            catalog_mode = ?catalog.mode(),
            timezone = %config.timezone,
            "Canteen state ready"
        );

        Ok(Self {
            assets: AssetResolver::new(config.asset_base_url.clone()),
            kitchen: KitchenPins::new(store.clone()),
            config,
            bus,
            store,
            catalog,
            tables,
            orders,
            ratings,
            auth,
            login_log,
            scans,
            analytics,
        })
    }

    /// 获取存储后端
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }
}
