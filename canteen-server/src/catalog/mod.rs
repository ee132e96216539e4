//! Menu Catalog - 菜单目录服务
//!
//! 两种模式在启动时按存储后端选定一次：
//!
//! | 模式 | 后端 | 数据来源 |
//! |------|------|----------|
//! | Overlay | Local | 静态目录 + `menu_overrides` 稀疏覆盖，读取时合并 |
//! | Documents | Remote | `menu` 集合即在线目录，首次为空时写入种子 |
//!
//! 两种模式对外返回同样形状的 [`MenuItem`] 列表，按 `(categoryId, sortOrder, name)` 排序。

pub mod defaults;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use serde_json::{Map, Value};
use shared::models::{MenuItem, MenuPatch};

use crate::message::{Subscription, spawn_listener};
use crate::store::{BackendKind, Collection, Store, merge_objects};
use crate::utils::{AppError, AppResult};

pub use defaults::{seed_items, seeded_item, static_catalog, static_item};

const OVERLAY_WATCH: &[Collection] = &[Collection::MenuOverrides];
const DOCUMENTS_WATCH: &[Collection] = &[Collection::Menu];

/// Catalog mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogMode {
    /// Static catalog + sparse overrides
    Overlay,
    /// `menu` collection is the live catalog
    Documents,
}

impl CatalogMode {
    pub fn for_backend(kind: BackendKind) -> Self {
        match kind {
            BackendKind::Local => Self::Overlay,
            BackendKind::Remote => Self::Documents,
        }
    }
}

/// Menu catalog service
///
/// Clone 成本很低 (全部 Arc)。
#[derive(Clone)]
pub struct MenuCatalog {
    store: Arc<dyn Store>,
    mode: CatalogMode,
    /// 每个进程只写一次种子
    seeded: Arc<AtomicBool>,
    /// 最近一次读到的目录 (Documents 模式更新失败时的回退来源)
    cache: Arc<RwLock<Vec<MenuItem>>>,
}

impl std::fmt::Debug for MenuCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MenuCatalog")
            .field("mode", &self.mode)
            .field("seeded", &self.seeded.load(Ordering::Relaxed))
            .finish()
    }
}

impl MenuCatalog {
    pub fn new(store: Arc<dyn Store>, mode: CatalogMode) -> Self {
        Self {
            store,
            mode,
            seeded: Arc::new(AtomicBool::new(false)),
            cache: Arc::new(RwLock::new(static_catalog().to_vec())),
        }
    }

    pub fn mode(&self) -> CatalogMode {
        self.mode
    }

    /// Current menu, merged and sorted
    pub async fn get_merged_menu(&self) -> AppResult<Vec<MenuItem>> {
        match self.mode {
            CatalogMode::Overlay => self.overlay_menu().await,
            CatalogMode::Documents => Ok(self.documents_menu().await),
        }
    }

    /// One item of the merged menu
    pub async fn get_item(&self, id: &str) -> AppResult<Option<MenuItem>> {
        let id = id.trim();
        Ok(self
            .get_merged_menu()
            .await?
            .into_iter()
            .find(|item| item.id == id))
    }

    /// Listen to the merged menu
    pub async fn listen_merged_menu<C>(&self, callback: C) -> Subscription
    where
        C: Fn(Vec<MenuItem>) + Send + Sync + 'static,
    {
        let watched = match self.mode {
            CatalogMode::Overlay => OVERLAY_WATCH,
            CatalogMode::Documents => DOCUMENTS_WATCH,
        };
        let catalog = self.clone();
        spawn_listener(
            self.store.as_ref(),
            "merged_menu",
            watched,
            move || {
                let catalog = catalog.clone();
                async move { catalog.get_merged_menu().await }
            },
            callback,
        )
        .await
    }

    /// Apply a partial update to one item
    ///
    /// 补丁先经过清洗；重复应用同一补丁结果不变。
    pub async fn update_menu_override(&self, item_id: &str, patch: MenuPatch) -> AppResult<()> {
        let item_id = validate_item_id(item_id)?;
        let patch = patch.sanitized();
        if patch.is_empty() {
            return Ok(());
        }
        let fields = patch.to_object();

        match self.mode {
            CatalogMode::Overlay => {
                self.store
                    .merge(Collection::MenuOverrides, item_id, fields)
                    .await?;
            }
            CatalogMode::Documents => {
                if let Err(e) = self.store.update(Collection::Menu, item_id, fields.clone()).await {
                    // 文档不存在或更新失败：以当前条目为底做一次 upsert
                    tracing::debug!(item_id = %item_id, error = %e, "Menu update failed, falling back to merge");
                    let mut doc = self.fallback_document(item_id);
                    merge_objects(&mut doc, fields);
                    self.store.merge(Collection::Menu, item_id, doc).await?;
                }
            }
        }

        tracing::info!(item_id = %item_id, mode = ?self.mode, "Menu item updated");
        Ok(())
    }

    /// Restore one item to its catalog definition
    pub async fn reset_menu_override(&self, item_id: &str) -> AppResult<()> {
        let item_id = validate_item_id(item_id)?;
        match self.mode {
            CatalogMode::Overlay => {
                self.store.delete(Collection::MenuOverrides, item_id).await?;
            }
            CatalogMode::Documents => {
                let doc = match seeded_item(item_id) {
                    Some(item) => Value::Object(item.to_object()),
                    None => serde_json::json!({ "id": item_id, "available": true }),
                };
                self.store.put(Collection::Menu, item_id, doc).await?;
            }
        }
        tracing::info!(item_id = %item_id, "Menu item reset");
        Ok(())
    }

    // ========== Overlay ==========

    async fn overlay_menu(&self) -> AppResult<Vec<MenuItem>> {
        let mut overrides: HashMap<String, Map<String, Value>> = self
            .store
            .list(Collection::MenuOverrides)
            .await?
            .into_iter()
            .filter_map(|doc| match doc.data {
                Value::Object(map) => Some((doc.id, map)),
                _ => {
                    tracing::warn!(key = %doc.id, "Ignoring non-object menu override");
                    None
                }
            })
            .collect();

        let mut items: Vec<MenuItem> = static_catalog()
            .iter()
            .map(|base| match overrides.remove(&base.id) {
                Some(patch) => apply_override(base, patch),
                None => base.clone(),
            })
            .collect();

        // 未知 id 的覆盖记录作为临时菜品出现
        items.extend(
            overrides
                .into_iter()
                .map(|(id, patch)| MenuItem::normalize(&Value::Object(patch), &id))
                .filter(|item| !item.id.is_empty()),
        );

        items.sort_by(MenuItem::catalog_order);
        Ok(items)
    }

    // ========== Documents ==========

    async fn documents_menu(&self) -> Vec<MenuItem> {
        let docs = match self.store.list(Collection::Menu).await {
            Ok(docs) => docs,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read menu collection, serving cached menu");
                return self.cache.read().clone();
            }
        };

        if docs.is_empty() {
            self.seed_once().await;
            let items = static_catalog().to_vec();
            *self.cache.write() = items.clone();
            return items;
        }

        let mut items: Vec<MenuItem> = docs
            .iter()
            .map(|doc| {
                let mut raw = doc.data.clone();
                if let Value::Object(map) = &mut raw {
                    map.insert("id".into(), Value::String(doc.id.clone()));
                }
                MenuItem::normalize(&raw, &doc.id)
            })
            .filter(|item| !item.id.is_empty())
            .collect();
        items.sort_by(MenuItem::catalog_order);

        *self.cache.write() = items.clone();
        items
    }

    async fn seed_once(&self) {
        if self.seeded.swap(true, Ordering::SeqCst) {
            return;
        }
        let seeds = seed_items();
        tracing::info!(count = seeds.len(), "Menu collection empty, seeding static catalog");
        for item in seeds {
            if let Err(e) = self
                .store
                .merge(Collection::Menu, &item.id, item.to_object())
                .await
            {
                tracing::error!(item_id = %item.id, error = %e, "Failed to seed menu item");
            }
        }
    }

    fn fallback_document(&self, item_id: &str) -> Map<String, Value> {
        if let Some(item) = self.cache.read().iter().find(|i| i.id == item_id) {
            return item.to_object();
        }
        if let Some(item) = static_item(item_id) {
            return item.to_object();
        }
        let mut doc = Map::new();
        doc.insert("id".into(), Value::String(item_id.to_string()));
        doc
    }
}

fn validate_item_id(item_id: &str) -> AppResult<&str> {
    let item_id = item_id.trim();
    if item_id.is_empty() {
        return Err(AppError::validation("Menu item id is required"));
    }
    Ok(item_id)
}

/// 合并单条覆盖：price 仅在覆盖里是数字时生效，available 缺省为 true
fn apply_override(base: &MenuItem, patch: Map<String, Value>) -> MenuItem {
    let price = match patch.get("price") {
        Some(Value::Number(n)) if n.as_f64().is_some_and(f64::is_finite) => Value::Number(n.clone()),
        _ => Value::from(base.price),
    };
    let available = match patch.get("available") {
        None | Some(Value::Null) => Value::Bool(true),
        Some(v) => v.clone(),
    };

    let mut merged = base.to_object();
    merge_objects(&mut merged, patch);
    merged.insert("price".into(), price);
    merged.insert("available".into(), available);
    MenuItem::normalize(&Value::Object(merged), &base.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::ChangeBus;
    use crate::store::{LocalStore, RemoteStore, RemoteStoreConfig};
    use parking_lot::Mutex;
    use serde_json::json;
    use std::time::Duration;

    fn overlay() -> MenuCatalog {
        let store = LocalStore::open_in_memory(ChangeBus::new()).unwrap();
        MenuCatalog::new(Arc::new(store), CatalogMode::Overlay)
    }

    async fn documents() -> MenuCatalog {
        let store = RemoteStore::connect(&RemoteStoreConfig::in_memory(), ChangeBus::new())
            .await
            .unwrap();
        MenuCatalog::new(Arc::new(store), CatalogMode::Documents)
    }

    fn patch(raw: Value) -> MenuPatch {
        MenuPatch::from_json(&raw)
    }

    #[tokio::test]
    async fn test_overlay_without_overrides_is_static_catalog() {
        let catalog = overlay();
        let menu = catalog.get_merged_menu().await.unwrap();
        assert_eq!(menu, static_catalog());
    }

    #[tokio::test]
    async fn test_overlay_override_and_reset_roundtrip() {
        let catalog = overlay();
        catalog
            .update_menu_override("tea", patch(json!({"price": 12, "available": false})))
            .await
            .unwrap();

        let tea = catalog.get_item("tea").await.unwrap().unwrap();
        assert_eq!(tea.price, 12);
        assert!(!tea.available);
        assert_eq!(tea.name, "Tea");

        catalog.reset_menu_override("tea").await.unwrap();
        let tea = catalog.get_item("tea").await.unwrap().unwrap();
        assert_eq!(&tea, static_item("tea").unwrap());
    }

    #[tokio::test]
    async fn test_overlay_patch_is_idempotent() {
        let catalog = overlay();
        let p = patch(json!({"available": false}));
        catalog.update_menu_override("coffee", p.clone()).await.unwrap();
        let once = catalog.get_merged_menu().await.unwrap();
        catalog.update_menu_override("coffee", p).await.unwrap();
        let twice = catalog.get_merged_menu().await.unwrap();
        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn test_overlay_missing_price_keeps_catalog_price() {
        let catalog = overlay();
        catalog
            .update_menu_override("puri", patch(json!({"tagline": "Crisp"})))
            .await
            .unwrap();
        let puri = catalog.get_item("puri").await.unwrap().unwrap();
        assert_eq!(puri.price, 45);
        assert_eq!(puri.tagline, "Crisp");
        assert!(puri.available);
    }

    #[tokio::test]
    async fn test_overlay_surfaces_adhoc_items() {
        let catalog = overlay();
        catalog
            .update_menu_override(
                "paneer-roll",
                patch(json!({"name": "Paneer Roll", "price": 55, "category": "Snacks"})),
            )
            .await
            .unwrap();
        let menu = catalog.get_merged_menu().await.unwrap();
        assert_eq!(menu.len(), static_catalog().len() + 1);
        let roll = menu.iter().find(|i| i.id == "paneer-roll").unwrap();
        assert_eq!(roll.category_id, "snacks");
        assert_eq!(roll.price, 55);
    }

    #[tokio::test]
    async fn test_blank_item_id_rejected() {
        let catalog = overlay();
        let err = catalog
            .update_menu_override("  ", patch(json!({"price": 1})))
            .await
            .unwrap_err();
        assert_eq!(err.code, shared::error::ErrorCode::ValidationFailed);
    }

    #[tokio::test]
    async fn test_documents_seeds_empty_collection_once() {
        let catalog = documents().await;
        let first = catalog.get_merged_menu().await.unwrap();
        assert_eq!(first, static_catalog());

        let stored = catalog.store.list(Collection::Menu).await.unwrap();
        assert_eq!(stored.len(), static_catalog().len());

        let second = catalog.get_merged_menu().await.unwrap();
        assert_eq!(second.len(), static_catalog().len());
        assert!(second.iter().all(|i| i.sort_order > 0));
    }

    #[tokio::test]
    async fn test_documents_update_falls_back_to_merge() {
        let catalog = documents().await;
        // 集合为空，update 失败后以静态条目为底 upsert
        catalog
            .update_menu_override("vada-pav", patch(json!({"price": 25})))
            .await
            .unwrap();
        let raw = catalog.store.get(Collection::Menu, "vada-pav").await.unwrap().unwrap();
        let item = MenuItem::normalize(&raw, "vada-pav");
        assert_eq!(item.price, 25);
        assert_eq!(item.name, "Vada Pav");
    }

    #[tokio::test]
    async fn test_documents_reset_restores_seeded_definition() {
        let catalog = documents().await;
        catalog.get_merged_menu().await.unwrap();
        catalog
            .update_menu_override("tea", patch(json!({"available": false, "price": 99})))
            .await
            .unwrap();
        catalog.reset_menu_override("tea").await.unwrap();
        let tea = catalog.get_item("tea").await.unwrap().unwrap();
        let seeded = seeded_item("tea").unwrap();
        assert_eq!(tea, seeded);
        // 重置后保留种子时的位置，不会跳到分类最前
        assert!(tea.sort_order > 0);
        let menu = catalog.get_merged_menu().await.unwrap();
        let stored = catalog.store.list(Collection::Menu).await.unwrap();
        let raw = stored.iter().find(|d| d.id == "tea").unwrap();
        assert_eq!(raw.data["sortOrder"], seeded.sort_order);
        let beverages: Vec<&str> = menu
            .iter()
            .filter(|i| i.category_id == "beverages")
            .map(|i| i.id.as_str())
            .collect();
        assert_eq!(beverages.len(), 5);
        assert_eq!(beverages.last().copied(), Some("tea"));

        catalog.reset_menu_override("mystery").await.unwrap();
        let mystery = catalog.get_item("mystery").await.unwrap().unwrap();
        assert!(mystery.available);
        assert_eq!(mystery.name, "mystery");
    }

    #[tokio::test]
    async fn test_listen_merged_menu_sees_overrides() {
        let catalog = overlay();
        let seen: Arc<Mutex<Vec<Vec<MenuItem>>>> = Arc::default();
        let sink = seen.clone();
        let sub = catalog
            .listen_merged_menu(move |menu| sink.lock().push(menu))
            .await;
        assert_eq!(seen.lock().len(), 1);

        catalog
            .update_menu_override("milk", patch(json!({"available": false})))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let last = seen.lock().last().cloned().unwrap();
        assert!(!last.iter().find(|i| i.id == "milk").unwrap().available);
        drop(sub);
    }
}
