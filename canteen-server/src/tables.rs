//! Table Registry - 桌台启用状态
//!
//! `tables` 集合按桌号字符串存储 [`TableConfig`]。
//! 记录缺失、损坏或不完整 (不是恰好 1..=12 各一条) 时重建并持久化 12 张启用的默认桌台。

use std::collections::BTreeSet;
use std::sync::Arc;

use shared::models::{TABLE_COUNT, TableConfig, is_valid_table};

use crate::message::{Subscription, spawn_listener};
use crate::store::{Collection, Store, decode_all, encode};
use crate::utils::{AppError, AppResult, ErrorCode};

const WATCH: &[Collection] = &[Collection::Tables];

#[derive(Clone)]
pub struct TableRegistry {
    store: Arc<dyn Store>,
}

impl std::fmt::Debug for TableRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableRegistry").finish_non_exhaustive()
    }
}

impl TableRegistry {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// All tables, sorted by number
    pub async fn get_table_config(&self) -> AppResult<Vec<TableConfig>> {
        let docs = self.store.list(Collection::Tables).await?;
        let doc_count = docs.len();
        let mut tables: Vec<TableConfig> = decode_all(Collection::Tables, docs);
        tables.sort_by_key(|t| t.table_number);

        if is_complete(&tables) && doc_count == tables.len() {
            return Ok(tables);
        }

        if doc_count > 0 {
            tracing::warn!(
                stored = doc_count,
                valid = tables.len(),
                "Table registry incomplete, regenerating defaults"
            );
        }
        self.regenerate().await
    }

    /// Is `table` a valid, enabled table
    pub async fn is_table_enabled(&self, table: u32) -> AppResult<bool> {
        if !is_valid_table(table) {
            return Ok(false);
        }
        Ok(self
            .get_table_config()
            .await?
            .iter()
            .any(|t| t.table_number == table && t.enabled))
    }

    /// Enable or disable one table
    pub async fn set_table_enabled(&self, table: u32, enabled: bool) -> AppResult<TableConfig> {
        if !is_valid_table(table) {
            return Err(table_not_found(table));
        }
        // 先确保注册表完整
        self.get_table_config().await?;

        let config = TableConfig {
            table_number: table,
            enabled,
        };
        self.store
            .put(Collection::Tables, &table.to_string(), encode(&config)?)
            .await?;
        tracing::info!(table, enabled, "Table updated");
        Ok(config)
    }

    /// Listen to the table registry
    pub async fn listen_table_config<C>(&self, callback: C) -> Subscription
    where
        C: Fn(Vec<TableConfig>) + Send + Sync + 'static,
    {
        let registry = self.clone();
        spawn_listener(
            self.store.as_ref(),
            "table_config",
            WATCH,
            move || {
                let registry = registry.clone();
                async move { registry.get_table_config().await }
            },
            callback,
        )
        .await
    }

    async fn regenerate(&self) -> AppResult<Vec<TableConfig>> {
        for doc in self.store.list(Collection::Tables).await? {
            self.store.delete(Collection::Tables, &doc.id).await?;
        }
        let defaults = TableConfig::defaults();
        for table in &defaults {
            self.store
                .put(
                    Collection::Tables,
                    &table.table_number.to_string(),
                    encode(table)?,
                )
                .await?;
        }
        Ok(defaults)
    }
}

pub(crate) fn table_not_found(table: u32) -> AppError {
    AppError::with_message(
        ErrorCode::TableNotFound,
        format!("Table {} does not exist (1-{})", table, TABLE_COUNT),
    )
    .with_detail("tableNumber", table)
}

/// 恰好 1..=TABLE_COUNT 各一条 (输入已按桌号排序)
fn is_complete(tables: &[TableConfig]) -> bool {
    let numbers: BTreeSet<u32> = tables.iter().map(|t| t.table_number).collect();
    tables.len() == TABLE_COUNT as usize
        && numbers.len() == tables.len()
        && numbers.iter().all(|n| is_valid_table(*n))
}
