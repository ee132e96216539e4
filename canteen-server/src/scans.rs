//! Scan counters - 扫码次数统计
//!
//! 单文档 `settings/scans`，非原子读改写 (多设备并发时允许少计)。

use std::sync::Arc;

use shared::models::{ScanStats, is_valid_table};

use crate::store::{Collection, Store, encode, read_or_default, settings_keys};
use crate::tables::table_not_found;
use crate::utils::AppResult;

#[derive(Clone)]
pub struct ScanCounter {
    store: Arc<dyn Store>,
}

impl std::fmt::Debug for ScanCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanCounter").finish_non_exhaustive()
    }
}

impl ScanCounter {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Record one scan of a table's code
    pub async fn increment_scan(&self, table: u32) -> AppResult<ScanStats> {
        if !is_valid_table(table) {
            return Err(table_not_found(table));
        }
        let mut stats = self.get_scan_stats().await?;
        stats.total_scans += 1;
        *stats.scans_per_table.entry(table.to_string()).or_insert(0) += 1;
        self.store
            .put(Collection::Settings, settings_keys::SCANS, encode(&stats)?)
            .await?;
        tracing::debug!(table, total = stats.total_scans, "Scan recorded");
        Ok(stats)
    }

    pub async fn get_scan_stats(&self) -> AppResult<ScanStats> {
        Ok(read_or_default(self.store.as_ref(), Collection::Settings, settings_keys::SCANS)
            .await?
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::ChangeBus;
    use crate::store::LocalStore;
    use crate::utils::ErrorCode;

    fn counter() -> ScanCounter {
        ScanCounter::new(Arc::new(LocalStore::open_in_memory(ChangeBus::new()).unwrap()))
    }

    #[tokio::test]
    async fn test_increment_scan() {
        let counter = counter();
        assert_eq!(counter.get_scan_stats().await.unwrap(), ScanStats::default());

        counter.increment_scan(3).await.unwrap();
        counter.increment_scan(3).await.unwrap();
        let stats = counter.increment_scan(7).await.unwrap();

        assert_eq!(stats.total_scans, 3);
        assert_eq!(stats.scans_per_table.get("3"), Some(&2));
        assert_eq!(stats.scans_per_table.get("7"), Some(&1));
        assert_eq!(counter.get_scan_stats().await.unwrap(), stats);
    }

    #[tokio::test]
    async fn test_invalid_table_not_counted() {
        let counter = counter();
        let err = counter.increment_scan(0).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::TableNotFound);
        assert_eq!(counter.get_scan_stats().await.unwrap().total_scans, 0);
    }
}
