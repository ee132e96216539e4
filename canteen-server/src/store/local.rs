//! redb-based local store
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | one per [`Collection`] | document key | JSON bytes | Documents |
//! | `counters` | `"{name}.date_code"` / `"{name}.value"` | `u64` | Daily sequences |
//!
//! # Durability
//!
//! Each write is one write transaction; redb commits are persistent as soon
//! as `commit()` returns. Changes are published on the [`ChangeBus`] only
//! after the commit succeeded.

use async_trait::async_trait;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast;

use super::{
    BackendKind, ChangeKind, Collection, Document, Store, StoreChange, StoreError, StoreResult,
    into_object, merge_objects, new_document_id,
};
use crate::message::ChangeBus;

/// Table for daily counters: key = "{name}.date_code" | "{name}.value"
const COUNTERS_TABLE: TableDefinition<&str, u64> = TableDefinition::new("counters");

fn documents_table(collection: Collection) -> TableDefinition<'static, &'static str, &'static [u8]> {
    TableDefinition::new(collection.as_str())
}

/// Local store backed by redb
#[derive(Clone)]
pub struct LocalStore {
    db: Arc<Database>,
    bus: ChangeBus,
}

impl std::fmt::Debug for LocalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStore").finish_non_exhaustive()
    }
}

impl LocalStore {
    /// Open or create the database at the given path
    pub fn open(path: impl AsRef<Path>, bus: ChangeBus) -> StoreResult<Self> {
        let db = Database::create(path)?;
        Self::init(db, bus)
    }

    /// Open an in-memory database (for tests and ephemeral devices)
    pub fn open_in_memory(bus: ChangeBus) -> StoreResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db, bus)
    }

    fn init(db: Database, bus: ChangeBus) -> StoreResult<Self> {
        // Create all tables if they don't exist
        let write_txn = db.begin_write()?;
        {
            for collection in Collection::ALL {
                let _ = write_txn.open_table(documents_table(collection))?;
            }
            let _ = write_txn.open_table(COUNTERS_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self {
            db: Arc::new(db),
            bus,
        })
    }

    fn read_doc(&self, collection: Collection, key: &str) -> StoreResult<Option<Value>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(documents_table(collection))?;
        match table.get(key)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Shallow merge inside one write transaction.
    ///
    /// `create` decides whether a missing document is created or reported.
    fn merge_doc(
        &self,
        collection: Collection,
        key: &str,
        patch: Map<String, Value>,
        create: bool,
    ) -> StoreResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(documents_table(collection))?;
            let current = match table.get(key)? {
                Some(value) => Some(serde_json::from_slice::<Value>(value.value())?),
                None => None,
            };
            let mut doc = match current {
                Some(value) => into_object(collection, key, value)?,
                None if create => Map::new(),
                None => {
                    return Err(StoreError::NotFound {
                        collection,
                        key: key.to_string(),
                    });
                }
            };
            merge_objects(&mut doc, patch);
            let bytes = serde_json::to_vec(&Value::Object(doc))?;
            table.insert(key, bytes.as_slice())?;
        }
        txn.commit()?;
        self.publish(collection, key, ChangeKind::Put);
        Ok(())
    }

    /// Compare and merge inside one write transaction
    fn update_doc_if(
        &self,
        collection: Collection,
        key: &str,
        expected: &Value,
        patch: Map<String, Value>,
    ) -> StoreResult<bool> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(documents_table(collection))?;
            let current = match table.get(key)? {
                Some(value) => serde_json::from_slice::<Value>(value.value())?,
                None => {
                    return Err(StoreError::NotFound {
                        collection,
                        key: key.to_string(),
                    });
                }
            };
            if current != *expected {
                return Ok(false);
            }
            let mut doc = into_object(collection, key, current)?;
            merge_objects(&mut doc, patch);
            let bytes = serde_json::to_vec(&Value::Object(doc))?;
            table.insert(key, bytes.as_slice())?;
        }
        txn.commit()?;
        self.publish(collection, key, ChangeKind::Put);
        Ok(true)
    }

    fn write_doc(&self, collection: Collection, key: &str, doc: &Value) -> StoreResult<()> {
        let bytes = serde_json::to_vec(doc)?;
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(documents_table(collection))?;
            table.insert(key, bytes.as_slice())?;
        }
        txn.commit()?;
        self.publish(collection, key, ChangeKind::Put);
        Ok(())
    }

    fn publish(&self, collection: Collection, key: &str, kind: ChangeKind) {
        self.bus.publish(StoreChange {
            collection,
            key: key.to_string(),
            kind,
        });
    }
}

#[async_trait]
impl Store for LocalStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    async fn get(&self, collection: Collection, key: &str) -> StoreResult<Option<Value>> {
        self.read_doc(collection, key)
    }

    async fn put(&self, collection: Collection, key: &str, doc: Value) -> StoreResult<()> {
        self.write_doc(collection, key, &doc)
    }

    async fn update(
        &self,
        collection: Collection,
        key: &str,
        patch: Map<String, Value>,
    ) -> StoreResult<()> {
        self.merge_doc(collection, key, patch, false)
    }

    async fn update_if(
        &self,
        collection: Collection,
        key: &str,
        expected: &Value,
        patch: Map<String, Value>,
    ) -> StoreResult<bool> {
        self.update_doc_if(collection, key, expected, patch)
    }

    async fn merge(
        &self,
        collection: Collection,
        key: &str,
        patch: Map<String, Value>,
    ) -> StoreResult<()> {
        self.merge_doc(collection, key, patch, true)
    }

    async fn insert(&self, collection: Collection, doc: Value) -> StoreResult<String> {
        let id = new_document_id();
        self.write_doc(collection, &id, &doc)?;
        Ok(id)
    }

    async fn delete(&self, collection: Collection, key: &str) -> StoreResult<()> {
        let txn = self.db.begin_write()?;
        let removed = {
            let mut table = txn.open_table(documents_table(collection))?;
            table.remove(key)?.is_some()
        };
        txn.commit()?;
        if removed {
            self.publish(collection, key, ChangeKind::Delete);
        }
        Ok(())
    }

    async fn list(&self, collection: Collection) -> StoreResult<Vec<Document>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(documents_table(collection))?;

        let mut docs = Vec::new();
        for result in table.iter()? {
            let (key, value) = result?;
            let data = match serde_json::from_slice(value.value()) {
                Ok(data) => data,
                Err(e) => {
                    tracing::warn!(
                        collection = %collection,
                        key = %key.value(),
                        error = %e,
                        "Skipping undecodable document"
                    );
                    continue;
                }
            };
            docs.push(Document {
                id: key.value().to_string(),
                data,
            });
        }
        Ok(docs)
    }

    async fn next_daily_sequence(&self, name: &str, date_code: u32) -> StoreResult<u64> {
        let date_key = format!("{name}.date_code");
        let value_key = format!("{name}.value");

        let txn = self.db.begin_write()?;
        let next = {
            let mut table = txn.open_table(COUNTERS_TABLE)?;
            let stored_date = table.get(date_key.as_str())?.map(|g| g.value());
            let next = if stored_date == Some(u64::from(date_code)) {
                let current = table
                    .get(value_key.as_str())?
                    .map(|g| g.value())
                    .unwrap_or(0);
                current + 1
            } else {
                table.insert(date_key.as_str(), u64::from(date_code))?;
                1
            };
            table.insert(value_key.as_str(), next)?;
            next
        };
        txn.commit()?;
        Ok(next)
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.bus.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> LocalStore {
        LocalStore::open_in_memory(ChangeBus::new()).unwrap()
    }

    fn obj(v: Value) -> Map<String, Value> {
        v.as_object().unwrap().clone()
    }

    #[tokio::test]
    async fn test_put_get_delete() {
        let store = store();
        assert!(store.get(Collection::Menu, "tea").await.unwrap().is_none());

        store
            .put(Collection::Menu, "tea", json!({"price": 10}))
            .await
            .unwrap();
        assert_eq!(
            store.get(Collection::Menu, "tea").await.unwrap(),
            Some(json!({"price": 10}))
        );

        store.delete(Collection::Menu, "tea").await.unwrap();
        assert!(store.get(Collection::Menu, "tea").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_collections_are_isolated() {
        let store = store();
        store
            .put(Collection::Menu, "tea", json!({"price": 10}))
            .await
            .unwrap();
        assert!(
            store
                .get(Collection::MenuOverrides, "tea")
                .await
                .unwrap()
                .is_none()
        );
        assert_eq!(store.list(Collection::Menu).await.unwrap().len(), 1);
        assert!(store.list(Collection::Orders).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_requires_existing_document() {
        let store = store();
        let err = store
            .update(Collection::Menu, "tea", obj(json!({"available": false})))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
        assert!(store.get(Collection::Menu, "tea").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_merge_upserts_shallowly() {
        let store = store();
        store
            .merge(Collection::MenuOverrides, "tea", obj(json!({"price": 12})))
            .await
            .unwrap();
        store
            .merge(
                Collection::MenuOverrides,
                "tea",
                obj(json!({"available": false})),
            )
            .await
            .unwrap();
        assert_eq!(
            store.get(Collection::MenuOverrides, "tea").await.unwrap(),
            Some(json!({"price": 12, "available": false}))
        );
    }

    #[tokio::test]
    async fn test_update_if_only_writes_unchanged_document() {
        let store = store();
        store
            .put(Collection::Orders, "o1", json!({"status": "ready"}))
            .await
            .unwrap();
        let seen = json!({"status": "ready"});

        assert!(
            store
                .update_if(Collection::Orders, "o1", &seen, obj(json!({"status": "served"})))
                .await
                .unwrap()
        );
        // 第二个写者基于旧快照，必须失败
        assert!(
            !store
                .update_if(Collection::Orders, "o1", &seen, obj(json!({"status": "cancelled"})))
                .await
                .unwrap()
        );
        assert_eq!(
            store.get(Collection::Orders, "o1").await.unwrap(),
            Some(json!({"status": "served"}))
        );

        let err = store
            .update_if(Collection::Orders, "missing", &seen, obj(json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_insert_assigns_unique_ids() {
        let store = store();
        let a = store.insert(Collection::Orders, json!({"n": 1})).await.unwrap();
        let b = store.insert(Collection::Orders, json!({"n": 2})).await.unwrap();
        assert_ne!(a, b);

        let docs = store.list(Collection::Orders).await.unwrap();
        assert_eq!(docs.len(), 2);
        assert!(docs.iter().any(|d| d.id == a && d.data == json!({"n": 1})));
    }

    #[tokio::test]
    async fn test_daily_sequence_resets_on_new_date() {
        let store = store();
        assert_eq!(store.next_daily_sequence("order_sequence", 20260101).await.unwrap(), 1);
        assert_eq!(store.next_daily_sequence("order_sequence", 20260101).await.unwrap(), 2);
        assert_eq!(store.next_daily_sequence("order_sequence", 20260101).await.unwrap(), 3);
        assert_eq!(store.next_daily_sequence("order_sequence", 20260102).await.unwrap(), 1);
        // independent counters
        assert_eq!(store.next_daily_sequence("other", 20260102).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_writes_publish_changes() {
        let store = store();
        let mut rx = store.subscribe();

        store
            .put(Collection::Tables, "1", json!({"enabled": true}))
            .await
            .unwrap();
        store.delete(Collection::Tables, "1").await.unwrap();
        // deleting a missing key publishes nothing
        store.delete(Collection::Tables, "1").await.unwrap();

        let first = rx.recv().await.unwrap();
        assert_eq!(first.collection, Collection::Tables);
        assert_eq!(first.kind, ChangeKind::Put);
        assert_eq!(rx.recv().await.unwrap().kind, ChangeKind::Delete);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_on_disk_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("canteen.redb");
        {
            let store = LocalStore::open(&path, ChangeBus::new()).unwrap();
            store
                .put(Collection::Settings, "scans", json!({"totalScans": 3}))
                .await
                .unwrap();
        }
        let store = LocalStore::open(&path, ChangeBus::new()).unwrap();
        assert_eq!(
            store.get(Collection::Settings, "scans").await.unwrap(),
            Some(json!({"totalScans": 3}))
        );
    }
}
