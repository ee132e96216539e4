//! SurrealDB-backed remote store
//!
//! 每个文档是一条记录 `collection:key`，正文以 JSON 字符串保存，
//! 这样任意形状的文档都能原样往返，而不受记录 id 类型影响。
//!
//! 变更通过 live query 获取 (包括其他设备的写入)，再转发到 [`ChangeBus`]。
//!
//! SurrealDB 使用乐观事务：并发写同一条记录时输掉的一方收到
//! "can be retried" 冲突错误。写入、删除、计数器和条件更新都经过
//! [`retry_on_conflict`]，带随机退避重试，直到成功或次数用尽。

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use surrealdb::Surreal;
use surrealdb::engine::any::{self, Any};
use surrealdb::method::Stream;
use surrealdb::opt::auth::Root;
use surrealdb::{Action, Notification};
use tokio::sync::broadcast;

use super::{
    BackendKind, ChangeKind, Collection, Document, Store, StoreChange, StoreError, StoreResult,
    into_object, merge_objects, new_document_id,
};
use crate::message::ChangeBus;

const COUNTERS_TABLE: &str = "counters";

/// 冲突重试上限
const MAX_CONFLICT_ATTEMPTS: u32 = 64;
/// 单次退避上限 (毫秒)
const MAX_BACKOFF_MS: u64 = 20;

/// Connection settings for the remote store
#[derive(Debug, Clone)]
pub struct RemoteStoreConfig {
    /// `ws://host:port` for a real server, `mem://` for tests
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl RemoteStoreConfig {
    /// In-process engine, used by tests
    pub fn in_memory() -> Self {
        Self {
            url: "mem://".to_string(),
            namespace: "canteen".to_string(),
            database: "orders".to_string(),
            username: None,
            password: None,
        }
    }
}

/// Stored record: document key + encoded JSON body
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Record {
    key: String,
    body: String,
}

impl Record {
    fn encode(key: &str, doc: &Value) -> StoreResult<Self> {
        Ok(Self {
            key: key.to_string(),
            body: serde_json::to_string(doc)?,
        })
    }

    fn decode(&self) -> StoreResult<Value> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

#[derive(Debug, Deserialize)]
struct CounterRow {
    seq: u64,
}

/// Remote store backed by SurrealDB
#[derive(Clone)]
pub struct RemoteStore {
    db: Surreal<Any>,
    bus: ChangeBus,
}

impl std::fmt::Debug for RemoteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteStore").finish_non_exhaustive()
    }
}

impl RemoteStore {
    /// Connect, select namespace/database and start the live-query forwarders
    pub async fn connect(config: &RemoteStoreConfig, bus: ChangeBus) -> StoreResult<Self> {
        let db = any::connect(config.url.as_str()).await?;

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            db.signin(Root {
                username: username.as_str(),
                password: password.as_str(),
            })
            .await?;
        }
        db.use_ns(config.namespace.as_str())
            .use_db(config.database.as_str())
            .await?;

        tracing::info!(
            url = %config.url,
            namespace = %config.namespace,
            database = %config.database,
            "Connected to remote store"
        );

        let store = Self { db, bus };
        for collection in Collection::ALL {
            store.spawn_live_forwarder(collection).await?;
        }
        Ok(store)
    }

    /// Forward live-query notifications of one collection onto the bus
    async fn spawn_live_forwarder(&self, collection: Collection) -> StoreResult<()> {
        let mut stream: Stream<Vec<Record>> = self.db.select(collection.as_str()).live().await?;
        let bus = self.bus.clone();
        let shutdown = bus.shutdown_token().clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    item = stream.next() => match item {
                        Some(Ok(notification)) => forward(&bus, collection, notification),
                        Some(Err(e)) => {
                            tracing::warn!(collection = %collection, error = %e, "Live query error");
                        }
                        None => {
                            tracing::warn!(collection = %collection, "Live query stream ended");
                            break;
                        }
                    },
                }
            }
        });
        Ok(())
    }

    async fn select_record(&self, collection: Collection, key: &str) -> StoreResult<Option<Record>> {
        let record: Option<Record> = self.db.select((collection.as_str(), key)).await?;
        Ok(record)
    }

    /// One attempt of the daily counter bump. 单条语句完成读改写。
    async fn bump_sequence(&self, name: &str, date_code: u32) -> StoreResult<u64> {
        let mut result = self
            .db
            .query(
                "UPSERT type::thing($table, $name) \
                 SET seq = IF date_code = $date_code THEN seq + 1 ELSE 1 END, \
                     date_code = $date_code \
                 RETURN AFTER",
            )
            .bind(("table", COUNTERS_TABLE))
            .bind(("name", name.to_string()))
            .bind(("date_code", date_code))
            .await?;
        let row: Option<CounterRow> = result.take(0)?;
        Ok(row.map(|r| r.seq).unwrap_or(1))
    }

    /// One compare-and-swap attempt on the encoded body
    async fn try_update_if(
        &self,
        collection: Collection,
        key: &str,
        expected: &Value,
        patch: &Map<String, Value>,
    ) -> StoreResult<bool> {
        let Some(record) = self.select_record(collection, key).await? else {
            return Err(StoreError::NotFound {
                collection,
                key: key.to_string(),
            });
        };
        let current = record.decode()?;
        if current != *expected {
            return Ok(false);
        }
        let mut doc = into_object(collection, key, current)?;
        merge_objects(&mut doc, patch.clone());
        let next = Record::encode(key, &Value::Object(doc))?;

        // WHERE body = 读到的原文：期间被别人改过则不更新任何记录
        let mut result = self
            .db
            .query(
                "UPDATE type::thing($table, $key) SET body = $next \
                 WHERE body = $previous RETURN AFTER",
            )
            .bind(("table", collection.as_str()))
            .bind(("key", key.to_string()))
            .bind(("next", next.body))
            .bind(("previous", record.body))
            .await?;
        let updated: Vec<Record> = result.take(0)?;
        Ok(!updated.is_empty())
    }

    async fn write_record(&self, collection: Collection, key: &str, doc: &Value) -> StoreResult<()> {
        let record = Record::encode(key, doc)?;
        // 整条覆盖，冲突时重放同一内容即可
        retry_on_conflict("write_record", || async {
            let _: Option<Record> = self
                .db
                .upsert((collection.as_str(), key))
                .content(record.clone())
                .await?;
            Ok::<_, StoreError>(())
        })
        .await
    }
}

/// Optimistic-transaction conflict reported by SurrealDB
fn is_conflict(err: &StoreError) -> bool {
    match err {
        StoreError::Remote(e) => {
            let message = e.to_string();
            message.contains("can be retried") || message.contains("read or write conflict")
        }
        _ => false,
    }
}

/// Run `op` again while it fails with a transaction conflict
async fn retry_on_conflict<T, F, Fut>(operation: &'static str, mut op: F) -> StoreResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = StoreResult<T>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Err(e) if attempt < MAX_CONFLICT_ATTEMPTS && is_conflict(&e) => {
                let ceiling = (u64::from(attempt) * 2).min(MAX_BACKOFF_MS);
                let backoff = rand::thread_rng().gen_range(1..=ceiling);
                tracing::debug!(operation, attempt, backoff_ms = backoff, "Transaction conflict, retrying");
                tokio::time::sleep(Duration::from_millis(backoff)).await;
                attempt += 1;
            }
            Err(e) => {
                if is_conflict(&e) {
                    tracing::warn!(operation, attempts = attempt, "Giving up after repeated transaction conflicts");
                }
                return Err(e);
            }
            Ok(value) => return Ok(value),
        }
    }
}

fn forward(bus: &ChangeBus, collection: Collection, notification: Notification<Record>) {
    let kind = match notification.action {
        Action::Delete => ChangeKind::Delete,
        _ => ChangeKind::Put,
    };
    bus.publish(StoreChange {
        collection,
        key: notification.data.key,
        kind,
    });
}

#[async_trait]
impl Store for RemoteStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Remote
    }

    async fn get(&self, collection: Collection, key: &str) -> StoreResult<Option<Value>> {
        match self.select_record(collection, key).await? {
            Some(record) => Ok(Some(record.decode()?)),
            None => Ok(None),
        }
    }

    async fn put(&self, collection: Collection, key: &str, doc: Value) -> StoreResult<()> {
        self.write_record(collection, key, &doc).await
    }

    async fn update(
        &self,
        collection: Collection,
        key: &str,
        patch: Map<String, Value>,
    ) -> StoreResult<()> {
        let Some(record) = self.select_record(collection, key).await? else {
            return Err(StoreError::NotFound {
                collection,
                key: key.to_string(),
            });
        };
        let mut doc = into_object(collection, key, record.decode()?)?;
        merge_objects(&mut doc, patch);
        self.write_record(collection, key, &Value::Object(doc)).await
    }

    async fn update_if(
        &self,
        collection: Collection,
        key: &str,
        expected: &Value,
        patch: Map<String, Value>,
    ) -> StoreResult<bool> {
        retry_on_conflict("update_if", || {
            self.try_update_if(collection, key, expected, &patch)
        })
        .await
    }

    async fn merge(
        &self,
        collection: Collection,
        key: &str,
        patch: Map<String, Value>,
    ) -> StoreResult<()> {
        let mut doc = match self.select_record(collection, key).await? {
            Some(record) => into_object(collection, key, record.decode()?)?,
            None => Map::new(),
        };
        merge_objects(&mut doc, patch);
        self.write_record(collection, key, &Value::Object(doc)).await
    }

    async fn insert(&self, collection: Collection, doc: Value) -> StoreResult<String> {
        let id = new_document_id();
        let record = Record::encode(&id, &doc)?;
        let _: Option<Record> = self
            .db
            .create((collection.as_str(), id.as_str()))
            .content(record)
            .await?;
        Ok(id)
    }

    async fn delete(&self, collection: Collection, key: &str) -> StoreResult<()> {
        retry_on_conflict("delete", || async {
            let _: Option<Record> = self.db.delete((collection.as_str(), key)).await?;
            Ok::<_, StoreError>(())
        })
        .await
    }

    async fn list(&self, collection: Collection) -> StoreResult<Vec<Document>> {
        let records: Vec<Record> = self.db.select(collection.as_str()).await?;
        let mut docs = Vec::with_capacity(records.len());
        for record in records {
            match record.decode() {
                Ok(data) => docs.push(Document {
                    id: record.key,
                    data,
                }),
                Err(e) => tracing::warn!(
                    collection = %collection,
                    key = %record.key,
                    error = %e,
                    "Skipping undecodable document"
                ),
            }
        }
        Ok(docs)
    }

    async fn next_daily_sequence(&self, name: &str, date_code: u32) -> StoreResult<u64> {
        retry_on_conflict("next_daily_sequence", || self.bump_sequence(name, date_code)).await
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.bus.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn store() -> RemoteStore {
        RemoteStore::connect(&RemoteStoreConfig::in_memory(), ChangeBus::new())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_put_get_list_delete() {
        let store = store().await;
        store
            .put(Collection::Menu, "tea", json!({"name": "Tea", "price": 10}))
            .await
            .unwrap();

        assert_eq!(
            store.get(Collection::Menu, "tea").await.unwrap(),
            Some(json!({"name": "Tea", "price": 10}))
        );
        let docs = store.list(Collection::Menu).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "tea");

        store.delete(Collection::Menu, "tea").await.unwrap();
        assert!(store.get(Collection::Menu, "tea").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found_and_merge_creates() {
        let store = store().await;
        let patch = json!({"available": false}).as_object().unwrap().clone();

        let err = store
            .update(Collection::Menu, "coffee", patch.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));

        store.merge(Collection::Menu, "coffee", patch).await.unwrap();
        assert_eq!(
            store.get(Collection::Menu, "coffee").await.unwrap(),
            Some(json!({"available": false}))
        );
    }

    #[tokio::test]
    async fn test_insert_returns_key() {
        let store = store().await;
        let id = store
            .insert(Collection::Orders, json!({"tableNumber": 2}))
            .await
            .unwrap();
        assert_eq!(
            store.get(Collection::Orders, &id).await.unwrap(),
            Some(json!({"tableNumber": 2}))
        );
    }

    #[tokio::test]
    async fn test_daily_sequence() {
        let store = store().await;
        assert_eq!(store.next_daily_sequence("order_sequence", 20260101).await.unwrap(), 1);
        assert_eq!(store.next_daily_sequence("order_sequence", 20260101).await.unwrap(), 2);
        assert_eq!(store.next_daily_sequence("order_sequence", 20260102).await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_daily_sequence_hands_out_distinct_numbers() {
        let store = store().await;
        let handles: Vec<_> = (0..40)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move {
                    store.next_daily_sequence("order_sequence", 20260115).await
                })
            })
            .collect();

        let mut numbers = Vec::new();
        for handle in handles {
            numbers.push(handle.await.unwrap().unwrap());
        }
        numbers.sort_unstable();
        assert_eq!(numbers, (1..=40).collect::<Vec<u64>>());
    }

    #[tokio::test]
    async fn test_update_if_rejects_stale_snapshot() {
        let store = store().await;
        store
            .put(Collection::Orders, "o1", json!({"status": "ready"}))
            .await
            .unwrap();
        let seen = json!({"status": "ready"});
        let served = json!({"status": "served"}).as_object().unwrap().clone();
        let cancelled = json!({"status": "cancelled"}).as_object().unwrap().clone();

        assert!(store.update_if(Collection::Orders, "o1", &seen, served).await.unwrap());
        assert!(!store.update_if(Collection::Orders, "o1", &seen, cancelled).await.unwrap());
        assert_eq!(
            store.get(Collection::Orders, "o1").await.unwrap(),
            Some(json!({"status": "served"}))
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_update_if_has_one_winner() {
        let store = store().await;
        store
            .put(Collection::Orders, "o1", json!({"status": "ready"}))
            .await
            .unwrap();

        let handles: Vec<_> = ["served", "cancelled", "rejected"]
            .into_iter()
            .map(|status| {
                let store = store.clone();
                tokio::spawn(async move {
                    let patch = json!({ "status": status }).as_object().unwrap().clone();
                    store
                        .update_if(Collection::Orders, "o1", &json!({"status": "ready"}), patch)
                        .await
                })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_live_query_reaches_bus() {
        let store = store().await;
        let mut rx = store.subscribe();

        store
            .put(Collection::Ratings, "r1", json!({"stars": 5}))
            .await
            .unwrap();

        let change = tokio::time::timeout(std::time::Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(change.collection, Collection::Ratings);
        assert_eq!(change.key, "r1");
    }
}
