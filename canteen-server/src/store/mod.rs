//! 持久化存储适配层
//!
//! # 架构
//!
//! ```text
//!           ┌──────────────────────────────┐
//!           │        dyn Store (trait)     │  ◄── 启动时选定一次
//!           └──────────────┬───────────────┘
//!                ┌─────────┴──────────┐
//!                ▼                    ▼
//!           LocalStore           RemoteStore
//!           (redb 文件)          (SurrealDB ws:// / mem://)
//!                │                    │
//!                └──── ChangeBus ◄────┘   (写提交后 / live query)
//! ```
//!
//! 文档一律是 JSON 对象，按 collection 命名空间隔离。
//! 原子读改写只有两处：每日订单计数器 [`Store::next_daily_sequence`]
//! 和条件更新 [`Store::update_if`]。

pub mod local;
pub mod remote;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use shared::error::{AppError, ErrorCode};
use std::fmt;
use thiserror::Error;
use tokio::sync::broadcast;

pub use local::LocalStore;
pub use remote::{RemoteStore, RemoteStoreConfig};

/// Document collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    /// Live catalog (documents mode)
    Menu,
    /// Sparse overrides keyed by item id (overlay mode)
    MenuOverrides,
    Tables,
    Orders,
    Ratings,
    LoginLogs,
    /// Singleton documents: `admin_auth`, `kitchen_pins`, `scans`
    Settings,
}

impl Collection {
    pub const ALL: [Collection; 7] = [
        Collection::Menu,
        Collection::MenuOverrides,
        Collection::Tables,
        Collection::Orders,
        Collection::Ratings,
        Collection::LoginLogs,
        Collection::Settings,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Menu => "menu",
            Self::MenuOverrides => "menu_overrides",
            Self::Tables => "tables",
            Self::Orders => "orders",
            Self::Ratings => "ratings",
            Self::LoginLogs => "login_logs",
            Self::Settings => "settings",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keys inside [`Collection::Settings`]
pub mod settings_keys {
    pub const ADMIN_AUTH: &str = "admin_auth";
    pub const KITCHEN_PINS: &str = "kitchen_pins";
    pub const SCANS: &str = "scans";
}

/// Which backend was selected at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Local,
    Remote,
}

/// One stored document with its key
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

impl Document {
    /// Decode into a typed record. The storage key wins over any `id` field
    /// in the body.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        let mut data = self.data.clone();
        if let Value::Object(map) = &mut data {
            map.insert("id".to_string(), Value::String(self.id.clone()));
        }
        serde_json::from_value(data)
    }
}

/// Kind of committed change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Put,
    Delete,
}

/// A committed change, fanned out on the change bus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreChange {
    pub collection: Collection,
    pub key: String,
    pub kind: ChangeKind,
}

/// Storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Remote store error: {0}")]
    Remote(#[from] surrealdb::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Document not found: {collection}/{key}")]
    NotFound { collection: Collection, key: String },

    #[error("Document is not a JSON object: {collection}/{key}")]
    NotAnObject { collection: Collection, key: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match &err {
            StoreError::NotFound { collection, key } => {
                AppError::with_message(ErrorCode::NotFound, err.to_string())
                    .with_detail("collection", collection.as_str())
                    .with_detail("key", key.as_str())
            }
            StoreError::Serialization(_) | StoreError::NotAnObject { .. } => {
                tracing::error!(error = %err, "Stored document could not be decoded");
                AppError::with_message(ErrorCode::StorageCorrupted, err.to_string())
            }
            StoreError::Remote(_) => {
                tracing::error!(error = %err, "Remote store error");
                AppError::with_message(ErrorCode::NetworkError, err.to_string())
            }
            _ => {
                tracing::error!(error = %err, "Local store error");
                AppError::database(err.to_string())
            }
        }
    }
}

/// Persistent store adapter
///
/// Both backends expose exactly these capabilities; services never know
/// which one they talk to.
#[async_trait]
pub trait Store: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Read one document
    async fn get(&self, collection: Collection, key: &str) -> StoreResult<Option<Value>>;

    /// Replace (set without merge)
    async fn put(&self, collection: Collection, key: &str, doc: Value) -> StoreResult<()>;

    /// Shallow-merge into an existing document, `NotFound` if absent
    async fn update(
        &self,
        collection: Collection,
        key: &str,
        patch: Map<String, Value>,
    ) -> StoreResult<()>;

    /// Shallow-merge into a document only while it still equals `expected`.
    ///
    /// Returns `false` (nothing written) when another writer changed the
    /// document since `expected` was read, `NotFound` if it is gone.
    async fn update_if(
        &self,
        collection: Collection,
        key: &str,
        expected: &Value,
        patch: Map<String, Value>,
    ) -> StoreResult<bool>;

    /// Shallow-merge upsert
    async fn merge(
        &self,
        collection: Collection,
        key: &str,
        patch: Map<String, Value>,
    ) -> StoreResult<()>;

    /// Create with a storage-assigned id
    async fn insert(&self, collection: Collection, doc: Value) -> StoreResult<String>;

    async fn delete(&self, collection: Collection, key: &str) -> StoreResult<()>;

    /// All documents of a collection
    async fn list(&self, collection: Collection) -> StoreResult<Vec<Document>>;

    /// Atomic daily counter: 1 when the stored date code differs from
    /// `date_code`, previous + 1 otherwise.
    async fn next_daily_sequence(&self, name: &str, date_code: u32) -> StoreResult<u64>;

    /// Every committed change, from this process or (remote) other devices
    fn subscribe(&self) -> broadcast::Receiver<StoreChange>;
}

/// Shallow merge `patch` into `base` (top-level keys replaced)
pub fn merge_objects(base: &mut Map<String, Value>, patch: Map<String, Value>) {
    for (k, v) in patch {
        base.insert(k, v);
    }
}

/// Encode a typed record as a JSON document
pub fn encode<T: Serialize>(value: &T) -> StoreResult<Value> {
    Ok(serde_json::to_value(value)?)
}

/// Read a typed document, treating undecodable data as absent.
///
/// Corruption is logged at `warn`; callers fall back to their defaults.
pub async fn read_or_default<T: DeserializeOwned>(
    store: &dyn Store,
    collection: Collection,
    key: &str,
) -> StoreResult<Option<T>> {
    let Some(raw) = store.get(collection, key).await? else {
        return Ok(None);
    };
    match serde_json::from_value(raw) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            tracing::warn!(
                collection = %collection,
                key = %key,
                error = %e,
                "Corrupt document, falling back to default"
            );
            Ok(None)
        }
    }
}

/// Decode every document of a collection, skipping (and logging) corrupt ones
pub fn decode_all<T: DeserializeOwned>(collection: Collection, docs: Vec<Document>) -> Vec<T> {
    docs.into_iter()
        .filter_map(|doc| match doc.decode::<T>() {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(
                    collection = %collection,
                    key = %doc.id,
                    error = %e,
                    "Skipping corrupt document"
                );
                None
            }
        })
        .collect()
}

/// Convert a JSON value into an object map, rejecting non-objects
pub(crate) fn into_object(
    collection: Collection,
    key: &str,
    value: Value,
) -> StoreResult<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(StoreError::NotAnObject {
            collection,
            key: key.to_string(),
        }),
    }
}

/// Storage-assigned document id
pub(crate) fn new_document_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
