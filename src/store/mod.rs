//! Realtime key-value store adapter.
//!
//! The controller publishes to, and displays subscribe from, a JSON document
//! addressed by `/`-separated paths. Two backends share one implementation:
//!
//! - [`MemoryStore`]: ephemeral, for tests and `--memory` runs
//! - [`SledStore`]: durable, one sled entry per top-level key
//!
//! Subscriptions deliver the full value at their path on every change,
//! starting with an initial snapshot when a value already exists. Writes are
//! last-write-wins unless made with [`RemoteStore::compare_and_write`], which
//! rejects the write when the path's version has moved.

mod document;
mod memory;
pub mod path;
mod sled_store;
mod subscription;

pub use document::{Backend, DocumentStore};
pub use memory::{MemoryBackend, MemoryStore};
pub use sled_store::{SledBackend, SledStore};
pub use subscription::{Subscription, SubscriptionState};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

/// Store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid store path: {0:?}")]
    InvalidPath(String),
    #[error("version conflict at {path}: expected {expected}, found {actual}")]
    Conflict {
        path: String,
        expected: u64,
        actual: u64,
    },
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("backend error: {0}")]
    Backend(String),
}

impl From<sled::Error> for StoreError {
    fn from(err: sled::Error) -> Self {
        Self::Backend(err.to_string())
    }
}

/// Value at a path at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub path: String,
    /// `Null` when nothing exists at the path.
    pub value: Value,
    /// Store revision of the last change touching this path.
    pub version: u64,
}

impl Snapshot {
    pub fn exists(&self) -> bool {
        !self.value.is_null()
    }

    /// Decode the value, `None` when the path is empty.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<Option<T>, StoreError> {
        if self.value.is_null() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(self.value.clone())?))
    }
}

/// Contract every store backend offers.
///
/// Implementations must be thread-safe (Send + Sync) for shared access
/// across async tasks. Each call targets one path; there is no cross-path
/// transaction.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn read(&self, path: &str) -> Result<Snapshot, StoreError>;

    /// Replace the value at `path`. Returns the new revision.
    async fn write(&self, path: &str, value: Value) -> Result<u64, StoreError>;

    /// Replace the value at `path` only if its version is still `expected_version`.
    async fn compare_and_write(
        &self,
        path: &str,
        value: Value,
        expected_version: u64,
    ) -> Result<u64, StoreError>;

    /// Shallow merge: each key (which may itself be a relative path) is
    /// written under `path`; other children are left alone.
    async fn update(&self, path: &str, fields: Map<String, Value>) -> Result<u64, StoreError>;

    async fn remove(&self, path: &str) -> Result<u64, StoreError>;

    async fn subscribe(&self, path: &str) -> Result<Subscription, StoreError>;

    /// Backend name for logging
    fn backend_name(&self) -> &'static str;
}

/// Typed helpers over any [`RemoteStore`].
#[async_trait]
pub trait RemoteStoreExt: RemoteStore {
    async fn write_record<T: Serialize + Sync>(&self, path: &str, record: &T) -> Result<u64, StoreError> {
        self.write(path, serde_json::to_value(record)?).await
    }

    async fn read_record<T: DeserializeOwned + Send>(&self, path: &str) -> Result<Option<T>, StoreError> {
        self.read(path).await?.decode()
    }

    /// Fire-and-forget write: failures are logged, never retried.
    async fn publish<T: Serialize + Sync>(&self, path: &str, record: &T) -> Option<u64> {
        match self.write_record(path, record).await {
            Ok(revision) => Some(revision),
            Err(e) => {
                warn!(path, error = %e, "Store write failed");
                None
            }
        }
    }
}

impl<S: RemoteStore + ?Sized> RemoteStoreExt for S {}
