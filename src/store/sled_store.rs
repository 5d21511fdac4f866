//! Sled-backed durable store.
//!
//! Each top-level key is one entry in the `documents` tree, serialized as
//! JSON. Writes are not flushed individually; sled flushes in the background
//! and [`SledBackend::flush`] is called on shutdown.

use serde_json::{Map, Value};
use std::path::Path;
use tracing::{info, warn};

use super::document::{Backend, DocumentStore};
use super::StoreError;

const DOCUMENTS_TREE: &str = "documents";

pub struct SledBackend {
    db: sled::Db,
    documents: sled::Tree,
}

impl SledBackend {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(path.as_ref())?;
        let documents = db.open_tree(DOCUMENTS_TREE)?;
        info!(path = %path.as_ref().display(), entries = documents.len(), "Sled store opened");
        Ok(Self { db, documents })
    }

    pub fn flush(&self) -> Result<usize, StoreError> {
        Ok(self.db.flush()?)
    }
}

impl Backend for SledBackend {
    fn load(&self) -> Result<Map<String, Value>, StoreError> {
        let mut map = Map::new();
        for item in self.documents.iter() {
            let (key, bytes) = item?;
            let key = String::from_utf8_lossy(&key).into_owned();
            match serde_json::from_slice::<Value>(&bytes) {
                Ok(value) => {
                    map.insert(key, value);
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "Skipping unreadable store entry");
                }
            }
        }
        Ok(map)
    }

    fn persist(&self, key: &str, value: Option<&Value>) -> Result<(), StoreError> {
        match value {
            Some(v) => {
                let bytes = serde_json::to_vec(v)?;
                self.documents.insert(key.as_bytes(), bytes)?;
            }
            None => {
                self.documents.remove(key.as_bytes())?;
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "sled"
    }
}

/// Durable store used by the service binary.
pub type SledStore = DocumentStore<SledBackend>;

impl SledStore {
    /// Open (or create) the store at `path` and load its contents.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        Self::with_backend(SledBackend::open(path)?)
    }

    pub fn flush(&self) -> Result<usize, StoreError> {
        self.backend().flush()
    }
}
