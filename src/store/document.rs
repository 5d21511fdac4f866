//! Document store shared by every backend.
//!
//! The whole keyspace is one JSON document held in memory. Each top-level
//! key is the persistence unit handed to the [`Backend`]. Every mutation
//! bumps a store-wide revision; the version of a path is the latest revision
//! that touched the path, an ancestor, or a descendant. A merge touches only
//! the fields it names, so it leaves the versions of sibling fields alone.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

use super::path::{self, StorePath};
use super::subscription::{Registry, Subscription};
use super::{RemoteStore, Snapshot, StoreError};

/// Durable side of a [`DocumentStore`].
pub trait Backend: Send + Sync + 'static {
    /// All persisted top-level entries.
    fn load(&self) -> Result<Map<String, Value>, StoreError>;

    /// Persist one top-level entry. `None` deletes it.
    fn persist(&self, key: &str, value: Option<&Value>) -> Result<(), StoreError>;

    fn name(&self) -> &'static str;
}

struct Document {
    root: Value,
    revision: u64,
    /// Revision of the last write per written path. Descendant entries are
    /// dropped when an ancestor is written, and a deleted path's entries
    /// fold into its nearest surviving ancestor, which keeps the map bounded
    /// by the number of distinct live paths.
    versions: BTreeMap<StorePath, u64>,
}

impl Document {
    fn version_of(&self, target: &StorePath) -> u64 {
        self.versions
            .iter()
            .filter(|(p, _)| p.overlaps(target))
            .map(|(_, rev)| *rev)
            .max()
            .unwrap_or(0)
    }

    fn next_revision(&mut self) -> u64 {
        self.revision += 1;
        self.revision
    }

    fn mark_written(&mut self, written: &StorePath, revision: u64) {
        self.versions
            .retain(|p, _| !(written.is_prefix_of(p) && p != written));
        self.versions.insert(written.clone(), revision);
    }

    /// Mark a path a write left empty. The revision lands on the nearest
    /// ancestor still holding a value, so the deleted path keeps reading a
    /// newer version than before the delete.
    fn mark_deleted(&mut self, deleted: &StorePath, revision: u64) {
        self.versions.retain(|p, _| !deleted.is_prefix_of(p));

        let mut anchor = deleted.clone();
        while let Some(parent) = anchor.parent() {
            anchor = parent;
            if anchor.is_root() || !path::get(&self.root, &anchor).is_null() {
                break;
            }
        }
        self.versions.insert(anchor, revision);
    }
}

/// JSON document store with subscriptions and versioned writes.
pub struct DocumentStore<B: Backend> {
    doc: Mutex<Document>,
    registry: Arc<Registry>,
    backend: B,
}

impl<B: Backend> DocumentStore<B> {
    /// Build a store over `backend`, loading whatever it already holds.
    pub fn with_backend(backend: B) -> Result<Self, StoreError> {
        let loaded = backend.load()?;
        Ok(Self::from_parts(
            path::normalize(Value::Object(loaded)),
            backend,
        ))
    }

    /// Build an empty store over `backend` without loading from it.
    pub fn from_backend(backend: B) -> Self {
        Self::from_parts(Value::Null, backend)
    }

    fn from_parts(root: Value, backend: B) -> Self {
        Self {
            doc: Mutex::new(Document {
                root,
                revision: 0,
                versions: BTreeMap::new(),
            }),
            registry: Arc::new(Registry::default()),
            backend,
        }
    }

    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Number of paths with a tracked version.
    pub fn tracked_versions(&self) -> usize {
        self.lock().versions.len()
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.registry.len()
    }

    fn lock(&self) -> MutexGuard<'_, Document> {
        self.doc.lock().unwrap_or_else(|e| {
            warn!("Document mutex poisoned, recovering");
            e.into_inner()
        })
    }

    /// Apply `edits` (relative to `at`) as one revision.
    ///
    /// Affected top-level entries are staged and persisted before the
    /// in-memory document changes, so a backend failure leaves the store
    /// untouched.
    fn apply(
        &self,
        at: &StorePath,
        edits: Vec<(StorePath, Value)>,
        expected_version: Option<u64>,
    ) -> Result<u64, StoreError> {
        let mut doc = self.lock();

        if let Some(expected) = expected_version {
            let actual = doc.version_of(at);
            if actual != expected {
                return Err(StoreError::Conflict {
                    path: at.to_string(),
                    expected,
                    actual,
                });
            }
        }

        let mut staged = doc.root.clone();
        let mut written = Vec::with_capacity(edits.len());
        for (rel, value) in edits {
            let target = at.child(&rel);
            path::set(&mut staged, &target, value);
            written.push(target);
        }

        let touched: Vec<String> = match at.top() {
            Some(top) => vec![top.to_string()],
            None => {
                let mut keys: Vec<String> = Vec::new();
                for v in [&doc.root, &staged] {
                    if let Value::Object(map) = v {
                        keys.extend(map.keys().cloned());
                    }
                }
                keys.sort();
                keys.dedup();
                keys
            }
        };
        for key in &touched {
            self.backend.persist(key, staged.get(key))?;
        }

        doc.root = staged;
        let revision = doc.next_revision();
        for target in &written {
            if path::get(&doc.root, target).is_null() {
                doc.mark_deleted(target, revision);
            } else {
                doc.mark_written(target, revision);
            }
        }
        debug!(path = %at, revision, backend = self.backend.name(), "store write");

        let doc = &*doc;
        self.registry
            .notify(at, &doc.root, |p| doc.version_of(p));
        Ok(revision)
    }
}

#[async_trait]
impl<B: Backend> RemoteStore for DocumentStore<B> {
    async fn read(&self, path: &str) -> Result<Snapshot, StoreError> {
        let at = StorePath::parse(path)?;
        let doc = self.lock();
        Ok(Snapshot {
            path: at.to_string(),
            value: path::get(&doc.root, &at),
            version: doc.version_of(&at),
        })
    }

    async fn write(&self, path: &str, value: Value) -> Result<u64, StoreError> {
        let at = StorePath::parse(path)?;
        self.apply(&at, vec![(StorePath::root(), value)], None)
    }

    async fn compare_and_write(
        &self,
        path: &str,
        value: Value,
        expected_version: u64,
    ) -> Result<u64, StoreError> {
        let at = StorePath::parse(path)?;
        self.apply(&at, vec![(StorePath::root(), value)], Some(expected_version))
    }

    async fn update(&self, path: &str, fields: Map<String, Value>) -> Result<u64, StoreError> {
        let at = StorePath::parse(path)?;
        let edits = fields
            .into_iter()
            .map(|(k, v)| StorePath::parse(&k).map(|rel| (rel, v)))
            .collect::<Result<Vec<_>, _>>()?;
        if edits.iter().any(|(rel, _)| rel.is_root()) {
            return Err(StoreError::InvalidPath(format!("{at}/")));
        }
        self.apply(&at, edits, None)
    }

    async fn remove(&self, path: &str) -> Result<u64, StoreError> {
        let at = StorePath::parse(path)?;
        self.apply(&at, vec![(StorePath::root(), Value::Null)], None)
    }

    async fn subscribe(&self, path: &str) -> Result<Subscription, StoreError> {
        let at = StorePath::parse(path)?;
        let doc = self.lock();
        let version = doc.version_of(&at);
        Ok(self.registry.register(at, &doc.root, version))
    }

    fn backend_name(&self) -> &'static str {
        self.backend.name()
    }
}
