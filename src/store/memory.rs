//! Ephemeral backend. Data is lost on restart.

use serde_json::{Map, Value};

use super::document::{Backend, DocumentStore};
use super::StoreError;

#[derive(Debug, Default)]
pub struct MemoryBackend;

impl Backend for MemoryBackend {
    fn load(&self) -> Result<Map<String, Value>, StoreError> {
        Ok(Map::new())
    }

    fn persist(&self, _key: &str, _value: Option<&Value>) -> Result<(), StoreError> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// In-process store for tests and `--memory` runs.
pub type MemoryStore = DocumentStore<MemoryBackend>;

impl MemoryStore {
    pub fn new() -> Self {
        Self::from_backend(MemoryBackend)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}
