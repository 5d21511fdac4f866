//! Location Registry
//!
//! CRUD over installation locations stored as one entry per id under
//! `trafficLight/locations`.

use chrono::Utc;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{info, warn};

use crate::store::{RemoteStore, RemoteStoreExt, StoreError};
use crate::types::{
    paths, seed_locations, Location, LocationRecord, LocationStatus, NewLocation,
};

#[derive(Debug, thiserror::Error)]
pub enum LocationError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("location not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Clone)]
pub struct LocationRegistry {
    store: Arc<dyn RemoteStore>,
}

impl LocationRegistry {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self { store }
    }

    /// Write the seed locations if none exist. Returns true if it wrote.
    pub async fn seed_if_empty(&self) -> Result<bool, LocationError> {
        if self.store.read(paths::LOCATIONS).await?.exists() {
            return Ok(false);
        }

        let mut entries = Map::new();
        for loc in seed_locations(Utc::now()) {
            entries.insert(loc.id, serde_json::to_value(&loc.record).map_err(StoreError::from)?);
        }
        let count = entries.len();
        self.store
            .write(paths::LOCATIONS, Value::Object(entries))
            .await?;
        info!(count, "Seeded default locations");
        Ok(true)
    }

    pub async fn create(&self, new: NewLocation) -> Result<Location, LocationError> {
        if new.name.trim().is_empty() {
            return Err(LocationError::MissingField("name"));
        }
        if new.address.trim().is_empty() {
            return Err(LocationError::MissingField("address"));
        }

        let id = uuid::Uuid::new_v4().simple().to_string();
        let record = new.into_record(Utc::now());
        self.store
            .write_record(&paths::location(&id), &record)
            .await?;
        info!(%id, name = %record.name, "Location created");
        Ok(Location { id, record })
    }

    pub async fn update_status(
        &self,
        id: &str,
        status: LocationStatus,
    ) -> Result<Location, LocationError> {
        let path = paths::location(id);
        let mut record: LocationRecord = self
            .store
            .read_record(&path)
            .await?
            .ok_or_else(|| LocationError::NotFound(id.to_string()))?;

        let mut fields = Map::new();
        fields.insert("status".to_string(), serde_json::to_value(status).map_err(StoreError::from)?);
        self.store.update(&path, fields).await?;

        record.status = status;
        info!(%id, %status, "Location status updated");
        Ok(Location {
            id: id.to_string(),
            record,
        })
    }

    /// Remove exactly the entry with `id`.
    pub async fn delete(&self, id: &str) -> Result<(), LocationError> {
        let path = paths::location(id);
        if !self.store.read(&path).await?.exists() {
            return Err(LocationError::NotFound(id.to_string()));
        }
        self.store.remove(&path).await?;
        info!(%id, "Location deleted");
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<Location, LocationError> {
        let record = self
            .store
            .read_record::<LocationRecord>(&paths::location(id))
            .await?
            .ok_or_else(|| LocationError::NotFound(id.to_string()))?;
        Ok(Location {
            id: id.to_string(),
            record,
        })
    }

    /// All locations ordered by id. Malformed entries are skipped.
    pub async fn list(&self) -> Result<Vec<Location>, LocationError> {
        let snapshot = self.store.read(paths::LOCATIONS).await?;
        let Value::Object(entries) = snapshot.value else {
            return Ok(Vec::new());
        };

        let mut locations: Vec<Location> = entries
            .into_iter()
            .filter_map(|(id, value)| match serde_json::from_value(value) {
                Ok(record) => Some(Location { id, record }),
                Err(e) => {
                    warn!(%id, error = %e, "Skipping malformed location");
                    None
                }
            })
            .collect();
        locations.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(locations)
    }
}
