//! Mirrors controller state into the remote store.
//!
//! Every write of the `traffic` record goes through here while the caller
//! holds the [`AppState`] write lock. Timer and counts writes are
//! conditional on the version we last wrote; operator commands are not.
//! The timer never writes the stored mode fields, so a mode set by another
//! client survives until [`Publisher::sync_external_mode`] takes it over.

use chrono::Utc;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::state::AppState;
use crate::store::{RemoteStore, RemoteStoreExt, StoreError};
use crate::types::{
    paths, ControlMode, SignalState, SystemStatus, TrafficLightStatus, TrafficRecord,
};

/// Rounds of re-reading the mode fields when copying a mode loses a race.
const MODE_SYNC_ATTEMPTS: usize = 3;

/// Result of a conditional `traffic` write.
#[derive(Debug, Clone, PartialEq)]
pub enum TrafficWrite {
    Written(u64),
    /// Someone else wrote `traffic` since our last write; their record was
    /// taken into the local model instead.
    Adopted(TrafficRecord),
    Failed,
}

pub struct Publisher {
    store: Arc<dyn RemoteStore>,
    extended_fields: bool,
}

impl Publisher {
    pub fn new(store: Arc<dyn RemoteStore>, extended_fields: bool) -> Self {
        Self {
            store,
            extended_fields,
        }
    }

    pub fn store(&self) -> &Arc<dyn RemoteStore> {
        &self.store
    }

    pub fn traffic_record(&self, state: &AppState) -> TrafficRecord {
        state.intersection.traffic_record(
            state.latest_counts.as_ref().map(|c| c.vehicles),
            self.extended_fields,
        )
    }

    /// Load whatever a previous run left in the store.
    ///
    /// Missing or malformed records leave the corresponding local state at
    /// its defaults.
    pub async fn restore(&self, state: &mut AppState) {
        let now = Utc::now();
        match self.store.read(paths::TRAFFIC).await {
            Ok(snapshot) => {
                state.traffic_version = snapshot.version;
                match snapshot.decode::<TrafficRecord>() {
                    Ok(Some(record)) => {
                        state.intersection.adopt(&record, now);
                        info!(state = %record.state, group = %record.group, "Restored traffic record");
                    }
                    Ok(None) => {}
                    Err(e) => warn!(error = %e, "Ignoring malformed traffic record"),
                }
            }
            Err(e) => warn!(error = %e, "Could not read traffic record"),
        }

        match self.store.read_record::<TrafficLightStatus>(paths::STATUS).await {
            Ok(Some(status)) => {
                state.intersection.set_mode_at(status.mode, now);
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Ignoring malformed status record"),
        }

        match self.store.read_record::<SystemStatus>(paths::SYSTEM).await {
            Ok(Some(system)) => state.system = system,
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Ignoring malformed system record"),
        }

        match self.store.read_record::<bool>(paths::LED).await {
            Ok(Some(led)) => state.led = led,
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Ignoring malformed led value"),
        }
    }

    /// Unconditional publish of `traffic`, `trafficLight/status` and `state`.
    pub async fn publish_intersection(&self, state: &mut AppState) {
        let record = self.traffic_record(state);
        if let Some(version) = self.store.publish(paths::TRAFFIC, &record).await {
            state.traffic_version = version;
        }
        let status = state.intersection.status_record();
        if let Some(version) = self.store.publish(paths::STATUS, &status).await {
            state.mode_versions.status = version;
        }
        self.store.publish(paths::STATE, &status.current_light).await;
    }

    /// Conditional publish used by the timer: on conflict the stored record
    /// wins and is adopted into `state`.
    pub async fn publish_tick(&self, state: &mut AppState) -> TrafficWrite {
        let outcome = self.write_traffic_checked(state).await;
        self.publish_light(state).await;
        outcome
    }

    /// Write the counts snapshot and refresh the counts in `traffic`.
    pub async fn publish_counts(&self, state: &mut AppState) -> TrafficWrite {
        if let Some(counts) = &state.latest_counts {
            self.store.publish(paths::COUNTS, counts).await;
        }
        self.write_traffic_checked(state).await
    }

    /// Write the whole `trafficLight/system` record from `state`.
    pub async fn publish_system(&self, state: &mut AppState) {
        if let Some(version) = self.store.publish(paths::SYSTEM, &state.system).await {
            state.mode_versions.system = version;
        }
    }

    /// Merge selected fields into `trafficLight/system`.
    pub async fn update_system(&self, state: &mut AppState, fields: Map<String, Value>) {
        let carries_mode = fields.contains_key("mode");
        match self.store.update(paths::SYSTEM, fields).await {
            Ok(version) if carries_mode => state.mode_versions.system = version,
            Ok(_) => {}
            Err(e) => warn!(path = paths::SYSTEM, error = %e, "Store update failed"),
        }
    }

    pub async fn publish_led(&self, on: bool) {
        self.store.publish(paths::LED, &on).await;
    }

    /// Take a control mode written by another client into `state`.
    ///
    /// Both mode fields are re-read; of those that moved past what this
    /// process accounted for, the most recent wins. The winner is copied to
    /// the other field with a conditional write so a newer write there is
    /// never overwritten. Returns the mode if the local mode changed.
    pub async fn sync_external_mode(&self, state: &mut AppState) -> Option<ControlMode> {
        let mut adopted = None;

        for _ in 0..MODE_SYNC_ATTEMPTS {
            let (system, status) = match (
                self.store.read(paths::SYSTEM_MODE).await,
                self.store.read(paths::STATUS_MODE).await,
            ) {
                (Ok(system), Ok(status)) => (system, status),
                (Err(e), _) | (_, Err(e)) => {
                    warn!(error = %e, "Could not read mode fields");
                    break;
                }
            };

            let system_moved = system.version > state.mode_versions.system;
            let status_moved = status.version > state.mode_versions.status;
            state.mode_versions.system = state.mode_versions.system.max(system.version);
            state.mode_versions.status = state.mode_versions.status.max(status.version);

            let (latest, other) = match (system_moved, status_moved) {
                (false, false) => break,
                (true, false) => (system, status),
                (false, true) => (status, system),
                (true, true) if system.version >= status.version => (system, status),
                (true, true) => (status, system),
            };

            let mode = match latest.decode::<ControlMode>() {
                Ok(Some(mode)) => mode,
                Ok(None) => break,
                Err(e) => {
                    warn!(path = %latest.path, error = %e, "Ignoring malformed mode");
                    break;
                }
            };
            if adopt_mode(state, mode) {
                adopted = Some(mode);
            }

            if matches!(other.decode::<ControlMode>(), Ok(Some(m)) if m == mode) {
                break;
            }
            match self
                .store
                .compare_and_write(&other.path, json!(mode), other.version)
                .await
            {
                Ok(version) if other.path == paths::SYSTEM_MODE => {
                    state.mode_versions.system = version;
                    break;
                }
                Ok(version) => {
                    state.mode_versions.status = version;
                    break;
                }
                Err(StoreError::Conflict { .. }) => {
                    debug!(path = %other.path, "mode field moved while copying, re-reading");
                }
                Err(e) => {
                    warn!(path = %other.path, error = %e, "Store write failed");
                    break;
                }
            }
        }

        if adopted.is_some() {
            self.write_traffic_checked(state).await;
            self.publish_light(state).await;
        }
        adopted
    }

    /// Refresh the light in `trafficLight/status` and `state`. The stored
    /// mode is left alone.
    async fn publish_light(&self, state: &AppState) {
        let status = state.intersection.status_record();
        let mut fields = Map::new();
        fields.insert("currentLight".to_string(), json!(status.current_light));
        fields.insert("lastUpdate".to_string(), json!(status.last_update));
        if let Err(e) = self.store.update(paths::STATUS, fields).await {
            warn!(path = paths::STATUS, error = %e, "Store update failed");
        }
        self.store.publish(paths::STATE, &status.current_light).await;
    }

    async fn write_traffic_checked(&self, state: &mut AppState) -> TrafficWrite {
        // One resync is allowed when the record was deleted underneath us.
        for _ in 0..2 {
            let record = self.traffic_record(state);
            let value = match serde_json::to_value(&record) {
                Ok(v) => v,
                Err(e) => {
                    warn!(error = %e, "Could not encode traffic record");
                    return TrafficWrite::Failed;
                }
            };

            match self
                .store
                .compare_and_write(paths::TRAFFIC, value, state.traffic_version)
                .await
            {
                Ok(version) => {
                    state.traffic_version = version;
                    return TrafficWrite::Written(version);
                }
                Err(StoreError::Conflict {
                    expected, actual, ..
                }) => {
                    debug!(expected, actual, "traffic record moved, re-reading");
                    match self.adopt_stored(state).await {
                        Some(adopted) => return TrafficWrite::Adopted(adopted),
                        None => continue,
                    }
                }
                Err(e) => {
                    warn!(path = paths::TRAFFIC, error = %e, "Store write failed");
                    return TrafficWrite::Failed;
                }
            }
        }
        TrafficWrite::Failed
    }

    /// Take the stored `traffic` record into the local model. Returns `None`
    /// (after syncing the version) if there is no usable record.
    async fn adopt_stored(&self, state: &mut AppState) -> Option<TrafficRecord> {
        let snapshot = match self.store.read(paths::TRAFFIC).await {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "Could not re-read traffic record");
                return None;
            }
        };
        state.traffic_version = snapshot.version;

        let record = match snapshot.decode::<TrafficRecord>() {
            Ok(Some(record)) => record,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "Stored traffic record is malformed, overwriting");
                return None;
            }
        };

        state.intersection.adopt(&record, Utc::now());
        if record.emergency_mode == Some(true) {
            state.intersection.set_mode(ControlMode::Emergency);
        }
        state.conflicts_adopted += 1;
        state
            .events
            .push(format!("Adopted external signal change: {}", record.state));
        info!(state = %record.state, group = %record.group, "Adopted concurrently written traffic record");
        Some(record)
    }
}

/// Apply an externally chosen mode to the local model. Emergency forces
/// all-red, the same as the operator command.
fn adopt_mode(state: &mut AppState, mode: ControlMode) -> bool {
    state.system.mode = mode;
    if !state.intersection.set_mode(mode) {
        return false;
    }
    if mode == ControlMode::Emergency {
        state.intersection.set_state(SignalState::AllRed);
    }
    state.conflicts_adopted += 1;
    state
        .events
        .push(format!("Adopted external mode change: {mode}"));
    info!(%mode, "Adopted externally written control mode");
    true
}
