//! Application State
//!
//! Shared controller state, accessible from API handlers, the phase timer
//! and the counts generator.

use serde::Serialize;
use std::time::Instant;

use crate::config::BoardConfig;
use crate::control::{EventLog, Intersection};
use crate::types::{CountsSnapshot, SystemStatus};

/// Shared application state.
///
/// This struct is wrapped in `Arc<RwLock<>>` for access across the async
/// runtime. Every write to the `traffic` record happens while holding the
/// write lock, so `traffic_version` always matches this process's last write.
#[derive(Debug, Clone)]
pub struct AppState {
    pub intersection: Intersection,

    /// Latest counts snapshot, `None` until the first tick
    pub latest_counts: Option<CountsSnapshot>,

    /// Camera / detector / mode as last written to `trafficLight/system`
    pub system: SystemStatus,

    pub led: bool,

    /// Simulation toggle from the system panel (in-process only)
    pub simulating: bool,

    pub events: EventLog,

    /// Store version of the `traffic` record after our last write
    pub traffic_version: u64,

    /// Versions of the stored mode fields already accounted for
    pub mode_versions: ModeVersions,

    pub phase_ticks: u64,
    pub counts_ticks: u64,

    /// Number of times a concurrent writer's signal or mode was taken over
    pub conflicts_adopted: u64,

    pub uptime: Instant,
}

impl AppState {
    pub fn from_config(config: &BoardConfig) -> Self {
        Self {
            intersection: Intersection::new(config.intersection.initial_group),
            latest_counts: None,
            system: SystemStatus::default(),
            led: false,
            simulating: false,
            events: EventLog::new(config.display.event_log_capacity),
            traffic_version: 0,
            mode_versions: ModeVersions::default(),
            phase_ticks: 0,
            counts_ticks: 0,
            conflicts_adopted: 0,
            uptime: Instant::now(),
        }
    }

    pub fn status(&self) -> StatusSummary {
        StatusSummary {
            uptime_secs: self.uptime.elapsed().as_secs(),
            phase_ticks: self.phase_ticks,
            counts_ticks: self.counts_ticks,
            conflicts_adopted: self.conflicts_adopted,
            simulating: self.simulating,
            led: self.led,
        }
    }
}

/// Store versions of `trafficLight/status/mode` and
/// `trafficLight/system/mode` that this process wrote itself or has already
/// adopted. A stored version above these is someone else's write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModeVersions {
    pub status: u64,
    pub system: u64,
}

impl Default for AppState {
    /// Deterministic zero-value suitable for tests.
    fn default() -> Self {
        Self::from_config(&BoardConfig::default())
    }
}

/// Counters reported by `/health`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSummary {
    pub uptime_secs: u64,
    pub phase_ticks: u64,
    pub counts_ticks: u64,
    pub conflicts_adopted: u64,
    pub simulating: bool,
    pub led: bool,
}
