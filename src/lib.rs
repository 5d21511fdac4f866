//! signal-board: simulated traffic-light controller
//!
//! One intersection, a fixed-period phase timer, a counts generator and a
//! realtime key-value store that displays subscribe to.
//!
//! ## Architecture
//!
//! - **Control**: intersection state model and operator event log
//! - **Pipeline**: phase timer, counts loop, store publisher, operator commands
//! - **Store**: JSON document store with path subscriptions (memory or sled)
//! - **Locations**: installation location registry
//! - **API**: axum HTTP and WebSocket surface

pub mod api;
pub mod config;
pub mod control;
pub mod locations;
pub mod pipeline;
pub mod store;
pub mod types;

// Re-export configuration
pub use config::BoardConfig;

// Re-export commonly used types
pub use types::{
    ControlMode, CountsSnapshot, DirectionCounts, DirectionGroup, Location, LocationStatus,
    SignalState, SystemStatus, TrafficRecord,
};

pub use control::{EventLog, Intersection};
pub use locations::{LocationError, LocationRegistry};
pub use pipeline::{AppState, ControlPanel, CountsSource, PhaseTimer, Publisher};
pub use store::{MemoryStore, RemoteStore, RemoteStoreExt, SledStore, Snapshot, StoreError, Subscription};
