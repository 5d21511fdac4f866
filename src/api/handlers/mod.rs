//! API route handlers
//!
//! Request handling logic for all API endpoints including:
//! - Intersection state, mode and active group
//! - Counts, system panel, LED and the event log
//! - Location CRUD
//! - Raw store reads/writes and WebSocket subscriptions

mod intersection;
mod locations;
mod status;
mod store;
mod system;

pub use intersection::*;
pub use locations::*;
pub use status::*;
pub use store::*;
pub use system::*;

use std::sync::Arc;
use tokio::sync::RwLock;

use crate::locations::LocationRegistry;
use crate::pipeline::{AppState, ControlPanel, Publisher};
use crate::store::RemoteStore;

// ============================================================================
// API State
// ============================================================================

/// Shared state for API handlers
#[derive(Clone)]
pub struct DashboardState {
    /// Controller state shared with the timer and counts tasks
    pub app_state: Arc<RwLock<AppState>>,
    /// Operator commands
    pub panel: ControlPanel,
    pub locations: LocationRegistry,
    /// Raw store access for `/store` and `/subscribe`
    pub store: Arc<dyn RemoteStore>,
}

impl DashboardState {
    pub fn new(
        app_state: Arc<RwLock<AppState>>,
        publisher: Arc<Publisher>,
        store: Arc<dyn RemoteStore>,
    ) -> Self {
        Self {
            panel: ControlPanel::new(Arc::clone(&app_state), publisher),
            locations: LocationRegistry::new(Arc::clone(&store)),
            app_state,
            store,
        }
    }

    /// In-memory state for tests and `--memory` runs.
    pub fn in_memory() -> Self {
        let store: Arc<dyn RemoteStore> = Arc::new(crate::store::MemoryStore::new());
        let publisher = Arc::new(Publisher::new(
            Arc::clone(&store),
            crate::config::get().display.extended_fields,
        ));
        let app_state = Arc::new(RwLock::new(AppState::from_config(crate::config::get())));
        Self::new(app_state, publisher, store)
    }
}
