//! External mode override task.
//!
//! Another dashboard can switch the intersection to manual or emergency by
//! writing `trafficLight/system/mode` or `trafficLight/status/mode` directly.
//! This task follows both fields and hands every change to
//! [`Publisher::sync_external_mode`], so the phase timer honours an override
//! made elsewhere.

use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::publisher::Publisher;
use super::state::AppState;
use crate::store::StoreError;
use crate::types::paths;

pub struct ModeWatcher {
    app_state: Arc<RwLock<AppState>>,
    publisher: Arc<Publisher>,
    cancel_token: CancellationToken,
}

impl ModeWatcher {
    pub fn new(
        app_state: Arc<RwLock<AppState>>,
        publisher: Arc<Publisher>,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            app_state,
            publisher,
            cancel_token,
        }
    }

    /// Run until cancelled or the store goes away. Returns the number of
    /// mode changes adopted.
    pub async fn run(self) -> Result<u64, StoreError> {
        let store = Arc::clone(self.publisher.store());
        let mut system = store.subscribe(paths::SYSTEM_MODE).await?;
        let mut status = store.subscribe(paths::STATUS_MODE).await?;
        let mut adopted = 0u64;

        info!("[ModeWatcher] Started");

        loop {
            let received = tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    info!(adopted, "[ModeWatcher] Shutdown signal received");
                    break;
                }
                snapshot = system.next() => snapshot,
                snapshot = status.next() => snapshot,
            };
            if received.is_none() {
                info!(adopted, "[ModeWatcher] Store closed");
                break;
            }

            // The sync re-reads both fields, so queued snapshots add nothing.
            while system.try_next().is_some() {}
            while status.try_next().is_some() {}

            let mut state = self.app_state.write().await;
            match self.publisher.sync_external_mode(&mut state).await {
                Some(mode) => {
                    adopted += 1;
                    debug!(%mode, "[ModeWatcher] Mode adopted");
                }
                None => debug!("[ModeWatcher] Nothing new"),
            }
        }

        Ok(adopted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ControlPanel;
    use crate::store::{MemoryStore, RemoteStore};
    use crate::types::{ControlMode, SignalState};
    use serde_json::json;
    use std::time::Duration;

    fn fixture() -> (Arc<dyn RemoteStore>, Arc<Publisher>, Arc<RwLock<AppState>>) {
        let store: Arc<dyn RemoteStore> = Arc::new(MemoryStore::new());
        let publisher = Arc::new(Publisher::new(store.clone(), false));
        (store, publisher, Arc::new(RwLock::new(AppState::default())))
    }

    #[tokio::test(start_paused = true)]
    async fn test_own_writes_are_not_adopted() {
        let (_store, publisher, app_state) = fixture();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(
            ModeWatcher::new(app_state.clone(), publisher.clone(), cancel.clone()).run(),
        );

        let panel = ControlPanel::new(app_state.clone(), publisher);
        panel.set_mode(ControlMode::Manual).await;
        panel.set_mode(ControlMode::Automatic).await;
        panel.set_camera(Some(true)).await;
        tokio::time::sleep(Duration::from_millis(100)).await;

        cancel.cancel();
        assert_eq!(handle.await.unwrap().unwrap(), 0);
        let state = app_state.read().await;
        assert_eq!(state.intersection.mode(), ControlMode::Automatic);
        assert_eq!(state.conflicts_adopted, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_system_mode_write_is_adopted_and_mirrored() {
        let (store, publisher, app_state) = fixture();
        {
            let mut state = app_state.write().await;
            publisher.publish_intersection(&mut state).await;
            publisher.publish_system(&mut state).await;
        }
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(
            ModeWatcher::new(app_state.clone(), publisher, cancel.clone()).run(),
        );

        store
            .write(paths::SYSTEM_MODE, json!("emergency"))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        {
            let state = app_state.read().await;
            assert_eq!(state.intersection.mode(), ControlMode::Emergency);
            assert_eq!(state.intersection.state(), SignalState::AllRed);
            assert_eq!(state.system.mode, ControlMode::Emergency);
        }
        assert_eq!(
            store.read(paths::STATUS_MODE).await.unwrap().value,
            json!("emergency")
        );
        assert_eq!(store.read(paths::STATE).await.unwrap().value, json!("all_red"));

        cancel.cancel();
        assert_eq!(handle.await.unwrap().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_latest_of_both_fields_wins() {
        let (store, publisher, app_state) = fixture();
        store.write(paths::SYSTEM_MODE, json!("emergency")).await.unwrap();
        store.write(paths::STATUS_MODE, json!("manual")).await.unwrap();

        let mut state = app_state.write().await;
        let adopted = publisher.sync_external_mode(&mut state).await;

        assert_eq!(adopted, Some(ControlMode::Manual));
        assert_eq!(state.intersection.mode(), ControlMode::Manual);
        assert_eq!(
            store.read(paths::SYSTEM_MODE).await.unwrap().value,
            json!("manual")
        );
        assert_eq!(publisher.sync_external_mode(&mut state).await, None);
    }
}
