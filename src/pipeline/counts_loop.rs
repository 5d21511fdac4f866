//! Counts generator task.
//!
//! Pulls snapshots from a [`CountsSource`] and overwrites the latest counts,
//! independent of the phase timer.

use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::publisher::Publisher;
use super::source::CountsSource;
use super::state::AppState;

pub struct CountsLoop<S: CountsSource> {
    source: S,
    app_state: Arc<RwLock<AppState>>,
    publisher: Arc<Publisher>,
    cancel_token: CancellationToken,
}

impl<S: CountsSource> CountsLoop<S> {
    pub fn new(
        source: S,
        app_state: Arc<RwLock<AppState>>,
        publisher: Arc<Publisher>,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            source,
            app_state,
            publisher,
            cancel_token,
        }
    }

    /// Run until the source is exhausted or cancellation. Returns the number
    /// of snapshots applied.
    pub async fn run(mut self) -> u64 {
        let mut snapshots = 0u64;
        info!(source = self.source.source_name(), "[CountsGenerator] Started");

        loop {
            let snapshot = tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    info!(snapshots, "[CountsGenerator] Shutdown signal received");
                    break;
                }
                result = self.source.next_snapshot() => match result {
                    Ok(Some(snapshot)) => snapshot,
                    Ok(None) => {
                        info!(snapshots, "[CountsGenerator] Source reached end");
                        break;
                    }
                    Err(e) => {
                        warn!("[CountsGenerator] Source error: {}", e);
                        break;
                    }
                }
            };

            snapshots += 1;
            let mut state = self.app_state.write().await;
            debug!(
                vehicles = snapshot.vehicles.total(),
                ns = snapshot.vehicles.group_total(crate::types::DirectionGroup::NS),
                ew = snapshot.vehicles.group_total(crate::types::DirectionGroup::EW),
                "[CountsGenerator] New counts"
            );
            state.latest_counts = Some(snapshot);
            state.counts_ticks += 1;
            self.publisher.publish_counts(&mut state).await;
        }

        snapshots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CountsConfig;
    use crate::pipeline::source::{SensorFeedCounts, SimulatedCounts};
    use crate::store::{MemoryStore, RemoteStore, RemoteStoreExt};
    use crate::types::{paths, CountsSnapshot, SignalState};
    use std::time::Duration;

    fn fixture() -> (Arc<dyn RemoteStore>, Arc<Publisher>, Arc<RwLock<AppState>>) {
        let store: Arc<dyn RemoteStore> = Arc::new(MemoryStore::new());
        let publisher = Arc::new(Publisher::new(store.clone(), false));
        (store, publisher, Arc::new(RwLock::new(AppState::default())))
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulated_counts_every_period() {
        let (store, publisher, app_state) = fixture();
        let cancel = CancellationToken::new();
        let source = SimulatedCounts::with_seed(CountsConfig::default(), Duration::from_secs(5), 3);
        let handle = tokio::spawn(
            CountsLoop::new(source, app_state.clone(), publisher, cancel.clone()).run(),
        );

        tokio::time::sleep(Duration::from_millis(10_500)).await;
        cancel.cancel();
        assert_eq!(handle.await.unwrap(), 2);

        let stored: CountsSnapshot = store.read_record(paths::COUNTS).await.unwrap().unwrap();
        let state = app_state.read().await;
        assert_eq!(Some(stored.vehicles), state.latest_counts.as_ref().map(|c| c.vehicles));
        // Counts never touch the signal.
        assert_eq!(state.intersection.state(), SignalState::Red);
    }

    #[tokio::test]
    async fn test_sensor_feed_runs_to_end() {
        let (store, publisher, app_state) = fixture();
        let input: &[u8] = b"{\"north\":1,\"south\":1,\"east\":1,\"west\":1}\n{\"north\":9,\"south\":9,\"east\":9,\"west\":9}\n";
        let source = SensorFeedCounts::new(input);

        let applied = CountsLoop::new(source, app_state.clone(), publisher, CancellationToken::new())
            .run()
            .await;

        assert_eq!(applied, 2);
        let stored: CountsSnapshot = store.read_record(paths::COUNTS).await.unwrap().unwrap();
        assert_eq!(stored.vehicles.total(), 36);
        assert_eq!(app_state.read().await.counts_ticks, 2);
    }
}
