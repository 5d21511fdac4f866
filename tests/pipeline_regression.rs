//! Pipeline Regression Tests
//!
//! Runs the phase timer and counts generator against a real store with
//! paused tokio time, and checks what a display subscribed to the store
//! would see. Also covers first-load location seeding and restart from a
//! sled store.

use signal_board::config::CountsConfig;
use signal_board::locations::LocationRegistry;
use signal_board::pipeline::{
    AppState, ControlPanel, CountsLoop, ModeWatcher, PhaseTimer, Publisher, SimulatedCounts,
};
use signal_board::store::{MemoryStore, RemoteStore, RemoteStoreExt, SledStore};
use signal_board::store::StoreError;
use signal_board::types::{
    paths, ControlMode, CountsSnapshot, DirectionGroup, SignalState, SystemStatus,
    TrafficLightStatus, TrafficRecord,
};

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

struct Harness {
    store: Arc<dyn RemoteStore>,
    publisher: Arc<Publisher>,
    app_state: Arc<RwLock<AppState>>,
    cancel: CancellationToken,
}

impl Harness {
    fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self {
            publisher: Arc::new(Publisher::new(Arc::clone(&store), false)),
            store,
            app_state: Arc::new(RwLock::new(AppState::default())),
            cancel: CancellationToken::new(),
        }
    }

    fn spawn_timer(&self) -> tokio::task::JoinHandle<signal_board::pipeline::TimerStats> {
        tokio::spawn(PhaseTimer::new(Duration::from_secs(5), true).run(
            Arc::clone(&self.app_state),
            Arc::clone(&self.publisher),
            self.cancel.clone(),
        ))
    }

    fn spawn_counts(&self, seed: u64) -> tokio::task::JoinHandle<u64> {
        let source = SimulatedCounts::with_seed(CountsConfig::default(), Duration::from_secs(5), seed);
        tokio::spawn(
            CountsLoop::new(
                source,
                Arc::clone(&self.app_state),
                Arc::clone(&self.publisher),
                self.cancel.clone(),
            )
            .run(),
        )
    }

    fn spawn_mode_watcher(&self) -> tokio::task::JoinHandle<Result<u64, StoreError>> {
        tokio::spawn(
            ModeWatcher::new(
                Arc::clone(&self.app_state),
                Arc::clone(&self.publisher),
                self.cancel.clone(),
            )
            .run(),
        )
    }

    fn panel(&self) -> ControlPanel {
        ControlPanel::new(Arc::clone(&self.app_state), Arc::clone(&self.publisher))
    }
}

/// A display subscribed to `state` sees every colour of the cycle in order.
#[tokio::test(start_paused = true)]
async fn subscriber_sees_full_cycle_in_order() {
    let h = Harness::new(Arc::new(MemoryStore::new()));
    let mut display = h.store.subscribe(paths::STATE).await.unwrap();
    let timer = h.spawn_timer();

    let mut seen = Vec::new();
    for _ in 0..6 {
        let snapshot = display.next().await.unwrap();
        seen.push(snapshot.value.as_str().unwrap().to_string());
    }
    h.cancel.cancel();
    let stats = timer.await.unwrap();

    assert_eq!(seen, ["green", "yellow", "red", "green", "yellow", "red"]);
    assert_eq!(stats.transitions, 6);
}

/// With alternation, consecutive greens serve different groups.
#[tokio::test(start_paused = true)]
async fn groups_alternate_between_greens() {
    let h = Harness::new(Arc::new(MemoryStore::new()));
    let mut display = h.store.subscribe(paths::TRAFFIC).await.unwrap();
    let timer = h.spawn_timer();

    let mut green_groups = Vec::new();
    while green_groups.len() < 3 {
        let record: TrafficRecord = display.next().await.unwrap().decode().unwrap().unwrap();
        assert!(record.state != SignalState::AllRed);
        if record.state == SignalState::Green {
            green_groups.push(record.group);
        }
    }
    h.cancel.cancel();
    timer.await.unwrap();

    assert_eq!(
        green_groups,
        [DirectionGroup::NS, DirectionGroup::EW, DirectionGroup::NS]
    );
}

/// Manual override freezes the signal while counts keep flowing.
#[tokio::test(start_paused = true)]
async fn manual_override_freezes_signal_but_not_counts() {
    let h = Harness::new(Arc::new(MemoryStore::new()));
    let panel = h.panel();
    panel.set_mode(ControlMode::Manual).await;
    panel.set_state(SignalState::Green).await;

    let timer = h.spawn_timer();
    let counts = h.spawn_counts(11);

    tokio::time::sleep(Duration::from_millis(30_500)).await;
    h.cancel.cancel();
    let stats = timer.await.unwrap();
    let snapshots = counts.await.unwrap();

    assert_eq!(stats.ticks, 6);
    assert_eq!(stats.transitions, 0);
    assert_eq!(snapshots, 6);

    let traffic: TrafficRecord = h.store.read_record(paths::TRAFFIC).await.unwrap().unwrap();
    assert_eq!(traffic.state, SignalState::Green);
    assert!(traffic.counts.is_some());

    let stored: CountsSnapshot = h.store.read_record(paths::COUNTS).await.unwrap().unwrap();
    for v in stored.vehicles.values() {
        assert!((20..90).contains(&v));
    }
}

/// An external write to `traffic` between ticks wins; the timer carries on
/// from the adopted state.
#[tokio::test(start_paused = true)]
async fn timer_adopts_external_write() {
    let h = Harness::new(Arc::new(MemoryStore::new()));
    {
        let mut state = h.app_state.write().await;
        h.publisher.publish_intersection(&mut state).await;
    }
    let timer = h.spawn_timer();

    // Between the 5s and 10s ticks another dashboard writes yellow/EW.
    tokio::time::sleep(Duration::from_millis(7_000)).await;
    h.store
        .write(
            paths::TRAFFIC,
            serde_json::json!({"state": "yellow", "group": "EW", "timestamp": 0}),
        )
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(4_000)).await;
    {
        let state = h.app_state.read().await;
        assert_eq!(state.conflicts_adopted, 1);
        assert_eq!(state.intersection.state(), SignalState::Yellow);
        assert_eq!(state.intersection.active_group(), DirectionGroup::EW);
    }

    // Next tick advances from the adopted yellow.
    tokio::time::sleep(Duration::from_secs(5)).await;
    h.cancel.cancel();
    let stats = timer.await.unwrap();
    assert_eq!(stats.adopted, 1);

    let traffic: TrafficRecord = h.store.read_record(paths::TRAFFIC).await.unwrap().unwrap();
    assert_eq!(traffic.state, SignalState::Red);
    assert_eq!(traffic.group, DirectionGroup::NS);
}

/// A mode set by another dashboard stops the cycle, and the timer never
/// writes the stored mode back.
#[tokio::test(start_paused = true)]
async fn external_mode_override_is_honoured() {
    let h = Harness::new(Arc::new(MemoryStore::new()));
    {
        let mut state = h.app_state.write().await;
        h.publisher.publish_intersection(&mut state).await;
        h.publisher.publish_system(&mut state).await;
    }
    let watcher = h.spawn_mode_watcher();
    let timer = h.spawn_timer();

    // One automatic step at 5s, then another dashboard merges `mode` into
    // the system record.
    tokio::time::sleep(Duration::from_millis(6_000)).await;
    let mut fields = serde_json::Map::new();
    fields.insert("mode".to_string(), serde_json::json!("manual"));
    h.store.update(paths::SYSTEM, fields).await.unwrap();

    tokio::time::sleep(Duration::from_millis(20_000)).await;
    {
        let state = h.app_state.read().await;
        assert_eq!(state.intersection.mode(), ControlMode::Manual);
        assert_eq!(state.intersection.state(), SignalState::Green);
    }
    let status: TrafficLightStatus = h.store.read_record(paths::STATUS).await.unwrap().unwrap();
    assert_eq!(status.mode, ControlMode::Manual);
    assert_eq!(status.current_light, SignalState::Green);

    // A status-side emergency write wins over the earlier manual.
    h.store
        .write(paths::STATUS_MODE, serde_json::json!("emergency"))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(5_500)).await;
    h.cancel.cancel();
    let stats = timer.await.unwrap();
    assert_eq!(watcher.await.unwrap().unwrap(), 2);

    assert_eq!(stats.transitions, 1);
    let system: SystemStatus = h.store.read_record(paths::SYSTEM).await.unwrap().unwrap();
    assert_eq!(system.mode, ControlMode::Emergency);
    assert_eq!(
        h.store.read(paths::STATE).await.unwrap().value,
        serde_json::json!("all_red")
    );
}

/// Emergency holds all-red across ticks; clearing resumes at green.
#[tokio::test(start_paused = true)]
async fn emergency_holds_all_red_until_cleared() {
    let h = Harness::new(Arc::new(MemoryStore::new()));
    let panel = h.panel();
    panel.set_emergency(true).await;
    let timer = h.spawn_timer();

    tokio::time::sleep(Duration::from_millis(15_500)).await;
    assert_eq!(
        h.app_state.read().await.intersection.state(),
        SignalState::AllRed
    );

    panel.set_emergency(false).await;
    tokio::time::sleep(Duration::from_secs(5)).await;
    h.cancel.cancel();
    timer.await.unwrap();

    assert_eq!(
        h.store.read(paths::STATE).await.unwrap().value,
        serde_json::json!("green")
    );
}

/// First load seeds exactly three locations; the second load writes nothing.
#[tokio::test]
async fn seeding_happens_once() {
    let store: Arc<dyn RemoteStore> = Arc::new(MemoryStore::new());
    let mut watcher = store.subscribe(paths::LOCATIONS).await.unwrap();

    let registry = LocationRegistry::new(Arc::clone(&store));
    assert!(registry.seed_if_empty().await.unwrap());
    let first = watcher.next().await.unwrap();
    assert_eq!(first.value.as_object().unwrap().len(), 3);

    let version = store.read(paths::LOCATIONS).await.unwrap().version;
    assert!(!registry.seed_if_empty().await.unwrap());
    assert_eq!(store.read(paths::LOCATIONS).await.unwrap().version, version);
    assert!(watcher.try_next().is_none());
}

/// State written to sled survives a restart and is restored on startup.
#[tokio::test]
async fn sled_restart_restores_state() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("board.db");

    {
        let sled = Arc::new(SledStore::open(&db_path).unwrap());
        let h = Harness::new(sled.clone());
        let panel = h.panel();
        panel.set_mode(ControlMode::Manual).await;
        panel.set_state(SignalState::Yellow).await;
        panel.set_led(true).await;
        LocationRegistry::new(Arc::clone(&h.store))
            .seed_if_empty()
            .await
            .unwrap();
        sled.flush().unwrap();
    }

    let sled: Arc<dyn RemoteStore> = Arc::new(SledStore::open(&db_path).unwrap());
    let h = Harness::new(Arc::clone(&sled));
    {
        let mut state = h.app_state.write().await;
        h.publisher.restore(&mut state).await;
        assert_eq!(state.intersection.state(), SignalState::Yellow);
        assert_eq!(state.intersection.mode(), ControlMode::Manual);
        assert!(state.led);
    }

    let registry = LocationRegistry::new(sled);
    assert!(!registry.seed_if_empty().await.unwrap());
    assert_eq!(registry.list().await.unwrap().len(), 3);
}
