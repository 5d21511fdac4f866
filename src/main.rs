//! signal-board - simulated traffic-light controller
//!
//! # Usage
//!
//! ```bash
//! # Run with simulated counts and the sled store under ./data
//! cargo run --release
//!
//! # Ephemeral store, custom bind address
//! ./signal-board --memory --addr 127.0.0.1:9000
//!
//! # Live counts from a detector bridge
//! detector_bridge | ./signal-board --sensor-stdin
//! ```
//!
//! # Environment Variables
//!
//! - `SIGNAL_BOARD_CONFIG`: Path to a TOML config file
//! - `SIGNAL_BOARD_ADDR`: HTTP bind address
//! - `SIGNAL_BOARD_CORS_ORIGINS`: Comma-separated allowed origins
//! - `RUST_LOG`: Logging level (default: info)
//! - `RESET_DB`: Set to "true" to wipe the store on startup

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use signal_board::api::{create_app, DashboardState};
use signal_board::config::{self, BoardConfig};
use signal_board::locations::LocationRegistry;
use signal_board::pipeline::{
    AppState, CountsLoop, CountsSource, ModeWatcher, PhaseTimer, Publisher, SensorFeedCounts,
    SimulatedCounts,
};
use signal_board::store::{MemoryStore, RemoteStore, SledStore};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "signal-board")]
#[command(about = "Simulated traffic-light controller with a realtime store")]
#[command(version)]
struct CliArgs {
    /// Override the server address (default: "0.0.0.0:8080")
    #[arg(short, long)]
    addr: Option<String>,

    /// Path to a TOML config file (overrides SIGNAL_BOARD_CONFIG)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Keep the store in memory only; nothing survives a restart
    #[arg(long)]
    memory: bool,

    /// Read counts from stdin (one JSON object per line) instead of simulating
    #[arg(long)]
    sensor_stdin: bool,

    /// Wipe the persistent store on startup.
    /// Can also be set via RESET_DB=true environment variable.
    #[arg(long)]
    reset_db: bool,
}

/// Check if a store reset is requested via CLI flag or environment variable.
fn should_reset_db(cli_flag: bool) -> bool {
    if cli_flag {
        return true;
    }
    if let Ok(val) = std::env::var("RESET_DB") {
        let val_lower = val.to_lowercase();
        return val_lower == "true" || val_lower == "1" || val_lower == "yes";
    }
    false
}

/// Remove the sled directory and all its contents.
fn reset_store_directory(path: &Path) -> Result<()> {
    if !path.exists() {
        info!("Store directory does not exist, nothing to reset");
        return Ok(());
    }
    warn!(path = %path.display(), "RESET_DB requested, wiping persistent store");
    std::fs::remove_dir_all(path)
        .with_context(|| format!("Failed to remove store directory {}", path.display()))?;
    Ok(())
}

fn load_config(explicit: Option<&Path>) -> Result<BoardConfig> {
    let config = match explicit {
        Some(path) => BoardConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => BoardConfig::load(),
    };
    Ok(config.with_env_overrides())
}

// ============================================================================
// Task Names for Supervisor Logging
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum TaskName {
    HttpServer,
    PhaseTimer,
    CountsGenerator,
    ModeWatcher,
}

impl std::fmt::Display for TaskName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskName::HttpServer => write!(f, "HttpServer"),
            TaskName::PhaseTimer => write!(f, "PhaseTimer"),
            TaskName::CountsGenerator => write!(f, "CountsGenerator"),
            TaskName::ModeWatcher => write!(f, "ModeWatcher"),
        }
    }
}

// ============================================================================
// Store Initialization
// ============================================================================

/// Opened store plus the sled handle, kept for a final flush.
struct OpenedStore {
    store: Arc<dyn RemoteStore>,
    sled: Option<Arc<SledStore>>,
}

fn open_store(board: &BoardConfig, memory: bool) -> Result<OpenedStore> {
    if memory {
        info!("Store: in-memory (nothing persists)");
        return Ok(OpenedStore {
            store: Arc::new(MemoryStore::new()),
            sled: None,
        });
    }

    let path = &board.store.path;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let sled = Arc::new(
        SledStore::open(path)
            .with_context(|| format!("Failed to open store at {}", path.display()))?,
    );
    info!(path = %path.display(), "Store: sled");
    Ok(OpenedStore {
        store: sled.clone(),
        sled: Some(sled),
    })
}

// ============================================================================
// Task Spawning
// ============================================================================

/// Spawn the HTTP server task into the JoinSet.
fn spawn_http_server(
    task_set: &mut JoinSet<Result<TaskName>>,
    listener: tokio::net::TcpListener,
    app: axum::Router,
    cancel_token: CancellationToken,
) {
    task_set.spawn(async move {
        info!("[HttpServer] Task starting");

        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                cancel_token.cancelled().await;
                info!("[HttpServer] Received shutdown signal");
            })
            .await;

        match result {
            Ok(()) => {
                info!("[HttpServer] Graceful shutdown complete");
                Ok(TaskName::HttpServer)
            }
            Err(e) => {
                error!("[HttpServer] Server error: {}", e);
                Err(anyhow::anyhow!("HTTP server error: {}", e))
            }
        }
    });
}

fn spawn_phase_timer(
    task_set: &mut JoinSet<Result<TaskName>>,
    timer: PhaseTimer,
    app_state: Arc<RwLock<AppState>>,
    publisher: Arc<Publisher>,
    cancel_token: CancellationToken,
) {
    task_set.spawn(async move {
        let stats = timer.run(app_state, publisher, cancel_token).await;
        info!(
            ticks = stats.ticks,
            transitions = stats.transitions,
            adopted = stats.adopted,
            "[PhaseTimer] Stopped"
        );
        Ok(TaskName::PhaseTimer)
    });
}

fn spawn_counts<S: CountsSource>(
    task_set: &mut JoinSet<Result<TaskName>>,
    source: S,
    app_state: Arc<RwLock<AppState>>,
    publisher: Arc<Publisher>,
    cancel_token: CancellationToken,
) {
    task_set.spawn(async move {
        let snapshots = CountsLoop::new(source, app_state, publisher, cancel_token)
            .run()
            .await;
        info!(snapshots, "[CountsGenerator] Stopped");
        Ok(TaskName::CountsGenerator)
    });
}

/// Spawn the task that adopts mode changes written by other clients.
fn spawn_mode_watcher(
    task_set: &mut JoinSet<Result<TaskName>>,
    app_state: Arc<RwLock<AppState>>,
    publisher: Arc<Publisher>,
    cancel_token: CancellationToken,
) {
    task_set.spawn(async move {
        let adopted = ModeWatcher::new(app_state, publisher, cancel_token)
            .run()
            .await
            .context("Mode watcher failed")?;
        info!(adopted, "[ModeWatcher] Stopped");
        Ok(TaskName::ModeWatcher)
    });
}

/// Run the supervisor loop: monitor tasks, cancel on failure.
async fn run_supervisor(
    task_set: &mut JoinSet<Result<TaskName>>,
    cancel_token: CancellationToken,
) -> Result<()> {
    info!("Supervisor: all tasks spawned, monitoring...");

    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => {
                info!("Supervisor: shutdown signal received");
                break;
            }
            result = task_set.join_next() => {
                match result {
                    Some(Ok(Ok(task_name))) => {
                        info!("Supervisor: task {} completed normally", task_name);
                    }
                    Some(Ok(Err(e))) => {
                        error!("Supervisor: task failed with error: {}", e);
                        cancel_token.cancel();
                        return Err(e);
                    }
                    Some(Err(e)) => {
                        error!("Supervisor: task panicked: {}", e);
                        cancel_token.cancel();
                        return Err(anyhow::anyhow!("Task panicked: {}", e));
                    }
                    None => {
                        info!("Supervisor: all tasks completed");
                        break;
                    }
                }
            }
        }
    }

    // Let the remaining tasks observe cancellation and finish.
    while let Some(result) = task_set.join_next().await {
        match result {
            Ok(Ok(task_name)) => info!("Supervisor: task {} stopped", task_name),
            Ok(Err(e)) => warn!("Supervisor: task ended with error during shutdown: {}", e),
            Err(e) => warn!("Supervisor: task panicked during shutdown: {}", e),
        }
    }

    Ok(())
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();

    let mut board = load_config(args.config.as_deref())?;
    if let Some(addr) = args.addr.clone() {
        board.server.addr = addr;
    }
    info!(
        intersection = %board.intersection.name,
        phase = ?board.timing.phase_interval(),
        counts = ?board.timing.counts_interval(),
        "Board configuration loaded"
    );
    config::init(board.clone());

    // Reset check, before the store is opened
    if !args.memory && should_reset_db(args.reset_db) {
        reset_store_directory(&board.store.path)?;
    }

    let opened = open_store(&board, args.memory)?;
    let store = opened.store;

    if board.store.seed_locations {
        let seeded = LocationRegistry::new(Arc::clone(&store))
            .seed_if_empty()
            .await
            .context("Failed to seed locations")?;
        if !seeded {
            info!("Locations already present, seeding skipped");
        }
    }

    let publisher = Arc::new(Publisher::new(
        Arc::clone(&store),
        board.display.extended_fields,
    ));
    let app_state = Arc::new(RwLock::new(AppState::from_config(&board)));
    {
        let mut state = app_state.write().await;
        publisher.restore(&mut state).await;
        publisher.publish_intersection(&mut state).await;
        publisher.publish_system(&mut state).await;
    }

    let dashboard = DashboardState::new(Arc::clone(&app_state), Arc::clone(&publisher), Arc::clone(&store));
    let app = create_app(dashboard);

    let listener = tokio::net::TcpListener::bind(&board.server.addr)
        .await
        .with_context(|| format!("Failed to bind to {}", board.server.addr))?;
    info!("HTTP server listening on {}", board.server.addr);

    // Graceful shutdown via Ctrl+C
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received Ctrl+C, initiating shutdown...");
        shutdown_token.cancel();
    });

    let mut task_set: JoinSet<Result<TaskName>> = JoinSet::new();

    spawn_http_server(&mut task_set, listener, app, cancel_token.clone());
    spawn_phase_timer(
        &mut task_set,
        PhaseTimer::from_config(&board.timing),
        Arc::clone(&app_state),
        Arc::clone(&publisher),
        cancel_token.clone(),
    );
    spawn_mode_watcher(
        &mut task_set,
        Arc::clone(&app_state),
        Arc::clone(&publisher),
        cancel_token.clone(),
    );
    if args.sensor_stdin {
        spawn_counts(
            &mut task_set,
            SensorFeedCounts::stdin(),
            Arc::clone(&app_state),
            Arc::clone(&publisher),
            cancel_token.clone(),
        );
    } else {
        spawn_counts(
            &mut task_set,
            SimulatedCounts::new(board.counts.clone(), board.timing.counts_interval()),
            Arc::clone(&app_state),
            Arc::clone(&publisher),
            cancel_token.clone(),
        );
    }

    let outcome = run_supervisor(&mut task_set, cancel_token).await;

    if let Some(sled) = opened.sled {
        match sled.flush() {
            Ok(bytes) => info!(bytes, "Store flushed"),
            Err(e) => warn!(error = %e, "Store flush failed"),
        }
    }

    outcome
}
