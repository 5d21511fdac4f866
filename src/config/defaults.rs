//! System-wide default constants.
//!
//! Grouped by subsystem for easy discovery.

// ============================================================================
// Timers
// ============================================================================

/// Phase timer period (seconds).
pub const PHASE_INTERVAL_SECS: u64 = 5;

/// Counts generator period (seconds).
pub const COUNTS_INTERVAL_SECS: u64 = 5;

// ============================================================================
// Counts Generator
// ============================================================================

/// Vehicle counts are drawn from `[VEHICLE_MIN, VEHICLE_MAX)`.
pub const VEHICLE_MIN: u32 = 20;
pub const VEHICLE_MAX: u32 = 90;

/// Pedestrian counts are drawn from `[PEDESTRIAN_MIN, PEDESTRIAN_MAX)`.
pub const PEDESTRIAN_MIN: u32 = 5;
pub const PEDESTRIAN_MAX: u32 = 30;

// ============================================================================
// Store / Server
// ============================================================================

/// Default sled directory.
pub const STORE_PATH: &str = "./data/signal_board.db";

/// Default HTTP bind address.
pub const SERVER_ADDR: &str = "0.0.0.0:8080";

/// Event log entries kept for display.
pub const EVENT_LOG_CAPACITY: usize = 10;
