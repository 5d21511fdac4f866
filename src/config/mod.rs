//! Board Configuration Module
//!
//! Timer periods, count ranges, store location and server address, loaded
//! from TOML.
//!
//! ## Loading Order
//!
//! 1. `SIGNAL_BOARD_CONFIG` environment variable (path to TOML file)
//! 2. `signal_board.toml` in the current working directory
//! 3. Built-in defaults
//!
//! ## Usage
//!
//! Call `config::init()` once at startup, then `config::get()` anywhere:
//!
//! ```ignore
//! // In main():
//! config::init(BoardConfig::load());
//!
//! // Anywhere in the codebase:
//! let period = config::get().timing.phase_interval();
//! ```

mod board_config;
pub mod defaults;

pub use board_config::*;

use std::sync::OnceLock;

/// Global board configuration, initialized once at startup.
static BOARD_CONFIG: OnceLock<BoardConfig> = OnceLock::new();

/// Initialize the global board configuration.
///
/// A second call is ignored with a warning.
pub fn init(config: BoardConfig) {
    if BOARD_CONFIG.set(config).is_err() {
        tracing::warn!("config::init() called more than once, ignoring");
    }
}

/// Get the global board configuration, or the defaults if `init()` has not
/// been called.
pub fn get() -> &'static BoardConfig {
    static FALLBACK: OnceLock<BoardConfig> = OnceLock::new();
    BOARD_CONFIG
        .get()
        .unwrap_or_else(|| FALLBACK.get_or_init(BoardConfig::default))
}

/// Check whether the config has been initialized.
pub fn is_initialized() -> bool {
    BOARD_CONFIG.get().is_some()
}
