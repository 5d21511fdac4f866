//! Board Configuration - timer periods, count ranges, store and server settings
//!
//! Each struct implements `Default` with the values the controller runs with
//! when no config file is present.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use super::defaults;
use crate::types::DirectionGroup;

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "SIGNAL_BOARD_CONFIG";

/// Environment variable overriding `server.addr`.
pub const ADDR_ENV: &str = "SIGNAL_BOARD_ADDR";

const LOCAL_CONFIG: &str = "signal_board.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration.
///
/// Load with `BoardConfig::load()` which searches:
/// 1. `$SIGNAL_BOARD_CONFIG` env var
/// 2. `./signal_board.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BoardConfig {
    #[serde(default)]
    pub intersection: IntersectionConfig,

    #[serde(default)]
    pub timing: TimingConfig,

    #[serde(default)]
    pub counts: CountsConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub display: DisplayConfig,
}

impl BoardConfig {
    /// Load configuration using the standard search order, falling back to
    /// defaults when a file is missing or invalid.
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), intersection = %config.intersection.name, "Loaded board config from {}", CONFIG_ENV);
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {}, falling back", CONFIG_ENV);
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", CONFIG_ENV);
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!(intersection = %config.intersection.name, "Loaded board config from ./{}", LOCAL_CONFIG);
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", LOCAL_CONFIG);
                }
            }
        }

        info!("No {} found, using built-in defaults", LOCAL_CONFIG);
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let config: Self =
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `SIGNAL_BOARD_ADDR` if set.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(addr) = std::env::var(ADDR_ENV) {
            if !addr.trim().is_empty() {
                self.server.addr = addr;
            }
        }
        self
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Check cross-field constraints. All problems are reported together.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        if self.timing.phase_interval_secs == 0 {
            errors.push("timing.phase_interval_secs must be > 0".to_string());
        }
        if self.timing.counts_interval_secs == 0 {
            errors.push("timing.counts_interval_secs must be > 0".to_string());
        }
        Self::check_range(
            self.counts.vehicle_min,
            self.counts.vehicle_max,
            "counts.vehicle",
            &mut errors,
        );
        Self::check_range(
            self.counts.pedestrian_min,
            self.counts.pedestrian_max,
            "counts.pedestrian",
            &mut errors,
        );
        if self.display.event_log_capacity == 0 {
            errors.push("display.event_log_capacity must be > 0".to_string());
        }
        if self.server.addr.trim().is_empty() {
            errors.push("server.addr must not be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    fn check_range(min: u32, max: u32, name: &str, errors: &mut Vec<String>) {
        if min >= max {
            errors.push(format!("{name}_min ({min}) must be < {name}_max ({max})"));
        }
    }
}

// ============================================================================
// Sections
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct IntersectionConfig {
    /// Display name
    pub name: String,
    /// Group that gets the first green
    pub initial_group: DirectionGroup,
}

impl Default for IntersectionConfig {
    fn default() -> Self {
        Self {
            name: "Downtown Intersection".to_string(),
            initial_group: DirectionGroup::NS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TimingConfig {
    pub phase_interval_secs: u64,
    pub counts_interval_secs: u64,
    /// Flip the active group on every yellow → red transition.
    pub alternate_groups: bool,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            phase_interval_secs: defaults::PHASE_INTERVAL_SECS,
            counts_interval_secs: defaults::COUNTS_INTERVAL_SECS,
            alternate_groups: true,
        }
    }
}

impl TimingConfig {
    pub const fn phase_interval(&self) -> Duration {
        Duration::from_secs(self.phase_interval_secs)
    }

    pub const fn counts_interval(&self) -> Duration {
        Duration::from_secs(self.counts_interval_secs)
    }
}

/// Half-open ranges for simulated counts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CountsConfig {
    pub vehicle_min: u32,
    pub vehicle_max: u32,
    pub pedestrian_min: u32,
    pub pedestrian_max: u32,
    pub include_pedestrians: bool,
}

impl Default for CountsConfig {
    fn default() -> Self {
        Self {
            vehicle_min: defaults::VEHICLE_MIN,
            vehicle_max: defaults::VEHICLE_MAX,
            pedestrian_min: defaults::PEDESTRIAN_MIN,
            pedestrian_max: defaults::PEDESTRIAN_MAX,
            include_pedestrians: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StoreConfig {
    /// Sled directory
    pub path: PathBuf,
    /// Write the seed locations when none exist.
    pub seed_locations: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(defaults::STORE_PATH),
            seed_locations: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    /// Can be overridden by `SIGNAL_BOARD_ADDR` env var or `--addr` CLI flag.
    pub addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: defaults::SERVER_ADDR.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DisplayConfig {
    /// Add `emergencyMode`, `pedestrianSignal` and `systemStatus` to the
    /// `traffic` record.
    pub extended_fields: bool,
    pub event_log_capacity: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            extended_fields: false,
            event_log_capacity: defaults::EVENT_LOG_CAPACITY,
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),
    #[error("failed to parse {0}: {1}")]
    Parse(PathBuf, #[source] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[source] toml::ser::Error),
    #[error("invalid config: {}", .0.join("; "))]
    Validation(Vec<String>),
}
