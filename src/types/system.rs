//! Records mirrored into the store for displays.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ControlMode, DirectionCounts, DirectionGroup, SignalState};

/// Online/offline flag for auxiliary devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeviceStatus {
    Online,
    #[default]
    Offline,
}

impl DeviceStatus {
    pub const fn from_active(active: bool) -> Self {
        if active {
            Self::Online
        } else {
            Self::Offline
        }
    }

    pub const fn is_online(self) -> bool {
        matches!(self, Self::Online)
    }
}

/// `trafficLight/system`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SystemStatus {
    #[serde(default)]
    pub camera: DeviceStatus,
    /// Vehicle detector
    #[serde(default)]
    pub yolo: DeviceStatus,
    #[serde(default)]
    pub mode: ControlMode,
}

/// `trafficLight/status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficLightStatus {
    pub current_light: SignalState,
    pub last_update: DateTime<Utc>,
    #[serde(default)]
    pub mode: ControlMode,
}

/// Walk indication for crosswalks parallel to the active group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PedestrianSignal {
    Walk,
    DontWalk,
}

impl PedestrianSignal {
    pub const fn for_state(state: SignalState) -> Self {
        match state {
            SignalState::Green => Self::Walk,
            _ => Self::DontWalk,
        }
    }
}

/// `traffic`: the record displays render the intersection from.
///
/// The optional fields are only present when extended fields are enabled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficRecord {
    pub state: SignalState,
    pub group: DirectionGroup,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counts: Option<DirectionCounts>,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emergency_mode: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pedestrian_signal: Option<PedestrianSignal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_status: Option<String>,
}
