//! Per-direction vehicle and pedestrian counts.

use serde::{Deserialize, Serialize};

use super::DirectionGroup;

/// One count per approach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DirectionCounts {
    pub north: u32,
    pub south: u32,
    pub east: u32,
    pub west: u32,
}

impl DirectionCounts {
    pub const fn new(north: u32, south: u32, east: u32, west: u32) -> Self {
        Self {
            north,
            south,
            east,
            west,
        }
    }

    /// Sum of the two approaches in `group`.
    pub const fn group_total(&self, group: DirectionGroup) -> u32 {
        match group {
            DirectionGroup::NS => self.north + self.south,
            DirectionGroup::EW => self.east + self.west,
        }
    }

    pub const fn total(&self) -> u32 {
        self.north + self.south + self.east + self.west
    }

    pub fn values(&self) -> [u32; 4] {
        [self.north, self.south, self.east, self.west]
    }
}

/// Latest counts snapshot. Replaced wholesale on every tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountsSnapshot {
    pub vehicles: DirectionCounts,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pedestrians: Option<DirectionCounts>,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl CountsSnapshot {
    pub fn now(vehicles: DirectionCounts, pedestrians: Option<DirectionCounts>) -> Self {
        Self {
            vehicles,
            pedestrians,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }
}
