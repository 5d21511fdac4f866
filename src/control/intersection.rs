//! Intersection state model.
//!
//! Holds the signal colour, the active direction group and the control mode
//! for one intersection. The colour each group's approaches show is derived
//! from those fields rather than stored, so the two groups can never both be
//! non-red.
//!
//! Setters apply no policy: setting green while in manual mode is accepted.
//! Deciding *when* to change is the phase timer's or the operator's job.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::{
    ControlMode, DirectionCounts, DirectionGroup, PedestrianSignal, SignalState,
    TrafficLightStatus, TrafficRecord,
};

/// Length of the most recent green interval per group, in whole minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GreenDurations {
    pub north_south: i64,
    pub east_west: i64,
    pub last_change: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Intersection {
    state: SignalState,
    active_group: DirectionGroup,
    mode: ControlMode,
    last_change: DateTime<Utc>,
    green_since: Option<DateTime<Utc>>,
    green: GreenDurations,
}

/// Read-only view for displays.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntersectionView {
    pub state: SignalState,
    pub active_group: DirectionGroup,
    pub mode: ControlMode,
    pub last_change_timestamp: DateTime<Utc>,
    pub north_south: SignalState,
    pub east_west: SignalState,
    pub green_durations: GreenDurations,
}

impl Intersection {
    pub fn new(initial_group: DirectionGroup) -> Self {
        Self::new_at(initial_group, Utc::now())
    }

    pub fn new_at(initial_group: DirectionGroup, now: DateTime<Utc>) -> Self {
        Self {
            state: SignalState::Red,
            active_group: initial_group,
            mode: ControlMode::Automatic,
            last_change: now,
            green_since: None,
            green: GreenDurations {
                north_south: 0,
                east_west: 0,
                last_change: now,
            },
        }
    }

    pub const fn state(&self) -> SignalState {
        self.state
    }

    pub const fn active_group(&self) -> DirectionGroup {
        self.active_group
    }

    pub const fn mode(&self) -> ControlMode {
        self.mode
    }

    pub const fn last_change(&self) -> DateTime<Utc> {
        self.last_change
    }

    pub const fn green_durations(&self) -> GreenDurations {
        self.green
    }

    pub fn set_state(&mut self, state: SignalState) -> bool {
        self.set_state_at(state, Utc::now())
    }

    /// Returns true if the state changed.
    pub fn set_state_at(&mut self, state: SignalState, now: DateTime<Utc>) -> bool {
        if state == self.state {
            return false;
        }
        if self.state == SignalState::Green {
            self.close_green(now);
        }
        if state == SignalState::Green {
            self.green_since = Some(now);
        }
        self.state = state;
        self.last_change = now;
        true
    }

    pub fn set_mode(&mut self, mode: ControlMode) -> bool {
        self.set_mode_at(mode, Utc::now())
    }

    pub fn set_mode_at(&mut self, mode: ControlMode, now: DateTime<Utc>) -> bool {
        if mode == self.mode {
            return false;
        }
        self.mode = mode;
        self.last_change = now;
        true
    }

    pub fn set_active_group(&mut self, group: DirectionGroup) -> bool {
        self.set_active_group_at(group, Utc::now())
    }

    pub fn set_active_group_at(&mut self, group: DirectionGroup, now: DateTime<Utc>) -> bool {
        if group == self.active_group {
            return false;
        }
        // A running green is charged to the group that had it.
        if self.state == SignalState::Green {
            self.close_green(now);
            self.green_since = Some(now);
        }
        self.active_group = group;
        self.last_change = now;
        true
    }

    /// Apply one step of the fixed cycle.
    ///
    /// With `alternate_groups`, the group flips as the signal returns to red
    /// so the next green serves the other pair of approaches.
    pub fn advance_at(&mut self, alternate_groups: bool, now: DateTime<Utc>) -> SignalState {
        let from = self.state;
        let next = from.next();
        self.set_state_at(next, now);
        if alternate_groups && from == SignalState::Yellow {
            self.active_group = self.active_group.other();
        }
        next
    }

    /// Colour shown by `group`'s approaches.
    pub fn aspect(&self, group: DirectionGroup) -> SignalState {
        match self.state {
            SignalState::AllRed => SignalState::Red,
            s if group == self.active_group => s,
            _ => SignalState::Red,
        }
    }

    /// True when `group`'s approaches may proceed.
    pub fn approaches_go(&self, group: DirectionGroup) -> bool {
        self.aspect(group).is_go()
    }

    /// Take state and group from a record written by someone else.
    pub fn adopt(&mut self, record: &TrafficRecord, now: DateTime<Utc>) {
        self.set_state_at(record.state, now);
        self.set_active_group_at(record.group, now);
    }

    fn close_green(&mut self, now: DateTime<Utc>) {
        let Some(since) = self.green_since.take() else {
            return;
        };
        let minutes = (now - since).num_minutes();
        match self.active_group {
            DirectionGroup::NS => self.green.north_south = minutes,
            DirectionGroup::EW => self.green.east_west = minutes,
        }
        self.green.last_change = now;
    }

    pub fn view(&self) -> IntersectionView {
        IntersectionView {
            state: self.state,
            active_group: self.active_group,
            mode: self.mode,
            last_change_timestamp: self.last_change,
            north_south: self.aspect(DirectionGroup::NS),
            east_west: self.aspect(DirectionGroup::EW),
            green_durations: self.green,
        }
    }

    /// Record for the `traffic` path.
    pub fn traffic_record(
        &self,
        counts: Option<DirectionCounts>,
        extended_fields: bool,
    ) -> TrafficRecord {
        let (emergency_mode, pedestrian_signal, system_status) = if extended_fields {
            (
                Some(self.mode == ControlMode::Emergency),
                Some(PedestrianSignal::for_state(self.state)),
                Some(self.mode.as_str().to_string()),
            )
        } else {
            (None, None, None)
        };
        TrafficRecord {
            state: self.state,
            group: self.active_group,
            counts,
            timestamp: self.last_change.timestamp_millis(),
            emergency_mode,
            pedestrian_signal,
            system_status,
        }
    }

    /// Record for the `trafficLight/status` path.
    pub fn status_record(&self) -> TrafficLightStatus {
        TrafficLightStatus {
            current_light: self.state,
            last_update: self.last_change,
            mode: self.mode,
        }
    }
}
