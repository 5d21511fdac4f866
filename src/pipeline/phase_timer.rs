//! Fixed-period phase timer.
//!
//! Every period the timer fires. In automatic mode it advances the
//! intersection one step (red → green → yellow → red, all_red → green) and
//! publishes; in manual or emergency mode the tick is a no-op.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::publisher::{Publisher, TrafficWrite};
use super::state::AppState;
use crate::config::TimingConfig;
use crate::control::Intersection;
use crate::types::{ControlMode, SignalState};

/// What one tick did to the intersection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Advanced { from: SignalState, to: SignalState },
    /// Mode suppressed the transition.
    Held(ControlMode),
}

/// Tick statistics returned when the timer stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimerStats {
    pub ticks: u64,
    pub transitions: u64,
    pub adopted: u64,
}

pub struct PhaseTimer {
    period: Duration,
    alternate_groups: bool,
}

impl PhaseTimer {
    pub fn new(period: Duration, alternate_groups: bool) -> Self {
        Self {
            period,
            alternate_groups,
        }
    }

    pub fn from_config(timing: &TimingConfig) -> Self {
        Self::new(timing.phase_interval(), timing.alternate_groups)
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Apply one tick of the cycle policy.
    pub fn on_tick(&self, intersection: &mut Intersection, now: DateTime<Utc>) -> TickOutcome {
        match intersection.mode() {
            ControlMode::Automatic => {
                let from = intersection.state();
                let to = intersection.advance_at(self.alternate_groups, now);
                TickOutcome::Advanced { from, to }
            }
            held => TickOutcome::Held(held),
        }
    }

    /// Run until cancelled. The first tick fires one period after start.
    pub async fn run(
        self,
        app_state: Arc<RwLock<AppState>>,
        publisher: Arc<Publisher>,
        cancel_token: CancellationToken,
    ) -> TimerStats {
        let mut stats = TimerStats::default();
        let start = tokio::time::Instant::now() + self.period;
        let mut interval = tokio::time::interval_at(start, self.period);

        info!(period = ?self.period, alternate_groups = self.alternate_groups, "[PhaseTimer] Started");

        loop {
            tokio::select! {
                _ = cancel_token.cancelled() => {
                    info!(ticks = stats.ticks, transitions = stats.transitions, "[PhaseTimer] Shutdown signal received");
                    break;
                }
                _ = interval.tick() => {
                    let mut state = app_state.write().await;
                    state.phase_ticks += 1;
                    stats.ticks += 1;

                    match self.on_tick(&mut state.intersection, Utc::now()) {
                        TickOutcome::Advanced { from, to } => {
                            stats.transitions += 1;
                            debug!(%from, %to, group = %state.intersection.active_group(), "[PhaseTimer] Advanced");
                            if let TrafficWrite::Adopted(_) = publisher.publish_tick(&mut state).await {
                                stats.adopted += 1;
                            }
                        }
                        TickOutcome::Held(mode) => {
                            debug!(%mode, "[PhaseTimer] Tick held");
                        }
                    }
                }
            }
        }

        stats
    }
}
