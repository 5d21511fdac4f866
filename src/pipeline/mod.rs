//! Controller Pipeline
//!
//! ```text
//! PhaseTimer ──► Intersection ──┐
//!                               ├─► Publisher ──► RemoteStore ──► subscribers
//! CountsSource ─► CountsLoop ───┤
//! ControlPanel (operator) ──────┤
//! ModeWatcher ◄── mode fields ──┘
//! ```
//!
//! The timer and the counts loop run as independent tasks; there is no
//! feedback from counts into phase. The mode watcher takes mode changes
//! made by other clients back into the local model.

mod state;
pub mod commands;
pub mod counts_loop;
pub mod mode_watcher;
pub mod phase_timer;
pub mod publisher;
pub mod source;

pub use commands::ControlPanel;
pub use counts_loop::CountsLoop;
pub use mode_watcher::ModeWatcher;
pub use phase_timer::{PhaseTimer, TickOutcome, TimerStats};
pub use publisher::{Publisher, TrafficWrite};
pub use source::{CountsSource, SensorFeedCounts, SimulatedCounts, SourceError};
pub use state::*;
