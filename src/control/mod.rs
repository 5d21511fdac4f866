//! Intersection model and operator event log.

mod events;
mod intersection;

pub use events::{EventEntry, EventLog};
pub use intersection::{GreenDurations, Intersection, IntersectionView};
