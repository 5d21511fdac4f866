//! Domain types shared by the controller, store records and API.

mod counts;
mod location;
mod signal;
mod system;

pub use counts::{CountsSnapshot, DirectionCounts};
pub use location::{seed_locations, Coordinates, Location, LocationRecord, LocationStatus, NewLocation};
pub use signal::{ControlMode, DirectionGroup, SignalState};
pub use system::{DeviceStatus, PedestrianSignal, SystemStatus, TrafficLightStatus, TrafficRecord};

/// Store paths shared by publishers and displays.
pub mod paths {
    pub const STATE: &str = "state";
    pub const LED: &str = "led";
    pub const TRAFFIC: &str = "traffic";
    pub const STATUS: &str = "trafficLight/status";
    pub const SYSTEM: &str = "trafficLight/system";
    /// Mode fields other dashboards may write directly.
    pub const STATUS_MODE: &str = "trafficLight/status/mode";
    pub const SYSTEM_MODE: &str = "trafficLight/system/mode";
    pub const LOCATIONS: &str = "trafficLight/locations";
    pub const COUNTS: &str = "trafficLight/counts";

    pub fn location(id: &str) -> String {
        format!("{LOCATIONS}/{id}")
    }
}
