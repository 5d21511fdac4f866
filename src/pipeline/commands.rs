//! Operator commands.
//!
//! Direct writes from the dashboard: signal colour, mode, active group, LED
//! and the system panel. These write unconditionally and win over the timer.
//! Every command appends to the event log.

use serde_json::{json, Map, Value};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use super::publisher::Publisher;
use super::state::AppState;
use crate::control::IntersectionView;
use crate::types::{ControlMode, DeviceStatus, DirectionGroup, SignalState, SystemStatus};

#[derive(Clone)]
pub struct ControlPanel {
    app_state: Arc<RwLock<AppState>>,
    publisher: Arc<Publisher>,
}

impl ControlPanel {
    pub fn new(app_state: Arc<RwLock<AppState>>, publisher: Arc<Publisher>) -> Self {
        Self {
            app_state,
            publisher,
        }
    }

    pub fn app_state(&self) -> &Arc<RwLock<AppState>> {
        &self.app_state
    }

    pub fn publisher(&self) -> &Arc<Publisher> {
        &self.publisher
    }

    // ------------------------------------------------------------------
    // Intersection
    // ------------------------------------------------------------------

    pub async fn set_state(&self, signal: SignalState) -> IntersectionView {
        let mut state = self.app_state.write().await;
        if state.intersection.set_state(signal) {
            state.events.push(format!("Traffic light set to {signal}"));
            info!(%signal, "Operator set signal");
        }
        self.publisher.publish_intersection(&mut state).await;
        state.intersection.view()
    }

    pub async fn set_mode(&self, mode: ControlMode) -> IntersectionView {
        let mut state = self.app_state.write().await;
        if state.intersection.set_mode(mode) {
            state.events.push(format!("Control mode set to {mode}"));
            info!(%mode, "Operator set mode");
        }
        state.system.mode = mode;
        self.publisher.publish_intersection(&mut state).await;
        let changed = fields([("mode", json!(mode))]);
        self.publisher.update_system(&mut state, changed).await;
        state.intersection.view()
    }

    pub async fn set_active_group(&self, group: DirectionGroup) -> IntersectionView {
        let mut state = self.app_state.write().await;
        if state.intersection.set_active_group(group) {
            state.events.push(format!("Active group set to {group}"));
            info!(%group, "Operator set active group");
        }
        self.publisher.publish_intersection(&mut state).await;
        state.intersection.view()
    }

    pub async fn set_led(&self, on: bool) -> bool {
        let mut state = self.app_state.write().await;
        state.led = on;
        state
            .events
            .push(format!("LED turned {}", if on { "on" } else { "off" }));
        self.publisher.publish_led(on).await;
        on
    }

    // ------------------------------------------------------------------
    // System panel
    // ------------------------------------------------------------------

    /// Set the camera, or flip it when `active` is `None`.
    pub async fn set_camera(&self, active: Option<bool>) -> SystemStatus {
        let mut state = self.app_state.write().await;
        let on = active.unwrap_or(!state.system.camera.is_online());
        state.system.camera = DeviceStatus::from_active(on);
        state.events.push(format!(
            "Camera {}",
            if on { "activated" } else { "deactivated" }
        ));
        let changed = fields([("camera", json!(state.system.camera))]);
        self.publisher.update_system(&mut state, changed).await;
        state.system
    }

    /// Set the vehicle detector, or flip it when `active` is `None`.
    pub async fn set_detector(&self, active: Option<bool>) -> SystemStatus {
        let mut state = self.app_state.write().await;
        let on = active.unwrap_or(!state.system.yolo.is_online());
        state.system.yolo = DeviceStatus::from_active(on);
        state.events.push(format!(
            "Vehicle detection {}",
            if on { "online" } else { "offline" }
        ));
        let changed = fields([("yolo", json!(state.system.yolo))]);
        self.publisher.update_system(&mut state, changed).await;
        state.system
    }

    /// Emergency holds every approach at red until cleared. Clearing returns
    /// to automatic; the next tick resumes the cycle at green.
    pub async fn set_emergency(&self, active: bool) -> SystemStatus {
        let mut state = self.app_state.write().await;
        if active {
            state.intersection.set_mode(ControlMode::Emergency);
            state.intersection.set_state(SignalState::AllRed);
            state.events.push("Emergency mode activated");
            info!("Emergency mode activated");
        } else {
            state.intersection.set_mode(ControlMode::Automatic);
            state.events.push("Emergency mode cleared");
            info!("Emergency mode cleared");
        }
        state.system.mode = state.intersection.mode();
        self.publisher.publish_intersection(&mut state).await;
        let changed = fields([("mode", json!(state.system.mode))]);
        self.publisher.update_system(&mut state, changed).await;
        state.system
    }

    /// Back to automatic red with camera and detector offline.
    pub async fn reset(&self) -> SystemStatus {
        let mut state = self.app_state.write().await;
        state.intersection.set_mode(ControlMode::Automatic);
        state.intersection.set_state(SignalState::Red);
        state.system = SystemStatus {
            camera: DeviceStatus::Offline,
            yolo: DeviceStatus::Offline,
            mode: ControlMode::Automatic,
        };
        state.simulating = false;
        state.events.push("System reset to default state");
        info!("System reset");
        self.publisher.publish_intersection(&mut state).await;
        let changed = fields([
            ("mode", json!(ControlMode::Automatic)),
            ("camera", json!(DeviceStatus::Offline)),
            ("yolo", json!(DeviceStatus::Offline)),
        ]);
        self.publisher.update_system(&mut state, changed).await;
        state.system
    }

    /// Set the simulation flag, or flip it when `active` is `None`.
    pub async fn set_simulation(&self, active: Option<bool>) -> bool {
        let mut state = self.app_state.write().await;
        let on = active.unwrap_or(!state.simulating);
        state.simulating = on;
        state.events.push(format!(
            "Simulation mode {}",
            if on { "activated" } else { "deactivated" }
        ));
        on
    }
}

fn fields<const N: usize>(pairs: [(&str, Value); N]) -> Map<String, Value> {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}
