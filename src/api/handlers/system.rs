//! System panel, LED and event log endpoints.

use axum::extract::State;
use axum::response::Response;
use serde::{Deserialize, Serialize};

use super::DashboardState;
use crate::api::envelope::{ApiJson, ApiResponse};
use crate::control::EventEntry;
use crate::types::SystemStatus;

/// Body for toggles. An absent `active` flips the current value.
#[derive(Debug, Default, Deserialize)]
pub struct ToggleRequest {
    #[serde(default)]
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct EmergencyRequest {
    #[serde(default = "default_true")]
    pub active: bool,
}

#[derive(Debug, Deserialize)]
pub struct LedRequest {
    pub on: bool,
}

const fn default_true() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct SystemResponse {
    #[serde(flatten)]
    pub status: SystemStatus,
    pub simulating: bool,
    pub led: bool,
}

/// GET /api/v1/system
pub async fn get_system(State(state): State<DashboardState>) -> Response {
    let app = state.app_state.read().await;
    ApiResponse::ok(SystemResponse {
        status: app.system,
        simulating: app.simulating,
        led: app.led,
    })
}

/// POST /api/v1/system/camera
pub async fn set_camera(
    State(state): State<DashboardState>,
    request: Option<ApiJson<ToggleRequest>>,
) -> Response {
    let active = request.and_then(|ApiJson(r)| r.active);
    ApiResponse::ok(state.panel.set_camera(active).await)
}

/// POST /api/v1/system/detector
pub async fn set_detector(
    State(state): State<DashboardState>,
    request: Option<ApiJson<ToggleRequest>>,
) -> Response {
    let active = request.and_then(|ApiJson(r)| r.active);
    ApiResponse::ok(state.panel.set_detector(active).await)
}

/// POST /api/v1/system/emergency
pub async fn set_emergency(
    State(state): State<DashboardState>,
    request: Option<ApiJson<EmergencyRequest>>,
) -> Response {
    let active = request.map_or(true, |ApiJson(r)| r.active);
    ApiResponse::ok(state.panel.set_emergency(active).await)
}

/// POST /api/v1/system/reset
pub async fn reset_system(State(state): State<DashboardState>) -> Response {
    ApiResponse::ok(state.panel.reset().await)
}

/// POST /api/v1/system/simulation
pub async fn set_simulation(
    State(state): State<DashboardState>,
    request: Option<ApiJson<ToggleRequest>>,
) -> Response {
    let active = request.and_then(|ApiJson(r)| r.active);
    let simulating = state.panel.set_simulation(active).await;
    ApiResponse::ok(serde_json::json!({ "simulating": simulating }))
}

/// POST /api/v1/led
pub async fn set_led(
    State(state): State<DashboardState>,
    ApiJson(request): ApiJson<LedRequest>,
) -> Response {
    let on = state.panel.set_led(request.on).await;
    ApiResponse::ok(serde_json::json!({ "on": on }))
}

/// GET /api/v1/events
pub async fn get_events(State(state): State<DashboardState>) -> Response {
    let app = state.app_state.read().await;
    let entries: Vec<EventEntry> = app.events.entries();
    ApiResponse::ok(entries)
}
