//! Intersection and counts endpoints.

use axum::extract::State;
use axum::response::Response;
use serde::Deserialize;

use super::DashboardState;
use crate::api::envelope::{ApiErrorResponse, ApiJson, ApiResponse};
use crate::types::{ControlMode, DirectionGroup, SignalState};

#[derive(Debug, Deserialize)]
pub struct SetStateRequest {
    pub state: SignalState,
}

#[derive(Debug, Deserialize)]
pub struct SetModeRequest {
    pub mode: ControlMode,
}

#[derive(Debug, Deserialize)]
pub struct SetGroupRequest {
    pub group: DirectionGroup,
}

/// GET /api/v1/intersection
pub async fn get_intersection(State(state): State<DashboardState>) -> Response {
    let app = state.app_state.read().await;
    ApiResponse::ok(app.intersection.view())
}

/// POST /api/v1/intersection/state
pub async fn set_intersection_state(
    State(state): State<DashboardState>,
    ApiJson(request): ApiJson<SetStateRequest>,
) -> Response {
    ApiResponse::ok(state.panel.set_state(request.state).await)
}

/// POST /api/v1/intersection/mode
///
/// Emergency has its own endpoint so it always comes with all-red.
pub async fn set_intersection_mode(
    State(state): State<DashboardState>,
    ApiJson(request): ApiJson<SetModeRequest>,
) -> Response {
    if request.mode == ControlMode::Emergency {
        return ApiErrorResponse::bad_request(
            "Use POST /api/v1/system/emergency to enter emergency mode.",
        );
    }
    ApiResponse::ok(state.panel.set_mode(request.mode).await)
}

/// POST /api/v1/intersection/group
pub async fn set_intersection_group(
    State(state): State<DashboardState>,
    ApiJson(request): ApiJson<SetGroupRequest>,
) -> Response {
    ApiResponse::ok(state.panel.set_active_group(request.group).await)
}

/// GET /api/v1/counts
pub async fn get_counts(State(state): State<DashboardState>) -> Response {
    let app = state.app_state.read().await;
    match &app.latest_counts {
        Some(counts) => ApiResponse::ok(counts.clone()),
        None => ApiErrorResponse::not_found("No counts generated yet"),
    }
}
