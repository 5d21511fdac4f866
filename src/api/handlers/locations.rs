//! Location CRUD endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use super::DashboardState;
use crate::api::envelope::{ApiJson, ApiResponse};
use crate::types::{LocationStatus, NewLocation};

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: LocationStatus,
}

/// GET /api/v1/locations
pub async fn list_locations(State(state): State<DashboardState>) -> Response {
    match state.locations.list().await {
        Ok(locations) => ApiResponse::ok(locations),
        Err(e) => e.into(),
    }
}

/// POST /api/v1/locations
pub async fn create_location(
    State(state): State<DashboardState>,
    ApiJson(request): ApiJson<NewLocation>,
) -> Response {
    match state.locations.create(request).await {
        Ok(location) => ApiResponse::created(location),
        Err(e) => e.into(),
    }
}

/// GET /api/v1/locations/:id
pub async fn get_location(
    State(state): State<DashboardState>,
    Path(id): Path<String>,
) -> Response {
    match state.locations.get(&id).await {
        Ok(location) => ApiResponse::ok(location),
        Err(e) => e.into(),
    }
}

/// PATCH /api/v1/locations/:id/status
pub async fn update_location_status(
    State(state): State<DashboardState>,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<UpdateStatusRequest>,
) -> Response {
    match state.locations.update_status(&id, request.status).await {
        Ok(location) => ApiResponse::ok(location),
        Err(e) => e.into(),
    }
}

/// DELETE /api/v1/locations/:id
pub async fn delete_location(
    State(state): State<DashboardState>,
    Path(id): Path<String>,
) -> Response {
    match state.locations.delete(&id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into(),
    }
}
