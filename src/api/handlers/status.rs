//! Health and configuration endpoints.

use axum::extract::State;
use axum::response::Response;
use axum::Json;
use serde::Serialize;

use super::DashboardState;
use crate::api::envelope::ApiResponse;
use crate::pipeline::StatusSummary;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: String,
    pub store_backend: &'static str,
    #[serde(flatten)]
    pub summary: StatusSummary,
}

/// GET /health
pub async fn health_check(State(state): State<DashboardState>) -> Json<HealthResponse> {
    let app_state = state.app_state.read().await;
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION").to_string(),
        store_backend: state.store.backend_name(),
        summary: app_state.status(),
    })
}

/// GET /api/v1/config
pub async fn get_config() -> Response {
    ApiResponse::ok(crate::config::get().clone())
}
