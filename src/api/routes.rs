//! API route definitions
//!
//! - /api/v1/intersection - signal state, mode, active group
//! - /api/v1/counts - latest counts snapshot
//! - /api/v1/locations - installation locations
//! - /api/v1/system, /api/v1/led, /api/v1/events - system panel
//! - /api/v1/store, /api/v1/subscribe - raw store access
//! - /api/v1/config - active configuration

use axum::routing::{get, patch, post};
use axum::Router;

use super::handlers::{self, DashboardState};

/// Create all API routes for the dashboard
pub fn api_routes(state: DashboardState) -> Router {
    Router::new()
        // Intersection
        .route("/intersection", get(handlers::get_intersection))
        .route("/intersection/state", post(handlers::set_intersection_state))
        .route("/intersection/mode", post(handlers::set_intersection_mode))
        .route("/intersection/group", post(handlers::set_intersection_group))
        .route("/counts", get(handlers::get_counts))
        // Locations
        .route(
            "/locations",
            get(handlers::list_locations).post(handlers::create_location),
        )
        .route(
            "/locations/:id",
            get(handlers::get_location).delete(handlers::delete_location),
        )
        .route("/locations/:id/status", patch(handlers::update_location_status))
        // System panel
        .route("/system", get(handlers::get_system))
        .route("/system/camera", post(handlers::set_camera))
        .route("/system/detector", post(handlers::set_detector))
        .route("/system/emergency", post(handlers::set_emergency))
        .route("/system/reset", post(handlers::reset_system))
        .route("/system/simulation", post(handlers::set_simulation))
        .route("/led", post(handlers::set_led))
        .route("/events", get(handlers::get_events))
        // Raw store
        .route(
            "/store/*path",
            get(handlers::read_path).put(handlers::write_path),
        )
        .route("/subscribe/*path", get(handlers::subscribe_path))
        .route("/config", get(handlers::get_config))
        .with_state(state)
}

/// Health endpoint at root level
pub fn root_routes(state: DashboardState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .with_state(state)
}
