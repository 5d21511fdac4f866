//! API Regression Tests
//!
//! In-process tests that build the Axum app via `create_app()` and exercise
//! the /api/v1/* endpoints using `tower::ServiceExt::oneshot()`.
//! No binary spawn, no network port.

use signal_board::api::{create_app, DashboardState};
use signal_board::config::{self, BoardConfig};

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

fn ensure_config() {
    if !config::is_initialized() {
        config::init(BoardConfig::default());
    }
}

fn create_test_state() -> DashboardState {
    ensure_config();
    DashboardState::in_memory()
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(v) => builder
            .header("content-type", "application/json")
            .body(Body::from(v.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let resp = app.clone().oneshot(request).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

/// All GET endpoints that need no prior data should return 200.
#[tokio::test]
async fn test_v1_get_endpoints_return_200() {
    let app = create_app(create_test_state());
    let endpoints = [
        "/health",
        "/api/v1/intersection",
        "/api/v1/locations",
        "/api/v1/system",
        "/api/v1/events",
        "/api/v1/config",
        "/api/v1/store/traffic",
    ];

    for endpoint in &endpoints {
        let (status, _) = send(&app, Method::GET, endpoint, None).await;
        assert!(status.is_success(), "GET {endpoint} returned status {status}");
    }
}

#[tokio::test]
async fn test_unknown_route_404() {
    let app = create_app(create_test_state());
    let (status, _) = send(&app, Method::GET, "/api/v1/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_manual_state_change_is_published() {
    let app = create_app(create_test_state());

    let (status, body) = send(&app, Method::POST, "/api/v1/intersection/mode", Some(json!({"mode": "manual"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["mode"], "manual");

    let (status, body) = send(&app, Method::POST, "/api/v1/intersection/state", Some(json!({"state": "green"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["state"], "green");

    let (_, body) = send(&app, Method::GET, "/api/v1/store/state", None).await;
    assert_eq!(body["data"]["value"], "green");

    let (_, body) = send(&app, Method::GET, "/api/v1/store/trafficLight/status", None).await;
    assert_eq!(body["data"]["value"]["currentLight"], "green");
    assert_eq!(body["data"]["value"]["mode"], "manual");
}

#[tokio::test]
async fn test_emergency_via_mode_endpoint_rejected() {
    let app = create_app(create_test_state());
    let (status, body) = send(&app, Method::POST, "/api/v1/intersection/mode", Some(json!({"mode": "emergency"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_invalid_signal_state_rejected() {
    let app = create_app(create_test_state());
    let (status, body) = send(&app, Method::POST, "/api/v1/intersection/state", Some(json!({"state": "purple"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
    assert!(body["meta"]["timestamp"].is_string());
}

#[tokio::test]
async fn test_malformed_body_gets_error_envelope() {
    let app = create_app(create_test_state());
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/led")
        .header("content-type", "application/json")
        .body(Body::from("{\"on\": tru"))
        .unwrap();
    let resp = app.oneshot(request).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_detector_toggles_without_body() {
    let app = create_app(create_test_state());
    let (status, body) = send(&app, Method::POST, "/api/v1/system/detector", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["yolo"], "online");

    let (_, body) = send(&app, Method::POST, "/api/v1/system/detector", None).await;
    assert_eq!(body["data"]["yolo"], "offline");
}

#[tokio::test]
async fn test_location_crud() {
    let app = create_app(create_test_state());

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/locations",
        Some(json!({
            "name": "Cairo Road Junction",
            "address": "10 Cairo Rd, Lusaka",
            "coordinates": {"latitude": -15.41, "longitude": 28.28},
            "installationDate": "2024-03-01",
            "description": "Test junction"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["status"], "operational");

    let (status, body) = send(
        &app,
        Method::PATCH,
        &format!("/api/v1/locations/{id}/status"),
        Some(json!({"status": "maintenance"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "maintenance");

    let (_, body) = send(&app, Method::GET, "/api/v1/locations", None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, _) = send(&app, Method::DELETE, &format!("/api/v1/locations/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, Method::GET, &format!("/api/v1/locations/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_location_missing_name_rejected() {
    let app = create_app(create_test_state());
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/locations",
        Some(json!({"name": "", "address": "somewhere"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["message"].as_str().unwrap().contains("name"));
}

#[tokio::test]
async fn test_system_panel_flow() {
    let app = create_app(create_test_state());

    let (_, body) = send(&app, Method::POST, "/api/v1/system/camera", None).await;
    assert_eq!(body["data"]["camera"], "online");

    let (_, body) = send(&app, Method::POST, "/api/v1/system/emergency", None).await;
    assert_eq!(body["data"]["mode"], "emergency");

    let (_, body) = send(&app, Method::GET, "/api/v1/intersection", None).await;
    assert_eq!(body["data"]["state"], "all_red");

    let (_, body) = send(&app, Method::POST, "/api/v1/system/reset", None).await;
    assert_eq!(body["data"]["camera"], "offline");
    assert_eq!(body["data"]["mode"], "automatic");

    let (_, body) = send(&app, Method::GET, "/api/v1/events", None).await;
    let messages: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["message"].as_str().unwrap())
        .collect();
    assert_eq!(
        messages,
        vec!["Camera activated", "Emergency mode activated", "System reset to default state"]
    );
}

#[tokio::test]
async fn test_led_written_to_store() {
    let app = create_app(create_test_state());
    let (status, _) = send(&app, Method::POST, "/api/v1/led", Some(json!({"on": true}))).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, Method::GET, "/api/v1/store/led", None).await;
    assert_eq!(body["data"]["value"], true);
}

#[tokio::test]
async fn test_store_compare_and_write_conflict() {
    let app = create_app(create_test_state());

    let (status, body) = send(&app, Method::PUT, "/api/v1/store/demo/value", Some(json!(1))).await;
    assert_eq!(status, StatusCode::OK);
    let version = body["data"]["version"].as_u64().unwrap();

    let uri = format!("/api/v1/store/demo/value?expected_version={version}");
    let (status, _) = send(&app, Method::PUT, &uri, Some(json!(2))).await;
    assert_eq!(status, StatusCode::OK);

    // Same expected version again is now stale.
    let (status, body) = send(&app, Method::PUT, &uri, Some(json!(3))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");

    let (_, body) = send(&app, Method::GET, "/api/v1/store/demo", None).await;
    assert_eq!(body["data"]["value"], json!({"value": 2}));
}

#[tokio::test]
async fn test_store_invalid_path_rejected() {
    let app = create_app(create_test_state());
    let (status, _) = send(&app, Method::PUT, "/api/v1/store/bad.key", Some(json!(1))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
