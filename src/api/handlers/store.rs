//! Raw store access and WebSocket subscriptions.
//!
//! `GET /store/*path` returns `{path, value, version}`. `PUT` writes the
//! body; with `?expected_version=N` the write only lands if the version is
//! still `N`, otherwise 409. `/subscribe/*path` streams the same snapshot
//! shape as JSON text frames, starting with the current value if any.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::response::Response;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::DashboardState;
use crate::api::envelope::{ApiJson, ApiResponse};
use crate::store::{Snapshot, Subscription};

#[derive(Debug, Default, Deserialize)]
pub struct WriteParams {
    pub expected_version: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct WriteResponse {
    pub path: String,
    pub version: u64,
}

/// GET /api/v1/store/*path
pub async fn read_path(
    State(state): State<DashboardState>,
    Path(path): Path<String>,
) -> Response {
    match state.store.read(&path).await {
        Ok(snapshot) => ApiResponse::ok(snapshot),
        Err(e) => e.into(),
    }
}

/// PUT /api/v1/store/*path
pub async fn write_path(
    State(state): State<DashboardState>,
    Path(path): Path<String>,
    Query(params): Query<WriteParams>,
    ApiJson(value): ApiJson<Value>,
) -> Response {
    let result = match params.expected_version {
        Some(expected) => state.store.compare_and_write(&path, value, expected).await,
        None => state.store.write(&path, value).await,
    };
    match result {
        Ok(version) => ApiResponse::ok(WriteResponse { path, version }),
        Err(e) => e.into(),
    }
}

/// GET /api/v1/subscribe/*path (WebSocket upgrade)
pub async fn subscribe_path(
    State(state): State<DashboardState>,
    Path(path): Path<String>,
    ws: WebSocketUpgrade,
) -> Response {
    let subscription = match state.store.subscribe(&path).await {
        Ok(s) => s,
        Err(e) => return e.into(),
    };
    ws.on_upgrade(move |socket| forward_snapshots(socket, subscription))
}

async fn forward_snapshots(mut socket: WebSocket, mut subscription: Subscription) {
    debug!(path = subscription.path(), "WebSocket subscriber attached");
    loop {
        tokio::select! {
            snapshot = subscription.next() => {
                let Some(snapshot) = snapshot else {
                    debug!(path = subscription.path(), "Store closed, ending subscription");
                    break;
                };
                if !send_snapshot(&mut socket, &snapshot).await {
                    break;
                }
            }
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    debug!(error = %e, "WebSocket receive failed");
                    break;
                }
                Some(Ok(_)) => {}
            }
        }
    }
    subscription.unsubscribe();
}

async fn send_snapshot(socket: &mut WebSocket, snapshot: &Snapshot) -> bool {
    let text = match serde_json::to_string(snapshot) {
        Ok(t) => t,
        Err(e) => {
            warn!(error = %e, "Could not encode snapshot");
            return true;
        }
    };
    socket.send(Message::Text(text)).await.is_ok()
}
