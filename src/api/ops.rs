//! Read-only monitoring endpoints plus the admin disconnect and the
//! test-event producer hook.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::{ApiError, AppState, FilterParams, Result};
use crate::event::{Event, EventType, Severity};
use crate::hub::{StatusSnapshot, TransportKind};

const MAX_RECENT: usize = 1000;
const DEFAULT_RECENT: usize = 100;

/// `GET /health`
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// `GET /api/v1/stream/status` — derived snapshot of broadcaster health.
pub async fn stream_status(State(state): State<AppState>) -> Json<StatusSnapshot> {
    Json(state.broadcaster.status())
}

// Filter fields are spelled out instead of flattening `FilterParams`:
// serde's flatten buffers query values as strings and then refuses to parse
// `count` as an integer.
#[derive(Debug, Deserialize)]
pub struct RecentParams {
    pub count: Option<usize>,
    pub event_types: Option<String>,
    pub session_id: Option<String>,
    pub include_performance: Option<bool>,
    pub include_system: Option<bool>,
}

/// `GET /api/v1/stream/events/recent` — up to `count` most recent matching
/// events, oldest first.
pub async fn recent_events(
    State(state): State<AppState>,
    Query(params): Query<RecentParams>,
) -> Result<Json<Vec<Event>>> {
    let count = params.count.unwrap_or(DEFAULT_RECENT).clamp(1, MAX_RECENT);
    let filter = FilterParams {
        event_types: params.event_types,
        session_id: params.session_id,
        include_performance: params.include_performance,
        include_system: params.include_system,
    }
    .into_filter()?;
    Ok(Json(state.broadcaster.get_recent(count, &filter)))
}

/// `GET /api/v1/stream/clients` — descriptors of every live subscription.
pub async fn list_clients(State(state): State<AppState>) -> Json<Value> {
    let clients = state.broadcaster.clients();
    Json(json!({
        "active_clients": clients.len(),
        "websocket_connections": state.broadcaster.connection_count(TransportKind::Websocket),
        "clients": clients,
    }))
}

/// `DELETE /api/v1/stream/clients/{client_id}` — administratively disconnect
/// one client.
pub async fn disconnect_client(
    State(state): State<AppState>,
    Path(client_id): Path<Uuid>,
) -> Result<Json<Value>> {
    if !state.broadcaster.disconnect(client_id) {
        return Err(ApiError::NotFound(format!("client {client_id}")));
    }
    Ok(Json(json!({ "status": "disconnected", "client_id": client_id })))
}

#[derive(Debug, Deserialize)]
pub struct TestEventParams {
    pub message: String,
    pub event_type: Option<EventType>,
    pub session_id: Option<String>,
    pub severity: Option<Severity>,
}

/// `POST /api/v1/stream/test-event` — emit a synthetic event, for exercising
/// client connections and filters.
pub async fn test_event(
    State(state): State<AppState>,
    Query(params): Query<TestEventParams>,
) -> Result<Json<Value>> {
    let mut event = Event::new(
        params.event_type.unwrap_or(EventType::SystemMessage),
        params.message,
    )
    .with_data(json!({ "test": true, "source": "test-event endpoint" }));
    if let Some(session_id) = params.session_id {
        event = event.with_session(session_id);
    }
    if let Some(severity) = params.severity {
        event = event.with_severity(severity);
    }

    let event = state.broadcaster.emit(event)?;
    Ok(Json(json!({
        "status": "sent",
        "event_id": event.id,
        "active_clients": state.broadcaster.status().active_connections,
    })))
}
