//! HTTP surface of the streaming hub.
//!
//! Three transport adapters (SSE, WebSocket, JSON-Lines) plus the read-only
//! status/recent/clients endpoints, all thin translators over the one
//! `Broadcaster` subscription primitive. Routes live under `/api/v1/stream`.

mod error;
mod ops;
mod stream;

pub use error::{ApiError, Result};

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use axum::routing::{delete, get, post};
use axum::Router;
use serde::Deserialize;

use crate::event::EventType;
use crate::hub::{Broadcaster, EventFilter};

/// Shared state injected into every handler. The broadcaster is constructed
/// once at startup and passed in; handlers never reach for a global.
#[derive(Clone)]
pub struct AppState {
    pub broadcaster: Arc<Broadcaster>,
    /// Idle interval after which streaming adapters send a keepalive.
    pub keepalive: Duration,
}

/// Common filter query parameters, shared by all three streaming endpoints
/// and the recent-events endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct FilterParams {
    /// Comma-separated event type tags.
    pub event_types: Option<String>,
    pub session_id: Option<String>,
    pub include_performance: Option<bool>,
    pub include_system: Option<bool>,
}

impl FilterParams {
    pub fn into_filter(self) -> Result<EventFilter> {
        let event_types = match self.event_types.as_deref() {
            Some(raw) if !raw.trim().is_empty() => {
                let mut types = HashSet::new();
                for tag in raw.split(',') {
                    let event_type: EventType = tag
                        .trim()
                        .parse()
                        .map_err(|e: crate::event::UnknownEventType| {
                            ApiError::BadRequest(e.to_string())
                        })?;
                    types.insert(event_type);
                }
                Some(types)
            }
            _ => None,
        };
        // Explicitly requested types are always delivered: naming a
        // suppressed category in `event_types` opts into it unless the
        // matching toggle is set to false outright.
        let names_type = |t: EventType| {
            event_types
                .as_ref()
                .map(|set| set.contains(&t))
                .unwrap_or(false)
        };
        Ok(EventFilter {
            include_performance: self
                .include_performance
                .unwrap_or_else(|| names_type(EventType::PerformanceMetric)),
            include_system: self.include_system.unwrap_or(true),
            event_types,
            session_id: self.session_id,
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/stream/sse", get(stream::sse_stream))
        .route("/api/v1/stream/ws", get(stream::ws_stream))
        .route("/api/v1/stream/jsonl", get(stream::jsonl_stream))
        .route("/api/v1/stream/status", get(ops::stream_status))
        .route("/api/v1/stream/events/recent", get(ops::recent_events))
        .route("/api/v1/stream/clients", get(ops::list_clients))
        .route(
            "/api/v1/stream/clients/{client_id}",
            delete(ops::disconnect_client),
        )
        .route("/api/v1/stream/test-event", post(ops::test_event))
        .route("/health", get(ops::health))
        .with_state(state)
}
