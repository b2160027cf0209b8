//! Integration tests for the HTTP surface.
//!
//! Exercises the router with `tower::ServiceExt::oneshot`: status math,
//! recent-event queries, client listing, admin disconnect and the test-event
//! producer hook.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use eventstream::api::{build_router, AppState};
use eventstream::hub::Broadcaster;
use eventstream::{Event, EventFilter, EventType};

fn test_state() -> (Arc<Broadcaster>, AppState) {
    let broadcaster = Arc::new(Broadcaster::new(100, 10));
    let state = AppState {
        broadcaster: broadcaster.clone(),
        keepalive: Duration::from_secs(15),
    };
    (broadcaster, state)
}

fn test_app() -> (Arc<Broadcaster>, Router) {
    let (broadcaster, state) = test_state();
    (broadcaster, build_router(state))
}

fn request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_endpoint_responds() {
    let (_, app) = test_app();
    let response = app
        .oneshot(request(Method::GET, "/health"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "ok");
}

#[tokio::test]
async fn status_reports_queue_depth_and_sent_total() {
    let (broadcaster, app) = test_app();

    // Two connected, unconsumed subscriptions with default filters.
    let _a = broadcaster.subscribe(EventFilter::default(), eventstream::hub::TransportKind::Sse);
    let _b = broadcaster.subscribe(
        EventFilter::default(),
        eventstream::hub::TransportKind::Jsonl,
    );
    for n in 0..5 {
        broadcaster
            .emit(Event::new(EventType::ToolUse, format!("tool {n}")))
            .unwrap();
    }

    let response = app
        .oneshot(request(Method::GET, "/api/v1/stream/status"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let status = json_body(response).await;
    assert_eq!(status["active_connections"], 2);
    assert_eq!(status["events_queued"], 10);
    assert_eq!(status["total_events_sent"], 10);
    assert!(status["uptime_seconds"].as_f64().unwrap() >= 0.0);
}

#[tokio::test]
async fn recent_events_filters_and_orders() {
    let (broadcaster, app) = test_app();
    broadcaster
        .emit(Event::new(EventType::ToolUse, "grep").with_session("s1"))
        .unwrap();
    broadcaster
        .emit(Event::new(EventType::QueryComplete, "done").with_session("s1"))
        .unwrap();
    broadcaster
        .emit(Event::new(EventType::ToolUse, "other").with_session("s2"))
        .unwrap();

    let response = app
        .clone()
        .oneshot(request(
            Method::GET,
            "/api/v1/stream/events/recent?count=10&session_id=s1",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let events = json_body(response).await;
    let events = events.as_array().unwrap();
    assert_eq!(events.len(), 2);
    assert!(events[0]["id"].as_u64().unwrap() < events[1]["id"].as_u64().unwrap());
    assert_eq!(events[0]["type"], "tool_use");
    assert_eq!(events[1]["type"], "query_complete");

    let response = app
        .clone()
        .oneshot(request(
            Method::GET,
            "/api/v1/stream/events/recent?event_types=query_complete",
        ))
        .await
        .unwrap();
    let events = json_body(response).await;
    assert_eq!(events.as_array().unwrap().len(), 1);

    // Unknown event type names are rejected, not silently ignored.
    let response = app
        .oneshot(request(
            Method::GET,
            "/api/v1/stream/events/recent?event_types=bogus",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn recent_events_is_total_on_empty_history() {
    let (_, app) = test_app();
    let response = app
        .oneshot(request(Method::GET, "/api/v1/stream/events/recent?count=50"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(json_body(response).await.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn clients_endpoint_lists_live_subscriptions() {
    let (broadcaster, app) = test_app();
    let guard = broadcaster.subscribe(
        EventFilter {
            session_id: Some("s1".into()),
            ..Default::default()
        },
        eventstream::hub::TransportKind::Sse,
    );

    let response = app
        .oneshot(request(Method::GET, "/api/v1/stream/clients"))
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["active_clients"], 1);
    assert_eq!(body["websocket_connections"], 0);
    let client = &body["clients"][0];
    assert_eq!(client["id"], guard.id.to_string());
    assert_eq!(client["transport_kind"], "sse");
    assert_eq!(client["filter"]["session_id"], "s1");
}

#[tokio::test]
async fn disconnect_removes_client_and_404s_on_unknown_id() {
    let (broadcaster, app) = test_app();
    let guard = broadcaster.subscribe(
        EventFilter::default(),
        eventstream::hub::TransportKind::Jsonl,
    );
    let id = guard.id;

    let response = app
        .clone()
        .oneshot(request(
            Method::DELETE,
            &format!("/api/v1/stream/clients/{id}"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(broadcaster.status().active_connections, 0);

    let response = app
        .oneshot(request(
            Method::DELETE,
            &format!("/api/v1/stream/clients/{}", uuid::Uuid::new_v4()),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_event_endpoint_emits_into_history() {
    let (broadcaster, app) = test_app();

    let response = app
        .clone()
        .oneshot(request(
            Method::POST,
            "/api/v1/stream/test-event?message=hello&event_type=tool_use&session_id=s9",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "sent");
    assert_eq!(body["event_id"], 1);

    let recent = broadcaster.get_recent(10, &EventFilter::default());
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].event_type, EventType::ToolUse);
    assert_eq!(recent[0].session_id.as_deref(), Some("s9"));
}

#[tokio::test]
async fn test_event_requires_a_message() {
    let (_, app) = test_app();
    let response = app
        .oneshot(request(
            Method::POST,
            "/api/v1/stream/test-event?message=%20%20",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn streaming_endpoints_negotiate_their_content_types() {
    let (_, app) = test_app();

    let response = app
        .clone()
        .oneshot(request(Method::GET, "/api/v1/stream/sse"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.starts_with("text/event-stream"));

    let response = app
        .clone()
        .oneshot(request(Method::GET, "/api/v1/stream/jsonl"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.starts_with("application/x-ndjson"));

    // Bad filter params are rejected before any subscription is registered.
    let response = app
        .oneshot(request(Method::GET, "/api/v1/stream/sse?event_types=nope"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
