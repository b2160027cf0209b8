//! Transport adapters: SSE, WebSocket and JSON-Lines.
//!
//! Each adapter registers a subscription *before* the client can observe
//! "connected", then translates the subscription's queue into its wire
//! format. The subscription guard travels with the response stream (or the
//! socket task), so every exit path — normal close, write failure, timeout,
//! abort — unregisters via `Drop`.

use std::convert::Infallible;

use axum::body::Body;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use futures::stream::{self, Stream, StreamExt};
use futures::SinkExt;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;

use crate::api::{AppState, FilterParams, Result};
use crate::event::{Event, EventType};
use crate::hub::{EventFilter, SubscriptionGuard, TransportKind};

// ---------------------------------------------------------------------------
// SSE
// ---------------------------------------------------------------------------

/// `GET /api/v1/stream/sse` — server-push stream of named event records.
pub async fn sse_stream(
    State(state): State<AppState>,
    Query(params): Query<FilterParams>,
) -> Result<impl IntoResponse> {
    let filter = params.into_filter()?;
    let guard = state.broadcaster.subscribe(filter, TransportKind::Sse);
    let client_id = guard.id;
    tracing::info!(%client_id, "sse client connected");

    let connected = SseEvent::default()
        .event("connection")
        .data(json!({ "status": "connected", "client_id": client_id }).to_string());

    let events = stream::once(async move { Ok::<_, Infallible>(connected) })
        .chain(subscription_stream(guard).map(|event| {
            let record = SseEvent::default()
                .id(event.id.to_string())
                .event(event.event_type.as_str())
                .data(envelope(&event));
            Ok::<_, Infallible>(record)
        }));

    Ok(Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(state.keepalive)
            .text("keep-alive"),
    ))
}

// ---------------------------------------------------------------------------
// JSON-Lines
// ---------------------------------------------------------------------------

/// `GET /api/v1/stream/jsonl` — one compact JSON object per line, for
/// programmatic consumers. Emits a heartbeat line when idle so proxies keep
/// the connection open.
pub async fn jsonl_stream(
    State(state): State<AppState>,
    Query(params): Query<FilterParams>,
) -> Result<Response> {
    let filter = params.into_filter()?;
    let guard = state.broadcaster.subscribe(filter, TransportKind::Jsonl);
    let client_id = guard.id;
    let keepalive = state.keepalive;
    tracing::info!(%client_id, "jsonl client connected");

    let first = format!(
        "{}\n",
        json!({ "type": "connection", "status": "connected", "client_id": client_id })
    );
    let lines = stream::once(async move { Ok::<_, Infallible>(first) }).chain(stream::unfold(
        guard,
        move |guard| async move {
            match tokio::time::timeout(keepalive, guard.recv()).await {
                Ok(Some(event)) => {
                    let line = format!("{}\n", envelope(&event));
                    Some((Ok::<_, Infallible>(line), guard))
                }
                // Subscription closed: end of stream, guard drops here.
                Ok(None) => None,
                Err(_idle) => {
                    let line = format!(
                        "{}\n",
                        json!({ "type": "heartbeat", "timestamp": Utc::now().to_rfc3339() })
                    );
                    Some((Ok(line), guard))
                }
            }
        },
    ));

    Ok((
        [
            ("content-type", "application/x-ndjson"),
            ("cache-control", "no-cache"),
            ("x-accel-buffering", "no"),
        ],
        Body::from_stream(lines),
    )
        .into_response())
}

// ---------------------------------------------------------------------------
// WebSocket
// ---------------------------------------------------------------------------

/// Client control frames. Anything that fails to parse is logged and ignored,
/// keeping the connection open.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum ControlFrame {
    Subscribe { event_types: Vec<EventType> },
    Ping,
    GetRecent {
        #[serde(default = "default_recent_count")]
        count: usize,
    },
}

fn default_recent_count() -> usize {
    10
}

/// `GET /api/v1/stream/ws` — duplex stream. The server pushes the same JSON
/// envelope as SSE; the client may send `subscribe`, `ping` and `get_recent`
/// control frames.
pub async fn ws_stream(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<FilterParams>,
) -> Result<Response> {
    let filter = params.into_filter()?;
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, filter)))
}

async fn handle_socket(socket: WebSocket, state: AppState, filter: EventFilter) {
    let guard = state
        .broadcaster
        .subscribe(filter, TransportKind::Websocket);
    let client_id = guard.id;
    tracing::info!(%client_id, "websocket client connected");

    let (mut sink, mut source) = socket.split();

    let hello = json!({
        "type": "connection",
        "status": "connected",
        "client_id": client_id,
        "subscription": guard.filter(),
    });
    if sink.send(Message::Text(hello.to_string().into())).await.is_err() {
        return;
    }

    // Control-frame replies share the outbound half with event delivery, so
    // one write task owns the sink and selects between the two sources.
    let (reply_tx, mut reply_rx) = mpsc::channel::<String>(16);

    let sub = guard.subscription().clone();
    let mut write_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                queued = sub.recv() => match queued {
                    Some(event) => {
                        if sink.send(Message::Text(envelope(&event).into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                },
                reply = reply_rx.recv() => match reply {
                    Some(frame) => {
                        if sink.send(Message::Text(frame.into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                },
            }
        }
    });

    let sub = guard.subscription().clone();
    let broadcaster = state.broadcaster.clone();
    let mut read_task = tokio::spawn(async move {
        while let Some(Ok(message)) = source.next().await {
            let text = match message {
                Message::Text(text) => text,
                Message::Close(_) => break,
                _ => continue,
            };
            let Some(reply) = handle_control_frame(text.as_str(), &sub, &broadcaster) else {
                continue;
            };
            if reply_tx.send(reply).await.is_err() {
                break;
            }
        }
    });

    // Either half ending (close, error, write failure) cancels the other.
    tokio::select! {
        _ = &mut write_task => read_task.abort(),
        _ = &mut read_task => write_task.abort(),
    }

    tracing::info!(%client_id, "websocket client disconnected");
    drop(guard);
}

/// Process one inbound text frame. Malformed frames (bad JSON, unknown
/// action, invalid event type names) are logged and ignored; the connection
/// stays open. Returns the reply to push back, if any.
fn handle_control_frame(
    raw: &str,
    sub: &crate::hub::Subscription,
    broadcaster: &crate::hub::Broadcaster,
) -> Option<String> {
    let frame = match serde_json::from_str::<ControlFrame>(raw) {
        Ok(frame) => frame,
        Err(error) => {
            tracing::warn!(client_id = %sub.id, %error, "ignoring malformed control frame");
            return None;
        }
    };
    let reply = match frame {
        ControlFrame::Ping => json!({ "type": "pong" }).to_string(),
        ControlFrame::Subscribe { event_types } => {
            sub.update_event_types(event_types.iter().copied().collect());
            json!({
                "type": "subscription_updated",
                "event_types": event_types,
            })
            .to_string()
        }
        ControlFrame::GetRecent { count } => {
            let events = broadcaster.get_recent(count.clamp(1, 1000), &sub.filter());
            json!({ "type": "recent_events", "events": events }).to_string()
        }
    };
    Some(reply)
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// The JSON event envelope, identical across all transports.
fn envelope(event: &Event) -> String {
    serde_json::to_string(event).unwrap_or_else(|error| {
        tracing::warn!(%error, id = event.id, "failed to serialize event");
        json!({ "id": event.id, "error": "serialization failed" }).to_string()
    })
}

/// Adapt a subscription guard into a stream of events. The guard lives inside
/// the stream state, so dropping the stream (client gone, server shutdown)
/// unregisters the subscription.
fn subscription_stream(guard: SubscriptionGuard) -> impl Stream<Item = Event> {
    stream::unfold(guard, |guard| async move {
        guard.recv().await.map(|event| (event, guard))
    })
}
