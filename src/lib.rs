//! Event streaming hub library.
//!
//! A single-process pub/sub engine that accepts one stream of AI query
//! telemetry events and fans them out, with per-consumer filtering and lossy
//! backpressure, to any number of concurrently connected observers over
//! three wire protocols (SSE, WebSocket, JSON-Lines).
//!
//! # Architecture
//!
//! Events flow producer → `Broadcaster::emit` → history append +
//! per-subscription fan-out → transport adapter → wire format → client:
//! - `event`: the immutable event model and the bounded recent-event history
//! - `hub`: subscriptions, filters and the fan-out broadcaster
//! - `api`: axum router with the three transport adapters and the
//!   status/recent/clients endpoints
//! - `config`: environment-driven settings

pub mod api;
pub mod config;
pub mod event;
pub mod hub;

pub use event::{Event, EventType, Severity};
pub use hub::{Broadcaster, EventFilter, StatusSnapshot};
