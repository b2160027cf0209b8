//! Fan-out core: the single entry point producers emit into and the single
//! source of truth consumers are served from.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::event::{Event, EventHistory};
use crate::hub::{EventFilter, Subscription, TransportKind};

#[derive(Debug, Error)]
pub enum EmitError {
    #[error("event message must not be empty")]
    EmptyMessage,
}

/// Point-in-time view of broadcaster health. Always computed from live state,
/// never stored.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub active_connections: usize,
    pub events_queued: usize,
    pub total_events_sent: u64,
    pub uptime_seconds: f64,
}

/// Descriptor of one connected client, for the clients endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ClientInfo {
    pub id: Uuid,
    pub transport_kind: TransportKind,
    pub connected_at: DateTime<Utc>,
    pub filter: EventFilter,
    pub dropped_count: u64,
}

/// Pub/sub hub tying the event history and the live subscription set
/// together.
///
/// Constructed exactly once at process start and shared as `Arc<Broadcaster>`
/// with every transport adapter; there is deliberately no global instance.
/// Every emitted event is appended to the history exactly once and offered to
/// every subscription registered at that instant whose filter matches, in one
/// global total order.
pub struct Broadcaster {
    history: EventHistory,
    subscriptions: DashMap<Uuid, Arc<Subscription>>,
    queue_capacity: usize,
    next_id: AtomicU64,
    total_sent: AtomicU64,
    started_at: Instant,
}

impl Broadcaster {
    pub fn new(history_capacity: usize, queue_capacity: usize) -> Self {
        Self {
            history: EventHistory::new(history_capacity),
            subscriptions: DashMap::new(),
            queue_capacity,
            next_id: AtomicU64::new(1),
            total_sent: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    /// Stamp, record and fan out one event.
    ///
    /// Never blocks and never fails because of subscriber state: a full
    /// subscriber queue sheds its oldest entry (visible only in that
    /// subscription's `dropped_count`). Returns the stamped event.
    pub fn emit(&self, mut event: Event) -> Result<Event, EmitError> {
        if event.message.trim().is_empty() {
            return Err(EmitError::EmptyMessage);
        }
        event.id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.history.push(event.clone());

        // Snapshot the registry, then deliver. A subscription registered
        // mid-emit may miss this event; one removed mid-emit may still get it.
        let targets: Vec<Arc<Subscription>> = self
            .subscriptions
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        for sub in targets {
            if sub.wants(&event) && sub.offer(event.clone()) {
                self.total_sent.fetch_add(1, Ordering::Relaxed);
            }
        }
        Ok(event)
    }

    /// Register a new consumer. The subscription is live before this returns,
    /// so no event emitted afterwards can be silently missed. The returned
    /// guard unregisters on drop, covering every adapter exit path.
    pub fn subscribe(
        self: &Arc<Self>,
        filter: EventFilter,
        transport: TransportKind,
    ) -> SubscriptionGuard {
        let sub = Arc::new(Subscription::new(filter, transport, self.queue_capacity));
        self.subscriptions.insert(sub.id, sub.clone());
        tracing::debug!(
            id = %sub.id,
            transport = ?sub.transport,
            total = self.subscriptions.len(),
            "subscription registered"
        );
        SubscriptionGuard {
            sub,
            broadcaster: self.clone(),
        }
    }

    /// Remove and close a subscription. Idempotent: unknown ids are a no-op.
    pub fn unregister(&self, id: Uuid) {
        self.disconnect(id);
    }

    /// Remove and close a subscription, reporting whether the id was live.
    /// Closing wakes the connection's delivery loop so it winds down within
    /// one iteration.
    pub fn disconnect(&self, id: Uuid) -> bool {
        match self.subscriptions.remove(&id) {
            Some((_, sub)) => {
                sub.close();
                tracing::debug!(id = %id, total = self.subscriptions.len(), "subscription removed");
                true
            }
            None => false,
        }
    }

    /// Up to `count` of the most recent events matching `filter`, oldest
    /// first. Reads history only; live subscriptions are not involved.
    pub fn get_recent(&self, count: usize, filter: &EventFilter) -> Vec<Event> {
        self.history.query(count, |event| filter.matches(event))
    }

    pub fn status(&self) -> StatusSnapshot {
        let events_queued = self
            .subscriptions
            .iter()
            .map(|entry| entry.value().queue_len())
            .sum();
        StatusSnapshot {
            active_connections: self.subscriptions.len(),
            events_queued,
            total_events_sent: self.total_sent.load(Ordering::Relaxed),
            uptime_seconds: self.started_at.elapsed().as_secs_f64(),
        }
    }

    pub fn clients(&self) -> Vec<ClientInfo> {
        self.subscriptions
            .iter()
            .map(|entry| {
                let sub = entry.value();
                ClientInfo {
                    id: sub.id,
                    transport_kind: sub.transport,
                    connected_at: sub.connected_at,
                    filter: sub.filter(),
                    dropped_count: sub.dropped_count(),
                }
            })
            .collect()
    }

    pub fn connection_count(&self, transport: TransportKind) -> usize {
        self.subscriptions
            .iter()
            .filter(|entry| entry.value().transport == transport)
            .count()
    }
}

/// Scoped handle to a registered subscription. Dropping it unregisters, so
/// normal close, error and timeout paths all release the registry entry.
pub struct SubscriptionGuard {
    sub: Arc<Subscription>,
    broadcaster: Arc<Broadcaster>,
}

impl SubscriptionGuard {
    pub fn subscription(&self) -> &Arc<Subscription> {
        &self.sub
    }
}

impl std::ops::Deref for SubscriptionGuard {
    type Target = Subscription;

    fn deref(&self) -> &Self::Target {
        &self.sub
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.broadcaster.unregister(self.sub.id);
    }
}
