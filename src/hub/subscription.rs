//! Per-consumer subscription state: filter, bounded delivery queue, drop
//! accounting.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use uuid::Uuid;

use crate::event::Event;
use crate::hub::EventFilter;

/// Which wire protocol a subscription is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    Sse,
    Websocket,
    Jsonl,
}

/// One registered consumer. The filter is the only mutable field besides the
/// queue itself; WebSocket control frames may replace it mid-connection.
///
/// The queue is a bounded FIFO with a drop-oldest overflow policy: a slow
/// consumer loses its stalest events and never stalls the producer or any
/// sibling subscription.
pub struct Subscription {
    pub id: Uuid,
    pub transport: TransportKind,
    pub connected_at: DateTime<Utc>,
    filter: RwLock<EventFilter>,
    queue: Mutex<VecDeque<Event>>,
    capacity: usize,
    notify: Notify,
    dropped: AtomicU64,
    closed: AtomicBool,
}

impl Subscription {
    pub(crate) fn new(filter: EventFilter, transport: TransportKind, capacity: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            transport,
            connected_at: Utc::now(),
            filter: RwLock::new(filter),
            queue: Mutex::new(VecDeque::with_capacity(capacity.max(1))),
            capacity: capacity.max(1),
            notify: Notify::new(),
            dropped: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Whether this subscription wants `event` under its current filter.
    pub fn wants(&self, event: &Event) -> bool {
        self.filter.read().expect("filter lock poisoned").matches(event)
    }

    pub fn filter(&self) -> EventFilter {
        self.filter.read().expect("filter lock poisoned").clone()
    }

    /// Replace the event-type list of this subscription's filter. Only touches
    /// this one subscription; the broadcaster's hot path is not involved.
    pub fn update_event_types(&self, types: std::collections::HashSet<crate::event::EventType>) {
        self.filter
            .write()
            .expect("filter lock poisoned")
            .set_event_types(types);
    }

    /// Non-blocking enqueue. When the queue is full the oldest queued event is
    /// dropped to admit the new one. Returns false only if the subscription is
    /// already closed.
    pub(crate) fn offer(&self, event: Event) -> bool {
        {
            let mut queue = self.queue.lock().expect("queue mutex poisoned");
            // Checked under the queue lock: once close() has released the
            // lock, no offer can slip another event in.
            if self.closed.load(Ordering::Acquire) {
                return false;
            }
            if queue.len() == self.capacity {
                queue.pop_front();
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
            queue.push_back(event);
        }
        self.notify.notify_one();
        true
    }

    /// Next event in emission order. Suspends while the queue is empty;
    /// resolves to `None` once the subscription is closed and drained.
    pub async fn recv(&self) -> Option<Event> {
        loop {
            if let Some(event) = self.try_recv() {
                return Some(event);
            }
            if self.closed.load(Ordering::Acquire) {
                return None;
            }
            self.notify.notified().await;
        }
    }

    pub fn try_recv(&self) -> Option<Event> {
        self.queue.lock().expect("queue mutex poisoned").pop_front()
    }

    /// Mark closed and wake the delivery loop so it exits within one
    /// iteration. The flag is set under the queue lock, so by the time this
    /// returns the queue contents are final.
    pub(crate) fn close(&self) {
        {
            let _queue = self.queue.lock().expect("queue mutex poisoned");
            self.closed.store(true, Ordering::Release);
        }
        self.notify.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn queue_len(&self) -> usize {
        self.queue.lock().expect("queue mutex poisoned").len()
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
