//! Bounded history of recently emitted events.

use std::collections::VecDeque;
use std::sync::Mutex;

use super::Event;

/// Fixed-capacity ring of the most recent events, independent of any
/// subscriber. Oldest entries are evicted silently on overflow; there are no
/// targeted deletes.
pub struct EventHistory {
    capacity: usize,
    ring: Mutex<VecDeque<Event>>,
}

impl EventHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            ring: Mutex::new(VecDeque::with_capacity(capacity.max(1))),
        }
    }

    /// Append an event, evicting the oldest entry if the ring is full.
    pub fn push(&self, event: Event) {
        let mut ring = self.ring.lock().expect("history mutex poisoned");
        if ring.len() == self.capacity {
            ring.pop_front();
        }
        ring.push_back(event);
    }

    /// Collect up to `limit` of the most recent events matching `pred`,
    /// returned in chronological (ascending id) order. Total function: an
    /// empty or short history just yields fewer events.
    pub fn query(&self, limit: usize, pred: impl Fn(&Event) -> bool) -> Vec<Event> {
        let ring = self.ring.lock().expect("history mutex poisoned");
        let mut matched: Vec<Event> = ring
            .iter()
            .rev()
            .filter(|e| pred(e))
            .take(limit)
            .cloned()
            .collect();
        matched.reverse();
        matched
    }

    pub fn len(&self) -> usize {
        self.ring.lock().expect("history mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
