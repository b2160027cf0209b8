//! Per-subscription event filtering.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::event::{Event, EventType};

/// What a single consumer wants to see. A default filter matches everything
/// except performance metrics (opt-in telemetry noise).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventFilter {
    /// Only these event types; `None` or empty means match-all.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_types: Option<HashSet<EventType>>,
    /// Only events correlated to this session. Events carrying no session id
    /// never match a session-scoped filter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub include_performance: bool,
    pub include_system: bool,
}

impl Default for EventFilter {
    fn default() -> Self {
        Self {
            event_types: None,
            session_id: None,
            include_performance: false,
            include_system: true,
        }
    }
}

impl EventFilter {
    /// Conjunction of all four filter clauses.
    pub fn matches(&self, event: &Event) -> bool {
        if let Some(types) = &self.event_types {
            if !types.is_empty() && !types.contains(&event.event_type) {
                return false;
            }
        }
        if let Some(session_id) = &self.session_id {
            match &event.session_id {
                Some(event_session) if event_session == session_id => {}
                _ => return false,
            }
        }
        if !self.include_performance && event.event_type == EventType::PerformanceMetric {
            return false;
        }
        if !self.include_system && event.event_type == EventType::SystemMessage {
            return false;
        }
        true
    }

    /// Replace the type list (WebSocket `subscribe` control frames). Types the
    /// client names explicitly are always delivered, so naming a suppressed
    /// category turns its toggle on.
    pub fn set_event_types(&mut self, types: HashSet<EventType>) {
        if types.contains(&EventType::PerformanceMetric) {
            self.include_performance = true;
        }
        if types.contains(&EventType::SystemMessage) {
            self.include_system = true;
        }
        self.event_types = if types.is_empty() { None } else { Some(types) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;

    fn event(event_type: EventType, session: Option<&str>) -> Event {
        let mut event = Event::new(event_type, "test");
        event.session_id = session.map(str::to_string);
        event
    }

    #[test]
    fn default_filter_matches_everything_but_performance() {
        let filter = EventFilter::default();
        assert!(filter.matches(&event(EventType::ToolUse, None)));
        assert!(filter.matches(&event(EventType::SystemMessage, None)));
        assert!(!filter.matches(&event(EventType::PerformanceMetric, None)));
    }

    #[test]
    fn type_list_restricts_matching() {
        let filter = EventFilter {
            event_types: Some([EventType::ToolUse, EventType::ToolResult].into()),
            ..Default::default()
        };
        assert!(filter.matches(&event(EventType::ToolUse, None)));
        assert!(!filter.matches(&event(EventType::QueryStart, None)));
    }

    #[test]
    fn empty_type_list_means_match_all() {
        let filter = EventFilter {
            event_types: Some(HashSet::new()),
            ..Default::default()
        };
        assert!(filter.matches(&event(EventType::QueryStart, None)));
    }

    #[test]
    fn session_scope_excludes_other_and_missing_sessions() {
        let filter = EventFilter {
            session_id: Some("s1".into()),
            ..Default::default()
        };
        assert!(filter.matches(&event(EventType::ToolUse, Some("s1"))));
        assert!(!filter.matches(&event(EventType::ToolUse, Some("s2"))));
        // No session id on the event: never matches a scoped filter.
        assert!(!filter.matches(&event(EventType::ToolUse, None)));
    }

    #[test]
    fn system_events_can_be_opted_out() {
        let filter = EventFilter {
            include_system: false,
            ..Default::default()
        };
        assert!(!filter.matches(&event(EventType::SystemMessage, None)));
        assert!(filter.matches(&event(EventType::ToolUse, None)));
    }

    #[test]
    fn naming_a_suppressed_type_turns_its_toggle_on() {
        let mut filter = EventFilter::default();
        assert!(!filter.matches(&event(EventType::PerformanceMetric, None)));

        filter.set_event_types([EventType::PerformanceMetric].into());
        assert!(filter.matches(&event(EventType::PerformanceMetric, None)));
        assert!(!filter.matches(&event(EventType::ToolUse, None)));
    }
}
