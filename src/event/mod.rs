//! Event model for the streaming hub.
//!
//! Events are immutable records of one occurrence during query processing.
//! They are created by the producer (the query engine), stamped with a
//! monotonic id by the broadcaster, and fanned out to subscribers. The JSON
//! envelope is identical on every transport:
//!
//! ```json
//! {"id": 42, "type": "tool_use", "timestamp": "...", "session_id": "s1",
//!  "severity": "info", "message": "Running grep", "data": {...}}
//! ```

mod history;

pub use history::EventHistory;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Event vocabulary
// ---------------------------------------------------------------------------

/// Fixed vocabulary of event types. Single source of truth for the wire tags;
/// anything outside this set is rejected at the edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    // Query lifecycle
    QueryStart,
    QueryComplete,
    QueryError,
    // Processing
    SessionInit,
    ThinkingStart,
    ThinkingInsight,
    // Tools
    ToolUse,
    ToolResult,
    ToolError,
    // Progress
    TodoIdentified,
    DecisionMade,
    StepProgress,
    // System
    SystemMessage,
    AssistantMessage,
    // Performance
    PerformanceMetric,
    TokenUsage,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::QueryStart => "query_start",
            EventType::QueryComplete => "query_complete",
            EventType::QueryError => "query_error",
            EventType::SessionInit => "session_init",
            EventType::ThinkingStart => "thinking_start",
            EventType::ThinkingInsight => "thinking_insight",
            EventType::ToolUse => "tool_use",
            EventType::ToolResult => "tool_result",
            EventType::ToolError => "tool_error",
            EventType::TodoIdentified => "todo_identified",
            EventType::DecisionMade => "decision_made",
            EventType::StepProgress => "step_progress",
            EventType::SystemMessage => "system_message",
            EventType::AssistantMessage => "assistant_message",
            EventType::PerformanceMetric => "performance_metric",
            EventType::TokenUsage => "token_usage",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = UnknownEventType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "query_start" => Ok(EventType::QueryStart),
            "query_complete" => Ok(EventType::QueryComplete),
            "query_error" => Ok(EventType::QueryError),
            "session_init" => Ok(EventType::SessionInit),
            "thinking_start" => Ok(EventType::ThinkingStart),
            "thinking_insight" => Ok(EventType::ThinkingInsight),
            "tool_use" => Ok(EventType::ToolUse),
            "tool_result" => Ok(EventType::ToolResult),
            "tool_error" => Ok(EventType::ToolError),
            "todo_identified" => Ok(EventType::TodoIdentified),
            "decision_made" => Ok(EventType::DecisionMade),
            "step_progress" => Ok(EventType::StepProgress),
            "system_message" => Ok(EventType::SystemMessage),
            "assistant_message" => Ok(EventType::AssistantMessage),
            "performance_metric" => Ok(EventType::PerformanceMetric),
            "token_usage" => Ok(EventType::TokenUsage),
            other => Err(UnknownEventType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown event type: {0}")]
pub struct UnknownEventType(pub String);

/// Severity levels for events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    Info,
    Success,
    Warning,
    Error,
    Critical,
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// One immutable event. `id` is 0 until the broadcaster assigns the next
/// monotonic id at emit time; after that the record never changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: u64,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub severity: Severity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl Event {
    pub fn new(event_type: EventType, message: impl Into<String>) -> Self {
        Self {
            id: 0,
            event_type,
            timestamp: Utc::now(),
            session_id: None,
            severity: Severity::Info,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}
