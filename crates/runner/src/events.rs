//! Inbound webhook payloads and event normalization.
//!
//! The platform's event stream is weakly typed: a string tag plus an
//! arbitrary data bag, delivered at-least-once and in no guaranteed
//! order. Normalization maps each event onto a human-readable activity
//! message through a fixed table, keeping unknown tags as a catch-all
//! variant instead of dropping them.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crewdeck_core::activity::ActivityKind;

// ---------------------------------------------------------------------------
// Webhook payloads
// ---------------------------------------------------------------------------

/// A HITL checkpoint notification from the platform.
///
/// Sent when the crew pauses on a task that requires human input. The
/// crew stays paused until our resume call.
#[derive(Debug, Clone, Deserialize)]
pub struct HitlNotification {
    /// The platform's execution id (`kickoff_id` from kickoff).
    pub execution_id: String,
    /// Task identifier from the crew definition.
    pub task_id: String,
    /// The content that needs human review.
    pub task_output: String,
    /// Agent that produced the output, when the platform includes it.
    pub agent_name: Option<String>,
    /// When the checkpoint was reached.
    pub timestamp: Option<DateTime<Utc>>,
}

/// One event from the platform's event stream.
#[derive(Debug, Clone, Deserialize)]
pub struct CrewEvent {
    /// Unique event identifier; the idempotency key.
    pub id: String,
    /// The platform's execution id this event belongs to.
    pub execution_id: String,
    /// When the event occurred. Delivery order is not guaranteed;
    /// batches are sorted on this field before processing.
    pub timestamp: DateTime<Utc>,
    /// Event type tag (e.g. `task_started`).
    #[serde(rename = "type")]
    pub event_type: String,
    /// Event-specific data; structure varies by type.
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Batch payload for the event-stream webhook.
#[derive(Debug, Clone, Deserialize)]
pub struct EventBatch {
    pub events: Vec<CrewEvent>,
}

/// Sort events by their embedded timestamps to approximate
/// chronological order across an unordered delivery.
pub fn sort_by_timestamp(events: &mut [CrewEvent]) {
    events.sort_by_key(|e| e.timestamp);
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// The known event-type table, plus a catch-all for anything new the
/// platform starts sending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventTag {
    TaskStarted,
    TaskCompleted,
    TaskFailed,
    AgentExecutionStarted,
    AgentExecutionCompleted,
    LlmCallStarted,
    LlmCallCompleted,
    ToolUsageStarted,
    ToolUsageFinished,
    CrewKickoffStarted,
    CrewKickoffCompleted,
    CrewKickoffFailed,
    Unknown,
}

impl EventTag {
    /// Classify a raw type tag.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "task_started" => EventTag::TaskStarted,
            "task_completed" => EventTag::TaskCompleted,
            "task_failed" => EventTag::TaskFailed,
            "agent_execution_started" => EventTag::AgentExecutionStarted,
            "agent_execution_completed" => EventTag::AgentExecutionCompleted,
            "llm_call_started" => EventTag::LlmCallStarted,
            "llm_call_completed" => EventTag::LlmCallCompleted,
            "tool_usage_started" => EventTag::ToolUsageStarted,
            "tool_usage_finished" => EventTag::ToolUsageFinished,
            "crew_kickoff_started" => EventTag::CrewKickoffStarted,
            "crew_kickoff_completed" => EventTag::CrewKickoffCompleted,
            "crew_kickoff_failed" => EventTag::CrewKickoffFailed,
            _ => EventTag::Unknown,
        }
    }
}

/// The canonical activity derived from one raw event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedEvent {
    pub actor_name: String,
    pub kind: ActivityKind,
    pub message: String,
}

/// Fields checked, in priority order, when extracting the actor name
/// from an event's data bag.
const ACTOR_NAME_FIELDS: &[&str] = &["agent_name", "agent", "actor"];

/// Extract the acting agent's name from an event data bag.
pub fn extract_actor_name(data: &serde_json::Value) -> String {
    ACTOR_NAME_FIELDS
        .iter()
        .find_map(|field| data.get(field).and_then(|v| v.as_str()))
        .unwrap_or("System")
        .to_string()
}

/// Map a raw event onto a human-readable message and activity kind.
pub fn normalize_event(event: &CrewEvent) -> NormalizedEvent {
    let data = &event.data;
    let str_field = |key: &str| data.get(key).and_then(|v| v.as_str());
    let task_name = || {
        str_field("task_name")
            .or_else(|| str_field("task_id"))
            .unwrap_or("unknown")
            .to_string()
    };
    let agent_name = || str_field("agent_name").unwrap_or("Agent").to_string();
    let model = || str_field("model").unwrap_or("AI model").to_string();
    let tool_name = || str_field("tool_name").unwrap_or("tool").to_string();
    let error = || str_field("error").unwrap_or("Unknown error").to_string();

    let (message, kind) = match EventTag::from_tag(&event.event_type) {
        EventTag::TaskStarted => (
            format!("Started task: {}", task_name()),
            ActivityKind::TaskStart,
        ),
        EventTag::TaskCompleted => (
            format!("Completed task: {}", task_name()),
            ActivityKind::TaskComplete,
        ),
        EventTag::TaskFailed => (
            format!("Task failed: {} - {}", task_name(), error()),
            ActivityKind::Error,
        ),
        EventTag::AgentExecutionStarted => (
            format!("{} started working", agent_name()),
            ActivityKind::AgentThinking,
        ),
        EventTag::AgentExecutionCompleted => (
            format!("{} finished", agent_name()),
            ActivityKind::AgentThinking,
        ),
        EventTag::LlmCallStarted => (format!("Calling {}", model()), ActivityKind::LlmCall),
        EventTag::LlmCallCompleted => (format!("{} responded", model()), ActivityKind::LlmCall),
        EventTag::ToolUsageStarted => (
            format!("Using tool: {}", tool_name()),
            ActivityKind::ToolUsage,
        ),
        EventTag::ToolUsageFinished => (
            format!("Finished using: {}", tool_name()),
            ActivityKind::ToolUsage,
        ),
        EventTag::CrewKickoffStarted => (
            "Crew execution started".to_string(),
            ActivityKind::CrewKickoff,
        ),
        EventTag::CrewKickoffCompleted => (
            "Crew execution completed".to_string(),
            ActivityKind::Message,
        ),
        EventTag::CrewKickoffFailed => (
            format!("Crew execution failed: {}", error()),
            ActivityKind::Error,
        ),
        EventTag::Unknown => (
            format!("Event: {}", event.event_type),
            ActivityKind::Message,
        ),
    };

    NormalizedEvent {
        actor_name: extract_actor_name(data),
        kind,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(event_type: &str, data: serde_json::Value) -> CrewEvent {
        CrewEvent {
            id: "evt-1".to_string(),
            execution_id: "run-1".to_string(),
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            data,
        }
    }

    #[test]
    fn task_events_use_task_name_with_task_id_fallback() {
        let normalized = normalize_event(&event(
            "task_started",
            json!({ "task_name": "Research Trends" }),
        ));
        assert_eq!(normalized.message, "Started task: Research Trends");
        assert_eq!(normalized.kind, ActivityKind::TaskStart);

        let normalized =
            normalize_event(&event("task_completed", json!({ "task_id": "research" })));
        assert_eq!(normalized.message, "Completed task: research");
        assert_eq!(normalized.kind, ActivityKind::TaskComplete);

        let normalized = normalize_event(&event("task_started", json!({})));
        assert_eq!(normalized.message, "Started task: unknown");
    }

    #[test]
    fn task_failure_includes_the_error() {
        let normalized = normalize_event(&event(
            "task_failed",
            json!({ "task_name": "qa", "error": "timeout" }),
        ));
        assert_eq!(normalized.message, "Task failed: qa - timeout");
        assert_eq!(normalized.kind, ActivityKind::Error);
    }

    #[test]
    fn agent_and_llm_and_tool_events_map_to_their_kinds() {
        let normalized = normalize_event(&event(
            "agent_execution_started",
            json!({ "agent_name": "Writer" }),
        ));
        assert_eq!(normalized.message, "Writer started working");
        assert_eq!(normalized.kind, ActivityKind::AgentThinking);

        let normalized =
            normalize_event(&event("llm_call_started", json!({ "model": "gpt-x" })));
        assert_eq!(normalized.message, "Calling gpt-x");
        assert_eq!(normalized.kind, ActivityKind::LlmCall);

        let normalized =
            normalize_event(&event("tool_usage_finished", json!({ "tool_name": "search" })));
        assert_eq!(normalized.message, "Finished using: search");
        assert_eq!(normalized.kind, ActivityKind::ToolUsage);
    }

    #[test]
    fn crew_lifecycle_events_normalize() {
        let normalized = normalize_event(&event("crew_kickoff_started", json!({})));
        assert_eq!(normalized.message, "Crew execution started");
        assert_eq!(normalized.kind, ActivityKind::CrewKickoff);

        let normalized = normalize_event(&event("crew_kickoff_failed", json!({})));
        assert_eq!(normalized.message, "Crew execution failed: Unknown error");
        assert_eq!(normalized.kind, ActivityKind::Error);
    }

    #[test]
    fn unknown_event_types_become_generic_messages() {
        let normalized = normalize_event(&event("memory_query_started", json!({})));
        assert_eq!(normalized.message, "Event: memory_query_started");
        assert_eq!(normalized.kind, ActivityKind::Message);
    }

    #[test]
    fn actor_name_follows_field_priority() {
        assert_eq!(
            extract_actor_name(&json!({ "agent_name": "Writer", "agent": "Other" })),
            "Writer"
        );
        assert_eq!(extract_actor_name(&json!({ "agent": "Editor" })), "Editor");
        assert_eq!(extract_actor_name(&json!({ "actor": "Reviewer" })), "Reviewer");
        assert_eq!(extract_actor_name(&json!({})), "System");
    }

    #[test]
    fn batches_sort_by_embedded_timestamp() {
        let t0 = Utc::now();
        let mut events = vec![
            CrewEvent {
                id: "b".to_string(),
                execution_id: "run-1".to_string(),
                timestamp: t0 + chrono::Duration::seconds(5),
                event_type: "task_completed".to_string(),
                data: json!({}),
            },
            CrewEvent {
                id: "a".to_string(),
                execution_id: "run-1".to_string(),
                timestamp: t0,
                event_type: "task_started".to_string(),
                data: json!({}),
            },
        ];

        sort_by_timestamp(&mut events);

        assert_eq!(events[0].id, "a");
        assert_eq!(events[1].id, "b");
    }

    #[test]
    fn missing_data_field_defaults_to_empty_bag() {
        let parsed: CrewEvent = serde_json::from_value(json!({
            "id": "evt-9",
            "execution_id": "run-1",
            "timestamp": "2025-02-16T10:58:44.965Z",
            "type": "task_started",
        }))
        .unwrap();

        assert!(parsed.data.is_null() || parsed.data.is_object());
        let normalized = normalize_event(&parsed);
        assert_eq!(normalized.actor_name, "System");
    }
}
