//! Activity kinds for the execution history.

use serde::{Deserialize, Serialize};

/// What kind of event an activity row records.
///
/// Stored as TEXT in the `activities` table via [`as_str`](Self::as_str).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    TaskStart,
    TaskComplete,
    AgentThinking,
    ToolUsage,
    LlmCall,
    CrewKickoff,
    Error,
    Message,
}

impl ActivityKind {
    /// Stable string form, as stored in the database.
    pub fn as_str(self) -> &'static str {
        match self {
            ActivityKind::TaskStart => "task_start",
            ActivityKind::TaskComplete => "task_complete",
            ActivityKind::AgentThinking => "agent_thinking",
            ActivityKind::ToolUsage => "tool_usage",
            ActivityKind::LlmCall => "llm_call",
            ActivityKind::CrewKickoff => "crew_kickoff",
            ActivityKind::Error => "error",
            ActivityKind::Message => "message",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_forms_are_snake_case() {
        assert_eq!(ActivityKind::TaskStart.as_str(), "task_start");
        assert_eq!(ActivityKind::CrewKickoff.as_str(), "crew_kickoff");
        assert_eq!(ActivityKind::LlmCall.as_str(), "llm_call");
    }
}
