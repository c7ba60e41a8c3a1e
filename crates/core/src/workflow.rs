//! Workflow modes for crew executions.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// How a crew execution produces its content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowMode {
    /// Produce new content from scratch.
    Creation,
    /// Revise a human-supplied draft according to instructions.
    Revision,
    /// Rework previously generated content for a different channel.
    Repurpose,
}

impl WorkflowMode {
    /// Stable string form, as stored in the database and sent to the
    /// crew platform.
    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowMode::Creation => "creation",
            WorkflowMode::Revision => "revision",
            WorkflowMode::Repurpose => "repurpose",
        }
    }

    /// Parse the stable string form back into the enum.
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "creation" => Ok(WorkflowMode::Creation),
            "revision" => Ok(WorkflowMode::Revision),
            "repurpose" => Ok(WorkflowMode::Repurpose),
            other => Err(CoreError::Validation(format!(
                "Unknown workflow mode: {other}"
            ))),
        }
    }
}

/// Validate the mode-specific start inputs before anything is persisted.
///
/// Revision mode requires non-empty revision instructions; the other
/// modes have no extra requirements.
pub fn validate_start_inputs(
    mode: WorkflowMode,
    revision_instructions: Option<&str>,
) -> Result<(), CoreError> {
    if mode == WorkflowMode::Revision
        && revision_instructions.map_or(true, |s| s.trim().is_empty())
    {
        return Err(CoreError::Validation(
            "revision_instructions is required when workflow_mode is revision".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_round_trips_through_string_form() {
        for mode in [
            WorkflowMode::Creation,
            WorkflowMode::Revision,
            WorkflowMode::Repurpose,
        ] {
            assert_eq!(WorkflowMode::parse(mode.as_str()).unwrap(), mode);
        }
    }

    #[test]
    fn unknown_mode_is_a_validation_error() {
        let err = WorkflowMode::parse("translation").unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn revision_requires_instructions() {
        let err = validate_start_inputs(WorkflowMode::Revision, None).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));

        let err = validate_start_inputs(WorkflowMode::Revision, Some("   ")).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));

        validate_start_inputs(WorkflowMode::Revision, Some("shorten the intro"))
            .expect("instructions provided");
    }

    #[test]
    fn creation_and_repurpose_need_no_instructions() {
        validate_start_inputs(WorkflowMode::Creation, None).expect("creation");
        validate_start_inputs(WorkflowMode::Repurpose, None).expect("repurpose");
    }
}
