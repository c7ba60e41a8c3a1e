//! Kickoff input assembly.
//!
//! The crew expects a fixed set of string-valued inputs on every
//! kickoff, with mode-specific overrides layered on top. All values are
//! strings because the platform treats inputs as template variables.

use serde_json::json;

use crewdeck_core::error::CoreError;
use crewdeck_core::types::DbId;
use crewdeck_core::workflow::{validate_start_inputs, WorkflowMode};

/// AI language code used when a project does not define one.
const DEFAULT_AI_LANGUAGE_CODE: &str = "/TN/A3,P4/VL4/SC3/FL2";

/// Default target content length in words.
const DEFAULT_CONTENT_LENGTH: &str = "1500";

/// Project fields needed to assemble kickoff inputs.
#[derive(Debug, Clone)]
pub struct ProjectInputs {
    pub client_id: DbId,
    pub client_name: String,
    pub topic: String,
    pub content_type: String,
    pub audience: String,
    pub ai_language_code: Option<String>,
}

/// Assemble the crew kickoff inputs for a project and workflow mode.
///
/// Validates mode-specific requirements (revision needs instructions)
/// before producing anything, so the caller can reject the request
/// without touching the platform.
pub fn build_kickoff_inputs(
    project: &ProjectInputs,
    mode: WorkflowMode,
    initial_draft: Option<&str>,
    revision_instructions: Option<&str>,
) -> Result<serde_json::Value, CoreError> {
    validate_start_inputs(mode, revision_instructions)?;

    let mut inputs = json!({
        "topic": project.topic,
        "client_name": project.client_name,
        "content_type": project.content_type,
        "audience": project.audience,
        "ai_language_code": project
            .ai_language_code
            .as_deref()
            .unwrap_or(DEFAULT_AI_LANGUAGE_CODE),
        "workflow_mode": mode.as_str(),
        "client_id": project.client_id.to_string(),
        "content_length": DEFAULT_CONTENT_LENGTH,
        "initial_draft": "",
        "draft_source": "none",
        "draft_length": "0",
        "draft_word_count": "0",
    });

    match mode {
        WorkflowMode::Creation => {}
        WorkflowMode::Revision => {
            let draft = initial_draft.unwrap_or("");
            inputs["initial_draft"] = json!(draft);
            inputs["draft_source"] = json!("human");
            inputs["draft_length"] = json!(draft.len().to_string());
            inputs["draft_word_count"] = json!(draft.split_whitespace().count().to_string());
            inputs["revision_instructions"] = json!(revision_instructions.unwrap_or(""));
        }
        WorkflowMode::Repurpose => {
            inputs["draft_source"] = json!("ai_generated");
        }
    }

    Ok(inputs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project() -> ProjectInputs {
        ProjectInputs {
            client_id: 7,
            client_name: "Acme".to_string(),
            topic: "Q3 product launch".to_string(),
            content_type: "blog_post".to_string(),
            audience: "developers".to_string(),
            ai_language_code: None,
        }
    }

    #[test]
    fn creation_mode_fills_required_fields_with_defaults() {
        let inputs = build_kickoff_inputs(&project(), WorkflowMode::Creation, None, None).unwrap();

        assert_eq!(inputs["topic"], "Q3 product launch");
        assert_eq!(inputs["client_name"], "Acme");
        assert_eq!(inputs["workflow_mode"], "creation");
        assert_eq!(inputs["client_id"], "7");
        assert_eq!(inputs["ai_language_code"], DEFAULT_AI_LANGUAGE_CODE);
        assert_eq!(inputs["content_length"], "1500");
        assert_eq!(inputs["draft_source"], "none");
        assert_eq!(inputs["draft_word_count"], "0");
        assert!(inputs.get("revision_instructions").is_none());
    }

    #[test]
    fn project_language_code_overrides_default() {
        let mut p = project();
        p.ai_language_code = Some("/TN/B1".to_string());

        let inputs = build_kickoff_inputs(&p, WorkflowMode::Creation, None, None).unwrap();
        assert_eq!(inputs["ai_language_code"], "/TN/B1");
    }

    #[test]
    fn revision_mode_carries_draft_and_instructions() {
        let inputs = build_kickoff_inputs(
            &project(),
            WorkflowMode::Revision,
            Some("one two three"),
            Some("make it shorter"),
        )
        .unwrap();

        assert_eq!(inputs["workflow_mode"], "revision");
        assert_eq!(inputs["initial_draft"], "one two three");
        assert_eq!(inputs["draft_source"], "human");
        assert_eq!(inputs["draft_length"], "13");
        assert_eq!(inputs["draft_word_count"], "3");
        assert_eq!(inputs["revision_instructions"], "make it shorter");
    }

    #[test]
    fn revision_without_instructions_is_rejected() {
        let err =
            build_kickoff_inputs(&project(), WorkflowMode::Revision, Some("draft"), None)
                .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn repurpose_mode_marks_draft_as_ai_generated() {
        let inputs =
            build_kickoff_inputs(&project(), WorkflowMode::Repurpose, None, None).unwrap();

        assert_eq!(inputs["draft_source"], "ai_generated");
        assert_eq!(inputs["initial_draft"], "");
    }
}
