//! Checkpoint type classification.
//!
//! The crew platform identifies a HITL pause only by the task id that
//! triggered it. The checkpoint type shown to reviewers is inferred
//! from that id using ordered keyword rules.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// The kind of human review a checkpoint asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointType {
    BrandVoice,
    StyleCompliance,
    FinalQa,
}

impl CheckpointType {
    /// Stable string form, as stored in the database.
    pub fn as_str(self) -> &'static str {
        match self {
            CheckpointType::BrandVoice => "brand_voice",
            CheckpointType::StyleCompliance => "style_compliance",
            CheckpointType::FinalQa => "final_qa",
        }
    }

    /// Parse the stable string form back into the enum.
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "brand_voice" => Ok(CheckpointType::BrandVoice),
            "style_compliance" => Ok(CheckpointType::StyleCompliance),
            "final_qa" => Ok(CheckpointType::FinalQa),
            other => Err(CoreError::Validation(format!(
                "Unknown checkpoint type: {other}"
            ))),
        }
    }
}

/// Infer the checkpoint type from a crew task id.
///
/// Rules are ordered; the first match wins. Anything unrecognized
/// defaults to final QA so the checkpoint is never dropped.
pub fn classify_checkpoint_type(task_id: &str) -> CheckpointType {
    let task = task_id.to_lowercase();

    if task.contains("brand") || task.contains("voice") {
        CheckpointType::BrandVoice
    } else if task.contains("style") || task.contains("compliance") {
        CheckpointType::StyleCompliance
    } else if task.contains("qa") || task.contains("final") || task.contains("review") {
        CheckpointType::FinalQa
    } else {
        CheckpointType::FinalQa
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brand_and_voice_tasks_classify_as_brand_voice() {
        assert_eq!(
            classify_checkpoint_type("brand_voice_review"),
            CheckpointType::BrandVoice
        );
        assert_eq!(
            classify_checkpoint_type("check_voice_alignment"),
            CheckpointType::BrandVoice
        );
    }

    #[test]
    fn style_and_compliance_tasks_classify_as_style_compliance() {
        assert_eq!(
            classify_checkpoint_type("style_guide_check"),
            CheckpointType::StyleCompliance
        );
        assert_eq!(
            classify_checkpoint_type("compliance_pass"),
            CheckpointType::StyleCompliance
        );
    }

    #[test]
    fn qa_final_and_review_tasks_classify_as_final_qa() {
        assert_eq!(classify_checkpoint_type("qa_task"), CheckpointType::FinalQa);
        assert_eq!(
            classify_checkpoint_type("final_polish"),
            CheckpointType::FinalQa
        );
    }

    #[test]
    fn earlier_rules_win_over_later_ones() {
        // "brand_final_review" matches both brand and final; brand wins.
        assert_eq!(
            classify_checkpoint_type("brand_final_review"),
            CheckpointType::BrandVoice
        );
        // "style_review" matches both style and review; style wins.
        assert_eq!(
            classify_checkpoint_type("style_review"),
            CheckpointType::StyleCompliance
        );
    }

    #[test]
    fn unknown_tasks_default_to_final_qa() {
        assert_eq!(
            classify_checkpoint_type("mystery_step"),
            CheckpointType::FinalQa
        );
    }

    #[test]
    fn classification_is_case_insensitive() {
        assert_eq!(
            classify_checkpoint_type("Brand_Voice_Review"),
            CheckpointType::BrandVoice
        );
    }

    #[test]
    fn type_round_trips_through_string_form() {
        for t in [
            CheckpointType::BrandVoice,
            CheckpointType::StyleCompliance,
            CheckpointType::FinalQa,
        ] {
            assert_eq!(CheckpointType::parse(t.as_str()).unwrap(), t);
        }
    }
}
