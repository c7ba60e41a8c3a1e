//! HITL checkpoint entity models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crewdeck_core::types::{DbId, Timestamp};

use super::status::StatusId;

/// A row from the `checkpoints` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Checkpoint {
    pub id: DbId,
    pub execution_id: DbId,
    pub checkpoint_type: String,
    pub task_id: String,
    pub status_id: StatusId,
    /// The content awaiting human review.
    pub content: String,
    pub reviewer_feedback: Option<String>,
    pub reviewed_by: Option<DbId>,
    pub created_at: Timestamp,
    pub reviewed_at: Option<Timestamp>,
    pub metadata: serde_json::Value,
}

/// Request body for the approve/reject endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewRequest {
    /// Human feedback on the checkpoint; recorded in the audit trail and
    /// forwarded to the crew.
    pub feedback: String,
}

/// Query parameters for `GET /api/v1/checkpoints/pending`.
#[derive(Debug, Deserialize)]
pub struct PendingCheckpointQuery {
    /// Filter by checkpoint type (`brand_voice`, `style_compliance`,
    /// `final_qa`).
    pub checkpoint_type: Option<String>,
    /// Filter by project.
    pub project_id: Option<DbId>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
