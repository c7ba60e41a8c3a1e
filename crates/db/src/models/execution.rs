//! Execution entity models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crewdeck_core::types::{DbId, Timestamp};

use super::status::StatusId;

/// A row from the `executions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Execution {
    pub id: DbId,
    pub project_id: DbId,
    pub workflow_mode: String,
    pub status_id: StatusId,
    /// The crew platform's kickoff id. `None` until the platform accepts
    /// the start request; set exactly once afterwards.
    pub runner_execution_id: Option<String>,
    pub started_at: Timestamp,
    pub completed_at: Option<Timestamp>,
    pub error_message: Option<String>,
    pub retry_count: i32,
    pub created_by: DbId,
    pub metrics: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Request body for `POST /api/v1/executions/start`.
#[derive(Debug, Clone, Deserialize)]
pub struct StartExecution {
    pub project_id: DbId,
    /// Workflow mode string (`creation`, `revision`, `repurpose`).
    /// Defaults to `creation` when omitted.
    pub workflow_mode: Option<String>,
    /// Draft text to revise (revision mode).
    pub initial_draft: Option<String>,
    /// What to change about the draft (required in revision mode).
    pub revision_instructions: Option<String>,
}
