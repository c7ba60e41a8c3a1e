//! Activity (execution history) entity model.

use serde::Serialize;
use sqlx::FromRow;

use crewdeck_core::types::{DbId, Timestamp};

/// A row from the `activities` table. Append-only; never mutated.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Activity {
    pub id: DbId,
    pub execution_id: DbId,
    pub actor_name: String,
    pub kind: String,
    pub message: String,
    pub occurred_at: Timestamp,
    /// Originating webhook event id when derived from the crew platform's
    /// event stream; `None` for human and system activities.
    pub origin_event_id: Option<String>,
    pub metadata: serde_json::Value,
    pub created_at: Timestamp,
}
