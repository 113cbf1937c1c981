// src/schema/approval.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry of a document's `meta.view.approvals` array, flattened.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRecord {
    pub source_id: String,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_automatically: Option<bool>,
    pub state: Option<String>,
    pub submission_id: Option<i64>,
    pub submission_object: Option<String>,
    pub submission_outcome: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub workflow_id: Option<i64>,
    pub permission_type: Option<String>,
    pub failure_count: Option<i64>,
    pub outcome_status: Option<String>,
    pub submitter_id: Option<String>,
    pub submitter_display_name: Option<String>,
}
