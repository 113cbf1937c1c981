// src/project/approval.rs

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;

use super::error::ProjectionError;
use super::utils::{cast_bool, cast_cell, get_path};
use crate::schema::{ApprovalRecord, FieldKind, Value};

/// Location of the approvals array inside a document.
pub const APPROVALS_PATH: &str = "meta.view.approvals";

static MISSING: JsonValue = JsonValue::Null;

fn lookup<'a>(entry: &'a JsonValue, path: &str) -> &'a JsonValue {
    get_path(entry, path).unwrap_or(&MISSING)
}

fn text(
    entry: &JsonValue,
    path: &str,
    column: &'static str,
) -> Result<Option<String>, ProjectionError> {
    match cast_cell(lookup(entry, path), FieldKind::Text, false, column)? {
        Value::Text(s) => Ok(Some(s)),
        _ => Ok(None),
    }
}

fn integer(
    entry: &JsonValue,
    path: &str,
    column: &'static str,
) -> Result<Option<i64>, ProjectionError> {
    match cast_cell(lookup(entry, path), FieldKind::Integer, false, column)? {
        Value::Integer(i) => Ok(Some(i)),
        _ => Ok(None),
    }
}

/// Epoch seconds → instant.
fn instant(
    entry: &JsonValue,
    path: &str,
    column: &'static str,
) -> Result<Option<DateTime<Utc>>, ProjectionError> {
    integer(entry, path, column)?
        .map(|seconds| {
            DateTime::<Utc>::from_timestamp(seconds, 0)
                .ok_or(ProjectionError::Epoch { column, seconds })
        })
        .transpose()
}

/// Project one approval object by field name.
pub fn project_entry(
    source_id: &str,
    entry: &JsonValue,
) -> Result<ApprovalRecord, ProjectionError> {
    if !entry.is_object() {
        return Err(ProjectionError::NotAnObject);
    }

    Ok(ApprovalRecord {
        source_id: source_id.to_string(),
        reviewed_at: instant(entry, "reviewedAt", "reviewed_at")?,
        reviewed_automatically: cast_bool(
            lookup(entry, "reviewedAutomatically"),
            "reviewed_automatically",
        )?,
        state: text(entry, "state", "state")?,
        submission_id: integer(entry, "submissionId", "submission_id")?,
        submission_object: text(entry, "submissionObject", "submission_object")?,
        submission_outcome: text(entry, "submissionOutcome", "submission_outcome")?,
        submitted_at: instant(entry, "submittedAt", "submitted_at")?,
        workflow_id: integer(entry, "workflowId", "workflow_id")?,
        permission_type: text(entry, "submissionDetails.permissionType", "permission_type")?,
        failure_count: integer(
            entry,
            "submissionOutcomeApplication.failureCount",
            "failure_count",
        )?,
        outcome_status: text(entry, "submissionOutcomeApplication.status", "outcome_status")?,
        submitter_id: text(entry, "submitter.id", "submitter_id")?,
        submitter_display_name: text(entry, "submitter.displayName", "submitter_display_name")?,
    })
}
