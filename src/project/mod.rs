// src/project/mod.rs
pub mod approval;
pub mod error;
pub mod utils;
pub mod vehicle;

pub use error::ProjectionError;
pub use utils::normalize_sentinel;

use rayon::prelude::*;
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::raw::{RawRecord, RawStore};
use crate::schema::{ApprovalRecord, VehicleRecord};
use approval::APPROVALS_PATH;

/// Field holding the positional row array in each document.
pub const DATA_FIELD: &str = "data";

/// Counters for one extraction pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProjectionStats {
    /// Documents read from the raw store.
    pub documents: usize,
    /// Rows that made it into the output set.
    pub records: usize,
    /// Rows skipped as malformed.
    pub malformed: usize,
    /// Documents whose array was absent or not an array.
    pub missing_path: usize,
}

impl ProjectionStats {
    fn merge(mut self, other: ProjectionStats) -> Self {
        self.documents += other.documents;
        self.records += other.records;
        self.malformed += other.malformed;
        self.missing_path += other.missing_path;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct VehicleProjection {
    pub records: Vec<VehicleRecord>,
    pub stats: ProjectionStats,
}

#[derive(Debug, Clone, Default)]
pub struct ApprovalProjection {
    pub records: Vec<ApprovalRecord>,
    pub stats: ProjectionStats,
}

/// Apply `project` to every element of the array at `path`, skipping and
/// counting the ones it rejects.
fn project_document<T>(
    raw: &RawRecord,
    path: &str,
    array: Option<&Vec<serde_json::Value>>,
    project: impl Fn(&str, &serde_json::Value) -> Result<T, ProjectionError>,
) -> (Vec<T>, ProjectionStats) {
    let mut stats = ProjectionStats {
        documents: 1,
        ..Default::default()
    };
    let Some(items) = array else {
        debug!(source_id = %raw.source_id, path, "path absent; no rows");
        stats.missing_path = 1;
        return (Vec::new(), stats);
    };

    let mut out = Vec::with_capacity(items.len());
    for (idx, item) in items.iter().enumerate() {
        match project(&raw.source_id, item) {
            Ok(rec) => out.push(rec),
            Err(e) => {
                debug!(source_id = %raw.source_id, path, idx, error = %e, "skipping malformed entry");
                stats.malformed += 1;
            }
        }
    }
    stats.records = out.len();
    (out, stats)
}

/// Fold per-document outputs in feed order so results are deterministic
/// whatever rayon's scheduling.
fn collect_in_order<T>(parts: Vec<(Vec<T>, ProjectionStats)>) -> (Vec<T>, ProjectionStats) {
    let total = parts.iter().map(|(rows, _)| rows.len()).sum();
    let mut records = Vec::with_capacity(total);
    let mut stats = ProjectionStats::default();
    for (rows, s) in parts {
        records.extend(rows);
        stats = stats.merge(s);
    }
    (records, stats)
}

/// Flatten every document's `data` rows into vehicle records.
#[instrument(level = "info", skip(store), fields(documents = store.len()))]
pub fn project_vehicles(store: &RawStore) -> VehicleProjection {
    let start = Instant::now();
    let parts: Vec<_> = store
        .records()
        .par_iter()
        .map(|raw| {
            let rows = raw.document.get(DATA_FIELD).and_then(|d| d.as_array());
            project_document(raw, DATA_FIELD, rows, vehicle::project_row)
        })
        .collect();
    let (records, stats) = collect_in_order(parts);

    if stats.malformed > 0 {
        warn!(malformed = stats.malformed, "skipped malformed vehicle rows");
    }
    info!(
        records = stats.records,
        missing_path = stats.missing_path,
        elapsed = ?start.elapsed(),
        "vehicle projection done"
    );
    VehicleProjection { records, stats }
}

/// Flatten every document's `meta.view.approvals` entries into approval records.
#[instrument(level = "info", skip(store), fields(documents = store.len()))]
pub fn project_approvals(store: &RawStore) -> ApprovalProjection {
    let start = Instant::now();
    let parts: Vec<_> = store
        .records()
        .par_iter()
        .map(|raw| {
            let entries = utils::get_path(&raw.document, APPROVALS_PATH).and_then(|a| a.as_array());
            project_document(raw, APPROVALS_PATH, entries, approval::project_entry)
        })
        .collect();
    let (records, stats) = collect_in_order(parts);

    if stats.malformed > 0 {
        warn!(malformed = stats.malformed, "skipped malformed approval entries");
    }
    info!(
        records = stats.records,
        missing_path = stats.missing_path,
        elapsed = ?start.elapsed(),
        "approval projection done"
    );
    ApprovalProjection { records, stats }
}
