// src/pipeline.rs

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{path::PathBuf, time::Instant};
use tracing::{info, instrument};

use crate::config::PipelineConfig;
use crate::project::{project_approvals, project_vehicles, ProjectionStats};
use crate::raw::RawStore;
use crate::schema::{approvals_to_batch, results_to_batch, vehicles_to_batch};
use crate::store::TableStore;
use crate::validate::{evaluate, ValidationResult};

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub vehicles: ProjectionStats,
    pub approvals: ProjectionStats,
    pub results: Vec<ValidationResult>,
    pub validated: usize,
    pub published: Vec<PathBuf>,
}

/// Project, validate and publish all four tables, stamped with the current time.
pub fn run(cfg: &PipelineConfig, raw: &RawStore, current_year: i32) -> Result<RunSummary> {
    run_at(cfg, raw, current_year, Utc::now())
}

/// Like [`run`] with an explicit evaluation instant.
///
/// Every table is built and staged as the next store generation; an error
/// before the pointer swap leaves the previous tables in place.
#[instrument(level = "info", skip(cfg, raw, evaluated_at), fields(out = %cfg.output_dir.display()))]
pub fn run_at(
    cfg: &PipelineConfig,
    raw: &RawStore,
    current_year: i32,
    evaluated_at: DateTime<Utc>,
) -> Result<RunSummary> {
    let start = Instant::now();
    let store = TableStore::new(&cfg.output_dir)?;

    // ─── 1) projection ───────────────────────────────────────────────
    let vehicles = project_vehicles(raw);
    let approvals = project_approvals(raw);

    // ─── 2) validation over the projected snapshot ───────────────────
    let report = evaluate(&vehicles.records, current_year, evaluated_at);

    // ─── 3) stage every table, then publish together ─────────────────
    let mut stage = store.stage()?;
    stage.put(&cfg.tables.vehicles, &vehicles_to_batch(&vehicles.records)?)?;
    stage.put(&cfg.tables.approvals, &approvals_to_batch(&approvals.records)?)?;
    stage.put(
        &cfg.tables.validation_results,
        &results_to_batch(&report.results)?,
    )?;
    stage.put(&cfg.tables.validated, &vehicles_to_batch(&report.validated)?)?;
    info!(tables = ?stage.tables().collect::<Vec<_>>(), "staged table set");
    let published = stage.commit()?;

    info!(
        vehicles = vehicles.stats.records,
        approvals = approvals.stats.records,
        validated = report.validated.len(),
        malformed = vehicles.stats.malformed + approvals.stats.malformed,
        elapsed = ?start.elapsed(),
        "pipeline run complete"
    );

    Ok(RunSummary {
        vehicles: vehicles.stats,
        approvals: approvals.stats,
        validated: report.validated.len(),
        results: report.results,
        published,
    })
}
