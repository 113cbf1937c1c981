// src/validate/mod.rs
pub mod rules;

pub use rules::{rule_battery, Bound, Bounds, Check, CheckType, Gate, RuleDescriptor};

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, instrument};

use crate::schema::VehicleRecord;

/// One audit row: how many issues a rule found in this run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    pub check_type: CheckType,
    pub column_name: String,
    pub issue_count: u64,
    pub validation_timestamp: DateTime<Utc>,
}

/// Audit rows plus the records that passed every gate.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub results: Vec<ValidationResult>,
    pub validated: Vec<VehicleRecord>,
}

impl ValidationReport {
    pub fn issue_count(&self, check_type: CheckType, column: &str) -> Option<u64> {
        self.results
            .iter()
            .find(|r| r.check_type == check_type && r.column_name == column)
            .map(|r| r.issue_count)
    }
}

/// Run the rule battery over `records`.
///
/// Rules read the same snapshot and are evaluated in parallel; result rows
/// keep battery order. An empty snapshot gives zero counts and an empty
/// validated set.
#[instrument(level = "info", skip(records, evaluated_at), fields(records = records.len()))]
pub fn evaluate(
    records: &[VehicleRecord],
    current_year: i32,
    evaluated_at: DateTime<Utc>,
) -> ValidationReport {
    let battery = rule_battery(current_year);

    let results: Vec<ValidationResult> = battery
        .par_iter()
        .map(|rule| ValidationResult {
            check_type: rule.check_type(),
            column_name: rule.column.name().to_string(),
            issue_count: rule.count_issues(records),
            validation_timestamp: evaluated_at,
        })
        .collect();

    for r in &results {
        info!(
            check = r.check_type.as_str(),
            column = %r.column_name,
            issues = r.issue_count,
            "rule evaluated"
        );
    }

    let validated: Vec<VehicleRecord> = records
        .par_iter()
        .filter(|rec| battery.iter().all(|rule| rule.admits(rec)))
        .cloned()
        .collect();

    info!(
        passed = validated.len(),
        rejected = records.len() - validated.len(),
        "validated set built"
    );
    ValidationReport { results, validated }
}
