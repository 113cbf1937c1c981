// src/schema/arrow.rs

use anyhow::{Context, Result};
use arrow::array::{
    ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray, TimestampMicrosecondArray,
};
use arrow::datatypes::{DataType, Field as ArrowField, Schema as ArrowSchema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::approval::ApprovalRecord;
use super::vehicle::{FieldKind, Value, VehicleRecord, VEHICLE_LAYOUT};
use crate::validate::ValidationResult;

const TZ: &str = "UTC";

fn timestamp_type() -> DataType {
    DataType::Timestamp(TimeUnit::Microsecond, Some(Arc::from(TZ)))
}

fn kind_to_arrow_type(kind: FieldKind) -> DataType {
    match kind {
        FieldKind::Text => DataType::Utf8,
        FieldKind::Integer => DataType::Int64,
        FieldKind::Double => DataType::Float64,
    }
}

fn source_field() -> ArrowField {
    ArrowField::new("file_name", DataType::Utf8, false)
}

/// `file_name` followed by the twenty layout columns, all nullable.
pub fn vehicle_schema() -> Arc<ArrowSchema> {
    let mut fields = Vec::with_capacity(VEHICLE_LAYOUT.len() + 1);
    fields.push(source_field());
    fields.extend(
        VEHICLE_LAYOUT
            .iter()
            .map(|f| ArrowField::new(f.column.name(), kind_to_arrow_type(f.kind), true)),
    );
    Arc::new(ArrowSchema::new(fields))
}

pub fn approval_schema() -> Arc<ArrowSchema> {
    Arc::new(ArrowSchema::new(vec![
        source_field(),
        ArrowField::new("reviewed_at", timestamp_type(), true),
        ArrowField::new("reviewed_automatically", DataType::Boolean, true),
        ArrowField::new("state", DataType::Utf8, true),
        ArrowField::new("submission_id", DataType::Int64, true),
        ArrowField::new("submission_object", DataType::Utf8, true),
        ArrowField::new("submission_outcome", DataType::Utf8, true),
        ArrowField::new("submitted_at", timestamp_type(), true),
        ArrowField::new("workflow_id", DataType::Int64, true),
        ArrowField::new("permission_type", DataType::Utf8, true),
        ArrowField::new("failure_count", DataType::Int64, true),
        ArrowField::new("outcome_status", DataType::Utf8, true),
        ArrowField::new("submitter_id", DataType::Utf8, true),
        ArrowField::new("submitter_display_name", DataType::Utf8, true),
    ]))
}

pub fn validation_schema() -> Arc<ArrowSchema> {
    Arc::new(ArrowSchema::new(vec![
        ArrowField::new("check_type", DataType::Utf8, false),
        ArrowField::new("column_name", DataType::Utf8, false),
        ArrowField::new("issue_count", DataType::Int64, false),
        ArrowField::new("validation_timestamp", timestamp_type(), false),
    ]))
}

fn strings<'a, T: 'a>(rows: &'a [T], f: impl Fn(&'a T) -> Option<&'a str>) -> ArrayRef {
    Arc::new(rows.iter().map(f).collect::<StringArray>())
}

fn ints<T>(rows: &[T], f: impl Fn(&T) -> Option<i64>) -> ArrayRef {
    Arc::new(rows.iter().map(f).collect::<Int64Array>())
}

fn timestamps<T>(rows: &[T], f: impl Fn(&T) -> Option<DateTime<Utc>>) -> ArrayRef {
    let arr: TimestampMicrosecondArray = rows
        .iter()
        .map(|r| f(r).map(|ts| ts.timestamp_micros()))
        .collect();
    Arc::new(arr.with_timezone(TZ))
}

/// Build the vehicle table batch; column order follows `VEHICLE_LAYOUT`.
pub fn vehicles_to_batch(records: &[VehicleRecord]) -> Result<RecordBatch> {
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(VEHICLE_LAYOUT.len() + 1);
    columns.push(strings(records, |r| Some(r.source_id.as_str())));

    for field in VEHICLE_LAYOUT.iter() {
        let col = field.column;
        let arr: ArrayRef = match field.kind {
            FieldKind::Text => strings(records, |r| match r.value(col) {
                Value::Text(s) => Some(s),
                _ => None,
            }),
            FieldKind::Integer => ints(records, |r| match r.value(col) {
                Value::Integer(i) => Some(i),
                _ => None,
            }),
            FieldKind::Double => Arc::new(
                records
                    .iter()
                    .map(|r| r.value(col).as_f64())
                    .collect::<Float64Array>(),
            ),
        };
        columns.push(arr);
    }

    RecordBatch::try_new(vehicle_schema(), columns).context("building vehicle record batch")
}

pub fn approvals_to_batch(records: &[ApprovalRecord]) -> Result<RecordBatch> {
    let columns: Vec<ArrayRef> = vec![
        strings(records, |r| Some(r.source_id.as_str())),
        timestamps(records, |r| r.reviewed_at),
        Arc::new(
            records
                .iter()
                .map(|r| r.reviewed_automatically)
                .collect::<BooleanArray>(),
        ),
        strings(records, |r| r.state.as_deref()),
        ints(records, |r| r.submission_id),
        strings(records, |r| r.submission_object.as_deref()),
        strings(records, |r| r.submission_outcome.as_deref()),
        timestamps(records, |r| r.submitted_at),
        ints(records, |r| r.workflow_id),
        strings(records, |r| r.permission_type.as_deref()),
        ints(records, |r| r.failure_count),
        strings(records, |r| r.outcome_status.as_deref()),
        strings(records, |r| r.submitter_id.as_deref()),
        strings(records, |r| r.submitter_display_name.as_deref()),
    ];

    RecordBatch::try_new(approval_schema(), columns).context("building approval record batch")
}

pub fn results_to_batch(results: &[ValidationResult]) -> Result<RecordBatch> {
    let columns: Vec<ArrayRef> = vec![
        strings(results, |r| Some(r.check_type.as_str())),
        strings(results, |r| Some(r.column_name.as_str())),
        ints(results, |r| Some(r.issue_count as i64)),
        timestamps(results, |r| Some(r.validation_timestamp)),
    ];

    RecordBatch::try_new(validation_schema(), columns)
        .context("building validation results record batch")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::CheckType;
    use arrow::array::Array;
    use chrono::TimeZone;

    #[test]
    fn vehicle_batch_shape() -> Result<()> {
        let mut a = VehicleRecord::new("a.json");
        a.vin_1_10 = Some("5YJ3E1EB4L".into());
        a.model_year = Some(2020);
        a.base_msrp = Some(0.0);
        let b = VehicleRecord::new("b.json");

        let batch = vehicles_to_batch(&[a, b])?;
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.num_columns(), 21);

        let vin = batch
            .column_by_name("vin_1_10")
            .unwrap()
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(vin.value(0), "5YJ3E1EB4L");
        assert!(vin.is_null(1));

        let year = batch
            .column_by_name("model_year")
            .unwrap()
            .as_any()
            .downcast_ref::<Int64Array>()
            .unwrap();
        assert_eq!(year.value(0), 2020);
        Ok(())
    }

    #[test]
    fn empty_tables_still_carry_schema() -> Result<()> {
        assert_eq!(vehicles_to_batch(&[])?.num_rows(), 0);
        assert_eq!(approvals_to_batch(&[])?.num_columns(), 14);
        assert_eq!(results_to_batch(&[])?.num_columns(), 4);
        Ok(())
    }

    #[test]
    fn results_batch_values() -> Result<()> {
        let ts = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        let batch = results_to_batch(&[ValidationResult {
            check_type: CheckType::Duplicate,
            column_name: "vin_1_10".into(),
            issue_count: 3,
            validation_timestamp: ts,
        }])?;

        let check = batch
            .column(0)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(check.value(0), "DUPLICATE");
        let when = batch
            .column(3)
            .as_any()
            .downcast_ref::<TimestampMicrosecondArray>()
            .unwrap();
        assert_eq!(when.value(0), ts.timestamp_micros());
        Ok(())
    }
}
