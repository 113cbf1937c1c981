// src/project/vehicle.rs

use serde_json::Value as JsonValue;

use super::error::ProjectionError;
use super::utils::cast_cell;
use crate::schema::{VehicleRecord, REQUIRED_WIDTH, VEHICLE_LAYOUT};

/// Project one positional `data` row through `VEHICLE_LAYOUT`.
pub fn project_row(source_id: &str, row: &JsonValue) -> Result<VehicleRecord, ProjectionError> {
    let cells = row.as_array().ok_or(ProjectionError::NotAnArray)?;
    if cells.len() < REQUIRED_WIDTH {
        return Err(ProjectionError::ShortRow {
            found: cells.len(),
            required: REQUIRED_WIDTH,
        });
    }

    let mut record = VehicleRecord::new(source_id);
    for field in VEHICLE_LAYOUT.iter() {
        let value = cast_cell(
            &cells[field.offset],
            field.kind,
            field.sentinel,
            field.column.name(),
        )?;
        record.assign(field.column, value);
    }
    Ok(record)
}
