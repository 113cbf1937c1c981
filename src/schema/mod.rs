pub mod approval;
pub mod arrow;
pub mod vehicle;

pub use approval::ApprovalRecord;
pub use arrow::{
    approval_schema, approvals_to_batch, results_to_batch, validation_schema, vehicle_schema,
    vehicles_to_batch,
};
pub use vehicle::{
    FieldKind, FieldSpec, Value, VehicleColumn, VehicleRecord, REQUIRED_WIDTH, VEHICLE_LAYOUT,
};
