// src/schema/vehicle.rs

use serde::{Deserialize, Serialize};

/// How a positional slot is typed once projected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Text,
    Integer,
    Double,
}

/// The twenty data columns of the vehicle table, in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VehicleColumn {
    Vin,
    County,
    City,
    State,
    PostalCode,
    ModelYear,
    Make,
    Model,
    ElectricVehicleType,
    CafvEligibility,
    ElectricRange,
    BaseMsrp,
    LegislativeDistrict,
    DolVehicleId,
    VehicleLocation,
    ElectricUtility,
    CensusTract2020,
    Counties,
    CongressionalDistricts,
    LegislativeDistrictBoundary,
}

impl VehicleColumn {
    pub fn name(&self) -> &'static str {
        match self {
            VehicleColumn::Vin => "vin_1_10",
            VehicleColumn::County => "county",
            VehicleColumn::City => "city",
            VehicleColumn::State => "state",
            VehicleColumn::PostalCode => "postal_code",
            VehicleColumn::ModelYear => "model_year",
            VehicleColumn::Make => "make",
            VehicleColumn::Model => "model",
            VehicleColumn::ElectricVehicleType => "electric_vehicle_type",
            VehicleColumn::CafvEligibility => "cafv_eligibility",
            VehicleColumn::ElectricRange => "electric_range",
            VehicleColumn::BaseMsrp => "base_msrp",
            VehicleColumn::LegislativeDistrict => "legislative_district",
            VehicleColumn::DolVehicleId => "dol_vehicle_id",
            VehicleColumn::VehicleLocation => "vehicle_location",
            VehicleColumn::ElectricUtility => "electric_utility",
            VehicleColumn::CensusTract2020 => "census_tract_2020",
            VehicleColumn::Counties => "counties",
            VehicleColumn::CongressionalDistricts => "congressional_districts",
            VehicleColumn::LegislativeDistrictBoundary => "legislative_district_boundary",
        }
    }
}

/// One positional slot of a raw `data` row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub offset: usize,
    pub column: VehicleColumn,
    pub kind: FieldKind,
    /// Slot may carry the literal text `"null"` in place of an absent value.
    pub sentinel: bool,
}

const fn spec(offset: usize, column: VehicleColumn, kind: FieldKind, sentinel: bool) -> FieldSpec {
    FieldSpec {
        offset,
        column,
        kind,
        sentinel,
    }
}

/// Offset → column mapping for every element of a document's `data` array.
///
/// Slots 0..8 hold row bookkeeping (row id, uuid, position, audit stamps) and
/// are not projected.
pub const VEHICLE_LAYOUT: [FieldSpec; 20] = [
    spec(8, VehicleColumn::Vin, FieldKind::Text, false),
    spec(9, VehicleColumn::County, FieldKind::Text, false),
    spec(10, VehicleColumn::City, FieldKind::Text, false),
    spec(11, VehicleColumn::State, FieldKind::Text, false),
    spec(12, VehicleColumn::PostalCode, FieldKind::Text, false),
    spec(13, VehicleColumn::ModelYear, FieldKind::Integer, false),
    spec(14, VehicleColumn::Make, FieldKind::Text, false),
    spec(15, VehicleColumn::Model, FieldKind::Text, false),
    spec(16, VehicleColumn::ElectricVehicleType, FieldKind::Text, false),
    spec(17, VehicleColumn::CafvEligibility, FieldKind::Text, false),
    spec(18, VehicleColumn::ElectricRange, FieldKind::Integer, false),
    spec(19, VehicleColumn::BaseMsrp, FieldKind::Double, false),
    spec(20, VehicleColumn::LegislativeDistrict, FieldKind::Integer, false),
    spec(21, VehicleColumn::DolVehicleId, FieldKind::Text, false),
    spec(22, VehicleColumn::VehicleLocation, FieldKind::Text, true),
    spec(23, VehicleColumn::ElectricUtility, FieldKind::Text, true),
    spec(24, VehicleColumn::CensusTract2020, FieldKind::Text, true),
    spec(25, VehicleColumn::Counties, FieldKind::Integer, true),
    spec(26, VehicleColumn::CongressionalDistricts, FieldKind::Integer, true),
    spec(27, VehicleColumn::LegislativeDistrictBoundary, FieldKind::Integer, true),
];

/// Minimum length of a raw row: one past the last projected offset.
pub const REQUIRED_WIDTH: usize = 28;

/// A typed cell, either borrowed out of a record or produced by projection.
#[derive(Debug, Clone, PartialEq)]
pub enum Value<S> {
    Null,
    Text(S),
    Integer(i64),
    Double(f64),
}

impl<S> Value<S> {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view used by range checks; text and null have none.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }
}

/// One flattened row of the vehicle table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VehicleRecord {
    pub source_id: String,
    pub vin_1_10: Option<String>,
    pub county: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub model_year: Option<i64>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub electric_vehicle_type: Option<String>,
    pub cafv_eligibility: Option<String>,
    pub electric_range: Option<i64>,
    pub base_msrp: Option<f64>,
    pub legislative_district: Option<i64>,
    pub dol_vehicle_id: Option<String>,
    pub vehicle_location: Option<String>,
    pub electric_utility: Option<String>,
    pub census_tract_2020: Option<String>,
    pub counties: Option<i64>,
    pub congressional_districts: Option<i64>,
    pub legislative_district_boundary: Option<i64>,
}

impl VehicleRecord {
    pub fn new(source_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            ..Default::default()
        }
    }

    /// Store a projected cell. The layout guarantees `value` matches the
    /// column's kind; a mismatching variant leaves the column absent.
    pub fn assign(&mut self, column: VehicleColumn, value: Value<String>) {
        let text = || match &value {
            Value::Text(s) => Some(s.clone()),
            _ => None,
        };
        let int = match value {
            Value::Integer(i) => Some(i),
            _ => None,
        };
        match column {
            VehicleColumn::Vin => self.vin_1_10 = text(),
            VehicleColumn::County => self.county = text(),
            VehicleColumn::City => self.city = text(),
            VehicleColumn::State => self.state = text(),
            VehicleColumn::PostalCode => self.postal_code = text(),
            VehicleColumn::ModelYear => self.model_year = int,
            VehicleColumn::Make => self.make = text(),
            VehicleColumn::Model => self.model = text(),
            VehicleColumn::ElectricVehicleType => self.electric_vehicle_type = text(),
            VehicleColumn::CafvEligibility => self.cafv_eligibility = text(),
            VehicleColumn::ElectricRange => self.electric_range = int,
            VehicleColumn::BaseMsrp => self.base_msrp = value.as_f64(),
            VehicleColumn::LegislativeDistrict => self.legislative_district = int,
            VehicleColumn::DolVehicleId => self.dol_vehicle_id = text(),
            VehicleColumn::VehicleLocation => self.vehicle_location = text(),
            VehicleColumn::ElectricUtility => self.electric_utility = text(),
            VehicleColumn::CensusTract2020 => self.census_tract_2020 = text(),
            VehicleColumn::Counties => self.counties = int,
            VehicleColumn::CongressionalDistricts => self.congressional_districts = int,
            VehicleColumn::LegislativeDistrictBoundary => self.legislative_district_boundary = int,
        }
    }

    /// Borrowed view of a single column.
    pub fn value(&self, column: VehicleColumn) -> Value<&str> {
        fn text(v: &Option<String>) -> Value<&str> {
            v.as_deref().map_or(Value::Null, Value::Text)
        }
        fn int<'a>(v: Option<i64>) -> Value<&'a str> {
            v.map_or(Value::Null, Value::Integer)
        }
        match column {
            VehicleColumn::Vin => text(&self.vin_1_10),
            VehicleColumn::County => text(&self.county),
            VehicleColumn::City => text(&self.city),
            VehicleColumn::State => text(&self.state),
            VehicleColumn::PostalCode => text(&self.postal_code),
            VehicleColumn::ModelYear => int(self.model_year),
            VehicleColumn::Make => text(&self.make),
            VehicleColumn::Model => text(&self.model),
            VehicleColumn::ElectricVehicleType => text(&self.electric_vehicle_type),
            VehicleColumn::CafvEligibility => text(&self.cafv_eligibility),
            VehicleColumn::ElectricRange => int(self.electric_range),
            VehicleColumn::BaseMsrp => self.base_msrp.map_or(Value::Null, Value::Double),
            VehicleColumn::LegislativeDistrict => int(self.legislative_district),
            VehicleColumn::DolVehicleId => text(&self.dol_vehicle_id),
            VehicleColumn::VehicleLocation => text(&self.vehicle_location),
            VehicleColumn::ElectricUtility => text(&self.electric_utility),
            VehicleColumn::CensusTract2020 => text(&self.census_tract_2020),
            VehicleColumn::Counties => int(self.counties),
            VehicleColumn::CongressionalDistricts => int(self.congressional_districts),
            VehicleColumn::LegislativeDistrictBoundary => int(self.legislative_district_boundary),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn layout_is_contiguous_and_unique() {
        let offsets: Vec<usize> = VEHICLE_LAYOUT.iter().map(|f| f.offset).collect();
        assert_eq!(offsets, (8..REQUIRED_WIDTH).collect::<Vec<_>>());

        let names: HashSet<&str> = VEHICLE_LAYOUT.iter().map(|f| f.column.name()).collect();
        assert_eq!(names.len(), VEHICLE_LAYOUT.len());
    }

    #[test]
    fn sentinel_slots_are_22_through_27() {
        let sentinel: Vec<usize> = VEHICLE_LAYOUT
            .iter()
            .filter(|f| f.sentinel)
            .map(|f| f.offset)
            .collect();
        assert_eq!(sentinel, vec![22, 23, 24, 25, 26, 27]);
    }

    #[test]
    fn assign_then_value() {
        let mut rec = VehicleRecord::new("a.json");
        rec.assign(VehicleColumn::Vin, Value::Text("5YJ3E1EB4L".into()));
        rec.assign(VehicleColumn::ModelYear, Value::Integer(2020));
        rec.assign(VehicleColumn::BaseMsrp, Value::Double(0.0));

        assert_eq!(rec.value(VehicleColumn::Vin), Value::Text("5YJ3E1EB4L"));
        assert_eq!(rec.value(VehicleColumn::ModelYear).as_f64(), Some(2020.0));
        assert_eq!(rec.base_msrp, Some(0.0));
        assert!(rec.value(VehicleColumn::Model).is_null());
    }
}
