// src/validate/rules.rs

use serde::Serialize;
use std::collections::HashMap;

use crate::schema::{Value, VehicleColumn, VehicleRecord};

/// Lowest model year the audit accepts.
pub const AUDIT_MIN_MODEL_YEAR: i32 = 1886;
/// Lowest model year admitted to the validated table.
pub const GATE_MIN_MODEL_YEAR: i32 = 1986;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckType {
    NotNull,
    Duplicate,
    Range,
}

impl CheckType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckType::NotNull => "NOT_NULL",
            CheckType::Duplicate => "DUPLICATE",
            CheckType::Range => "RANGE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bound {
    Inclusive(f64),
    Exclusive(f64),
}

/// Closed, open or half-open interval of accepted values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub lower: Bound,
    pub upper: Bound,
}

impl Bounds {
    pub const fn new(lower: Bound, upper: Bound) -> Self {
        Self { lower, upper }
    }

    pub fn contains(&self, v: f64) -> bool {
        let above = match self.lower {
            Bound::Inclusive(lo) => v >= lo,
            Bound::Exclusive(lo) => v > lo,
        };
        let below = match self.upper {
            Bound::Inclusive(hi) => v <= hi,
            Bound::Exclusive(hi) => v < hi,
        };
        above && below
    }
}

/// What the audit counts as an issue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Check {
    /// Rows where the column is absent.
    NotNull,
    /// Distinct values occurring more than once; absent values form one
    /// group of their own.
    Duplicate,
    /// Rows whose present value falls outside the bounds. Absent values
    /// are left to the not-null checks.
    Range(Bounds),
}

/// How a rule takes part in the validated-table filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gate {
    /// Counted in the audit only.
    Excluded,
    /// Row must have a value.
    Present,
    /// Row must have a value inside these bounds.
    Within(Bounds),
}

/// Hashable form of a cell, for grouping.
#[derive(Debug, PartialEq, Eq, Hash)]
enum GroupKey<'a> {
    Null,
    Text(&'a str),
    Integer(i64),
    Double(u64),
}

impl<'a> GroupKey<'a> {
    fn of(value: Value<&'a str>) -> Self {
        match value {
            Value::Null => GroupKey::Null,
            Value::Text(s) => GroupKey::Text(s),
            Value::Integer(i) => GroupKey::Integer(i),
            Value::Double(d) => GroupKey::Double(d.to_bits()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuleDescriptor {
    pub column: VehicleColumn,
    pub check: Check,
    pub gate: Gate,
}

impl RuleDescriptor {
    pub fn check_type(&self) -> CheckType {
        match self.check {
            Check::NotNull => CheckType::NotNull,
            Check::Duplicate => CheckType::Duplicate,
            Check::Range(_) => CheckType::Range,
        }
    }

    /// Issue count for this rule over the whole snapshot.
    pub fn count_issues(&self, records: &[VehicleRecord]) -> u64 {
        match self.check {
            Check::NotNull => records
                .iter()
                .filter(|r| r.value(self.column).is_null())
                .count() as u64,
            Check::Duplicate => {
                let mut seen: HashMap<GroupKey<'_>, usize> = HashMap::new();
                for key in records.iter().map(|r| GroupKey::of(r.value(self.column))) {
                    *seen.entry(key).or_default() += 1;
                }
                seen.values().filter(|&&n| n > 1).count() as u64
            }
            Check::Range(bounds) => records
                .iter()
                .filter(|r| {
                    r.value(self.column)
                        .as_f64()
                        .is_some_and(|v| !bounds.contains(v))
                })
                .count() as u64,
        }
    }

    /// Whether `record` passes this rule's gate.
    pub fn admits(&self, record: &VehicleRecord) -> bool {
        let value = record.value(self.column);
        match self.gate {
            Gate::Excluded => true,
            Gate::Present => !value.is_null(),
            Gate::Within(bounds) => value.as_f64().is_some_and(|v| bounds.contains(v)),
        }
    }
}

/// The fixed battery, in reporting order.
///
/// The model_year gate starts at 1986 while the audit starts at 1886, and the
/// duplicate check never gates. Both match the historical output tables.
pub fn rule_battery(current_year: i32) -> Vec<RuleDescriptor> {
    let electric_range = Bounds::new(Bound::Exclusive(0.0), Bound::Exclusive(1000.0));
    let base_msrp = Bounds::new(Bound::Inclusive(0.0), Bound::Exclusive(1_000_000.0));
    let year_hi = Bound::Inclusive(f64::from(current_year));

    vec![
        RuleDescriptor {
            column: VehicleColumn::Vin,
            check: Check::NotNull,
            gate: Gate::Present,
        },
        RuleDescriptor {
            column: VehicleColumn::Model,
            check: Check::NotNull,
            gate: Gate::Present,
        },
        RuleDescriptor {
            column: VehicleColumn::Vin,
            check: Check::Duplicate,
            gate: Gate::Excluded,
        },
        RuleDescriptor {
            column: VehicleColumn::ElectricRange,
            check: Check::Range(electric_range),
            gate: Gate::Within(electric_range),
        },
        RuleDescriptor {
            column: VehicleColumn::BaseMsrp,
            check: Check::Range(base_msrp),
            gate: Gate::Within(base_msrp),
        },
        RuleDescriptor {
            column: VehicleColumn::ModelYear,
            check: Check::Range(Bounds::new(
                Bound::Inclusive(f64::from(AUDIT_MIN_MODEL_YEAR)),
                year_hi,
            )),
            gate: Gate::Within(Bounds::new(
                Bound::Inclusive(f64::from(GATE_MIN_MODEL_YEAR)),
                year_hi,
            )),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_range(range: Option<i64>) -> VehicleRecord {
        VehicleRecord {
            electric_range: range,
            ..VehicleRecord::new("t.json")
        }
    }

    fn rule(column: VehicleColumn) -> RuleDescriptor {
        rule_battery(2025)
            .into_iter()
            .find(|r| r.column == column && r.check_type() == CheckType::Range)
            .unwrap()
    }

    #[test]
    fn battery_order() {
        let got: Vec<(&str, &str)> = rule_battery(2025)
            .iter()
            .map(|r| (r.check_type().as_str(), r.column.name()))
            .collect();
        assert_eq!(
            got,
            vec![
                ("NOT_NULL", "vin_1_10"),
                ("NOT_NULL", "model"),
                ("DUPLICATE", "vin_1_10"),
                ("RANGE", "electric_range"),
                ("RANGE", "base_msrp"),
                ("RANGE", "model_year"),
            ]
        );
    }

    #[test]
    fn electric_range_boundaries() {
        let r = rule(VehicleColumn::ElectricRange);
        let rows: Vec<_> = [0, 1000, 1, 999]
            .into_iter()
            .map(|v| with_range(Some(v)))
            .collect();
        assert_eq!(r.count_issues(&rows[..2]), 2);
        assert_eq!(r.count_issues(&rows[2..]), 0);
    }

    #[test]
    fn absent_values_do_not_violate_ranges_but_fail_gates() {
        let r = rule(VehicleColumn::ElectricRange);
        let row = with_range(None);
        assert_eq!(r.count_issues(std::slice::from_ref(&row)), 0);
        assert!(!r.admits(&row));
    }

    #[test]
    fn msrp_boundaries() {
        let r = rule(VehicleColumn::BaseMsrp);
        let rows: Vec<_> = [-0.01, 0.0, 999_999.99, 1_000_000.0]
            .into_iter()
            .map(|v| VehicleRecord {
                base_msrp: Some(v),
                ..VehicleRecord::new("t.json")
            })
            .collect();
        assert_eq!(r.count_issues(&rows), 2);
        assert!(r.admits(&rows[1]));
        assert!(!r.admits(&rows[3]));
    }

    #[test]
    fn model_year_audit_and_gate_disagree() {
        let r = rule(VehicleColumn::ModelYear);
        let row = VehicleRecord {
            model_year: Some(1900),
            ..VehicleRecord::new("t.json")
        };
        assert_eq!(r.count_issues(std::slice::from_ref(&row)), 0);
        assert!(!r.admits(&row));

        let future = VehicleRecord {
            model_year: Some(2026),
            ..VehicleRecord::new("t.json")
        };
        assert_eq!(r.count_issues(std::slice::from_ref(&future)), 1);
    }
}
