use serde_json::Value as JsonValue;

use super::error::ProjectionError;
use crate::schema::{FieldKind, Value};

/// In-band text standing in for an absent value.
pub const NULL_SENTINEL: &str = "null";

/// Map the literal `"null"` sentinel to absence; everything else passes through.
pub fn normalize_sentinel(raw: &str) -> Option<&str> {
    if raw == NULL_SENTINEL {
        None
    } else {
        Some(raw)
    }
}

/// Walk a dotted path (`meta.view.approvals`) through nested objects.
pub fn get_path<'a>(value: &'a JsonValue, path: &str) -> Option<&'a JsonValue> {
    path.split('.')
        .try_fold(value, |node, key| node.as_object()?.get(key))
}

/// Integral view of a number; fractional values round half away from zero.
fn to_i64(n: f64) -> Option<i64> {
    if !n.is_finite() {
        return None;
    }
    let r = n.round();
    if r < i64::MIN as f64 || r > i64::MAX as f64 {
        return None;
    }
    Some(r as i64)
}

fn parse_i64(s: &str) -> Option<i64> {
    let s = s.trim();
    s.parse::<i64>()
        .ok()
        .or_else(|| s.parse::<f64>().ok().and_then(to_i64))
}

fn parse_f64(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Coerce one JSON cell to `kind`.
///
/// JSON null is absent. When `sentinel` is set the text `"null"` is absent
/// too, and that check runs before any numeric cast.
pub fn cast_cell(
    raw: &JsonValue,
    kind: FieldKind,
    sentinel: bool,
    column: &'static str,
) -> Result<Value<String>, ProjectionError> {
    let fail = || ProjectionError::Cast {
        column,
        raw: raw.to_string(),
        kind,
    };

    match raw {
        JsonValue::Null => Ok(Value::Null),
        JsonValue::String(s) => {
            let Some(s) = (if sentinel { normalize_sentinel(s) } else { Some(s.as_str()) }) else {
                return Ok(Value::Null);
            };
            match kind {
                FieldKind::Text => Ok(Value::Text(s.to_string())),
                FieldKind::Integer => parse_i64(s).map(Value::Integer).ok_or_else(fail),
                FieldKind::Double => parse_f64(s).map(Value::Double).ok_or_else(fail),
            }
        }
        JsonValue::Number(n) => match kind {
            FieldKind::Text => Ok(Value::Text(n.to_string())),
            FieldKind::Integer => n
                .as_i64()
                .or_else(|| n.as_f64().and_then(to_i64))
                .map(Value::Integer)
                .ok_or_else(fail),
            FieldKind::Double => n.as_f64().map(Value::Double).ok_or_else(fail),
        },
        JsonValue::Bool(b) => match kind {
            FieldKind::Text => Ok(Value::Text(b.to_string())),
            _ => Err(fail()),
        },
        JsonValue::Array(_) | JsonValue::Object(_) => match kind {
            FieldKind::Text => Ok(Value::Text(raw.to_string())),
            _ => Err(fail()),
        },
    }
}

/// Boolean coercion: JSON booleans, the usual textual spellings, and numbers
/// (zero is false).
pub fn cast_bool(raw: &JsonValue, column: &'static str) -> Result<Option<bool>, ProjectionError> {
    let fail = || ProjectionError::Boolean {
        column,
        raw: raw.to_string(),
    };
    match raw {
        JsonValue::Null => Ok(None),
        JsonValue::Bool(b) => Ok(Some(*b)),
        JsonValue::Number(n) => n.as_f64().map(|v| Some(v != 0.0)).ok_or_else(fail),
        JsonValue::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "yes" | "y" | "on" | "1" => Ok(Some(true)),
            "false" | "f" | "no" | "n" | "off" | "0" => Ok(Some(false)),
            _ => Err(fail()),
        },
        _ => Err(fail()),
    }
}
