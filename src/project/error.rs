use thiserror::Error;

use crate::schema::FieldKind;

/// Why a single raw row or approval entry was skipped.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProjectionError {
    #[error("row is not an array")]
    NotAnArray,

    #[error("row has {found} entries, need at least {required}")]
    ShortRow { found: usize, required: usize },

    #[error("approval entry is not an object")]
    NotAnObject,

    #[error("column {column}: cannot cast {raw} to {kind:?}")]
    Cast {
        column: &'static str,
        raw: String,
        kind: FieldKind,
    },

    #[error("column {column}: cannot cast {raw} to boolean")]
    Boolean { column: &'static str, raw: String },

    #[error("column {column}: epoch {seconds} out of range")]
    Epoch { column: &'static str, seconds: i64 },
}
