use crate::parameters::{ParamKind, ParamType};
use crate::types::DbId;

/// Domain errors raised before any database round-trip.
///
/// Every variant carries the data a caller needs to fix and resubmit the
/// request (the offending name, the counts, or the allowed database set).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Missing parameter: no value provided for '{name}'")]
    MissingParameter { name: String },

    #[error("Missing identifier: no value provided for '{name}'")]
    MissingIdentifier { name: String },

    #[error("{kind} count mismatch: expected {expected}, got {provided}")]
    Arity {
        kind: ParamKind,
        expected: usize,
        provided: usize,
    },

    #[error("Invalid type for parameter '{name}': expected {expected}")]
    TypeMismatch { name: String, expected: ParamType },

    #[error("Database '{requested}' is not available. Available databases: {}", allowed.join(", "))]
    UnavailableDatabase {
        requested: String,
        allowed: Vec<String>,
    },

    #[error("No database selected among the available databases: {}", allowed.join(", "))]
    AmbiguousDatabase { allowed: Vec<String> },

    #[error("Validation failed: {0}")]
    Validation(String),
}
