//! Error types for spanorm-schema

use thiserror::Error;

/// Result type for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Error type for introspection and reconciliation.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Error from the underlying connection or codec.
    #[error(transparent)]
    Orm(#[from] spanorm::OrmError),

    /// The catalog diverges from the desired schema in ways the differ is
    /// not authorized to reconcile (e.g. a changed column type).
    ///
    /// Lists every discrepancy found, not just the first.
    #[error("Unresolvable schema drift ({} discrepancies): {}", .0.len(), .0.join("; "))]
    Drift(Vec<String>),

    /// Validation error (malformed model, unknown reference, ...).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Decode error when reading a catalog row.
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },
}

impl SchemaError {
    /// Create a decode error.
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        SchemaError::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        SchemaError::Validation(message.into())
    }
}
