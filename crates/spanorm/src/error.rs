//! Error types for spanorm

use crate::config::WriteMode;
use thiserror::Error;

/// Result type alias for spanorm operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Error types for the dialect, codec, and transaction layers
#[derive(Debug, Error)]
pub enum OrmError {
    /// Network / transport error from the underlying connection
    #[error("Connection error: {0}")]
    Connection(String),

    /// A value's runtime type disagrees with its declared Spanner type
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    /// A SQL fragment with no known Spanner-native equivalent
    #[error("Unsupported dialect translation: {0}")]
    UnsupportedTranslation(String),

    /// Optimistic-concurrency version check failed on UPDATE/DELETE.
    ///
    /// Recoverable: the caller may reload the row and retry with fresh data.
    /// spanorm never retries internally, since a blind retry could mask a
    /// real conflict.
    #[error("Stale version for {table} key ({key}): row was changed or deleted concurrently")]
    StaleVersion { table: String, key: String },

    /// DML and mutation writes were mixed inside one transaction.
    ///
    /// Fatal to the transaction; raised at the moment the conflicting write
    /// is queued, and the transaction must be rolled back.
    #[error("Incompatible write modes in one transaction: {active:?} already active, {requested:?} requested")]
    IncompatibleWriteMode {
        active: WriteMode,
        requested: WriteMode,
    },

    /// Invalid transaction-state transition (commit without begin, etc.)
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl OrmError {
    /// Create a type-mismatch error
    pub fn type_mismatch(expected: impl Into<String>, got: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            got: got.into(),
        }
    }

    /// Create a stale-version error for a keyed row
    pub fn stale_version(table: impl Into<String>, key: impl Into<String>) -> Self {
        Self::StaleVersion {
            table: table.into(),
            key: key.into(),
        }
    }

    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a connection error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Check if this is a stale-version conflict
    pub fn is_stale_version(&self) -> bool {
        matches!(self, Self::StaleVersion { .. })
    }

    /// Check if this is a type-mismatch error
    pub fn is_type_mismatch(&self) -> bool {
        matches!(self, Self::TypeMismatch { .. })
    }

    /// Whether the caller can recover by reloading data and retrying.
    ///
    /// Only stale-version conflicts are recoverable; everything else is
    /// fatal to the operation or to the whole transaction.
    pub fn is_recoverable(&self) -> bool {
        self.is_stale_version()
    }
}
