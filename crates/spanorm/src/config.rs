//! Session configuration.

use crate::connection::Staleness;

/// Which write path a transaction uses.
///
/// The two paths are mutually exclusive within one transaction; mixing them
/// fails fast with [`crate::OrmError::IncompatibleWriteMode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Parameterized INSERT/UPDATE/DELETE statements, optionally batched.
    Dml,
    /// Native mutations, applied atomically at commit.
    Mutation,
}

/// Configuration for a [`Session`](crate::Session).
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Write path for entities without a per-entity override.
    pub default_write_mode: WriteMode,
    /// Same-shaped DML statements in one flush coalesce into batch requests
    /// once their count exceeds this threshold; each batch carries at most
    /// this many statements.
    pub batch_threshold: usize,
    /// Whether generated SQL carries the hint comment block (the comment
    /// channel the interceptor consumes).
    pub emit_hint_comments: bool,
    /// Default staleness bound for standalone reads.
    pub read_staleness: Staleness,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_write_mode: WriteMode::Dml,
            batch_threshold: 100,
            emit_hint_comments: true,
            read_staleness: Staleness::Strong,
        }
    }
}

impl SessionConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default write mode.
    pub fn write_mode(mut self, mode: WriteMode) -> Self {
        self.default_write_mode = mode;
        self
    }

    /// Set the DML batching threshold.
    pub fn batch_threshold(mut self, threshold: usize) -> Self {
        self.batch_threshold = threshold.max(1);
        self
    }

    /// Toggle hint comment emission.
    pub fn emit_hint_comments(mut self, enabled: bool) -> Self {
        self.emit_hint_comments = enabled;
        self
    }

    /// Set the default read-staleness bound for standalone reads.
    pub fn read_staleness(mut self, staleness: Staleness) -> Self {
        self.read_staleness = staleness;
        self
    }
}
