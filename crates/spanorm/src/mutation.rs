//! Native mutation model: the key-value write API Spanner offers as an
//! alternative to DML.
//!
//! Mutations cannot express arbitrary WHERE predicates; the coordinator
//! compensates with existence-check reads for version validation (see
//! [`crate::session`]).

use crate::codec::Value;

/// Kind of native mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOp {
    Insert,
    Update,
    Delete,
}

/// One native mutation: an operation against one table.
///
/// For `Insert`/`Update`, `columns` names the written columns and each row
/// in `rows` carries the values in the same order. For `Delete`, `columns`
/// names the primary-key columns and each row is a key tuple.
#[derive(Debug, Clone, PartialEq)]
pub struct Mutation {
    pub op: MutationOp,
    pub table: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

/// Mutations accumulated across flushes within one transaction.
///
/// Owned exclusively by the transaction scope: at most one batch per active
/// transaction, cleared on commit or rollback. A flush appends to the batch
/// only after the whole flush has succeeded, so a failed or cancelled flush
/// leaves the batch untouched and a retry is safe.
#[derive(Debug, Default)]
pub struct PendingMutationBatch {
    mutations: Vec<Mutation>,
}

impl PendingMutationBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    /// Append a fully-staged flush worth of mutations.
    pub fn append(&mut self, mut staged: Vec<Mutation>) {
        self.mutations.append(&mut staged);
    }

    /// Drain the batch for a commit call.
    pub fn take(&mut self) -> Vec<Mutation> {
        std::mem::take(&mut self.mutations)
    }

    /// Discard everything (rollback).
    pub fn clear(&mut self) {
        self.mutations.clear();
    }

    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }
}
