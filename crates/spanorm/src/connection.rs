//! The downstream network protocol, as a trait.
//!
//! The wire-level RPC transport is an external collaborator; this trait is
//! the interface it presents. All suspension points of the adapter layer are
//! exactly these calls. Any in-flight call may be cancelled by the caller
//! (dropping the future); the coordinator guarantees its own state stays
//! retry-safe across a cancelled flush.

use crate::codec::{self, Value, WireValue};
use crate::error::OrmResult;
use crate::mutation::Mutation;
use crate::types::SpannerType;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Opaque handle for a server-side read-write transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionHandle(pub String);

/// Read-staleness bound for standalone reads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Staleness {
    /// Read the latest committed data.
    Strong,
    /// Read data at least this stale.
    ExactStaleness(Duration),
    /// Read data as of a fixed timestamp.
    ReadTimestamp(DateTime<Utc>),
}

impl Default for Staleness {
    fn default() -> Self {
        Staleness::Strong
    }
}

/// Options for a single-use read-only execution.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ReadOptions {
    pub staleness: Staleness,
}

/// One wire-encoded parameter: name (without `@`), declared type, value.
pub type WireParam = (String, SpannerType, WireValue);

/// One execute-SQL request.
#[derive(Debug, Clone)]
pub struct ExecuteRequest {
    pub sql: String,
    pub params: Vec<WireParam>,
    /// Execute inside this read-write transaction when set.
    pub transaction: Option<TransactionHandle>,
    /// Execute as a standalone read-only operation when set. Mutually
    /// exclusive with `transaction`.
    pub read_only: Option<ReadOptions>,
}

/// One statement of an execute-batch request.
#[derive(Debug, Clone)]
pub struct BatchStatement {
    pub sql: String,
    pub params: Vec<WireParam>,
}

/// Result of an execute-SQL request.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<WireValue>>,
    /// Affected row count for DML; `None` for queries.
    pub affected_rows: Option<u64>,
}

impl ResultSet {
    /// Decode every row under the given declared column types.
    pub fn decode_rows(&self, types: &[SpannerType]) -> OrmResult<Vec<Vec<Value>>> {
        let mut out = Vec::with_capacity(self.rows.len());
        for row in &self.rows {
            let mut decoded = Vec::with_capacity(row.len());
            for (wire, ty) in row.iter().zip(types) {
                decoded.push(codec::decode(wire, ty)?);
            }
            out.push(decoded);
        }
        Ok(out)
    }
}

/// The connection the coordinator drives.
///
/// One coordinator instance per session; implementations are not required to
/// provide any internal locking beyond what the transport itself needs.
pub trait Connection: Send + Sync {
    /// Execute a single SQL statement.
    fn execute_sql(
        &self,
        request: ExecuteRequest,
    ) -> impl std::future::Future<Output = OrmResult<ResultSet>> + Send;

    /// Execute an ordered list of DML statements sharing one transaction.
    ///
    /// Returns per-statement affected-row counts, in input order.
    fn execute_batch_dml(
        &self,
        transaction: &TransactionHandle,
        statements: Vec<BatchStatement>,
    ) -> impl std::future::Future<Output = OrmResult<Vec<u64>>> + Send;

    /// Begin a read-write transaction.
    fn begin_transaction(
        &self,
    ) -> impl std::future::Future<Output = OrmResult<TransactionHandle>> + Send;

    /// Commit a transaction together with its ordered mutation list.
    ///
    /// Returns the commit timestamp.
    fn commit(
        &self,
        transaction: TransactionHandle,
        mutations: Vec<Mutation>,
    ) -> impl std::future::Future<Output = OrmResult<DateTime<Utc>>> + Send;

    /// Roll back a transaction.
    fn rollback(
        &self,
        transaction: TransactionHandle,
    ) -> impl std::future::Future<Output = OrmResult<()>> + Send;

    /// Submit an ordered batch of DDL statements.
    fn execute_ddl(
        &self,
        statements: &[String],
    ) -> impl std::future::Future<Output = OrmResult<()>> + Send;
}
