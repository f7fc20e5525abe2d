//! Transaction & mutation coordinator.
//!
//! One [`Session`] per logical ORM session. For every entity write the
//! session decides the execution strategy (parameterized DML, batched DML,
//! or native mutations) and maintains the optimistic-concurrency contract:
//!
//! - DML path: INSERT binds version = 1; UPDATE/DELETE carry
//!   `WHERE <pk> = @.. AND <version> = @..` with the previously-read version
//!   and UPDATE increments the version by 1 in its SET list. Zero affected
//!   rows is a stale-version conflict, not a generic "not found".
//! - Mutation path: mutations cannot express a WHERE clause, so UPDATE and
//!   DELETE first run a `SELECT 1` existence check against the transaction's
//!   own read snapshot. A failed check marks the transaction stale; commit
//!   then rolls back and fails with the same stale-version error kind, with
//!   no mutation applied.
//!
//! The two write paths are mutually exclusive within one transaction; the
//! conflicting enqueue fails immediately. Without an explicit transaction,
//! every flush is its own implicit transaction. The session never retries
//! anything internally.

use crate::codec::{self, Value};
use crate::config::{SessionConfig, WriteMode};
use crate::connection::{
    BatchStatement, Connection, ExecuteRequest, ReadOptions, ResultSet, Staleness,
    TransactionHandle, WireParam,
};
use crate::error::{OrmError, OrmResult};
use crate::hints::{self, HintSpec};
use crate::mutation::{Mutation, MutationOp, PendingMutationBatch};
use crate::registry::{ColumnMapping, EntityMapping, MappingRegistry};
use crate::statement::{ParameterBinding, Statement, StatementBuilder};
use crate::types::SpannerType;
use chrono::{DateTime, Utc};
use tracing::debug;

/// Kind of entity write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOp {
    Insert,
    Update,
    Delete,
}

/// One entity-level write handed down by the ORM pipeline.
#[derive(Debug, Clone)]
pub struct EntityWrite {
    pub entity: String,
    pub op: WriteOp,
    /// Primary-key values, in key-column order.
    pub key: Vec<Value>,
    /// Data-column values, in declared-entity order. Empty for deletes.
    pub values: Vec<Value>,
    /// The version read when the entity was loaded. Required for
    /// UPDATE/DELETE on versioned entities.
    pub read_version: Option<i64>,
}

impl EntityWrite {
    pub fn insert(entity: impl Into<String>, key: Vec<Value>, values: Vec<Value>) -> Self {
        Self {
            entity: entity.into(),
            op: WriteOp::Insert,
            key,
            values,
            read_version: None,
        }
    }

    pub fn update(
        entity: impl Into<String>,
        key: Vec<Value>,
        values: Vec<Value>,
        read_version: Option<i64>,
    ) -> Self {
        Self {
            entity: entity.into(),
            op: WriteOp::Update,
            key,
            values,
            read_version,
        }
    }

    pub fn delete(entity: impl Into<String>, key: Vec<Value>, read_version: Option<i64>) -> Self {
        Self {
            entity: entity.into(),
            op: WriteOp::Delete,
            key,
            values: Vec::new(),
            read_version,
        }
    }
}

/// State of the currently-open explicit transaction.
struct TxState {
    handle: TransactionHandle,
    mutations: PendingMutationBatch,
    /// Failed existence checks: (table, key display). Surfaced at commit.
    stale: Vec<(String, String)>,
    /// Set when an incompatible write mode was queued; the transaction can
    /// only be rolled back.
    poisoned: bool,
}

impl TxState {
    fn new(handle: TransactionHandle) -> Self {
        Self {
            handle,
            mutations: PendingMutationBatch::new(),
            stale: Vec::new(),
            poisoned: false,
        }
    }
}

/// A planned DML statement, ready to execute.
struct PlannedDml {
    stmt: Statement,
    /// Whether a zero affected-row count signals a stale version.
    check_version: bool,
    table: String,
    key: String,
}

/// The transaction & mutation coordinator.
///
/// # Example
/// ```ignore
/// let registry = MappingRegistry::new().with(
///     EntityMapping::new("Singer", "Singers")
///         .key_column("SingerId", SpannerType::Int64)
///         .data_column("FirstName", SpannerType::String)
///         .versioned("Version"),
/// );
/// let mut session = Session::new(conn, registry, SessionConfig::new());
///
/// session.queue_write(EntityWrite::insert(
///     "Singer",
///     vec![Value::Int64(1)],
///     vec![Value::String("Alice".into())],
/// ))?;
/// session.flush().await?; // implicit transaction: begin, execute, commit
/// ```
pub struct Session<C: Connection> {
    conn: C,
    registry: MappingRegistry,
    config: SessionConfig,
    pending: Vec<EntityWrite>,
    /// Write mode of the current transaction scope (queued writes plus any
    /// open transaction). Reset when the scope ends.
    scope_mode: Option<WriteMode>,
    tx: Option<TxState>,
}

impl<C: Connection> Session<C> {
    pub fn new(conn: C, registry: MappingRegistry, config: SessionConfig) -> Self {
        Self {
            conn,
            registry,
            config,
            pending: Vec::new(),
            scope_mode: None,
            tx: None,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn in_transaction(&self) -> bool {
        self.tx.is_some()
    }

    /// Number of queued, unflushed writes.
    pub fn pending_writes(&self) -> usize {
        self.pending.len()
    }

    /// Mutations staged in the open transaction, if any.
    pub fn staged_mutations(&self) -> usize {
        self.tx.as_ref().map_or(0, |tx| tx.mutations.len())
    }

    // ─── Hint emission (upstream side of the comment channel) ───────────

    /// Append the hint comment block to generated SQL, when emission is
    /// enabled. The interceptor strips and splices it at execution time.
    pub fn attach_hint_comment(&self, sql: &str, spec: &HintSpec) -> String {
        if !self.config.emit_hint_comments || spec.is_empty() {
            return sql.to_string();
        }
        format!("{sql} {}", spec.to_comment())
    }

    // ─── Transaction lifecycle ──────────────────────────────────────────

    /// Open an explicit read-write transaction.
    pub async fn begin(&mut self) -> OrmResult<()> {
        if self.tx.is_some() {
            return Err(OrmError::Transaction(
                "a transaction is already open on this session".to_string(),
            ));
        }
        let handle = self.conn.begin_transaction().await?;
        debug!(transaction = %handle.0, "begin explicit transaction");
        self.tx = Some(TxState::new(handle));
        Ok(())
    }

    /// Flush queued writes and commit the explicit transaction.
    ///
    /// Fails with [`OrmError::StaleVersion`] (after rolling back) when any
    /// mutation-path existence check came back empty, leaving the underlying
    /// tables unchanged.
    pub async fn commit(&mut self) -> OrmResult<DateTime<Utc>> {
        if self.tx.is_none() {
            return Err(OrmError::Transaction(
                "commit without an open transaction".to_string(),
            ));
        }
        if self.tx.as_ref().is_some_and(|tx| tx.poisoned) {
            let Some(mut tx) = self.tx.take() else {
                return Err(OrmError::Transaction(
                    "commit without an open transaction".to_string(),
                ));
            };
            self.pending.clear();
            self.scope_mode = None;
            tx.mutations.clear();
            self.conn.rollback(tx.handle).await?;
            return Err(OrmError::Transaction(
                "transaction aborted: DML and mutation writes were mixed".to_string(),
            ));
        }
        self.flush().await?;

        let Some(mut tx) = self.tx.take() else {
            return Err(OrmError::Transaction(
                "commit without an open transaction".to_string(),
            ));
        };

        if let Some((table, key)) = tx.stale.first().cloned() {
            tx.mutations.clear();
            self.conn.rollback(tx.handle).await?;
            self.scope_mode = None;
            return Err(OrmError::stale_version(table, key));
        }

        let mutations = tx.mutations.take();
        let commit_ts = self.conn.commit(tx.handle, mutations).await?;
        self.scope_mode = None;
        debug!(%commit_ts, "explicit transaction committed");
        Ok(commit_ts)
    }

    /// Roll back the explicit transaction, discarding queued writes and the
    /// pending mutation batch.
    pub async fn rollback(&mut self) -> OrmResult<()> {
        let Some(mut tx) = self.tx.take() else {
            return Err(OrmError::Transaction(
                "rollback without an open transaction".to_string(),
            ));
        };
        self.pending.clear();
        self.scope_mode = None;
        tx.mutations.clear();
        self.conn.rollback(tx.handle).await
    }

    // ─── Write queueing ─────────────────────────────────────────────────

    /// Queue an entity write for the next flush.
    ///
    /// Fails fast with [`OrmError::IncompatibleWriteMode`] when the write's
    /// resolved mode conflicts with the mode already active in the current
    /// transaction scope.
    pub fn queue_write(&mut self, write: EntityWrite) -> OrmResult<()> {
        let mapping = self.registry.get(&write.entity)?;
        let mode = mapping.write_mode.unwrap_or(self.config.default_write_mode);

        validate_shape(mapping, &write)?;

        if let Some(active) = self.scope_mode {
            if active != mode {
                if let Some(tx) = self.tx.as_mut() {
                    tx.poisoned = true;
                }
                return Err(OrmError::IncompatibleWriteMode {
                    active,
                    requested: mode,
                });
            }
        }
        self.scope_mode = Some(mode);
        self.pending.push(write);
        Ok(())
    }

    // ─── Flush ──────────────────────────────────────────────────────────

    /// Execute all queued writes.
    ///
    /// With an explicit transaction open, statements and staged mutations
    /// share that transaction; otherwise this flush is one implicit
    /// transaction (begin, execute, commit). Queued writes are only drained
    /// once the flush has fully succeeded, so a failed or cancelled flush
    /// is safe to retry and never leaves a half-staged mutation batch.
    pub async fn flush(&mut self) -> OrmResult<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        if self.tx.as_ref().is_some_and(|tx| tx.poisoned) {
            return Err(OrmError::Transaction(
                "transaction aborted: DML and mutation writes were mixed".to_string(),
            ));
        }
        match self.scope_mode.unwrap_or(self.config.default_write_mode) {
            WriteMode::Dml => self.flush_dml().await,
            WriteMode::Mutation => self.flush_mutations().await,
        }
    }

    async fn flush_dml(&mut self) -> OrmResult<()> {
        let plan = self.plan_dml()?;

        match &self.tx {
            Some(tx) => {
                let handle = tx.handle.clone();
                self.execute_dml_plan(&handle, &plan).await?;
                self.pending.clear();
                Ok(())
            }
            None => {
                let handle = self.conn.begin_transaction().await?;
                debug!(statements = plan.len(), "implicit transaction flush (DML)");
                match self.execute_dml_plan(&handle, &plan).await {
                    Ok(()) => {
                        self.conn.commit(handle, Vec::new()).await?;
                        self.pending.clear();
                        self.scope_mode = None;
                        Ok(())
                    }
                    Err(error) => match self.conn.rollback(handle).await {
                        Ok(()) => Err(error),
                        Err(rollback_err) => Err(OrmError::Other(format!(
                            "{error} (rollback failed: {rollback_err})"
                        ))),
                    },
                }
            }
        }
    }

    async fn flush_mutations(&mut self) -> OrmResult<()> {
        let explicit = self.tx.is_some();
        let handle = match &self.tx {
            Some(tx) => tx.handle.clone(),
            None => self.conn.begin_transaction().await?,
        };

        let mut staged: Vec<Mutation> = Vec::new();
        let mut stale: Vec<(String, String)> = Vec::new();
        let staging = self.stage_mutations(&handle, &mut staged, &mut stale).await;

        if explicit {
            staging?;
            let Some(tx) = self.tx.as_mut() else {
                return Err(OrmError::Transaction("transaction vanished during flush".to_string()));
            };
            tx.mutations.append(staged);
            tx.stale.extend(stale);
            self.pending.clear();
            Ok(())
        } else {
            let outcome = match staging {
                Err(e) => Err(e),
                Ok(()) => match stale.first().cloned() {
                    Some((table, key)) => Err(OrmError::stale_version(table, key)),
                    None => Ok(()),
                },
            };
            match outcome {
                Ok(()) => {
                    debug!(mutations = staged.len(), "implicit transaction flush (mutations)");
                    self.conn.commit(handle, staged).await?;
                    self.pending.clear();
                    self.scope_mode = None;
                    Ok(())
                }
                Err(error) => match self.conn.rollback(handle).await {
                    Ok(()) => Err(error),
                    Err(rollback_err) => Err(OrmError::Other(format!(
                        "{error} (rollback failed: {rollback_err})"
                    ))),
                },
            }
        }
    }

    // ─── Reads ──────────────────────────────────────────────────────────

    /// Execute a query.
    ///
    /// Inside an explicit transaction the query shares its snapshot (and
    /// sees its own writes). Otherwise it runs as a standalone single-use
    /// read under the configured staleness bound — a read never opens a
    /// read-write transaction and never triggers a commit.
    pub async fn query(&self, stmt: &Statement) -> OrmResult<ResultSet> {
        let sql = hints::apply(stmt.sql(), stmt.hints());
        let params = encode_params(stmt.params())?;
        let request = match &self.tx {
            Some(tx) => ExecuteRequest {
                sql,
                params,
                transaction: Some(tx.handle.clone()),
                read_only: None,
            },
            None => ExecuteRequest {
                sql,
                params,
                transaction: None,
                read_only: Some(ReadOptions {
                    staleness: self.config.read_staleness,
                }),
            },
        };
        self.conn.execute_sql(request).await
    }

    /// Execute a standalone read under an explicit staleness bound,
    /// regardless of any open transaction.
    pub async fn query_at(&self, stmt: &Statement, staleness: Staleness) -> OrmResult<ResultSet> {
        let sql = hints::apply(stmt.sql(), stmt.hints());
        let params = encode_params(stmt.params())?;
        self.conn
            .execute_sql(ExecuteRequest {
                sql,
                params,
                transaction: None,
                read_only: Some(ReadOptions { staleness }),
            })
            .await
    }

    // ─── DML planning and execution ─────────────────────────────────────

    fn plan_dml(&self) -> OrmResult<Vec<PlannedDml>> {
        let mut plan = Vec::with_capacity(self.pending.len());
        for write in &self.pending {
            let mapping = self.registry.get(&write.entity)?;
            let stmt = match write.op {
                WriteOp::Insert => build_insert_dml(mapping, write)?,
                WriteOp::Update => build_update_dml(mapping, write)?,
                WriteOp::Delete => build_delete_dml(mapping, write)?,
            };
            plan.push(PlannedDml {
                stmt,
                check_version: mapping.is_versioned() && write.op != WriteOp::Insert,
                table: mapping.table.clone(),
                key: key_display(&write.key),
            });
        }
        Ok(plan)
    }

    /// Execute a plan, coalescing consecutive same-shaped statements into
    /// batch requests once the run exceeds the batch threshold.
    ///
    /// Within the transaction, statements execute in queue order; batched
    /// runs preserve input order inside each batch request.
    async fn execute_dml_plan(
        &self,
        handle: &TransactionHandle,
        plan: &[PlannedDml],
    ) -> OrmResult<()> {
        let threshold = self.config.batch_threshold;
        let mut idx = 0;
        while idx < plan.len() {
            let mut run_end = idx + 1;
            while run_end < plan.len() && plan[run_end].stmt.sql() == plan[idx].stmt.sql() {
                run_end += 1;
            }
            let run = &plan[idx..run_end];

            if run.len() > threshold {
                debug!(
                    shape = run[0].stmt.sql(),
                    count = run.len(),
                    batches = run.len().div_ceil(threshold),
                    "coalescing same-shaped DML into batches"
                );
                for chunk in run.chunks(threshold) {
                    let statements = chunk
                        .iter()
                        .map(|item| {
                            Ok(BatchStatement {
                                sql: item.stmt.sql().to_string(),
                                params: encode_params(item.stmt.params())?,
                            })
                        })
                        .collect::<OrmResult<Vec<_>>>()?;
                    let counts = self.conn.execute_batch_dml(handle, statements).await?;
                    for (item, count) in chunk.iter().zip(counts) {
                        check_affected(item, count)?;
                    }
                }
            } else {
                for item in run {
                    let result = self
                        .conn
                        .execute_sql(ExecuteRequest {
                            sql: item.stmt.sql().to_string(),
                            params: encode_params(item.stmt.params())?,
                            transaction: Some(handle.clone()),
                            read_only: None,
                        })
                        .await?;
                    check_affected(item, result.affected_rows.unwrap_or(0))?;
                }
            }
            idx = run_end;
        }
        Ok(())
    }

    // ─── Mutation staging ───────────────────────────────────────────────

    async fn stage_mutations(
        &self,
        handle: &TransactionHandle,
        staged: &mut Vec<Mutation>,
        stale: &mut Vec<(String, String)>,
    ) -> OrmResult<()> {
        for write in &self.pending {
            let mapping = self.registry.get(&write.entity)?;
            match write.op {
                WriteOp::Insert => staged.push(build_insert_mutation(mapping, write)),
                WriteOp::Update => {
                    if mapping.is_versioned() && !self.version_check(handle, mapping, write).await? {
                        stale.push((mapping.table.clone(), key_display(&write.key)));
                        continue;
                    }
                    staged.push(build_update_mutation(mapping, write));
                }
                WriteOp::Delete => {
                    if mapping.is_versioned() && !self.version_check(handle, mapping, write).await? {
                        stale.push((mapping.table.clone(), key_display(&write.key)));
                        continue;
                    }
                    staged.push(build_delete_mutation(mapping, write));
                }
            }
        }
        Ok(())
    }

    /// Lightweight existence check on the transaction's own read snapshot:
    /// `SELECT 1 FROM <table> WHERE <pk> = @.. AND <version> = @..`.
    async fn version_check(
        &self,
        handle: &TransactionHandle,
        mapping: &EntityMapping,
        write: &EntityWrite,
    ) -> OrmResult<bool> {
        let stmt = build_version_check(mapping, write)?;
        let result = self
            .conn
            .execute_sql(ExecuteRequest {
                sql: stmt.sql().to_string(),
                params: encode_params(stmt.params())?,
                transaction: Some(handle.clone()),
                read_only: None,
            })
            .await?;
        Ok(!result.rows.is_empty())
    }
}

// ─── Statement construction ─────────────────────────────────────────────────

fn validate_shape(mapping: &EntityMapping, write: &EntityWrite) -> OrmResult<()> {
    if write.key.len() != mapping.key_columns.len() {
        return Err(OrmError::validation(format!(
            "entity '{}' expects {} key values, got {}",
            mapping.entity,
            mapping.key_columns.len(),
            write.key.len()
        )));
    }
    match write.op {
        WriteOp::Insert | WriteOp::Update => {
            if write.values.len() != mapping.data_columns.len() {
                return Err(OrmError::validation(format!(
                    "entity '{}' expects {} data values, got {}",
                    mapping.entity,
                    mapping.data_columns.len(),
                    write.values.len()
                )));
            }
        }
        WriteOp::Delete => {
            if !write.values.is_empty() {
                return Err(OrmError::validation(
                    "delete writes carry no data values".to_string(),
                ));
            }
        }
    }
    if mapping.is_versioned() && write.op != WriteOp::Insert && write.read_version.is_none() {
        return Err(OrmError::validation(format!(
            "versioned entity '{}' requires the previously-read version for {:?}",
            mapping.entity, write.op
        )));
    }
    Ok(())
}

/// Data columns the coordinator actually writes: generated columns are
/// computed by the database and skipped.
fn writable_data<'a>(
    mapping: &'a EntityMapping,
    write: &'a EntityWrite,
) -> Vec<(&'a ColumnMapping, &'a Value)> {
    mapping
        .data_columns
        .iter()
        .zip(&write.values)
        .filter(|(column, _)| !column.generated)
        .collect()
}

fn build_insert_dml(mapping: &EntityMapping, write: &EntityWrite) -> OrmResult<Statement> {
    let data = writable_data(mapping, write);
    let mut columns: Vec<&str> = mapping.key_columns.iter().map(|c| c.name.as_str()).collect();
    columns.extend(data.iter().map(|(c, _)| c.name.as_str()));
    if let Some(version) = &mapping.version_column {
        columns.push(version);
    }

    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("@p{i}")).collect();
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        mapping.table,
        columns.join(", "),
        placeholders.join(", ")
    );

    let mut builder = StatementBuilder::new(sql)?;
    for (column, value) in mapping.key_columns.iter().zip(&write.key) {
        builder = builder.bind(column.declared_type.clone(), value.clone());
    }
    for (column, value) in &data {
        builder = builder.bind(column.declared_type.clone(), (*value).clone());
    }
    if mapping.version_column.is_some() {
        // Every INSERT starts the version token at 1.
        builder = builder.bind(SpannerType::Int64, Value::Int64(1));
    }
    Ok(builder.build())
}

fn build_update_dml(mapping: &EntityMapping, write: &EntityWrite) -> OrmResult<Statement> {
    let data = writable_data(mapping, write);
    let mut sets: Vec<String> = Vec::new();
    let mut param = 0usize;
    for (column, _) in &data {
        param += 1;
        sets.push(format!("{} = @p{param}", column.name));
    }
    if let Some(version) = &mapping.version_column {
        param += 1;
        sets.push(format!("{version} = @p{param}"));
    }

    let mut wheres: Vec<String> = Vec::new();
    for column in &mapping.key_columns {
        param += 1;
        wheres.push(format!("{} = @p{param}", column.name));
    }
    if let Some(version) = &mapping.version_column {
        param += 1;
        wheres.push(format!("{version} = @p{param}"));
    }

    let sql = format!(
        "UPDATE {} SET {} WHERE {}",
        mapping.table,
        sets.join(", "),
        wheres.join(" AND ")
    );

    let mut builder = StatementBuilder::new(sql)?;
    for (column, value) in &data {
        builder = builder.bind(column.declared_type.clone(), (*value).clone());
    }
    if mapping.version_column.is_some() {
        let read = write.read_version.unwrap_or(0);
        builder = builder.bind(SpannerType::Int64, Value::Int64(read + 1));
    }
    for (column, value) in mapping.key_columns.iter().zip(&write.key) {
        builder = builder.bind(column.declared_type.clone(), value.clone());
    }
    if mapping.version_column.is_some() {
        let read = write.read_version.unwrap_or(0);
        builder = builder.bind(SpannerType::Int64, Value::Int64(read));
    }
    Ok(builder.build())
}

fn build_delete_dml(mapping: &EntityMapping, write: &EntityWrite) -> OrmResult<Statement> {
    let mut wheres: Vec<String> = Vec::new();
    let mut param = 0usize;
    for column in &mapping.key_columns {
        param += 1;
        wheres.push(format!("{} = @p{param}", column.name));
    }
    if let Some(version) = &mapping.version_column {
        param += 1;
        wheres.push(format!("{version} = @p{param}"));
    }

    let sql = format!("DELETE FROM {} WHERE {}", mapping.table, wheres.join(" AND "));

    let mut builder = StatementBuilder::new(sql)?;
    for (column, value) in mapping.key_columns.iter().zip(&write.key) {
        builder = builder.bind(column.declared_type.clone(), value.clone());
    }
    if mapping.version_column.is_some() {
        let read = write.read_version.unwrap_or(0);
        builder = builder.bind(SpannerType::Int64, Value::Int64(read));
    }
    Ok(builder.build())
}

fn build_version_check(mapping: &EntityMapping, write: &EntityWrite) -> OrmResult<Statement> {
    let mut wheres: Vec<String> = Vec::new();
    let mut param = 0usize;
    for column in &mapping.key_columns {
        param += 1;
        wheres.push(format!("{} = @p{param}", column.name));
    }
    let Some(version) = &mapping.version_column else {
        return Err(OrmError::validation(format!(
            "entity '{}' is not versioned",
            mapping.entity
        )));
    };
    param += 1;
    wheres.push(format!("{version} = @p{param}"));

    let sql = format!("SELECT 1 FROM {} WHERE {}", mapping.table, wheres.join(" AND "));

    let mut builder = StatementBuilder::new(sql)?;
    for (column, value) in mapping.key_columns.iter().zip(&write.key) {
        builder = builder.bind(column.declared_type.clone(), value.clone());
    }
    let read = write.read_version.unwrap_or(0);
    builder = builder.bind(SpannerType::Int64, Value::Int64(read));
    Ok(builder.build())
}

fn mutation_columns_and_row(
    mapping: &EntityMapping,
    write: &EntityWrite,
    version: i64,
) -> (Vec<String>, Vec<Value>) {
    let data = writable_data(mapping, write);
    let mut columns: Vec<String> = mapping.key_columns.iter().map(|c| c.name.clone()).collect();
    columns.extend(data.iter().map(|(c, _)| c.name.clone()));
    let mut row: Vec<Value> = write.key.clone();
    row.extend(data.iter().map(|(_, v)| (*v).clone()));
    if let Some(version_column) = &mapping.version_column {
        columns.push(version_column.clone());
        row.push(Value::Int64(version));
    }
    (columns, row)
}

fn build_insert_mutation(mapping: &EntityMapping, write: &EntityWrite) -> Mutation {
    let (columns, row) = mutation_columns_and_row(mapping, write, 1);
    Mutation {
        op: MutationOp::Insert,
        table: mapping.table.clone(),
        columns,
        rows: vec![row],
    }
}

fn build_update_mutation(mapping: &EntityMapping, write: &EntityWrite) -> Mutation {
    let (columns, row) =
        mutation_columns_and_row(mapping, write, write.read_version.unwrap_or(0) + 1);
    Mutation {
        op: MutationOp::Update,
        table: mapping.table.clone(),
        columns,
        rows: vec![row],
    }
}

fn build_delete_mutation(mapping: &EntityMapping, write: &EntityWrite) -> Mutation {
    Mutation {
        op: MutationOp::Delete,
        table: mapping.table.clone(),
        columns: mapping.key_columns.iter().map(|c| c.name.clone()).collect(),
        rows: vec![write.key.clone()],
    }
}

fn check_affected(item: &PlannedDml, count: u64) -> OrmResult<()> {
    if item.check_version && count == 0 {
        return Err(OrmError::stale_version(item.table.clone(), item.key.clone()));
    }
    Ok(())
}

fn encode_params(params: &[ParameterBinding]) -> OrmResult<Vec<WireParam>> {
    params
        .iter()
        .map(|p| {
            Ok((
                p.name.clone(),
                p.declared_type.clone(),
                codec::encode(&p.value, &p.declared_type)?,
            ))
        })
        .collect()
}

fn key_display(key: &[Value]) -> String {
    key.iter()
        .map(|v| format!("{v:?}"))
        .collect::<Vec<_>>()
        .join(", ")
}
