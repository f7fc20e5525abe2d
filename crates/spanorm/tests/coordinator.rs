//! Integration tests for the transaction & mutation coordinator, driven
//! against a recording mock connection.

use chrono::{TimeZone, Utc};
use spanorm::{
    BatchStatement, Connection, EntityMapping, EntityWrite, ExecuteRequest, MappingRegistry,
    Mutation, MutationOp, OrmError, OrmResult, ResultSet, Session, SessionConfig, SpannerType,
    Staleness, StatementBuilder, TransactionHandle, Value, WireValue, WriteMode,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct MockState {
    requests: Vec<ExecuteRequest>,
    batches: Vec<Vec<BatchStatement>>,
    commits: Vec<Vec<Mutation>>,
    begins: usize,
    rollbacks: usize,
    affected_override: Option<u64>,
    check_results: VecDeque<bool>,
    fail_next_execute: bool,
}

#[derive(Default)]
struct MockConnection {
    state: Mutex<MockState>,
}

/// Shareable handle to a `MockConnection`. The coordinator takes ownership of
/// its connection by value, while the test body keeps a clone to inspect the
/// recorded state. `Connection` is implemented on this local newtype rather
/// than on `Arc<MockConnection>` directly, which the orphan rule forbids in an
/// integration-test crate.
#[derive(Clone, Default)]
struct SharedMock(Arc<MockConnection>);

impl std::ops::Deref for SharedMock {
    type Target = MockConnection;

    fn deref(&self) -> &MockConnection {
        &self.0
    }
}

impl MockConnection {
    fn new() -> SharedMock {
        SharedMock(Arc::new(Self::default()))
    }

    fn set_affected(&self, affected: u64) {
        self.state.lock().unwrap().affected_override = Some(affected);
    }

    fn push_check_result(&self, exists: bool) {
        self.state.lock().unwrap().check_results.push_back(exists);
    }

    fn fail_next_execute(&self) {
        self.state.lock().unwrap().fail_next_execute = true;
    }

    fn requests(&self) -> Vec<ExecuteRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    fn batches(&self) -> Vec<Vec<BatchStatement>> {
        self.state.lock().unwrap().batches.clone()
    }

    fn commits(&self) -> Vec<Vec<Mutation>> {
        self.state.lock().unwrap().commits.clone()
    }

    fn begins(&self) -> usize {
        self.state.lock().unwrap().begins
    }

    fn rollbacks(&self) -> usize {
        self.state.lock().unwrap().rollbacks
    }
}

impl Connection for SharedMock {
    async fn execute_sql(&self, request: ExecuteRequest) -> OrmResult<ResultSet> {
        let mut state = self.state.lock().unwrap();
        if state.fail_next_execute {
            state.fail_next_execute = false;
            return Err(OrmError::connection("injected transport failure"));
        }
        let is_existence_check = request.sql.starts_with("SELECT 1 FROM");
        let is_query = request.sql.trim_start().to_ascii_uppercase().starts_with("SELECT");
        state.requests.push(request);

        if is_existence_check {
            let exists = state.check_results.pop_front().unwrap_or(true);
            let rows = if exists {
                vec![vec![WireValue::String("1".to_string())]]
            } else {
                Vec::new()
            };
            return Ok(ResultSet {
                columns: vec!["1".to_string()],
                rows,
                affected_rows: None,
            });
        }
        if is_query {
            return Ok(ResultSet::default());
        }
        Ok(ResultSet {
            columns: Vec::new(),
            rows: Vec::new(),
            affected_rows: Some(state.affected_override.unwrap_or(1)),
        })
    }

    async fn execute_batch_dml(
        &self,
        _transaction: &TransactionHandle,
        statements: Vec<BatchStatement>,
    ) -> OrmResult<Vec<u64>> {
        let mut state = self.state.lock().unwrap();
        let affected = state.affected_override.unwrap_or(1);
        let counts = vec![affected; statements.len()];
        state.batches.push(statements);
        Ok(counts)
    }

    async fn begin_transaction(&self) -> OrmResult<TransactionHandle> {
        let mut state = self.state.lock().unwrap();
        state.begins += 1;
        Ok(TransactionHandle(format!("tx-{}", state.begins)))
    }

    async fn commit(
        &self,
        _transaction: TransactionHandle,
        mutations: Vec<Mutation>,
    ) -> OrmResult<chrono::DateTime<Utc>> {
        self.state.lock().unwrap().commits.push(mutations);
        Ok(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
    }

    async fn rollback(&self, _transaction: TransactionHandle) -> OrmResult<()> {
        self.state.lock().unwrap().rollbacks += 1;
        Ok(())
    }

    async fn execute_ddl(&self, _statements: &[String]) -> OrmResult<()> {
        Ok(())
    }
}

// ─── Fixtures ───────────────────────────────────────────────────────────────

fn registry() -> MappingRegistry {
    MappingRegistry::new()
        .with(
            EntityMapping::new("Singer", "Singers")
                .key_column("SingerId", SpannerType::Int64)
                .data_column("FirstName", SpannerType::String)
                .versioned("Version"),
        )
        .with(
            EntityMapping::new("Venue", "Venues")
                .key_column("VenueId", SpannerType::Int64)
                .data_column("Name", SpannerType::String)
                .versioned("Version")
                .write_mode(WriteMode::Mutation),
        )
}

fn insert_singer(id: i64) -> EntityWrite {
    EntityWrite::insert(
        "Singer",
        vec![Value::Int64(id)],
        vec![Value::String(format!("name-{id}"))],
    )
}

fn update_singer(id: i64, version: i64) -> EntityWrite {
    EntityWrite::update(
        "Singer",
        vec![Value::Int64(id)],
        vec![Value::String("renamed".to_string())],
        Some(version),
    )
}

fn update_venue(id: i64, version: i64) -> EntityWrite {
    EntityWrite::update(
        "Venue",
        vec![Value::Int64(id)],
        vec![Value::String("renamed".to_string())],
        Some(version),
    )
}

// ─── Transaction boundaries ─────────────────────────────────────────────────

#[tokio::test]
async fn each_flush_without_explicit_transaction_commits_independently() {
    let conn = MockConnection::new();
    let mut session = Session::new(conn.clone(), registry(), SessionConfig::new());

    session.queue_write(insert_singer(1)).unwrap();
    session.flush().await.unwrap();
    session.queue_write(insert_singer(2)).unwrap();
    session.flush().await.unwrap();

    assert_eq!(conn.begins(), 2);
    assert_eq!(conn.commits().len(), 2);
    assert_eq!(conn.rollbacks(), 0);
}

#[tokio::test]
async fn explicit_transaction_shares_one_commit_across_flushes() {
    let conn = MockConnection::new();
    let mut session = Session::new(conn.clone(), registry(), SessionConfig::new());

    session.begin().await.unwrap();
    session.queue_write(insert_singer(1)).unwrap();
    session.flush().await.unwrap();
    session.queue_write(insert_singer(2)).unwrap();
    session.flush().await.unwrap();
    session.commit().await.unwrap();

    assert_eq!(conn.begins(), 1);
    assert_eq!(conn.commits().len(), 1);
    assert!(!session.in_transaction());
}

#[tokio::test]
async fn commit_without_begin_is_rejected() {
    let conn = MockConnection::new();
    let mut session = Session::new(conn.clone(), registry(), SessionConfig::new());
    assert!(matches!(
        session.commit().await,
        Err(OrmError::Transaction(_))
    ));
}

#[tokio::test]
async fn rollback_discards_queued_writes() {
    let conn = MockConnection::new();
    let mut session = Session::new(conn.clone(), registry(), SessionConfig::new());

    session.begin().await.unwrap();
    session.queue_write(insert_singer(1)).unwrap();
    session.rollback().await.unwrap();

    assert_eq!(session.pending_writes(), 0);
    assert_eq!(conn.rollbacks(), 1);
    assert_eq!(conn.commits().len(), 0);
}

// ─── DML path: versioning ───────────────────────────────────────────────────

#[tokio::test]
async fn dml_update_carries_version_predicate_and_increment() {
    let conn = MockConnection::new();
    let mut session = Session::new(conn.clone(), registry(), SessionConfig::new());

    session.queue_write(update_singer(1, 7)).unwrap();
    session.flush().await.unwrap();

    let requests = conn.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].sql,
        "UPDATE Singers SET FirstName = @p1, Version = @p2 WHERE SingerId = @p3 AND Version = @p4"
    );
    // SET binds version 8, WHERE binds version 7.
    assert_eq!(requests[0].params[1].2, WireValue::String("8".to_string()));
    assert_eq!(requests[0].params[3].2, WireValue::String("7".to_string()));
}

#[tokio::test]
async fn dml_zero_affected_rows_is_a_stale_version_conflict() {
    let conn = MockConnection::new();
    conn.set_affected(0);
    let mut session = Session::new(conn.clone(), registry(), SessionConfig::new());

    session.queue_write(update_singer(1, 7)).unwrap();
    let err = session.flush().await.unwrap_err();
    assert!(err.is_stale_version());
    assert!(err.is_recoverable());
    // The implicit transaction was rolled back, never committed.
    assert_eq!(conn.rollbacks(), 1);
    assert_eq!(conn.commits().len(), 0);
}

// ─── DML path: batching ─────────────────────────────────────────────────────

#[tokio::test]
async fn same_shaped_dml_above_threshold_batches_in_order() {
    let conn = MockConnection::new();
    let config = SessionConfig::new().batch_threshold(3);
    let mut session = Session::new(conn.clone(), registry(), config);

    for id in 1..=7 {
        session.queue_write(insert_singer(id)).unwrap();
    }
    session.flush().await.unwrap();

    // ⌈7/3⌉ = 3 batch requests of at most 3 statements each.
    let batches = conn.batches();
    assert_eq!(batches.len(), 3);
    assert_eq!(
        batches.iter().map(|b| b.len()).collect::<Vec<_>>(),
        [3, 3, 1]
    );
    // Original insertion order is preserved across batches.
    let keys: Vec<String> = batches
        .iter()
        .flatten()
        .map(|stmt| match &stmt.params[0].2 {
            WireValue::String(s) => s.clone(),
            other => panic!("unexpected key param {other:?}"),
        })
        .collect();
    assert_eq!(keys, ["1", "2", "3", "4", "5", "6", "7"]);
    // Nothing went through the single-statement path.
    assert!(conn.requests().is_empty());
}

#[tokio::test]
async fn same_shaped_dml_below_threshold_executes_individually() {
    let conn = MockConnection::new();
    let config = SessionConfig::new().batch_threshold(3);
    let mut session = Session::new(conn.clone(), registry(), config);

    session.queue_write(insert_singer(1)).unwrap();
    session.queue_write(insert_singer(2)).unwrap();
    session.flush().await.unwrap();

    assert!(conn.batches().is_empty());
    assert_eq!(conn.requests().len(), 2);
}

#[tokio::test]
async fn differently_shaped_dml_never_coalesces_across_shapes() {
    let conn = MockConnection::new();
    let config = SessionConfig::new().batch_threshold(1);
    let mut session = Session::new(conn.clone(), registry(), config);

    session.queue_write(insert_singer(1)).unwrap();
    session.queue_write(update_singer(1, 1)).unwrap();
    session.queue_write(insert_singer(2)).unwrap();
    session.flush().await.unwrap();

    // Three consecutive runs of length 1; threshold 1 means none exceed it.
    assert!(conn.batches().is_empty());
    let requests = conn.requests();
    assert_eq!(requests.len(), 3);
    assert!(requests[0].sql.starts_with("INSERT"));
    assert!(requests[1].sql.starts_with("UPDATE"));
    assert!(requests[2].sql.starts_with("INSERT"));
}

// ─── Mutation path ──────────────────────────────────────────────────────────

#[tokio::test]
async fn mutation_insert_commits_with_version_one() {
    let conn = MockConnection::new();
    let mut session = Session::new(conn.clone(), registry(), SessionConfig::new());

    session
        .queue_write(EntityWrite::insert(
            "Venue",
            vec![Value::Int64(10)],
            vec![Value::String("Hall".to_string())],
        ))
        .unwrap();
    session.flush().await.unwrap();

    let commits = conn.commits();
    assert_eq!(commits.len(), 1);
    let mutation = &commits[0][0];
    assert_eq!(mutation.op, MutationOp::Insert);
    assert_eq!(mutation.table, "Venues");
    assert_eq!(mutation.columns, ["VenueId", "Name", "Version"]);
    assert_eq!(mutation.rows[0][2], Value::Int64(1));
}

#[tokio::test]
async fn mutation_update_runs_existence_check_on_transaction_snapshot() {
    let conn = MockConnection::new();
    let mut session = Session::new(conn.clone(), registry(), SessionConfig::new());

    session.queue_write(update_venue(10, 4)).unwrap();
    session.flush().await.unwrap();

    let requests = conn.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].sql,
        "SELECT 1 FROM Venues WHERE VenueId = @p1 AND Version = @p2"
    );
    // The check runs on the transaction's own read snapshot, not standalone.
    assert!(requests[0].transaction.is_some());
    assert!(requests[0].read_only.is_none());
    // The staged mutation carries the incremented version.
    let commits = conn.commits();
    assert_eq!(commits[0][0].rows[0][2], Value::Int64(5));
}

#[tokio::test]
async fn mutation_stale_check_fails_implicit_flush_without_applying_anything() {
    let conn = MockConnection::new();
    conn.push_check_result(false);
    let mut session = Session::new(conn.clone(), registry(), SessionConfig::new());

    session.queue_write(update_venue(10, 4)).unwrap();
    let err = session.flush().await.unwrap_err();
    assert!(err.is_stale_version());
    assert_eq!(conn.commits().len(), 0, "no mutation reached the table");
    assert_eq!(conn.rollbacks(), 1);
}

#[tokio::test]
async fn mutation_stale_check_in_explicit_transaction_fails_at_commit() {
    let conn = MockConnection::new();
    conn.push_check_result(false);
    let mut session = Session::new(conn.clone(), registry(), SessionConfig::new());

    session.begin().await.unwrap();
    session.queue_write(update_venue(10, 4)).unwrap();
    // The flush itself succeeds: the failure surfaces at commit time.
    session.flush().await.unwrap();

    let err = session.commit().await.unwrap_err();
    assert!(err.is_stale_version());
    assert_eq!(conn.commits().len(), 0);
    assert_eq!(conn.rollbacks(), 1);
    assert!(!session.in_transaction());
}

#[tokio::test]
async fn failed_flush_leaves_mutation_batch_and_queue_untouched() {
    let conn = MockConnection::new();
    let mut session = Session::new(conn.clone(), registry(), SessionConfig::new());

    session.begin().await.unwrap();
    session.queue_write(update_venue(10, 4)).unwrap();

    conn.fail_next_execute();
    assert!(session.flush().await.is_err());
    assert_eq!(session.staged_mutations(), 0, "all-or-nothing per flush");
    assert_eq!(session.pending_writes(), 1, "retry is safe");

    // The retry stages the mutation normally.
    session.flush().await.unwrap();
    assert_eq!(session.staged_mutations(), 1);
    assert_eq!(session.pending_writes(), 0);
    session.commit().await.unwrap();
    assert_eq!(conn.commits().len(), 1);
}

// ─── Write-mode mixing ──────────────────────────────────────────────────────

#[tokio::test]
async fn mixing_write_modes_fails_at_enqueue_not_commit() {
    let conn = MockConnection::new();
    let mut session = Session::new(conn.clone(), registry(), SessionConfig::new());

    session.begin().await.unwrap();
    session.queue_write(insert_singer(1)).unwrap();
    let err = session
        .queue_write(EntityWrite::insert(
            "Venue",
            vec![Value::Int64(10)],
            vec![Value::String("Hall".to_string())],
        ))
        .unwrap_err();
    assert!(matches!(
        err,
        OrmError::IncompatibleWriteMode {
            active: WriteMode::Dml,
            requested: WriteMode::Mutation,
        }
    ));

    // The poisoned transaction refuses to commit and rolls back.
    assert!(matches!(
        session.commit().await,
        Err(OrmError::Transaction(_))
    ));
    assert_eq!(conn.rollbacks(), 1);
    assert_eq!(conn.commits().len(), 0);
}

#[tokio::test]
async fn write_modes_may_differ_across_implicit_transactions() {
    let conn = MockConnection::new();
    let mut session = Session::new(conn.clone(), registry(), SessionConfig::new());

    session.queue_write(insert_singer(1)).unwrap();
    session.flush().await.unwrap();

    // A fresh implicit transaction may use the other path.
    session
        .queue_write(EntityWrite::insert(
            "Venue",
            vec![Value::Int64(10)],
            vec![Value::String("Hall".to_string())],
        ))
        .unwrap();
    session.flush().await.unwrap();
    assert_eq!(conn.commits().len(), 2);
}

// ─── Reads ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn reads_outside_a_transaction_are_standalone_and_never_commit() {
    let conn = MockConnection::new();
    let session = Session::new(conn.clone(), registry(), SessionConfig::new());

    let stmt = StatementBuilder::new("SELECT FirstName FROM Singers WHERE SingerId = @p1")
        .unwrap()
        .bind(SpannerType::Int64, Value::Int64(1))
        .build();
    session.query(&stmt).await.unwrap();

    assert_eq!(conn.begins(), 0);
    assert_eq!(conn.commits().len(), 0);
    let requests = conn.requests();
    assert!(requests[0].transaction.is_none());
    assert_eq!(
        requests[0].read_only.map(|r| r.staleness),
        Some(Staleness::Strong)
    );
}

#[tokio::test]
async fn reads_honor_an_explicit_staleness_bound() {
    let conn = MockConnection::new();
    let session = Session::new(conn.clone(), registry(), SessionConfig::new());

    let stmt = StatementBuilder::new("SELECT 2").unwrap().build();
    session
        .query_at(&stmt, Staleness::ExactStaleness(Duration::from_secs(15)))
        .await
        .unwrap();

    let requests = conn.requests();
    assert_eq!(
        requests[0].read_only.map(|r| r.staleness),
        Some(Staleness::ExactStaleness(Duration::from_secs(15)))
    );
}

#[tokio::test]
async fn reads_inside_an_explicit_transaction_share_its_snapshot() {
    let conn = MockConnection::new();
    let mut session = Session::new(conn.clone(), registry(), SessionConfig::new());

    session.begin().await.unwrap();
    let stmt = StatementBuilder::new("SELECT 2").unwrap().build();
    session.query(&stmt).await.unwrap();

    let requests = conn.requests();
    assert!(requests[0].transaction.is_some());
    assert!(requests[0].read_only.is_none());
}

// ─── Hint channel ───────────────────────────────────────────────────────────

#[tokio::test]
async fn embedded_hint_comment_is_spliced_before_execution() {
    let conn = MockConnection::new();
    let session = Session::new(conn.clone(), registry(), SessionConfig::new());

    let spec = spanorm::HintSpec::new()
        .statement_hint("@{OPTIMIZER_VERSION=1}")
        .table_hint("Singers", "@{FORCE_INDEX=SingersByFirstName}");
    let sql = session.attach_hint_comment("SELECT FirstName FROM Singers", &spec);
    assert!(sql.contains(spanorm::HINT_MARKER));

    let stmt = StatementBuilder::new(sql).unwrap().build();
    session.query(&stmt).await.unwrap();

    assert_eq!(
        conn.requests()[0].sql,
        "@{OPTIMIZER_VERSION=1}SELECT FirstName FROM Singers@{FORCE_INDEX=SingersByFirstName} "
    );
}

#[tokio::test]
async fn hint_comment_emission_can_be_disabled() {
    let conn = MockConnection::new();
    let config = SessionConfig::new().emit_hint_comments(false);
    let session = Session::new(conn.clone(), registry(), config);

    let spec = spanorm::HintSpec::new().statement_hint("@{OPTIMIZER_VERSION=1}");
    let sql = session.attach_hint_comment("SELECT 1", &spec);
    assert_eq!(sql, "SELECT 1");
}
