//! # spanorm
//!
//! The adapter layer that lets a generic relational-ORM query pipeline
//! target Cloud Spanner.
//!
//! ## What lives here
//!
//! - **Type/value codec**: a closed [`SpannerType`] set with total
//!   encode/decode between native values and the wire representation
//! - **Dialect translator**: stateless rewrites of ANSI-ish SQL fragments
//!   (string/date functions, pagination, INSERT-SELECT, casts) into
//!   GoogleSQL
//! - **Hint interceptor**: extracts a hint comment block from generated SQL
//!   and re-splices statement and table hints at the positions Spanner
//!   expects
//! - **Transaction & mutation coordinator**: [`Session`] decides DML vs.
//!   native mutations per write, batches same-shaped DML, and enforces the
//!   optimistic-concurrency version contract
//! - **Connection trait**: the downstream execute/begin/commit/rollback/DDL
//!   protocol, implemented by the transport
//!
//! The generic ORM pipeline (session lifecycle, query compilation, entity
//! state tracking) is a black box upstream of this crate; schema
//! introspection and reconciliation live in the sibling `spanorm-schema`
//! crate.
//!
//! ## Example
//!
//! ```ignore
//! use spanorm::{
//!     EntityMapping, EntityWrite, MappingRegistry, Session, SessionConfig,
//!     SpannerType, Value,
//! };
//!
//! let registry = MappingRegistry::new().with(
//!     EntityMapping::new("Singer", "Singers")
//!         .key_column("SingerId", SpannerType::Int64)
//!         .data_column("FirstName", SpannerType::String)
//!         .versioned("Version"),
//! );
//!
//! let mut session = Session::new(conn, registry, SessionConfig::new());
//! session.queue_write(EntityWrite::insert(
//!     "Singer",
//!     vec![Value::Int64(1)],
//!     vec![Value::String("Alice".into())],
//! ))?;
//! session.flush().await?;
//! ```

pub mod codec;
pub mod config;
pub mod connection;
pub mod dialect;
pub mod error;
pub mod hints;
pub mod mutation;
pub mod registry;
pub mod session;
pub mod statement;
pub mod types;

pub use codec::{Value, WireValue, decode, encode};
pub use config::{SessionConfig, WriteMode};
pub use connection::{
    BatchStatement, Connection, ExecuteRequest, ReadOptions, ResultSet, Staleness,
    TransactionHandle, WireParam,
};
pub use error::{OrmError, OrmResult};
pub use hints::{HINT_MARKER, HintSpec};
pub use mutation::{Mutation, MutationOp, PendingMutationBatch};
pub use registry::{ColumnMapping, EntityMapping, MappingRegistry};
pub use session::{EntityWrite, Session, WriteOp};
pub use statement::{ParameterBinding, Statement, StatementBuilder, StatementKind};
pub use types::SpannerType;
