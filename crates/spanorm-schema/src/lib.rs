//! # spanorm-schema
//!
//! Catalog introspection and schema reconciliation for `spanorm`.
//!
//! - [`introspect`] reads the live INFORMATION_SCHEMA catalog into a fresh
//!   [`CatalogSnapshot`] (tables, columns, parent/child interleaving,
//!   indexes, foreign keys)
//! - [`diff`] computes the minimal, dependency-ordered DDL that reconciles
//!   the catalog with a desired [`SchemaModel`], without destructive column
//!   changes
//! - [`export`] computes a full drop-and-recreate sequence
//!
//! The resulting DDL is an ordered statement list for
//! [`Connection::execute_ddl`](spanorm::Connection::execute_ddl).
//!
//! ## Example
//!
//! ```ignore
//! use spanorm_schema::{diff, introspect, ColumnDef, SchemaModel, TableDef};
//! use spanorm::SpannerType;
//!
//! let desired = SchemaModel::new().table(
//!     TableDef::new("Singers")
//!         .column(ColumnDef::new("SingerId", SpannerType::Int64).not_null())
//!         .column(ColumnDef::with_type_text("Name", "STRING(200)"))
//!         .primary_key(&["SingerId"]),
//! );
//!
//! let current = introspect(&conn).await?;
//! let plan = diff(&desired, &current)?;
//! conn.execute_ddl(plan.statements()).await?;
//! ```

pub mod ddl;
pub mod diff;
pub mod error;
pub mod introspect;
pub mod model;

pub use diff::{SchemaDiff, diff, export};
pub use error::{SchemaError, SchemaResult};
pub use introspect::{
    CatalogColumn, CatalogForeignKey, CatalogIndex, CatalogSnapshot, CatalogTable, introspect,
    introspect_table,
};
pub use model::{
    ColumnDef, ForeignKeyDef, IndexDef, Interleave, OnDeleteAction, SchemaModel, TableDef,
};
