//! Live catalog introspection over INFORMATION_SCHEMA.
//!
//! [`introspect`] is a pure read: it issues standalone single-use queries
//! against the fixed system views (TABLES, COLUMNS, INDEXES, INDEX_COLUMNS,
//! REFERENTIAL_CONSTRAINTS / KEY_COLUMN_USAGE) and assembles a fresh
//! [`CatalogSnapshot`] on every call. Snapshots are never cached across
//! schema operations, and a partially-created schema (tables without
//! indexes, dangling creates from an interrupted DDL batch) is represented
//! as-is rather than rejected.

use crate::error::{SchemaError, SchemaResult};
use crate::model::OnDeleteAction;
use serde::{Deserialize, Serialize};
use spanorm::{Connection, ExecuteRequest, ReadOptions, SpannerType, Value, WireValue};
use std::collections::BTreeMap;

/// One column as reported by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogColumn {
    pub name: String,
    pub ordinal: i64,
    /// Native type text, e.g. `STRING(100)` or `ARRAY<INT64>`.
    pub spanner_type: String,
    pub nullable: bool,
    pub generated: bool,
    pub generation_expression: Option<String>,
}

/// One table as reported by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogTable {
    pub name: String,
    /// Interleave parent, when this is a child table.
    pub parent: Option<String>,
    pub on_delete: Option<OnDeleteAction>,
    pub columns: Vec<CatalogColumn>,
    pub primary_key: Vec<String>,
}

/// One secondary index as reported by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogIndex {
    pub name: String,
    pub table: String,
    pub columns: Vec<String>,
    pub unique: bool,
    pub null_filtered: bool,
}

/// One foreign key as reported by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogForeignKey {
    pub name: String,
    pub table: String,
    pub columns: Vec<String>,
    pub referenced_table: String,
    pub referenced_columns: Vec<String>,
}

/// A point-in-time view of the live catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    pub tables: Vec<CatalogTable>,
    pub indexes: Vec<CatalogIndex>,
    pub foreign_keys: Vec<CatalogForeignKey>,
}

impl CatalogSnapshot {
    pub fn find_table(&self, name: &str) -> Option<&CatalogTable> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn indexes_of(&self, table: &str) -> impl Iterator<Item = &CatalogIndex> {
        self.indexes.iter().filter(move |i| i.table == table)
    }

    pub fn foreign_keys_of(&self, table: &str) -> impl Iterator<Item = &CatalogForeignKey> {
        self.foreign_keys.iter().filter(move |f| f.table == table)
    }
}

/// Introspect the whole default schema.
pub async fn introspect<C: Connection>(conn: &C) -> SchemaResult<CatalogSnapshot> {
    introspect_filtered(conn, None).await
}

/// Introspect a single table (columns, indexes, and foreign keys included).
pub async fn introspect_table<C: Connection>(
    conn: &C,
    table: &str,
) -> SchemaResult<CatalogSnapshot> {
    introspect_filtered(conn, Some(table)).await
}

async fn introspect_filtered<C: Connection>(
    conn: &C,
    table: Option<&str>,
) -> SchemaResult<CatalogSnapshot> {
    let mut tables = load_tables(conn, table).await?;
    load_columns(conn, table, &mut tables).await?;
    let (indexes, primary_keys) = load_indexes(conn, table).await?;
    for (table_name, pk) in primary_keys {
        if let Some(t) = tables.get_mut(&table_name) {
            t.primary_key = pk;
        }
    }
    let foreign_keys = load_foreign_keys(conn, table).await?;

    Ok(CatalogSnapshot {
        tables: tables.into_values().collect(),
        indexes,
        foreign_keys,
    })
}

async fn read_system_view<C: Connection>(
    conn: &C,
    sql: &str,
    table: Option<&str>,
) -> SchemaResult<Vec<Vec<WireValue>>> {
    let params = match table {
        Some(name) => vec![(
            "table_name".to_string(),
            SpannerType::String,
            spanorm::encode(&Value::String(name.to_string()), &SpannerType::String)?,
        )],
        None => Vec::new(),
    };
    let result = conn
        .execute_sql(ExecuteRequest {
            sql: sql.to_string(),
            params,
            transaction: None,
            read_only: Some(ReadOptions::default()),
        })
        .await?;
    Ok(result.rows)
}

async fn load_tables<C: Connection>(
    conn: &C,
    table: Option<&str>,
) -> SchemaResult<BTreeMap<String, CatalogTable>> {
    let mut sql = String::from(
        "SELECT t.TABLE_NAME, t.PARENT_TABLE_NAME, t.ON_DELETE_ACTION \
         FROM INFORMATION_SCHEMA.TABLES AS t \
         WHERE t.TABLE_CATALOG = '' AND t.TABLE_SCHEMA = ''",
    );
    if table.is_some() {
        sql.push_str(" AND t.TABLE_NAME = @table_name");
    }
    sql.push_str(" ORDER BY t.TABLE_NAME");

    let rows = read_system_view(conn, &sql, table).await?;
    let mut tables = BTreeMap::new();
    for row in rows {
        let name = get_string(&row, 0, "TABLE_NAME")?;
        let parent = get_opt_string(&row, 1, "PARENT_TABLE_NAME")?;
        let on_delete = get_opt_string(&row, 2, "ON_DELETE_ACTION")?
            .map(|s| OnDeleteAction::parse(&s));
        tables.insert(
            name.clone(),
            CatalogTable {
                name,
                parent,
                on_delete,
                columns: Vec::new(),
                primary_key: Vec::new(),
            },
        );
    }
    Ok(tables)
}

async fn load_columns<C: Connection>(
    conn: &C,
    table: Option<&str>,
    tables: &mut BTreeMap<String, CatalogTable>,
) -> SchemaResult<()> {
    let mut sql = String::from(
        "SELECT c.TABLE_NAME, c.COLUMN_NAME, c.ORDINAL_POSITION, c.SPANNER_TYPE, \
         c.IS_NULLABLE, c.IS_GENERATED, c.GENERATION_EXPRESSION \
         FROM INFORMATION_SCHEMA.COLUMNS AS c \
         WHERE c.TABLE_CATALOG = '' AND c.TABLE_SCHEMA = ''",
    );
    if table.is_some() {
        sql.push_str(" AND c.TABLE_NAME = @table_name");
    }
    sql.push_str(" ORDER BY c.TABLE_NAME, c.ORDINAL_POSITION");

    let rows = read_system_view(conn, &sql, table).await?;
    for row in rows {
        let table_name = get_string(&row, 0, "TABLE_NAME")?;
        let column = CatalogColumn {
            name: get_string(&row, 1, "COLUMN_NAME")?,
            ordinal: get_i64(&row, 2, "ORDINAL_POSITION")?,
            spanner_type: get_string(&row, 3, "SPANNER_TYPE")?,
            nullable: get_string(&row, 4, "IS_NULLABLE")?.eq_ignore_ascii_case("YES"),
            generated: get_string(&row, 5, "IS_GENERATED")?.eq_ignore_ascii_case("ALWAYS"),
            generation_expression: get_opt_string(&row, 6, "GENERATION_EXPRESSION")?,
        };
        // Tolerate columns of tables that appeared mid-introspection: the
        // snapshot only carries tables seen by the TABLES query.
        if let Some(t) = tables.get_mut(&table_name) {
            t.columns.push(column);
        }
    }
    Ok(())
}

type PrimaryKeys = Vec<(String, Vec<String>)>;

async fn load_indexes<C: Connection>(
    conn: &C,
    table: Option<&str>,
) -> SchemaResult<(Vec<CatalogIndex>, PrimaryKeys)> {
    let mut sql = String::from(
        "SELECT i.TABLE_NAME, i.INDEX_NAME, i.INDEX_TYPE, i.IS_UNIQUE, i.IS_NULL_FILTERED \
         FROM INFORMATION_SCHEMA.INDEXES AS i \
         WHERE i.TABLE_CATALOG = '' AND i.TABLE_SCHEMA = '' AND i.SPANNER_IS_MANAGED = FALSE",
    );
    if table.is_some() {
        sql.push_str(" AND i.TABLE_NAME = @table_name");
    }
    sql.push_str(" ORDER BY i.TABLE_NAME, i.INDEX_NAME");

    let rows = read_system_view(conn, &sql, table).await?;
    let mut indexes: Vec<CatalogIndex> = Vec::new();
    let mut primary: PrimaryKeys = Vec::new();
    for row in rows {
        let table_name = get_string(&row, 0, "TABLE_NAME")?;
        let index_name = get_string(&row, 1, "INDEX_NAME")?;
        let index_type = get_string(&row, 2, "INDEX_TYPE")?;
        if index_type.eq_ignore_ascii_case("PRIMARY_KEY") {
            primary.push((table_name, Vec::new()));
        } else {
            indexes.push(CatalogIndex {
                name: index_name,
                table: table_name,
                columns: Vec::new(),
                unique: get_bool(&row, 3, "IS_UNIQUE")?,
                null_filtered: get_bool(&row, 4, "IS_NULL_FILTERED")?,
            });
        }
    }

    let mut sql = String::from(
        "SELECT ic.TABLE_NAME, ic.INDEX_NAME, ic.COLUMN_NAME \
         FROM INFORMATION_SCHEMA.INDEX_COLUMNS AS ic \
         WHERE ic.TABLE_CATALOG = '' AND ic.TABLE_SCHEMA = ''",
    );
    if table.is_some() {
        sql.push_str(" AND ic.TABLE_NAME = @table_name");
    }
    sql.push_str(" ORDER BY ic.TABLE_NAME, ic.INDEX_NAME, ic.ORDINAL_POSITION");

    let rows = read_system_view(conn, &sql, table).await?;
    for row in rows {
        let table_name = get_string(&row, 0, "TABLE_NAME")?;
        let index_name = get_string(&row, 1, "INDEX_NAME")?;
        let column_name = get_string(&row, 2, "COLUMN_NAME")?;
        if index_name.eq_ignore_ascii_case("PRIMARY_KEY") {
            if let Some((_, pk)) = primary.iter_mut().find(|(t, _)| *t == table_name) {
                pk.push(column_name);
            }
        } else if let Some(index) = indexes
            .iter_mut()
            .find(|i| i.table == table_name && i.name == index_name)
        {
            index.columns.push(column_name);
        }
    }

    Ok((indexes, primary))
}

async fn load_foreign_keys<C: Connection>(
    conn: &C,
    table: Option<&str>,
) -> SchemaResult<Vec<CatalogForeignKey>> {
    let mut sql = String::from(
        "SELECT rc.CONSTRAINT_NAME, kcu.TABLE_NAME, kcu.COLUMN_NAME, \
         ref_kcu.TABLE_NAME AS REFERENCED_TABLE, ref_kcu.COLUMN_NAME AS REFERENCED_COLUMN \
         FROM INFORMATION_SCHEMA.REFERENTIAL_CONSTRAINTS AS rc \
         JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE AS kcu \
           ON kcu.CONSTRAINT_NAME = rc.CONSTRAINT_NAME \
         JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE AS ref_kcu \
           ON ref_kcu.CONSTRAINT_NAME = rc.UNIQUE_CONSTRAINT_NAME \
          AND ref_kcu.ORDINAL_POSITION = kcu.POSITION_IN_UNIQUE_CONSTRAINT \
         WHERE rc.CONSTRAINT_CATALOG = '' AND rc.CONSTRAINT_SCHEMA = ''",
    );
    if table.is_some() {
        sql.push_str(" AND kcu.TABLE_NAME = @table_name");
    }
    sql.push_str(" ORDER BY rc.CONSTRAINT_NAME, kcu.ORDINAL_POSITION");

    let rows = read_system_view(conn, &sql, table).await?;
    let mut fks: Vec<CatalogForeignKey> = Vec::new();
    for row in rows {
        let name = get_string(&row, 0, "CONSTRAINT_NAME")?;
        let table_name = get_string(&row, 1, "TABLE_NAME")?;
        let column = get_string(&row, 2, "COLUMN_NAME")?;
        let referenced_table = get_string(&row, 3, "REFERENCED_TABLE")?;
        let referenced_column = get_string(&row, 4, "REFERENCED_COLUMN")?;

        match fks.last_mut() {
            Some(fk) if fk.name == name => {
                fk.columns.push(column);
                fk.referenced_columns.push(referenced_column);
            }
            _ => fks.push(CatalogForeignKey {
                name,
                table: table_name,
                columns: vec![column],
                referenced_table,
                referenced_columns: vec![referenced_column],
            }),
        }
    }
    Ok(fks)
}

// ─── Row decoding helpers ───────────────────────────────────────────────────

fn get_string(row: &[WireValue], idx: usize, column: &str) -> SchemaResult<String> {
    match row.get(idx) {
        Some(WireValue::String(s)) => Ok(s.clone()),
        other => Err(SchemaError::decode(
            column,
            format!("expected string, got {other:?}"),
        )),
    }
}

fn get_opt_string(row: &[WireValue], idx: usize, column: &str) -> SchemaResult<Option<String>> {
    match row.get(idx) {
        Some(WireValue::Null) | None => Ok(None),
        Some(WireValue::String(s)) => Ok(Some(s.clone())),
        other => Err(SchemaError::decode(
            column,
            format!("expected string or null, got {other:?}"),
        )),
    }
}

fn get_bool(row: &[WireValue], idx: usize, column: &str) -> SchemaResult<bool> {
    match row.get(idx) {
        Some(WireValue::Bool(b)) => Ok(*b),
        other => Err(SchemaError::decode(
            column,
            format!("expected bool, got {other:?}"),
        )),
    }
}

fn get_i64(row: &[WireValue], idx: usize, column: &str) -> SchemaResult<i64> {
    match row.get(idx) {
        Some(WireValue::String(s)) => s
            .parse::<i64>()
            .map_err(|e| SchemaError::decode(column, e.to_string())),
        other => Err(SchemaError::decode(
            column,
            format!("expected int64 string, got {other:?}"),
        )),
    }
}
