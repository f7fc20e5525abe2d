//! Schema reconciliation: desired model vs. live catalog.
//!
//! [`diff`] computes the minimal, dependency-ordered DDL that brings the
//! catalog up to the desired schema without destructive column changes.
//! Tables present in the catalog but absent from the model are out of
//! scope: an update never drops unknown tables. [`export`] is the
//! drop-and-recreate path: it always computes the complete drop sequence
//! before any create, even for unchanged tables.
//!
//! Ordering invariants:
//! - drops before creates
//! - within drops: indexes, then foreign-key constraints, then child
//!   tables, then parent tables (reverse interleaving order)
//! - within creates: parent tables, then child tables, then foreign keys,
//!   then indexes

use crate::ddl;
use crate::error::{SchemaError, SchemaResult};
use crate::introspect::{CatalogIndex, CatalogSnapshot, CatalogTable};
use crate::model::{ForeignKeyDef, IndexDef, SchemaModel, TableDef};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// An ordered list of DDL statements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaDiff {
    statements: Vec<String>,
}

impl SchemaDiff {
    pub fn statements(&self) -> &[String] {
        &self.statements
    }

    pub fn into_statements(self) -> Vec<String> {
        self.statements
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }
}

/// Compute the minimal DDL to reconcile the catalog with the desired model.
///
/// Fails with [`SchemaError::Drift`] — listing every discrepancy found —
/// when reconciliation would require a destructive change this differ is
/// not authorized to make (a changed column type or nullability).
pub fn diff(desired: &SchemaModel, current: &CatalogSnapshot) -> SchemaResult<SchemaDiff> {
    let current_tables: BTreeMap<&str, &CatalogTable> =
        current.tables.iter().map(|t| (t.name.as_str(), t)).collect();

    let mut discrepancies: Vec<String> = Vec::new();
    let mut index_drops: Vec<String> = Vec::new();
    let mut constraint_drops: Vec<String> = Vec::new();
    let mut table_creates: Vec<String> = Vec::new();
    let mut column_adds: Vec<String> = Vec::new();
    let mut fk_creates: Vec<String> = Vec::new();
    let mut index_creates: Vec<String> = Vec::new();

    let missing: Vec<&TableDef> = desired
        .tables
        .iter()
        .filter(|t| !current_tables.contains_key(t.name.as_str()))
        .collect();
    let missing_names: HashSet<&str> = missing.iter().map(|t| t.name.as_str()).collect();

    for table in order_desired(&missing) {
        table_creates.push(ddl::create_table(table));
    }

    for table in &desired.tables {
        let is_new = missing_names.contains(table.name.as_str());

        if let Some(existing) = current_tables.get(table.name.as_str()) {
            // Column diff: additive only. Changing a column's type or
            // nullability is a destructive change and reported as drift.
            for column in &table.columns {
                match existing.columns.iter().find(|c| c.name == column.name) {
                    None => column_adds.push(ddl::add_column(&table.name, column)),
                    Some(live) => {
                        if !live.spanner_type.eq_ignore_ascii_case(&column.ddl_type) {
                            discrepancies.push(format!(
                                "{}.{}: type {} in catalog, {} desired",
                                table.name, column.name, live.spanner_type, column.ddl_type
                            ));
                        }
                        if live.nullable == column.not_null {
                            discrepancies.push(format!(
                                "{}.{}: nullability differs (catalog {}, desired {})",
                                table.name,
                                column.name,
                                if live.nullable { "NULL" } else { "NOT NULL" },
                                if column.not_null { "NOT NULL" } else { "NULL" }
                            ));
                        }
                    }
                }
            }
        }

        // Index diff.
        let live_indexes: Vec<&CatalogIndex> = if is_new {
            Vec::new()
        } else {
            current.indexes_of(&table.name).collect()
        };
        for index in &table.indexes {
            match live_indexes.iter().find(|i| i.name == index.name) {
                None => index_creates.push(ddl::create_index(&table.name, index)),
                Some(live) if !index_matches(index, live) => {
                    index_drops.push(ddl::drop_index(&index.name));
                    index_creates.push(ddl::create_index(&table.name, index));
                }
                Some(_) => {}
            }
        }
        for live in &live_indexes {
            if !table.indexes.iter().any(|i| i.name == live.name) {
                index_drops.push(ddl::drop_index(&live.name));
            }
        }

        // Foreign-key diff.
        let live_fks: Vec<_> = if is_new {
            Vec::new()
        } else {
            current.foreign_keys_of(&table.name).collect()
        };
        for fk in &table.foreign_keys {
            match live_fks.iter().find(|f| f.name == fk.name) {
                None => fk_creates.push(ddl::add_foreign_key(&table.name, fk)),
                Some(live) if !fk_matches(fk, live) => {
                    constraint_drops.push(ddl::drop_constraint(&table.name, &fk.name));
                    fk_creates.push(ddl::add_foreign_key(&table.name, fk));
                }
                Some(_) => {}
            }
        }
        for live in &live_fks {
            if !table.foreign_keys.iter().any(|f| f.name == live.name) {
                constraint_drops.push(ddl::drop_constraint(&table.name, &live.name));
            }
        }
    }

    if !discrepancies.is_empty() {
        return Err(SchemaError::Drift(discrepancies));
    }

    let extras: Vec<&CatalogTable> = current
        .tables
        .iter()
        .filter(|t| desired.find_table(&t.name).is_none())
        .collect();
    if !extras.is_empty() {
        debug!(
            tables = ?extras.iter().map(|t| &t.name).collect::<Vec<_>>(),
            "catalog tables absent from the desired schema left untouched"
        );
    }

    let mut statements = Vec::new();
    statements.extend(index_drops);
    statements.extend(constraint_drops);
    statements.extend(table_creates);
    statements.extend(column_adds);
    statements.extend(fk_creates);
    statements.extend(index_creates);
    Ok(SchemaDiff { statements })
}

/// Compute the full drop-and-recreate DDL sequence.
///
/// The complete drop sequence (everything currently in the catalog,
/// including unchanged and unknown tables) precedes the complete create
/// sequence for the desired schema.
pub fn export(desired: &SchemaModel, current: &CatalogSnapshot) -> SchemaResult<SchemaDiff> {
    let mut statements = Vec::new();

    // Drops: indexes, then constraints, then tables child-first.
    for index in &current.indexes {
        statements.push(ddl::drop_index(&index.name));
    }
    for fk in &current.foreign_keys {
        statements.push(ddl::drop_constraint(&fk.table, &fk.name));
    }
    let current_refs: Vec<&CatalogTable> = current.tables.iter().collect();
    let mut drop_order = order_catalog(&current_refs, current);
    drop_order.reverse();
    for table in drop_order {
        statements.push(ddl::drop_table(&table.name));
    }

    // Creates: tables parent-first, then foreign keys, then indexes.
    let desired_refs: Vec<&TableDef> = desired.tables.iter().collect();
    for table in order_desired(&desired_refs) {
        statements.push(ddl::create_table(table));
    }
    for table in &desired.tables {
        for fk in &table.foreign_keys {
            statements.push(ddl::add_foreign_key(&table.name, fk));
        }
    }
    for table in &desired.tables {
        for index in &table.indexes {
            statements.push(ddl::create_index(&table.name, index));
        }
    }

    Ok(SchemaDiff { statements })
}

fn index_matches(desired: &IndexDef, live: &CatalogIndex) -> bool {
    desired.columns == live.columns
        && desired.unique == live.unique
        && desired.null_filtered == live.null_filtered
}

fn fk_matches(desired: &ForeignKeyDef, live: &crate::introspect::CatalogForeignKey) -> bool {
    desired.columns == live.columns
        && desired.referenced_table == live.referenced_table
        && desired.referenced_columns == live.referenced_columns
}

// ─── Dependency ordering ────────────────────────────────────────────────────

/// Order items so that every dependency precedes its dependents, keeping
/// input order among independent items. Cyclic remainders are appended in
/// input order.
fn topo_order<'a, T>(
    items: &[&'a T],
    name_of: impl Fn(&T) -> &str,
    deps_of: impl Fn(&T) -> Vec<String>,
) -> Vec<&'a T> {
    let names: HashSet<&str> = items.iter().map(|t| name_of(t)).collect();
    let mut emitted: HashSet<String> = HashSet::new();
    let mut remaining: Vec<&T> = items.to_vec();
    let mut ordered: Vec<&T> = Vec::with_capacity(items.len());

    loop {
        let mut progressed = false;
        remaining.retain(|item| {
            let ready = deps_of(item).iter().all(|dep| {
                dep == name_of(item) || !names.contains(dep.as_str()) || emitted.contains(dep)
            });
            if ready {
                emitted.insert(name_of(item).to_string());
                ordered.push(*item);
                progressed = true;
                false
            } else {
                true
            }
        });
        if remaining.is_empty() {
            break;
        }
        if !progressed {
            ordered.extend(remaining.iter().copied());
            break;
        }
    }
    ordered
}

fn order_desired<'a>(tables: &[&'a TableDef]) -> Vec<&'a TableDef> {
    topo_order(
        tables,
        |t| &t.name,
        |t| {
            let mut deps: Vec<String> = Vec::new();
            if let Some(interleave) = &t.interleave {
                deps.push(interleave.parent.clone());
            }
            for fk in &t.foreign_keys {
                deps.push(fk.referenced_table.clone());
            }
            deps
        },
    )
}

fn order_catalog<'a>(
    tables: &[&'a CatalogTable],
    snapshot: &CatalogSnapshot,
) -> Vec<&'a CatalogTable> {
    topo_order(
        tables,
        |t| &t.name,
        |t| {
            let mut deps: Vec<String> = Vec::new();
            if let Some(parent) = &t.parent {
                deps.push(parent.clone());
            }
            for fk in snapshot.foreign_keys_of(&t.name) {
                deps.push(fk.referenced_table.clone());
            }
            deps
        },
    )
}
