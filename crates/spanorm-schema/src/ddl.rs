//! DDL statement rendering.

use crate::model::{ColumnDef, ForeignKeyDef, IndexDef, TableDef};

fn column_ddl(column: &ColumnDef) -> String {
    let mut out = format!("{} {}", column.name, column.ddl_type);
    if column.not_null {
        out.push_str(" NOT NULL");
    }
    if let Some(expr) = &column.generation_expression {
        out.push_str(&format!(" AS ({expr}) STORED"));
    }
    out
}

/// `CREATE TABLE` with inline primary key and optional interleave clause.
pub fn create_table(table: &TableDef) -> String {
    let columns: Vec<String> = table
        .columns
        .iter()
        .map(|c| format!("  {}", column_ddl(c)))
        .collect();
    let mut out = format!(
        "CREATE TABLE {} (\n{}\n) PRIMARY KEY ({})",
        table.name,
        columns.join(",\n"),
        table.primary_key.join(", ")
    );
    if let Some(interleave) = &table.interleave {
        out.push_str(&format!(
            ",\n  INTERLEAVE IN PARENT {} ON DELETE {}",
            interleave.parent,
            interleave.on_delete.ddl_text()
        ));
    }
    out
}

/// `ALTER TABLE ... ADD COLUMN`
pub fn add_column(table: &str, column: &ColumnDef) -> String {
    format!("ALTER TABLE {table} ADD COLUMN {}", column_ddl(column))
}

/// `CREATE [UNIQUE] [NULL_FILTERED] INDEX ... ON ...`
pub fn create_index(table: &str, index: &IndexDef) -> String {
    let mut out = String::from("CREATE ");
    if index.unique {
        out.push_str("UNIQUE ");
    }
    if index.null_filtered {
        out.push_str("NULL_FILTERED ");
    }
    out.push_str(&format!(
        "INDEX {} ON {table} ({})",
        index.name,
        index.columns.join(", ")
    ));
    out
}

/// `ALTER TABLE ... ADD CONSTRAINT ... FOREIGN KEY`
pub fn add_foreign_key(table: &str, fk: &ForeignKeyDef) -> String {
    format!(
        "ALTER TABLE {table} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
        fk.name,
        fk.columns.join(", "),
        fk.referenced_table,
        fk.referenced_columns.join(", ")
    )
}

/// `DROP INDEX`
pub fn drop_index(name: &str) -> String {
    format!("DROP INDEX {name}")
}

/// `ALTER TABLE ... DROP CONSTRAINT`
pub fn drop_constraint(table: &str, name: &str) -> String {
    format!("ALTER TABLE {table} DROP CONSTRAINT {name}")
}

/// `DROP TABLE`
pub fn drop_table(name: &str) -> String {
    format!("DROP TABLE {name}")
}
