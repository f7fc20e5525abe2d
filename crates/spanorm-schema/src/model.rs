//! The desired-schema model.
//!
//! Describes the schema an application wants: tables with columns, primary
//! keys, parent-child interleaving, secondary indexes, and foreign keys.
//! The differ reconciles this model against a live [`CatalogSnapshot`]
//! (see [`crate::introspect`]).

use serde::{Deserialize, Serialize};
use spanorm::SpannerType;

/// ON DELETE behavior of an interleaved child table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnDeleteAction {
    NoAction,
    Cascade,
}

impl OnDeleteAction {
    /// Parse the catalog's `ON_DELETE_ACTION` text.
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("CASCADE") {
            OnDeleteAction::Cascade
        } else {
            OnDeleteAction::NoAction
        }
    }

    pub fn ddl_text(&self) -> &'static str {
        match self {
            OnDeleteAction::NoAction => "NO ACTION",
            OnDeleteAction::Cascade => "CASCADE",
        }
    }
}

/// Interleave-in-parent clause of a child table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interleave {
    pub parent: String,
    pub on_delete: OnDeleteAction,
}

/// A column in the desired schema.
///
/// The type is carried as DDL text (`INT64`, `STRING(100)`, ...) so it can
/// be compared verbatim against the catalog's `SPANNER_TYPE`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub ddl_type: String,
    pub not_null: bool,
    /// Stored generation expression for generated columns.
    pub generation_expression: Option<String>,
}

impl ColumnDef {
    /// Column with an unsized default rendering of the given type.
    pub fn new(name: impl Into<String>, ty: SpannerType) -> Self {
        Self {
            name: name.into(),
            ddl_type: ty.ddl_name(),
            not_null: false,
            generation_expression: None,
        }
    }

    /// Column with explicit DDL type text, e.g. `STRING(100)`.
    pub fn with_type_text(name: impl Into<String>, ddl_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ddl_type: ddl_type.into(),
            not_null: false,
            generation_expression: None,
        }
    }

    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// Mark as a stored generated column.
    #[must_use]
    pub fn generated(mut self, expression: impl Into<String>) -> Self {
        self.generation_expression = Some(expression.into());
        self
    }
}

/// A secondary index in the desired schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDef {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
    pub null_filtered: bool,
}

impl IndexDef {
    pub fn new(name: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            name: name.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            unique: false,
            null_filtered: false,
        }
    }

    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    #[must_use]
    pub fn null_filtered(mut self) -> Self {
        self.null_filtered = true;
        self
    }
}

/// A foreign-key constraint in the desired schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyDef {
    pub name: String,
    pub columns: Vec<String>,
    pub referenced_table: String,
    pub referenced_columns: Vec<String>,
}

impl ForeignKeyDef {
    pub fn new(
        name: impl Into<String>,
        columns: &[&str],
        referenced_table: impl Into<String>,
        referenced_columns: &[&str],
    ) -> Self {
        Self {
            name: name.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            referenced_table: referenced_table.into(),
            referenced_columns: referenced_columns.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// A table in the desired schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDef {
    pub name: String,
    pub columns: Vec<ColumnDef>,
    pub primary_key: Vec<String>,
    pub interleave: Option<Interleave>,
    pub indexes: Vec<IndexDef>,
    pub foreign_keys: Vec<ForeignKeyDef>,
}

impl TableDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key: Vec::new(),
            interleave: None,
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    #[must_use]
    pub fn column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    #[must_use]
    pub fn primary_key(mut self, columns: &[&str]) -> Self {
        self.primary_key = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Physically interleave this table in a parent.
    #[must_use]
    pub fn interleave_in(mut self, parent: impl Into<String>, on_delete: OnDeleteAction) -> Self {
        self.interleave = Some(Interleave {
            parent: parent.into(),
            on_delete,
        });
        self
    }

    #[must_use]
    pub fn index(mut self, index: IndexDef) -> Self {
        self.indexes.push(index);
        self
    }

    #[must_use]
    pub fn foreign_key(mut self, fk: ForeignKeyDef) -> Self {
        self.foreign_keys.push(fk);
        self
    }

    pub fn find_column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// The whole desired schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaModel {
    pub tables: Vec<TableDef>,
}

impl SchemaModel {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn table(mut self, table: TableDef) -> Self {
        self.tables.push(table);
        self
    }

    pub fn find_table(&self, name: &str) -> Option<&TableDef> {
        self.tables.iter().find(|t| t.name == name)
    }
}
