//! Entity-to-table mapping registry.
//!
//! Mappings are an explicit configuration object handed to the session at
//! construction, keyed by entity identity. There is no process-wide mutable
//! registration.

use crate::config::WriteMode;
use crate::error::{OrmError, OrmResult};
use crate::types::SpannerType;
use std::collections::HashMap;

/// A mapped column: name, declared type, and whether the database computes
/// it (generated columns are never written).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    pub name: String,
    pub declared_type: SpannerType,
    pub generated: bool,
}

impl ColumnMapping {
    pub fn new(name: impl Into<String>, declared_type: SpannerType) -> Self {
        Self {
            name: name.into(),
            declared_type,
            generated: false,
        }
    }
}

/// Mapping of one entity onto its table.
#[derive(Debug, Clone)]
pub struct EntityMapping {
    /// Entity identity (the registry key).
    pub entity: String,
    pub table: String,
    /// Primary-key columns, in key order.
    pub key_columns: Vec<ColumnMapping>,
    /// Non-key data columns, in declared-entity order.
    pub data_columns: Vec<ColumnMapping>,
    /// Version column for optimistic concurrency, when the entity is
    /// versioned. Always INT64.
    pub version_column: Option<String>,
    /// Per-entity write-mode override.
    pub write_mode: Option<WriteMode>,
}

impl EntityMapping {
    pub fn new(entity: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            table: table.into(),
            key_columns: Vec::new(),
            data_columns: Vec::new(),
            version_column: None,
            write_mode: None,
        }
    }

    /// Add a primary-key column.
    #[must_use]
    pub fn key_column(mut self, name: impl Into<String>, ty: SpannerType) -> Self {
        self.key_columns.push(ColumnMapping::new(name, ty));
        self
    }

    /// Add a data column.
    #[must_use]
    pub fn data_column(mut self, name: impl Into<String>, ty: SpannerType) -> Self {
        self.data_columns.push(ColumnMapping::new(name, ty));
        self
    }

    /// Add a database-computed column. It participates in reads and entity
    /// state, but the coordinator never writes it.
    #[must_use]
    pub fn generated_column(mut self, name: impl Into<String>, ty: SpannerType) -> Self {
        let mut column = ColumnMapping::new(name, ty);
        column.generated = true;
        self.data_columns.push(column);
        self
    }

    /// Mark the entity as versioned via the given INT64 column.
    #[must_use]
    pub fn versioned(mut self, column: impl Into<String>) -> Self {
        self.version_column = Some(column.into());
        self
    }

    /// Override the session's default write mode for this entity.
    #[must_use]
    pub fn write_mode(mut self, mode: WriteMode) -> Self {
        self.write_mode = Some(mode);
        self
    }

    pub fn is_versioned(&self) -> bool {
        self.version_column.is_some()
    }
}

/// Registry of entity mappings, passed to the session at construction.
#[derive(Debug, Clone, Default)]
pub struct MappingRegistry {
    mappings: HashMap<String, EntityMapping>,
}

impl MappingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a mapping, replacing any previous mapping for the entity.
    #[must_use]
    pub fn with(mut self, mapping: EntityMapping) -> Self {
        self.mappings.insert(mapping.entity.clone(), mapping);
        self
    }

    pub fn get(&self, entity: &str) -> OrmResult<&EntityMapping> {
        self.mappings
            .get(entity)
            .ok_or_else(|| OrmError::validation(format!("No mapping registered for entity '{entity}'")))
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}
