//! Statement model: SQL text, kind, typed parameter bindings, and hints.
//!
//! A [`Statement`] is immutable once built and lives for exactly one
//! execution. Parameters use Spanner's named `@pN` placeholders; the
//! declared type of each binding drives codec selection at execution time.

use crate::codec::Value;
use crate::error::{OrmError, OrmResult};
use crate::hints::HintSpec;
use crate::types::SpannerType;

/// Statement classification, derived from the leading keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    Ddl,
}

impl StatementKind {
    /// Classify a SQL string by its first keyword.
    pub fn of(sql: &str) -> OrmResult<Self> {
        let first = sql
            .trim_start()
            .split_whitespace()
            .next()
            .unwrap_or_default();
        match first.to_ascii_uppercase().as_str() {
            "SELECT" | "WITH" => Ok(StatementKind::Select),
            "INSERT" => Ok(StatementKind::Insert),
            "UPDATE" => Ok(StatementKind::Update),
            "DELETE" => Ok(StatementKind::Delete),
            "CREATE" | "ALTER" | "DROP" => Ok(StatementKind::Ddl),
            other => Err(OrmError::validation(format!(
                "Cannot classify statement starting with '{other}'"
            ))),
        }
    }

    pub fn is_dml(&self) -> bool {
        matches!(
            self,
            StatementKind::Insert | StatementKind::Update | StatementKind::Delete
        )
    }
}

/// One named, typed parameter binding.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterBinding {
    pub name: String,
    pub declared_type: SpannerType,
    pub value: Value,
}

/// A SQL statement prepared for one execution.
#[derive(Debug, Clone)]
pub struct Statement {
    sql: String,
    kind: StatementKind,
    params: Vec<ParameterBinding>,
    hints: Option<HintSpec>,
}

impl Statement {
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    pub fn params(&self) -> &[ParameterBinding] {
        &self.params
    }

    pub fn hints(&self) -> Option<&HintSpec> {
        self.hints.as_ref()
    }
}

/// Builder for [`Statement`].
///
/// # Example
/// ```ignore
/// let stmt = StatementBuilder::new("SELECT * FROM Singers WHERE SingerId = @p1")?
///     .bind(SpannerType::Int64, Value::Int64(42))
///     .build();
/// ```
#[must_use]
pub struct StatementBuilder {
    sql: String,
    kind: StatementKind,
    params: Vec<ParameterBinding>,
    hints: Option<HintSpec>,
}

impl StatementBuilder {
    /// Start a builder; the statement kind is derived from the SQL text.
    pub fn new(sql: impl Into<String>) -> OrmResult<Self> {
        let sql = sql.into();
        let kind = StatementKind::of(&sql)?;
        Ok(Self {
            sql,
            kind,
            params: Vec::new(),
            hints: None,
        })
    }

    /// Bind the next positional parameter as `@p1`, `@p2`, ...
    pub fn bind(mut self, declared_type: SpannerType, value: Value) -> Self {
        let name = format!("p{}", self.params.len() + 1);
        self.params.push(ParameterBinding {
            name,
            declared_type,
            value,
        });
        self
    }

    /// Bind a parameter under an explicit name (without the `@`).
    pub fn bind_named(
        mut self,
        name: impl Into<String>,
        declared_type: SpannerType,
        value: Value,
    ) -> Self {
        self.params.push(ParameterBinding {
            name: name.into(),
            declared_type,
            value,
        });
        self
    }

    /// Attach structured hints to splice at execution time.
    pub fn hints(mut self, hints: HintSpec) -> Self {
        self.hints = Some(hints);
        self
    }

    pub fn build(self) -> Statement {
        Statement {
            sql: self.sql,
            kind: self.kind,
            params: self.params,
            hints: self.hints,
        }
    }
}
