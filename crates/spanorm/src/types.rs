//! The closed set of Spanner scalar and array types.
//!
//! Declared types drive codec selection and are matched exhaustively, so an
//! unsupported type is a compile error rather than a value silently passed
//! through.

use crate::error::{OrmError, OrmResult};
use serde::{Deserialize, Serialize};

/// A declared Spanner column/parameter type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpannerType {
    Bool,
    Int64,
    Float64,
    Numeric,
    String,
    Bytes,
    Date,
    Timestamp,
    Json,
    Array(Box<SpannerType>),
}

impl SpannerType {
    /// Shorthand for an array of the given element type.
    pub fn array(element: SpannerType) -> Self {
        SpannerType::Array(Box::new(element))
    }

    /// Parse a catalog type string as found in `INFORMATION_SCHEMA.COLUMNS.SPANNER_TYPE`.
    ///
    /// Length specifiers (`STRING(120)`, `BYTES(MAX)`) are accepted and
    /// dropped; the codec does not enforce lengths.
    pub fn parse(s: &str) -> OrmResult<Self> {
        let s = s.trim();
        if let Some(rest) = strip_prefix_ci(s, "ARRAY<") {
            let inner = rest.strip_suffix('>').ok_or_else(|| {
                OrmError::validation(format!("Unclosed ARRAY type: '{s}'"))
            })?;
            return Ok(SpannerType::array(Self::parse(inner)?));
        }

        // Strip a parenthesized length from STRING(n)/BYTES(n)/NUMERIC(p,s).
        let base = match s.find('(') {
            Some(idx) => {
                if !s.ends_with(')') {
                    return Err(OrmError::validation(format!("Malformed type string: '{s}'")));
                }
                &s[..idx]
            }
            None => s,
        };

        match base.to_ascii_uppercase().as_str() {
            "BOOL" => Ok(SpannerType::Bool),
            "INT64" => Ok(SpannerType::Int64),
            "FLOAT64" => Ok(SpannerType::Float64),
            "NUMERIC" => Ok(SpannerType::Numeric),
            "STRING" => Ok(SpannerType::String),
            "BYTES" => Ok(SpannerType::Bytes),
            "DATE" => Ok(SpannerType::Date),
            "TIMESTAMP" => Ok(SpannerType::Timestamp),
            "JSON" => Ok(SpannerType::Json),
            other => Err(OrmError::validation(format!(
                "Unknown Spanner type: '{other}'"
            ))),
        }
    }

    /// Render as DDL column type text (sized types default to `MAX`).
    pub fn ddl_name(&self) -> String {
        match self {
            SpannerType::Bool => "BOOL".to_string(),
            SpannerType::Int64 => "INT64".to_string(),
            SpannerType::Float64 => "FLOAT64".to_string(),
            SpannerType::Numeric => "NUMERIC".to_string(),
            SpannerType::String => "STRING(MAX)".to_string(),
            SpannerType::Bytes => "BYTES(MAX)".to_string(),
            SpannerType::Date => "DATE".to_string(),
            SpannerType::Timestamp => "TIMESTAMP".to_string(),
            SpannerType::Json => "JSON".to_string(),
            SpannerType::Array(inner) => format!("ARRAY<{}>", inner.ddl_name()),
        }
    }

    /// Render as a `CAST(... AS <name>)` target (no length specifiers).
    pub fn cast_name(&self) -> String {
        match self {
            SpannerType::Bool => "BOOL".to_string(),
            SpannerType::Int64 => "INT64".to_string(),
            SpannerType::Float64 => "FLOAT64".to_string(),
            SpannerType::Numeric => "NUMERIC".to_string(),
            SpannerType::String => "STRING".to_string(),
            SpannerType::Bytes => "BYTES".to_string(),
            SpannerType::Date => "DATE".to_string(),
            SpannerType::Timestamp => "TIMESTAMP".to_string(),
            SpannerType::Json => "JSON".to_string(),
            SpannerType::Array(inner) => format!("ARRAY<{}>", inner.cast_name()),
        }
    }

    /// Element type if this is an array.
    pub fn element(&self) -> Option<&SpannerType> {
        match self {
            SpannerType::Array(inner) => Some(inner),
            _ => None,
        }
    }
}

impl std::fmt::Display for SpannerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.ddl_name())
    }
}

fn strip_prefix_ci<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    if s.len() >= prefix.len() && s[..prefix.len()].eq_ignore_ascii_case(prefix) {
        Some(&s[prefix.len()..])
    } else {
        None
    }
}
