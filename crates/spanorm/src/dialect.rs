//! Fragment-level translation from the ORM's ANSI-ish SQL to Spanner SQL.
//!
//! Every function here is stateless and context-free: it receives
//! already-rendered SQL subexpressions and returns the Spanner-native
//! fragment, without knowledge of the enclosing statement.
//!
//! String indexing crosses a convention boundary: the ORM is 0-based,
//! GoogleSQL string functions are 1-based. The shift is applied here and
//! only here: +1 going into `SUBSTR`/`STRPOS` positions, -1 coming out of
//! `index_of`.

use crate::error::{OrmError, OrmResult};
use crate::types::SpannerType;

/// Explicit "no limit" sentinel. Spanner requires a LIMIT whenever OFFSET is
/// present, so an OFFSET-only page is expressed as `LIMIT <i64::MAX>`.
pub const NO_LIMIT_SENTINEL: i64 = i64::MAX;

// ─── String functions ───────────────────────────────────────────────────────

/// `Contains(haystack, needle)` → `STRPOS(haystack, needle) > 0`
pub fn contains(haystack: &str, needle: &str) -> String {
    format!("STRPOS({haystack}, {needle}) > 0")
}

/// `StartsWith(s, prefix)` → `STARTS_WITH(s, prefix)`
pub fn starts_with(s: &str, prefix: &str) -> String {
    format!("STARTS_WITH({s}, {prefix})")
}

/// `EndsWith(s, suffix)` → `ENDS_WITH(s, suffix)`
pub fn ends_with(s: &str, suffix: &str) -> String {
    format!("ENDS_WITH({s}, {suffix})")
}

/// `IndexOf(source, search[, from])`, 0-based in and out.
///
/// `STRPOS` is 1-based and returns 0 on no match, so the result is shifted
/// by -1 (no match becomes -1, matching the ORM convention). The optional
/// `from` argument is a 0-based start offset fragment.
pub fn index_of(source: &str, search: &str, from: Option<&str>) -> String {
    match from {
        None => format!("STRPOS({source}, {search}) - 1"),
        Some(from) => format!(
            "IF(STRPOS(SUBSTR({source}, {from} + 1), {search}) = 0, -1, \
             STRPOS(SUBSTR({source}, {from} + 1), {search}) + {from} - 1)"
        ),
    }
}

/// `Substring(source, start[, length])`, start is 0-based.
pub fn substring(source: &str, start: &str, length: Option<&str>) -> String {
    match length {
        None => format!("SUBSTR({source}, {start} + 1)"),
        Some(len) => format!("SUBSTR({source}, {start} + 1, {len})"),
    }
}

/// `Replace(source, from, to)` → `REPLACE(source, from, to)`
pub fn replace(source: &str, from: &str, to: &str) -> String {
    format!("REPLACE({source}, {from}, {to})")
}

/// `ToUpper(s)` → `UPPER(s)`
pub fn upper(s: &str) -> String {
    format!("UPPER({s})")
}

/// `ToLower(s)` → `LOWER(s)`
pub fn lower(s: &str) -> String {
    format!("LOWER({s})")
}

/// Which side(s) a trim applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrimSide {
    Both,
    Leading,
    Trailing,
}

/// `Trim`/`TrimStart`/`TrimEnd`, with or without an explicit trim set.
pub fn trim(s: &str, side: TrimSide, chars: Option<&str>) -> String {
    let func = match side {
        TrimSide::Both => "TRIM",
        TrimSide::Leading => "LTRIM",
        TrimSide::Trailing => "RTRIM",
    };
    match chars {
        None => format!("{func}({s})"),
        Some(chars) => format!("{func}({s}, {chars})"),
    }
}

/// `PadLeft(s, width[, pad])` → `LPAD(s, width[, pad])`
pub fn pad_left(s: &str, width: &str, pad: Option<&str>) -> String {
    match pad {
        None => format!("LPAD({s}, {width})"),
        Some(pad) => format!("LPAD({s}, {width}, {pad})"),
    }
}

/// `PadRight(s, width[, pad])` → `RPAD(s, width[, pad])`
pub fn pad_right(s: &str, width: &str, pad: Option<&str>) -> String {
    match pad {
        None => format!("RPAD({s}, {width})"),
        Some(pad) => format!("RPAD({s}, {width}, {pad})"),
    }
}

/// `Length(s)` → `CHAR_LENGTH(s)`
pub fn length(s: &str) -> String {
    format!("CHAR_LENGTH({s})")
}

/// String concatenation via `+` → `CONCAT(a, b, ...)`
pub fn concat(parts: &[&str]) -> String {
    format!("CONCAT({})", parts.join(", "))
}

// ─── Date/time functions ────────────────────────────────────────────────────

/// A date/time field the ORM can extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateField {
    Year,
    Month,
    Day,
    DayOfYear,
    DayOfWeek,
    Hour,
    Minute,
    Second,
    Millisecond,
}

impl DateField {
    fn sql_part(self) -> &'static str {
        match self {
            DateField::Year => "YEAR",
            DateField::Month => "MONTH",
            DateField::Day => "DAY",
            DateField::DayOfYear => "DAYOFYEAR",
            // GoogleSQL DAYOFWEEK is 1-based starting Sunday; passed through
            // unchanged, see DESIGN.md.
            DateField::DayOfWeek => "DAYOFWEEK",
            DateField::Hour => "HOUR",
            DateField::Minute => "MINUTE",
            DateField::Second => "SECOND",
            DateField::Millisecond => "MILLISECOND",
        }
    }
}

/// Field extraction → `EXTRACT(<part> FROM expr)`
pub fn extract(field: DateField, expr: &str) -> String {
    format!("EXTRACT({} FROM {expr})", field.sql_part())
}

/// `AddDays(ts, n)` → `TIMESTAMP_ADD(ts, INTERVAL n DAY)`
pub fn add_days(ts: &str, days: &str) -> String {
    format!("TIMESTAMP_ADD({ts}, INTERVAL {days} DAY)")
}

/// `AddHours(ts, n)` → `TIMESTAMP_ADD(ts, INTERVAL n HOUR)`
pub fn add_hours(ts: &str, hours: &str) -> String {
    format!("TIMESTAMP_ADD({ts}, INTERVAL {hours} HOUR)")
}

/// `AddTicks(ts, n)` where a tick is 100 nanoseconds.
///
/// Spanner's finest interval unit is the nanosecond, so ticks are scaled
/// by a fixed ×100.
pub fn add_ticks(ts: &str, ticks: &str) -> String {
    format!("TIMESTAMP_ADD({ts}, INTERVAL ({ticks}) * 100 NANOSECOND)")
}

// ─── Casts ──────────────────────────────────────────────────────────────────

/// `CAST(expr AS <type>)` using the unsized Spanner type name.
pub fn cast(expr: &str, target: &SpannerType) -> String {
    format!("CAST({expr} AS {})", target.cast_name())
}

// ─── Pagination ─────────────────────────────────────────────────────────────

/// Render the pagination tail of a SELECT.
///
/// - both present → `LIMIT l OFFSET o`
/// - LIMIT only, or OFFSET = 0 → `LIMIT l` (OFFSET omitted entirely)
/// - OFFSET only → `LIMIT 9223372036854775807 OFFSET o` (Spanner requires an
///   explicit limit whenever OFFSET is present)
/// - neither → empty string
pub fn limit_clause(limit: Option<u64>, offset: Option<u64>) -> String {
    let offset = offset.filter(|o| *o > 0);
    match (limit, offset) {
        (Some(l), Some(o)) => format!("LIMIT {l} OFFSET {o}"),
        (Some(l), None) => format!("LIMIT {l}"),
        (None, Some(o)) => format!("LIMIT {NO_LIMIT_SENTINEL} OFFSET {o}"),
        (None, None) => String::new(),
    }
}

// ─── INSERT ... SELECT ──────────────────────────────────────────────────────

/// Build an `INSERT INTO ... SELECT` with target columns in declared-entity
/// order.
///
/// Positional correspondence is validated: the source projection arity must
/// equal the target column count.
pub fn insert_select(
    table: &str,
    columns: &[&str],
    select_sql: &str,
    projection_arity: usize,
) -> OrmResult<String> {
    if columns.is_empty() {
        return Err(OrmError::validation("INSERT-SELECT requires target columns"));
    }
    if projection_arity != columns.len() {
        return Err(OrmError::validation(format!(
            "INSERT-SELECT projection arity {} does not match {} target columns",
            projection_arity,
            columns.len()
        )));
    }
    Ok(format!(
        "INSERT INTO {table} ({}) {select_sql}",
        columns.join(", ")
    ))
}

// ─── Dispatch by ORM function name ──────────────────────────────────────────

/// Translate a function call the upstream query compiler emits by name.
///
/// Names are the ORM's own (case-insensitive). A name with no Spanner-native
/// equivalent fails with [`OrmError::UnsupportedTranslation`]; that error is
/// surfaced to the caller and never retried.
pub fn translate_function(name: &str, args: &[&str]) -> OrmResult<String> {
    let arity = |want: std::ops::RangeInclusive<usize>| -> OrmResult<()> {
        if want.contains(&args.len()) {
            Ok(())
        } else {
            Err(OrmError::validation(format!(
                "{name} takes {}..={} arguments, got {}",
                want.start(),
                want.end(),
                args.len()
            )))
        }
    };

    match name.to_ascii_lowercase().as_str() {
        "contains" => {
            arity(2..=2)?;
            Ok(contains(args[0], args[1]))
        }
        "startswith" => {
            arity(2..=2)?;
            Ok(starts_with(args[0], args[1]))
        }
        "endswith" => {
            arity(2..=2)?;
            Ok(ends_with(args[0], args[1]))
        }
        "indexof" => {
            arity(2..=3)?;
            Ok(index_of(args[0], args[1], args.get(2).copied()))
        }
        "substring" => {
            arity(2..=3)?;
            Ok(substring(args[0], args[1], args.get(2).copied()))
        }
        "replace" => {
            arity(3..=3)?;
            Ok(replace(args[0], args[1], args[2]))
        }
        "toupper" => {
            arity(1..=1)?;
            Ok(upper(args[0]))
        }
        "tolower" => {
            arity(1..=1)?;
            Ok(lower(args[0]))
        }
        "trim" => {
            arity(1..=2)?;
            Ok(trim(args[0], TrimSide::Both, args.get(1).copied()))
        }
        "trimstart" => {
            arity(1..=2)?;
            Ok(trim(args[0], TrimSide::Leading, args.get(1).copied()))
        }
        "trimend" => {
            arity(1..=2)?;
            Ok(trim(args[0], TrimSide::Trailing, args.get(1).copied()))
        }
        "padleft" => {
            arity(2..=3)?;
            Ok(pad_left(args[0], args[1], args.get(2).copied()))
        }
        "padright" => {
            arity(2..=3)?;
            Ok(pad_right(args[0], args[1], args.get(2).copied()))
        }
        "length" => {
            arity(1..=1)?;
            Ok(length(args[0]))
        }
        "concat" => {
            arity(2..=usize::MAX)?;
            Ok(concat(args))
        }
        "year" => {
            arity(1..=1)?;
            Ok(extract(DateField::Year, args[0]))
        }
        "month" => {
            arity(1..=1)?;
            Ok(extract(DateField::Month, args[0]))
        }
        "day" => {
            arity(1..=1)?;
            Ok(extract(DateField::Day, args[0]))
        }
        "dayofyear" => {
            arity(1..=1)?;
            Ok(extract(DateField::DayOfYear, args[0]))
        }
        "dayofweek" => {
            arity(1..=1)?;
            Ok(extract(DateField::DayOfWeek, args[0]))
        }
        "hour" => {
            arity(1..=1)?;
            Ok(extract(DateField::Hour, args[0]))
        }
        "minute" => {
            arity(1..=1)?;
            Ok(extract(DateField::Minute, args[0]))
        }
        "second" => {
            arity(1..=1)?;
            Ok(extract(DateField::Second, args[0]))
        }
        "millisecond" => {
            arity(1..=1)?;
            Ok(extract(DateField::Millisecond, args[0]))
        }
        "adddays" => {
            arity(2..=2)?;
            Ok(add_days(args[0], args[1]))
        }
        "addhours" => {
            arity(2..=2)?;
            Ok(add_hours(args[0], args[1]))
        }
        "addticks" => {
            arity(2..=2)?;
            Ok(add_ticks(args[0], args[1]))
        }
        other => Err(OrmError::UnsupportedTranslation(format!(
            "no Spanner equivalent for function '{other}'"
        ))),
    }
}
