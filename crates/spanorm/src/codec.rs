//! Bidirectional mapping between native values and Spanner wire values.
//!
//! Encoding is total over the supported type set: every [`Value`] either maps
//! to a [`WireValue`] under its declared [`SpannerType`] or fails with
//! [`OrmError::TypeMismatch`]. There is no silent coercion, with one
//! documented widening: an `Int64` value may be encoded into a `Float64`
//! slot.
//!
//! Canonical wire formatting follows production Spanner: INT64 as a decimal
//! string, NUMERIC as a normalized fixed-point string (no forced trailing
//! zeros), DATE as ISO `YYYY-MM-DD`, TIMESTAMP as RFC 3339 with an explicit
//! UTC offset at nanosecond precision. The emulator formats NUMERIC strings
//! differently in some releases; that divergence is a test-environment
//! caveat and is intentionally not compensated for here.

use crate::error::{OrmError, OrmResult};
use crate::types::SpannerType;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;

/// A native value as seen by the ORM pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int64(i64),
    Float64(f64),
    Numeric(Decimal),
    String(String),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
    Json(serde_json::Value),
    Array(Vec<Value>),
}

impl Value {
    /// Short type label used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Bool(_) => "BOOL",
            Value::Int64(_) => "INT64",
            Value::Float64(_) => "FLOAT64",
            Value::Numeric(_) => "NUMERIC",
            Value::String(_) => "STRING",
            Value::Bytes(_) => "BYTES",
            Value::Date(_) => "DATE",
            Value::Timestamp(_) => "TIMESTAMP",
            Value::Json(_) => "JSON",
            Value::Array(_) => "ARRAY",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

/// A value in Spanner's wire representation.
///
/// Mirrors the protobuf `Value` union the execute-SQL protocol carries:
/// INT64, NUMERIC, DATE, TIMESTAMP, and JSON all travel as strings; FLOAT64
/// travels as a number; BYTES stay raw here (the transport applies its own
/// base64 framing).
#[derive(Debug, Clone, PartialEq)]
pub enum WireValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Bytes(Vec<u8>),
    List(Vec<WireValue>),
}

impl WireValue {
    fn kind_name(&self) -> &'static str {
        match self {
            WireValue::Null => "null",
            WireValue::Bool(_) => "bool",
            WireValue::Number(_) => "number",
            WireValue::String(_) => "string",
            WireValue::Bytes(_) => "bytes",
            WireValue::List(_) => "list",
        }
    }
}

/// Canonical NUMERIC wire text: fixed-point, no forced trailing zeros.
fn format_numeric(d: &Decimal) -> String {
    d.normalize().to_string()
}

/// Canonical TIMESTAMP wire text: RFC 3339, explicit UTC offset, nanoseconds.
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Canonical DATE wire text: ISO `YYYY-MM-DD`.
fn format_date(d: &NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

/// Encode a native value under its declared type.
///
/// A `Null` container encodes to a wire null regardless of declared type.
/// Array encoding preserves per-element null; an empty array encodes to an
/// empty wire list, which is distinct from a null array.
pub fn encode(value: &Value, declared: &SpannerType) -> OrmResult<WireValue> {
    if value.is_null() {
        return Ok(WireValue::Null);
    }

    let mismatch = || OrmError::type_mismatch(declared.ddl_name(), value.kind_name());

    match declared {
        SpannerType::Bool => match value {
            Value::Bool(b) => Ok(WireValue::Bool(*b)),
            _ => Err(mismatch()),
        },
        SpannerType::Int64 => match value {
            Value::Int64(i) => Ok(WireValue::String(i.to_string())),
            _ => Err(mismatch()),
        },
        SpannerType::Float64 => match value {
            Value::Float64(f) => Ok(WireValue::Number(*f)),
            // Documented widening: integer literal into a FLOAT64 slot.
            Value::Int64(i) => Ok(WireValue::Number(*i as f64)),
            _ => Err(mismatch()),
        },
        SpannerType::Numeric => match value {
            Value::Numeric(d) => Ok(WireValue::String(format_numeric(d))),
            _ => Err(mismatch()),
        },
        SpannerType::String => match value {
            Value::String(s) => Ok(WireValue::String(s.clone())),
            _ => Err(mismatch()),
        },
        SpannerType::Bytes => match value {
            Value::Bytes(b) => Ok(WireValue::Bytes(b.clone())),
            _ => Err(mismatch()),
        },
        SpannerType::Date => match value {
            Value::Date(d) => Ok(WireValue::String(format_date(d))),
            _ => Err(mismatch()),
        },
        SpannerType::Timestamp => match value {
            Value::Timestamp(ts) => Ok(WireValue::String(format_timestamp(ts))),
            _ => Err(mismatch()),
        },
        SpannerType::Json => match value {
            Value::Json(v) => Ok(WireValue::String(v.to_string())),
            _ => Err(mismatch()),
        },
        SpannerType::Array(element) => match value {
            Value::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    if let Value::Array(_) = item {
                        // Spanner has no nested arrays.
                        return Err(OrmError::type_mismatch(
                            element.ddl_name(),
                            item.kind_name(),
                        ));
                    }
                    out.push(encode(item, element)?);
                }
                Ok(WireValue::List(out))
            }
            _ => Err(mismatch()),
        },
    }
}

/// Decode a wire value under its declared type.
pub fn decode(wire: &WireValue, declared: &SpannerType) -> OrmResult<Value> {
    if let WireValue::Null = wire {
        return Ok(Value::Null);
    }

    let mismatch = || OrmError::type_mismatch(declared.ddl_name(), wire.kind_name());

    match declared {
        SpannerType::Bool => match wire {
            WireValue::Bool(b) => Ok(Value::Bool(*b)),
            _ => Err(mismatch()),
        },
        SpannerType::Int64 => match wire {
            WireValue::String(s) => s
                .parse::<i64>()
                .map(Value::Int64)
                .map_err(|e| OrmError::type_mismatch("INT64", format!("'{s}' ({e})"))),
            _ => Err(mismatch()),
        },
        SpannerType::Float64 => match wire {
            WireValue::Number(f) => Ok(Value::Float64(*f)),
            _ => Err(mismatch()),
        },
        SpannerType::Numeric => match wire {
            WireValue::String(s) => Decimal::from_str(s)
                .map(Value::Numeric)
                .map_err(|e| OrmError::type_mismatch("NUMERIC", format!("'{s}' ({e})"))),
            _ => Err(mismatch()),
        },
        SpannerType::String => match wire {
            WireValue::String(s) => Ok(Value::String(s.clone())),
            _ => Err(mismatch()),
        },
        SpannerType::Bytes => match wire {
            WireValue::Bytes(b) => Ok(Value::Bytes(b.clone())),
            _ => Err(mismatch()),
        },
        SpannerType::Date => match wire {
            WireValue::String(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map(Value::Date)
                .map_err(|e| OrmError::type_mismatch("DATE", format!("'{s}' ({e})"))),
            _ => Err(mismatch()),
        },
        SpannerType::Timestamp => match wire {
            WireValue::String(s) => DateTime::parse_from_rfc3339(s)
                .map(|ts| Value::Timestamp(ts.with_timezone(&Utc)))
                .map_err(|e| OrmError::type_mismatch("TIMESTAMP", format!("'{s}' ({e})"))),
            _ => Err(mismatch()),
        },
        SpannerType::Json => match wire {
            WireValue::String(s) => serde_json::from_str(s)
                .map(Value::Json)
                .map_err(|e| OrmError::type_mismatch("JSON", format!("'{s}' ({e})"))),
            _ => Err(mismatch()),
        },
        SpannerType::Array(element) => match wire {
            WireValue::List(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(decode(item, element)?);
                }
                Ok(Value::Array(out))
            }
            _ => Err(mismatch()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn round_trip(value: Value, ty: SpannerType) {
        let wire = encode(&value, &ty).unwrap();
        assert_eq!(decode(&wire, &ty).unwrap(), value);
    }

    #[test]
    fn scalar_round_trips() {
        round_trip(Value::Bool(true), SpannerType::Bool);
        round_trip(Value::Int64(-42), SpannerType::Int64);
        round_trip(Value::Int64(i64::MAX), SpannerType::Int64);
        round_trip(Value::Float64(2.5), SpannerType::Float64);
        round_trip(Value::String("héllo".into()), SpannerType::String);
        round_trip(Value::Bytes(vec![0, 1, 255]), SpannerType::Bytes);
        round_trip(
            Value::Date(NaiveDate::from_ymd_opt(2020, 12, 25).unwrap()),
            SpannerType::Date,
        );
        round_trip(
            Value::Json(serde_json::json!({"a": [1, 2], "b": null})),
            SpannerType::Json,
        );
    }

    #[test]
    fn timestamp_round_trip_keeps_sub_second_precision() {
        let ts = Utc.with_ymd_and_hms(2021, 1, 2, 3, 4, 5).unwrap()
            + chrono::Duration::nanoseconds(123_456_700);
        round_trip(Value::Timestamp(ts), SpannerType::Timestamp);
    }

    #[test]
    fn int64_travels_as_string() {
        let wire = encode(&Value::Int64(7), &SpannerType::Int64).unwrap();
        assert_eq!(wire, WireValue::String("7".into()));
    }

    #[test]
    fn numeric_canonical_form_drops_trailing_zeros() {
        let d = Decimal::from_str("12.3400").unwrap();
        let wire = encode(&Value::Numeric(d), &SpannerType::Numeric).unwrap();
        assert_eq!(wire, WireValue::String("12.34".into()));
        // Lossy by design: the scale of "12.3400" is not preserved, the
        // numeric value is.
        let back = decode(&wire, &SpannerType::Numeric).unwrap();
        assert_eq!(back, Value::Numeric(Decimal::from_str("12.34").unwrap()));
    }

    #[test]
    fn timestamp_canonical_form_has_utc_offset() {
        let ts = Utc.with_ymd_and_hms(2021, 6, 1, 12, 0, 0).unwrap();
        let wire = encode(&Value::Timestamp(ts), &SpannerType::Timestamp).unwrap();
        assert_eq!(wire, WireValue::String("2021-06-01T12:00:00.000000000Z".into()));
    }

    #[test]
    fn date_canonical_form() {
        let d = NaiveDate::from_ymd_opt(2021, 3, 9).unwrap();
        let wire = encode(&Value::Date(d), &SpannerType::Date).unwrap();
        assert_eq!(wire, WireValue::String("2021-03-09".into()));
    }

    #[test]
    fn null_container_encodes_to_wire_null_for_any_type() {
        for ty in [
            SpannerType::Bool,
            SpannerType::Int64,
            SpannerType::array(SpannerType::String),
        ] {
            assert_eq!(encode(&Value::Null, &ty).unwrap(), WireValue::Null);
            assert_eq!(decode(&WireValue::Null, &ty).unwrap(), Value::Null);
        }
    }

    #[test]
    fn array_preserves_element_nulls() {
        let ty = SpannerType::array(SpannerType::Int64);
        let value = Value::Array(vec![Value::Int64(1), Value::Null, Value::Int64(3)]);
        let wire = encode(&value, &ty).unwrap();
        assert_eq!(
            wire,
            WireValue::List(vec![
                WireValue::String("1".into()),
                WireValue::Null,
                WireValue::String("3".into()),
            ])
        );
        assert_eq!(decode(&wire, &ty).unwrap(), value);
    }

    #[test]
    fn empty_array_is_not_null() {
        let ty = SpannerType::array(SpannerType::String);
        let wire = encode(&Value::Array(vec![]), &ty).unwrap();
        assert_eq!(wire, WireValue::List(vec![]));
        assert_ne!(wire, WireValue::Null);
        assert_eq!(decode(&wire, &ty).unwrap(), Value::Array(vec![]));
    }

    #[test]
    fn int_widens_into_float64_slot() {
        let wire = encode(&Value::Int64(3), &SpannerType::Float64).unwrap();
        assert_eq!(wire, WireValue::Number(3.0));
    }

    #[test]
    fn mismatched_runtime_type_is_an_error() {
        let err = encode(&Value::String("x".into()), &SpannerType::Int64).unwrap_err();
        assert!(err.is_type_mismatch());

        let err = encode(&Value::Float64(1.0), &SpannerType::Int64).unwrap_err();
        assert!(err.is_type_mismatch(), "no silent narrowing into INT64");

        let err = encode(
            &Value::Array(vec![Value::Bool(true)]),
            &SpannerType::array(SpannerType::Int64),
        )
        .unwrap_err();
        assert!(err.is_type_mismatch());
    }

    #[test]
    fn nested_arrays_are_rejected() {
        let err = encode(
            &Value::Array(vec![Value::Array(vec![])]),
            &SpannerType::array(SpannerType::Int64),
        )
        .unwrap_err();
        assert!(err.is_type_mismatch());
    }

    #[test]
    fn decode_rejects_wrong_wire_shape() {
        let err = decode(&WireValue::Bool(true), &SpannerType::Int64).unwrap_err();
        assert!(err.is_type_mismatch());
        let err = decode(&WireValue::String("abc".into()), &SpannerType::Int64).unwrap_err();
        assert!(err.is_type_mismatch());
    }
}
