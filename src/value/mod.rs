//! Row and value helpers.
//!
//! Records keep column values as `sea_query::Value` so they can be bound into
//! statements unchanged. This module holds the conversions between those values,
//! JSON (snapshots, form input) and plain integers (identity handling).

use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use indexmap::IndexMap;
use sea_query::Value;
use serde_json::Value as JsonValue;

/// One result row: column name (or `path:column` alias) to value, in select order
pub type Row = IndexMap<String, Value>;

/// Whether `value` is SQL NULL, whatever its type
pub fn is_null(value: &Value) -> bool {
    *value == value.as_null()
}

/// Integer view of a value, used for identities and counts
pub fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::TinyInt(Some(v)) => Some(i64::from(*v)),
        Value::SmallInt(Some(v)) => Some(i64::from(*v)),
        Value::Int(Some(v)) => Some(i64::from(*v)),
        Value::BigInt(Some(v)) => Some(*v),
        Value::TinyUnsigned(Some(v)) => Some(i64::from(*v)),
        Value::SmallUnsigned(Some(v)) => Some(i64::from(*v)),
        Value::Unsigned(Some(v)) => Some(i64::from(*v)),
        Value::BigUnsigned(Some(v)) => i64::try_from(*v).ok(),
        Value::String(Some(s)) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Compare two values the way a change tracker should: integers of different widths
/// holding the same number are equal, and so are two NULLs of different types.
pub fn same_value(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    match (a, b) {
        (a, b) if is_null(a) && is_null(b) => true,
        (a, b) if is_integer(a) && is_integer(b) => {
            integer_of(a).is_some() && integer_of(a) == integer_of(b)
        }
        (Value::Float(Some(x)), Value::Double(Some(y))) | (Value::Double(Some(y)), Value::Float(Some(x))) => {
            f64::from(*x) == *y
        }
        _ => false,
    }
}

fn is_integer(value: &Value) -> bool {
    matches!(
        value,
        Value::TinyInt(_)
            | Value::SmallInt(_)
            | Value::Int(_)
            | Value::BigInt(_)
            | Value::TinyUnsigned(_)
            | Value::SmallUnsigned(_)
            | Value::Unsigned(_)
            | Value::BigUnsigned(_)
    )
}

fn integer_of(value: &Value) -> Option<i128> {
    match value {
        Value::BigUnsigned(Some(v)) => Some(i128::from(*v)),
        Value::String(_) => None,
        other => value_as_i64(other).map(i128::from),
    }
}

/// Whether a value counts as "empty" for validation and filters
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::String(Some(s)) => s.is_empty(),
        Value::Bytes(Some(b)) => b.is_empty(),
        Value::Json(Some(j)) => match j.as_ref() {
            JsonValue::Null => true,
            JsonValue::String(s) => s.is_empty(),
            JsonValue::Array(a) => a.is_empty(),
            JsonValue::Object(o) => o.is_empty(),
            _ => false,
        },
        other => is_null(other),
    }
}

/// Text view of a scalar value, `None` for NULL and binary data
pub fn value_as_string(value: &Value) -> Option<String> {
    if is_null(value) {
        return None;
    }
    match value_to_json(value) {
        JsonValue::String(s) => Some(s),
        JsonValue::Null => None,
        other => Some(other.to_string()),
    }
}

/// Convert a value to JSON for snapshots and `to_json()`
pub fn value_to_json(value: &Value) -> JsonValue {
    match value {
        Value::Bool(Some(v)) => JsonValue::Bool(*v),
        Value::TinyInt(Some(v)) => (*v).into(),
        Value::SmallInt(Some(v)) => (*v).into(),
        Value::Int(Some(v)) => (*v).into(),
        Value::BigInt(Some(v)) => (*v).into(),
        Value::TinyUnsigned(Some(v)) => (*v).into(),
        Value::SmallUnsigned(Some(v)) => (*v).into(),
        Value::Unsigned(Some(v)) => (*v).into(),
        Value::BigUnsigned(Some(v)) => (*v).into(),
        Value::Float(Some(v)) => (*v).into(),
        Value::Double(Some(v)) => (*v).into(),
        Value::String(Some(s)) => JsonValue::String(s.as_ref().clone()),
        Value::Char(Some(c)) => JsonValue::String(c.to_string()),
        Value::Bytes(Some(b)) => JsonValue::Array(b.iter().map(|byte| (*byte).into()).collect()),
        Value::Json(Some(j)) => j.as_ref().clone(),
        Value::ChronoDate(Some(d)) => JsonValue::String(d.to_string()),
        Value::ChronoTime(Some(t)) => JsonValue::String(t.to_string()),
        Value::ChronoDateTime(Some(dt)) => JsonValue::String(dt.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
        Value::ChronoDateTimeUtc(Some(dt)) => JsonValue::String(dt.to_rfc3339()),
        Value::ChronoDateTimeLocal(Some(dt)) => JsonValue::String(dt.to_rfc3339()),
        Value::ChronoDateTimeWithTimeZone(Some(dt)) => JsonValue::String(dt.to_rfc3339()),
        _ => JsonValue::Null,
    }
}

/// Convert JSON back into a value shaped like `like` (usually the column's empty value)
///
/// Numbers and strings are coerced into the template's variant when they fit;
/// anything that does not fit falls back to the closest natural variant.
pub fn json_to_value(json: &JsonValue, like: &Value) -> Value {
    match json {
        JsonValue::Null => like.as_null(),
        JsonValue::Bool(b) => Value::Bool(Some(*b)),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                integer_like(i, like)
            } else if let Some(u) = n.as_u64() {
                Value::BigUnsigned(Some(u))
            } else {
                let f = n.as_f64().unwrap_or_default();
                match like {
                    Value::Float(_) => Value::Float(Some(f as f32)),
                    _ => Value::Double(Some(f)),
                }
            }
        }
        JsonValue::String(s) => string_like(s, like),
        JsonValue::Array(items) if matches!(like, Value::Bytes(_)) => {
            let bytes: Option<Vec<u8>> = items
                .iter()
                .map(|item| item.as_u64().and_then(|b| u8::try_from(b).ok()))
                .collect();
            match bytes {
                Some(bytes) => Value::Bytes(Some(Box::new(bytes))),
                None => Value::Json(Some(Box::new(json.clone()))),
            }
        }
        JsonValue::Array(_) | JsonValue::Object(_) => Value::Json(Some(Box::new(json.clone()))),
    }
}

fn integer_like(i: i64, like: &Value) -> Value {
    let fitted = match like {
        Value::TinyInt(_) => i8::try_from(i).ok().map(|v| Value::TinyInt(Some(v))),
        Value::SmallInt(_) => i16::try_from(i).ok().map(|v| Value::SmallInt(Some(v))),
        Value::Int(_) => i32::try_from(i).ok().map(|v| Value::Int(Some(v))),
        Value::TinyUnsigned(_) => u8::try_from(i).ok().map(|v| Value::TinyUnsigned(Some(v))),
        Value::SmallUnsigned(_) => u16::try_from(i).ok().map(|v| Value::SmallUnsigned(Some(v))),
        Value::Unsigned(_) => u32::try_from(i).ok().map(|v| Value::Unsigned(Some(v))),
        Value::BigUnsigned(_) => u64::try_from(i).ok().map(|v| Value::BigUnsigned(Some(v))),
        Value::Float(_) => Some(Value::Float(Some(i as f32))),
        Value::Double(_) => Some(Value::Double(Some(i as f64))),
        Value::String(_) => Some(Value::String(Some(Box::new(i.to_string())))),
        _ => None,
    };
    fitted.unwrap_or(Value::BigInt(Some(i)))
}

fn string_like(s: &str, like: &Value) -> Value {
    let parsed = match like {
        Value::Char(_) => s.chars().next().map(|c| Value::Char(Some(c))),
        Value::ChronoDate(_) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()
            .map(|d| Value::ChronoDate(Some(Box::new(d)))),
        Value::ChronoTime(_) => NaiveTime::parse_from_str(s, "%H:%M:%S%.f")
            .ok()
            .map(|t| Value::ChronoTime(Some(Box::new(t)))),
        Value::ChronoDateTime(_) => NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
            .ok()
            .map(|dt| Value::ChronoDateTime(Some(Box::new(dt)))),
        Value::ChronoDateTimeUtc(_) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| Value::ChronoDateTimeUtc(Some(Box::new(dt.with_timezone(&Utc))))),
        Value::ChronoDateTimeLocal(_) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| Value::ChronoDateTimeLocal(Some(Box::new(dt.with_timezone(&Local))))),
        Value::ChronoDateTimeWithTimeZone(_) => DateTime::<FixedOffset>::parse_from_rfc3339(s)
            .ok()
            .map(|dt| Value::ChronoDateTimeWithTimeZone(Some(Box::new(dt)))),
        Value::TinyInt(_)
        | Value::SmallInt(_)
        | Value::Int(_)
        | Value::BigInt(_)
        | Value::TinyUnsigned(_)
        | Value::SmallUnsigned(_)
        | Value::Unsigned(_)
        | Value::BigUnsigned(_) => s.trim().parse::<i64>().ok().map(|i| integer_like(i, like)),
        Value::Float(_) => s.trim().parse::<f32>().ok().map(|f| Value::Float(Some(f))),
        Value::Double(_) => s.trim().parse::<f64>().ok().map(|f| Value::Double(Some(f))),
        Value::Bool(_) => match s.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "t" | "yes" | "on" => Some(Value::Bool(Some(true))),
            "0" | "false" | "f" | "no" | "off" | "" => Some(Value::Bool(Some(false))),
            _ => None,
        },
        _ => None,
    };
    parsed.unwrap_or_else(|| Value::String(Some(Box::new(s.to_string()))))
}
