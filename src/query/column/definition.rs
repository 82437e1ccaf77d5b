//! Column definition metadata.
//!
//! This module provides `ColumnDefinition` which stores what the schema introspector
//! reports about a column: its type, nullability, default value and constraints.
//! Records use the type to pick the typed NULL a fresh column starts with.

use sea_query::Value;
use serde::{Deserialize, Serialize};

/// Column definition metadata
///
/// Stores information about a column's type, nullability, default value, etc.
/// Calling code can read it back through `Record::list_columns()`, e.g. to
/// generate forms.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    /// Column type (e.g., "Integer", "String", "Json", or the raw SQL type name)
    pub column_type: Option<String>,
    /// Whether the column is nullable
    pub nullable: bool,
    /// Default value (if any), as reported by the catalogue
    pub default_value: Option<String>,
    /// Maximum character length for string columns
    pub max_length: Option<u32>,
    /// Column comment/documentation
    pub comment: Option<String>,
    /// Whether the column is part of the primary key
    pub primary_key: bool,
    /// Whether the column is auto-increment
    pub auto_increment: bool,
}

impl ColumnDefinition {
    /// A definition with only the type set
    pub fn of_type(column_type: impl Into<String>) -> Self {
        Self {
            column_type: Some(column_type.into()),
            ..Default::default()
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub fn max_length(mut self, len: u32) -> Self {
        self.max_length = Some(len);
        self
    }

    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// The typed NULL a column of this type holds before anything is loaded
    ///
    /// # Type Mapping
    ///
    /// - "Integer" / "int" / "int4" / "serial" → `Value::Int`
    /// - "BigInt" / "int8" / "bigserial" → `Value::BigInt`
    /// - "SmallInt" / "int2" → `Value::SmallInt`
    /// - "TinyInt" → `Value::TinyInt`
    /// - "Unsigned" / "BigUnsigned" → `Value::Unsigned` / `Value::BigUnsigned`
    /// - "Boolean" / "bool" → `Value::Bool`
    /// - "Float" / "real" → `Value::Float`
    /// - "Double" / "numeric" / "decimal" → `Value::Double`
    /// - "Json" / "Jsonb" → `Value::Json`
    /// - "Timestamp" / "DateTime" → `Value::ChronoDateTime`
    /// - "TimestampTz" → `Value::ChronoDateTimeUtc`
    /// - "Date" / "Time" → `Value::ChronoDate` / `Value::ChronoTime`
    /// - "Binary" / "Bytes" / "bytea" / "blob" → `Value::Bytes`
    /// - anything else (text, varchar, uuid, enums) → `Value::String`
    pub fn empty_value(&self) -> Value {
        let Some(column_type) = self.column_type.as_deref() else {
            return Value::String(None);
        };
        let lowered = column_type.to_ascii_lowercase();
        // strip length/precision, e.g. "varchar(255)" or "numeric(10, 2)"
        let base = lowered.split('(').next().unwrap_or_default().trim();

        match base {
            "integer" | "int" | "int4" | "serial" | "mediumint" => Value::Int(None),
            "bigint" | "int8" | "bigserial" => Value::BigInt(None),
            "smallint" | "int2" | "smallserial" => Value::SmallInt(None),
            "tinyint" => Value::TinyInt(None),
            "unsigned" | "int unsigned" | "integer unsigned" => Value::Unsigned(None),
            "bigunsigned" | "bigint unsigned" => Value::BigUnsigned(None),
            "boolean" | "bool" => Value::Bool(None),
            "float" | "real" | "float4" => Value::Float(None),
            "double" | "double precision" | "float8" | "numeric" | "decimal" => Value::Double(None),
            "json" | "jsonb" => Value::Json(None),
            "timestamp" | "datetime" | "timestamp without time zone" => Value::ChronoDateTime(None),
            "timestamptz" | "timestamp with time zone" => Value::ChronoDateTimeUtc(None),
            "date" => Value::ChronoDate(None),
            "time" | "time without time zone" => Value::ChronoTime(None),
            "binary" | "bytes" | "bytea" | "blob" | "varbinary" => Value::Bytes(None),
            "char" if self.max_length == Some(1) => Value::Char(None),
            _ => Value::String(None),
        }
    }
}
