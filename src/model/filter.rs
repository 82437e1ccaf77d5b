//! Column filters.
//!
//! Filters run on every `set()` of a direct column, before change detection. The
//! wildcard filters of a model run first, then the column's own filters, each one
//! seeing the value produced by the previous one.

use crate::record::Record;
use crate::value::{is_empty, value_as_string};
use sea_query::Value;
use std::fmt;
use std::sync::Arc;

/// What a filter sees besides the value
#[derive(Clone, Copy)]
pub struct FilterContext<'a> {
    /// Column being assigned
    pub field: &'a str,
    /// Record the column belongs to
    pub record: &'a Record,
}

type FilterFn = Arc<dyn Fn(Value, FilterContext<'_>) -> Value + Send + Sync>;

/// A named value transformation
#[derive(Clone)]
pub struct Filter {
    name: String,
    func: FilterFn,
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter").field("name", &self.name).finish()
    }
}

fn map_text(value: Value, map: impl Fn(&str) -> String) -> Value {
    match value {
        Value::String(Some(s)) => Value::String(Some(Box::new(map(&s)))),
        other => other,
    }
}

impl Filter {
    pub fn custom<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(Value, FilterContext<'_>) -> Value + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    /// Strip surrounding whitespace from strings
    pub fn trim() -> Self {
        Self::custom("trim", |value, _| map_text(value, |s| s.trim().to_string()))
    }

    pub fn lowercase() -> Self {
        Self::custom("lowercase", |value, _| map_text(value, str::to_lowercase))
    }

    pub fn uppercase() -> Self {
        Self::custom("uppercase", |value, _| map_text(value, str::to_uppercase))
    }

    /// Turn empty values into the column's NULL
    pub fn null_if_empty() -> Self {
        Self::custom("null_if_empty", |value, _| {
            if is_empty(&value) {
                value.as_null()
            } else {
                value
            }
        })
    }

    /// Parse numeric strings into integers, leaving anything else untouched
    pub fn integer() -> Self {
        Self::custom("integer", |value, _| {
            match value_as_string(&value).and_then(|s| s.trim().parse::<i64>().ok()) {
                Some(n) if matches!(value, Value::String(_)) => Value::BigInt(Some(n)),
                _ => value,
            }
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn apply(&self, value: Value, ctx: FilterContext<'_>) -> Value {
        (self.func)(value, ctx)
    }
}

/// Filters declared on a model: wildcard filters plus per-column lists
#[derive(Debug, Clone, Default)]
pub struct FilterSet {
    wildcard: Vec<Filter>,
    columns: indexmap::IndexMap<String, Vec<Filter>>,
}

impl FilterSet {
    pub(crate) fn push_wildcard(&mut self, filter: Filter) {
        self.wildcard.push(filter);
    }

    pub(crate) fn push(&mut self, column: String, filter: Filter) {
        self.columns.entry(column).or_default().push(filter);
    }

    pub fn is_empty(&self) -> bool {
        self.wildcard.is_empty() && self.columns.is_empty()
    }

    /// Filters that apply to `field`, in run order
    pub fn for_field<'a>(&'a self, field: &str) -> impl Iterator<Item = &'a Filter> + 'a {
        let own = self.columns.get(field).map(Vec::as_slice).unwrap_or(&[]);
        self.wildcard.iter().chain(own.iter())
    }
}
