//! Structured validation failures.

use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;

/// The first rule a field failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub rule: String,
    pub label: String,
    pub params: Vec<String>,
}

impl FieldError {
    /// Human readable message for this failure
    pub fn message(&self) -> String {
        let label = &self.label;
        let param = |idx: usize| self.params.get(idx).map(String::as_str).unwrap_or("");
        match self.rule.as_str() {
            "not_empty" => format!("{} must not be empty", label),
            "min_length" => format!("{} must be at least {} characters long", label, param(0)),
            "max_length" => format!("{} must not exceed {} characters long", label, param(0)),
            "exact_length" => format!("{} must be exactly {} characters long", label, param(0)),
            "email" => format!("{} must be an email address", label),
            "regex" => format!("{} does not match the required format", label),
            "numeric" => format!("{} must be numeric", label),
            "digit" => format!("{} must be a digit", label),
            "range" => format!("{} must be within the range of {} to {}", label, param(0), param(1)),
            "matches" => format!("{} must be the same as {}", label, param(0)),
            "equals" => format!("{} must equal {}", label, param(0)),
            _ => format!("{} is not valid", label),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

/// Field-level failures of one validation run, plus an optional external set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    /// Model name (or other owner) the failures belong to
    pub object: String,
    pub fields: IndexMap<String, FieldError>,
    /// Failures of an extra validation supplied by the caller
    pub external: Option<Box<ValidationErrors>>,
}

impl ValidationErrors {
    pub fn new(object: impl Into<String>) -> Self {
        Self {
            object: object.into(),
            ..Default::default()
        }
    }

    pub fn add(&mut self, error: FieldError) {
        self.fields.entry(error.field.clone()).or_insert(error);
    }

    pub fn get(&self, field: &str) -> Option<&FieldError> {
        self.fields.get(field)
    }

    /// True when neither this set nor the external set has failures
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.external.as_ref().map_or(true, |ext| ext.is_empty())
    }

    /// Field name to message; external failures are keyed `_external.<field>`
    pub fn messages(&self) -> IndexMap<String, String> {
        let mut messages: IndexMap<String, String> = self
            .fields
            .iter()
            .map(|(field, err)| (field.clone(), err.message()))
            .collect();
        if let Some(external) = &self.external {
            for (field, message) in external.messages() {
                messages.insert(format!("_external.{}", field), message);
            }
        }
        messages
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.messages().into_values().collect();
        write!(f, "{}: {}", self.object, messages.join("; "))
    }
}
