//! Error types for record operations.
//!
//! `OrmError` is what every fallible record, relation and registry operation returns.
//! Failures from the statement executor are wrapped as [`OrmError::Execution`].

use crate::executor::LifeError;
use crate::validation::ValidationErrors;

/// Error type for record operations
#[derive(Debug, Clone, PartialEq)]
pub enum OrmError {
    /// A column or relation name that the model does not declare
    UnknownProperty { property: String, model: String },
    /// Operation not allowed in the record's current state, or an unsupported builder call
    InvalidOperation(String),
    /// Validation rules rejected the record's values
    ValidationFailed(ValidationErrors),
    /// No model registered under this name
    UnknownModel(String),
    /// Model declarations are inconsistent (unknown relation target, duplicate alias, ...)
    Declaration(String),
    /// Statement execution or introspection failed
    Execution(LifeError),
}

impl OrmError {
    pub(crate) fn unknown_property(property: impl Into<String>, model: impl Into<String>) -> Self {
        OrmError::UnknownProperty {
            property: property.into(),
            model: model.into(),
        }
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        OrmError::InvalidOperation(msg.into())
    }

    /// Validation detail, when this is a validation failure
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            OrmError::ValidationFailed(errors) => Some(errors),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrmError::UnknownProperty { property, model } => {
                write!(f, "The {} property does not exist in the {} class", property, model)
            }
            OrmError::InvalidOperation(msg) => write!(f, "Invalid operation: {}", msg),
            OrmError::ValidationFailed(errors) => write!(f, "Validation failed: {}", errors),
            OrmError::UnknownModel(name) => write!(f, "Unknown model: {}", name),
            OrmError::Declaration(msg) => write!(f, "Invalid model declaration: {}", msg),
            OrmError::Execution(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for OrmError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OrmError::Execution(err) => Some(err),
            _ => None,
        }
    }
}

impl From<LifeError> for OrmError {
    fn from(err: LifeError) -> Self {
        OrmError::Execution(err)
    }
}

impl From<ValidationErrors> for OrmError {
    fn from(errors: ValidationErrors) -> Self {
        OrmError::ValidationFailed(errors)
    }
}
