//! Record validation.
//!
//! `Validation` is built from a data map, per-field rule lists and labels. `check()`
//! runs every field's rules in order and keeps the first failure per field.

pub mod errors;
pub mod rules;

pub use errors::{FieldError, ValidationErrors};
pub use rules::{Rule, RuleContext};

use indexmap::IndexMap;
use sea_query::Value;

#[derive(Debug, Clone, Default)]
pub struct Validation {
    object: String,
    data: IndexMap<String, Value>,
    rules: IndexMap<String, Vec<Rule>>,
    labels: IndexMap<String, String>,
    errors: ValidationErrors,
}

impl Validation {
    pub fn new(data: IndexMap<String, Value>) -> Self {
        Self {
            data,
            ..Default::default()
        }
    }

    /// Name reported in [`ValidationErrors::object`]
    pub fn object(mut self, name: impl Into<String>) -> Self {
        self.object = name.into();
        self
    }

    pub fn label(mut self, field: impl Into<String>, label: impl Into<String>) -> Self {
        self.labels.insert(field.into(), label.into());
        self
    }

    pub fn rule(mut self, field: impl Into<String>, rule: Rule) -> Self {
        self.rules.entry(field.into()).or_default().push(rule);
        self
    }

    pub fn rules<I>(mut self, field: impl Into<String>, rules: I) -> Self
    where
        I: IntoIterator<Item = Rule>,
    {
        self.rules.entry(field.into()).or_default().extend(rules);
        self
    }

    pub fn data(&self) -> &IndexMap<String, Value> {
        &self.data
    }

    /// Run every rule; returns true when all fields pass
    pub fn check(&mut self) -> bool {
        let mut errors = ValidationErrors::new(self.object.clone());
        let null = Value::String(None);

        for (field, rules) in &self.rules {
            let value = self.data.get(field).unwrap_or(&null);
            let ctx = RuleContext {
                field,
                data: &self.data,
            };
            if let Some(failed) = rules.iter().find(|rule| !rule.passes(value, ctx)) {
                errors.add(FieldError {
                    field: field.clone(),
                    rule: failed.name().to_string(),
                    label: self.labels.get(field).cloned().unwrap_or_else(|| field.clone()),
                    params: failed.params().to_vec(),
                });
            }
        }

        log::debug!("Validation of {} found {} failing field(s)", self.object, errors.fields.len());
        let passed = errors.fields.is_empty();
        self.errors = errors;
        passed
    }

    /// Failures of the last `check()`
    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    pub fn into_errors(self) -> ValidationErrors {
        self.errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(pairs: &[(&str, Value)]) -> IndexMap<String, Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_first_failure_per_field() {
        let mut validation = Validation::new(data(&[("title", Value::from(""))]))
            .object("post")
            .label("title", "Title")
            .rules("title", [Rule::not_empty(), Rule::min_length(3)]);

        assert!(!validation.check());
        let err = validation.errors().get("title").unwrap();
        assert_eq!(err.rule, "not_empty");
        assert_eq!(err.message(), "Title must not be empty");
        assert_eq!(validation.errors().fields.len(), 1);
    }

    #[test]
    fn test_empty_values_skip_non_empty_rules() {
        let mut validation = Validation::new(data(&[("email", Value::String(None))]))
            .rule("email", Rule::email());
        assert!(validation.check());
    }

    #[test]
    fn test_length_and_email_rules() {
        let mut validation = Validation::new(data(&[
            ("name", Value::from("ab")),
            ("email", Value::from("not-an-email")),
        ]))
        .rule("name", Rule::min_length(3))
        .rule("email", Rule::email());

        assert!(!validation.check());
        assert_eq!(validation.errors().get("name").unwrap().params, vec!["3".to_string()]);
        assert_eq!(validation.errors().get("email").unwrap().rule, "email");
    }

    #[test]
    fn test_matches_compares_other_field() {
        let mut validation = Validation::new(data(&[
            ("password", Value::from("secret")),
            ("password_confirm", Value::from("secret")),
        ]))
        .rule("password_confirm", Rule::matches("password"));
        assert!(validation.check());
    }

    #[test]
    fn test_custom_rule_sees_context() {
        let rule = Rule::custom("positive", |value, ctx| {
            ctx.field == "count" && crate::value::value_as_i64(value).map_or(false, |n| n > 0)
        });
        let mut validation = Validation::new(data(&[("count", Value::from(-1))])).rule("count", rule);
        assert!(!validation.check());
        assert_eq!(validation.errors().get("count").unwrap().message(), "count is not valid");
    }

    #[test]
    fn test_messages_include_external() {
        let mut errors = ValidationErrors::new("user");
        errors.add(FieldError {
            field: "name".into(),
            rule: "not_empty".into(),
            label: "Name".into(),
            params: vec![],
        });
        let mut external = ValidationErrors::new("form");
        external.add(FieldError {
            field: "terms".into(),
            rule: "not_empty".into(),
            label: "terms".into(),
            params: vec![],
        });
        errors.external = Some(Box::new(external));

        let messages = errors.messages();
        assert_eq!(messages.get("name").map(String::as_str), Some("Name must not be empty"));
        assert_eq!(
            messages.get("_external.terms").map(String::as_str),
            Some("terms must not be empty")
        );
        assert!(!errors.is_empty());
    }
}
