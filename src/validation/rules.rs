//! Validation rules.
//!
//! A rule is a named predicate over one field's value, with the whole data map
//! available for cross-field rules such as `matches`. Apart from `not_empty` and
//! `matches`, rules are skipped when the value is empty.

use crate::value::{is_empty, same_value, value_as_string};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use sea_query::Value;
use std::fmt;
use std::sync::Arc;

static EMAIL: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$").ok()
});

/// What a rule sees besides the value under test
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    pub field: &'a str,
    pub data: &'a IndexMap<String, Value>,
}

type RuleFn = Arc<dyn Fn(&Value, RuleContext<'_>) -> bool + Send + Sync>;

#[derive(Clone)]
pub struct Rule {
    name: String,
    params: Vec<String>,
    runs_on_empty: bool,
    check: RuleFn,
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish()
    }
}

fn char_len(value: &Value) -> usize {
    value_as_string(value).map(|s| s.chars().count()).unwrap_or(0)
}

impl Rule {
    fn new<F>(name: &str, params: Vec<String>, check: F) -> Self
    where
        F: Fn(&Value, RuleContext<'_>) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            params,
            runs_on_empty: false,
            check: Arc::new(check),
        }
    }

    /// A rule with a caller-supplied check; skipped for empty values
    pub fn custom<F>(name: impl Into<String>, check: F) -> Self
    where
        F: Fn(&Value, RuleContext<'_>) -> bool + Send + Sync + 'static,
    {
        let name = name.into();
        Self::new(&name, Vec::new(), check)
    }

    /// Also run this rule when the value is empty
    pub fn on_empty(mut self) -> Self {
        self.runs_on_empty = true;
        self
    }

    pub fn with_params<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.params = params.into_iter().map(Into::into).collect();
        self
    }

    pub fn not_empty() -> Self {
        Self::new("not_empty", Vec::new(), |value, _| !is_empty(value)).on_empty()
    }

    pub fn min_length(min: usize) -> Self {
        Self::new("min_length", vec![min.to_string()], move |value, _| char_len(value) >= min)
    }

    pub fn max_length(max: usize) -> Self {
        Self::new("max_length", vec![max.to_string()], move |value, _| char_len(value) <= max)
    }

    pub fn exact_length(len: usize) -> Self {
        Self::new("exact_length", vec![len.to_string()], move |value, _| char_len(value) == len)
    }

    pub fn regex(pattern: Regex) -> Self {
        let params = vec![pattern.as_str().to_string()];
        Self::new("regex", params, move |value, _| {
            value_as_string(value).map_or(false, |s| pattern.is_match(&s))
        })
    }

    pub fn email() -> Self {
        Self::new("email", Vec::new(), |value, _| {
            match (EMAIL.as_ref(), value_as_string(value)) {
                (Some(re), Some(s)) => s.len() <= 254 && re.is_match(&s),
                _ => false,
            }
        })
    }

    pub fn numeric() -> Self {
        Self::new("numeric", Vec::new(), |value, _| {
            value_as_string(value).map_or(false, |s| s.trim().parse::<f64>().is_ok())
        })
    }

    pub fn digit() -> Self {
        Self::new("digit", Vec::new(), |value, _| {
            value_as_string(value).map_or(false, |s| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()))
        })
    }

    pub fn range(min: f64, max: f64) -> Self {
        Self::new("range", vec![min.to_string(), max.to_string()], move |value, _| {
            value_as_string(value)
                .and_then(|s| s.trim().parse::<f64>().ok())
                .map_or(false, |n| n >= min && n <= max)
        })
    }

    /// Value must equal the value of another field
    pub fn matches(other: impl Into<String>) -> Self {
        let other = other.into();
        Self::new("matches", vec![other.clone()], move |value, ctx| {
            ctx.data.get(&other).map_or(false, |o| same_value(value, o))
        })
        .on_empty()
    }

    pub fn equals(expected: impl Into<Value>) -> Self {
        let expected = expected.into();
        let shown = value_as_string(&expected).unwrap_or_default();
        Self::new("equals", vec![shown], move |value, _| same_value(value, &expected))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Evaluate the rule; `true` also when skipped for an empty value
    pub fn passes(&self, value: &Value, ctx: RuleContext<'_>) -> bool {
        if !self.runs_on_empty && is_empty(value) {
            return true;
        }
        (self.check)(value, ctx)
    }
}
