//! RelationDef struct for storing relationship metadata.
//!
//! A `RelationDef` is the normalized form of one `belongs_to`, `has_one` or
//! `has_many` declaration: every default (target model, foreign key, far key) has
//! been filled in from the model name, the alias and the foreign key suffix.

use super::types::RelationType;
use crate::inflector::Inflector;

/// Explicit overrides given when declaring a relation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationOptions {
    pub model: Option<String>,
    pub foreign_key: Option<String>,
    pub through: Option<String>,
    pub far_key: Option<String>,
}

impl RelationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Target model name (defaults from the alias)
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn foreign_key(mut self, key: impl Into<String>) -> Self {
        self.foreign_key = Some(key.into());
        self
    }

    /// Join table of a many-to-many `has_many`
    pub fn through(mut self, table: impl Into<String>) -> Self {
        self.through = Some(table.into());
        self
    }

    /// Column of the join table pointing at the target model
    pub fn far_key(mut self, key: impl Into<String>) -> Self {
        self.far_key = Some(key.into());
        self
    }
}

/// Normalized relationship declaration
///
/// Immutable once the owning model is registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationDef {
    /// Type of relationship
    pub rel_type: RelationType,
    /// Target model name
    pub model: String,
    /// `belongs_to`: column on this table. `has_one` / `has_many`: column on the
    /// target table, or on the join table for `has_many` through.
    pub foreign_key: String,
    /// Join table for `has_many` through
    pub through: Option<String>,
    /// Join table column pointing at the target model
    pub far_key: Option<String>,
}

impl RelationDef {
    /// `belongs_to`: model defaults to the alias, key to `<alias><suffix>`
    pub fn belongs_to(alias: &str, options: RelationOptions, suffix: &str) -> Self {
        Self {
            rel_type: RelationType::BelongsTo,
            model: options.model.unwrap_or_else(|| alias.to_string()),
            foreign_key: options
                .foreign_key
                .unwrap_or_else(|| format!("{}{}", alias, suffix)),
            through: None,
            far_key: None,
        }
    }

    /// `has_one`: model defaults to the alias, key to `<this model><suffix>`
    pub fn has_one(alias: &str, options: RelationOptions, object_name: &str, suffix: &str) -> Self {
        Self {
            rel_type: RelationType::HasOne,
            model: options.model.unwrap_or_else(|| alias.to_string()),
            foreign_key: options
                .foreign_key
                .unwrap_or_else(|| format!("{}{}", object_name, suffix)),
            through: None,
            far_key: None,
        }
    }

    /// `has_many`: model defaults to the singular alias, key to
    /// `<this model><suffix>`, far key to `<singular alias><suffix>`
    pub fn has_many(
        alias: &str,
        options: RelationOptions,
        object_name: &str,
        suffix: &str,
        inflector: &dyn Inflector,
    ) -> Self {
        let singular = inflector.singular(alias);
        let rel_type = if options.through.is_some() {
            RelationType::HasManyThrough
        } else {
            RelationType::HasMany
        };
        Self {
            rel_type,
            model: options.model.unwrap_or_else(|| singular.clone()),
            foreign_key: options
                .foreign_key
                .unwrap_or_else(|| format!("{}{}", object_name, suffix)),
            far_key: Some(
                options
                    .far_key
                    .unwrap_or_else(|| format!("{}{}", singular, suffix)),
            ),
            through: options.through,
        }
    }

    pub fn is_one_to_one(&self) -> bool {
        self.rel_type.is_one_to_one()
    }
}
