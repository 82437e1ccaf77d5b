//! Model declarations.
//!
//! A [`ModelDecl`] is what calling code writes: a model name plus whatever it wants
//! to override. The registry normalizes every declaration into a [`ModelDef`] once,
//! filling in the table name and the relation defaults; definitions are read-only
//! from then on.

use super::filter::{Filter, FilterSet};
use crate::config::OrmConfig;
use crate::error::OrmError;
use crate::inflector::Inflector;
use crate::query::{ColumnDefinition, ColumnMap, Direction};
use crate::relation::{RelationDef, RelationOptions, RelationType};
use crate::validation::Rule;
use chrono::format::{Item, StrftimeItems};
use chrono::{Local, Utc};
use indexmap::IndexMap;
use sea_query::Value;
use std::fmt::Write;

/// How an automatic timestamp column is filled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimestampFormat {
    /// Seconds since the epoch, as a `BIGINT`
    Unix,
    /// Local time rendered with a chrono format string, e.g. `"%Y-%m-%d %H:%M:%S"`
    Pattern(String),
}

/// Column filled automatically on create or update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampColumn {
    pub column: String,
    pub format: TimestampFormat,
}

impl TimestampColumn {
    /// Current time in this column's format
    pub fn now(&self) -> Result<Value, OrmError> {
        match &self.format {
            TimestampFormat::Unix => Ok(Value::BigInt(Some(Utc::now().timestamp()))),
            TimestampFormat::Pattern(pattern) => {
                let mut rendered = String::new();
                write!(rendered, "{}", Local::now().format(pattern)).map_err(|_| {
                    OrmError::Declaration(format!(
                        "invalid timestamp format {:?} for column {}",
                        pattern, self.column
                    ))
                })?;
                Ok(Value::String(Some(Box::new(rendered))))
            }
        }
    }
}

#[derive(Debug, Clone)]
enum RelationDecl {
    BelongsTo(String, RelationOptions),
    HasOne(String, RelationOptions),
    HasMany(String, RelationOptions),
}

/// Declaration of one model
///
/// # Example
///
/// ```
/// use lifeline::{ModelDecl, RelationOptions, Direction};
/// use lifeline::validation::Rule;
///
/// let post = ModelDecl::new("post")
///     .belongs_to("author", RelationOptions::new().model("user"))
///     .has_many("tags", RelationOptions::new().through("posts_tags"))
///     .sorting("created", Direction::Desc)
///     .rule("title", Rule::not_empty());
/// ```
#[derive(Debug, Clone)]
pub struct ModelDecl {
    name: String,
    table: Option<String>,
    primary_key: Option<String>,
    foreign_key_suffix: Option<String>,
    columns: Option<ColumnMap>,
    relations: Vec<RelationDecl>,
    load_with: Vec<String>,
    sorting: Vec<(String, Direction)>,
    created: Option<TimestampColumn>,
    updated: Option<TimestampColumn>,
    rules: IndexMap<String, Vec<Rule>>,
    labels: IndexMap<String, String>,
    filters: FilterSet,
}

impl ModelDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: None,
            primary_key: None,
            foreign_key_suffix: None,
            columns: None,
            relations: Vec::new(),
            load_with: Vec::new(),
            sorting: Vec::new(),
            created: None,
            updated: None,
            rules: IndexMap::new(),
            labels: IndexMap::new(),
            filters: FilterSet::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Table name, instead of the (pluralized) model name
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key = Some(column.into());
        self
    }

    pub fn foreign_key_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.foreign_key_suffix = Some(suffix.into());
        self
    }

    /// Declare one column; a model with declared columns is never introspected
    pub fn column(mut self, name: impl Into<String>, definition: ColumnDefinition) -> Self {
        self.columns
            .get_or_insert_with(ColumnMap::new)
            .insert(name.into(), definition);
        self
    }

    /// Declare the whole column list at once
    pub fn columns(mut self, columns: ColumnMap) -> Self {
        self.columns = Some(columns);
        self
    }

    pub fn belongs_to(mut self, alias: impl Into<String>, options: RelationOptions) -> Self {
        self.relations.push(RelationDecl::BelongsTo(alias.into(), options));
        self
    }

    pub fn has_one(mut self, alias: impl Into<String>, options: RelationOptions) -> Self {
        self.relations.push(RelationDecl::HasOne(alias.into(), options));
        self
    }

    pub fn has_many(mut self, alias: impl Into<String>, options: RelationOptions) -> Self {
        self.relations.push(RelationDecl::HasMany(alias.into(), options));
        self
    }

    /// One-to-one path joined automatically on every find
    pub fn load_with(mut self, path: impl Into<String>) -> Self {
        self.load_with.push(path.into());
        self
    }

    /// Default ordering, used when no `order_by()` was queued
    pub fn sorting(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.sorting.push((column.into(), direction));
        self
    }

    pub fn created_column(mut self, column: impl Into<String>, format: TimestampFormat) -> Self {
        self.created = Some(TimestampColumn {
            column: column.into(),
            format,
        });
        self
    }

    pub fn updated_column(mut self, column: impl Into<String>, format: TimestampFormat) -> Self {
        self.updated = Some(TimestampColumn {
            column: column.into(),
            format,
        });
        self
    }

    pub fn rule(mut self, field: impl Into<String>, rule: Rule) -> Self {
        self.rules.entry(field.into()).or_default().push(rule);
        self
    }

    pub fn label(mut self, field: impl Into<String>, label: impl Into<String>) -> Self {
        self.labels.insert(field.into(), label.into());
        self
    }

    pub fn filter(mut self, column: impl Into<String>, filter: Filter) -> Self {
        self.filters.push(column.into(), filter);
        self
    }

    /// Filter applied to every column, before the column's own filters
    pub fn filter_all(mut self, filter: Filter) -> Self {
        self.filters.push_wildcard(filter);
        self
    }

    /// Fill in every default and check the declaration for conflicts
    pub(crate) fn normalize(
        self,
        config: &OrmConfig,
        inflector: &dyn Inflector,
    ) -> Result<ModelDef, OrmError> {
        if self.name.is_empty() {
            return Err(OrmError::Declaration("model name must not be empty".to_string()));
        }

        let object_plural = inflector.plural(&self.name);
        let table_name = match self.table {
            Some(table) => table,
            None if config.table_names_plural => object_plural.clone(),
            None => self.name.clone(),
        };
        let primary_key = self.primary_key.unwrap_or_else(|| config.primary_key.clone());
        let suffix = self
            .foreign_key_suffix
            .unwrap_or_else(|| config.foreign_key_suffix.clone());

        let mut relations = IndexMap::new();
        for decl in self.relations {
            let (alias, def) = match decl {
                RelationDecl::BelongsTo(alias, options) => {
                    let def = RelationDef::belongs_to(&alias, options, &suffix);
                    (alias, def)
                }
                RelationDecl::HasOne(alias, options) => {
                    let def = RelationDef::has_one(&alias, options, &self.name, &suffix);
                    (alias, def)
                }
                RelationDecl::HasMany(alias, options) => {
                    let def = RelationDef::has_many(&alias, options, &self.name, &suffix, inflector);
                    (alias, def)
                }
            };
            if relations.insert(alias.clone(), def).is_some() {
                return Err(OrmError::Declaration(format!(
                    "relation {} is declared twice on model {}",
                    alias, self.name
                )));
            }
        }

        for stamp in self.created.iter().chain(self.updated.iter()) {
            if let TimestampFormat::Pattern(pattern) = &stamp.format {
                if StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error)) {
                    return Err(OrmError::Declaration(format!(
                        "invalid timestamp format {:?} for column {}",
                        pattern, stamp.column
                    )));
                }
            }
        }

        Ok(ModelDef {
            object_name: self.name,
            object_plural,
            table_name,
            primary_key,
            foreign_key_suffix: suffix,
            columns: self.columns,
            relations,
            load_with: self.load_with,
            sorting: self.sorting,
            created: self.created,
            updated: self.updated,
            rules: self.rules,
            labels: self.labels,
            filters: self.filters,
        })
    }
}

/// Normalized model definition, shared by every record of the model
#[derive(Debug, Clone)]
pub struct ModelDef {
    object_name: String,
    object_plural: String,
    table_name: String,
    primary_key: String,
    foreign_key_suffix: String,
    columns: Option<ColumnMap>,
    relations: IndexMap<String, RelationDef>,
    load_with: Vec<String>,
    sorting: Vec<(String, Direction)>,
    created: Option<TimestampColumn>,
    updated: Option<TimestampColumn>,
    rules: IndexMap<String, Vec<Rule>>,
    labels: IndexMap<String, String>,
    filters: FilterSet,
}

impl ModelDef {
    pub fn object_name(&self) -> &str {
        &self.object_name
    }

    pub fn object_plural(&self) -> &str {
        &self.object_plural
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    pub fn foreign_key_suffix(&self) -> &str {
        &self.foreign_key_suffix
    }

    /// Columns given at declaration time, if any
    pub fn declared_columns(&self) -> Option<&ColumnMap> {
        self.columns.as_ref()
    }

    pub fn relation(&self, alias: &str) -> Option<&RelationDef> {
        self.relations.get(alias)
    }

    pub fn relations(&self) -> &IndexMap<String, RelationDef> {
        &self.relations
    }

    /// Relations of one type, by alias
    pub fn relations_of(&self, rel_type: RelationType) -> IndexMap<&str, &RelationDef> {
        self.relations
            .iter()
            .filter(|(_, def)| match rel_type {
                RelationType::HasMany | RelationType::HasManyThrough => {
                    matches!(def.rel_type, RelationType::HasMany | RelationType::HasManyThrough)
                }
                other => def.rel_type == other,
            })
            .map(|(alias, def)| (alias.as_str(), def))
            .collect()
    }

    pub fn load_with(&self) -> &[String] {
        &self.load_with
    }

    pub fn sorting(&self) -> &[(String, Direction)] {
        &self.sorting
    }

    pub fn created_column(&self) -> Option<&TimestampColumn> {
        self.created.as_ref()
    }

    pub fn updated_column(&self) -> Option<&TimestampColumn> {
        self.updated.as_ref()
    }

    pub fn rules(&self) -> &IndexMap<String, Vec<Rule>> {
        &self.rules
    }

    pub fn labels(&self) -> &IndexMap<String, String> {
        &self.labels
    }

    pub fn filters(&self) -> &FilterSet {
        &self.filters
    }
}
