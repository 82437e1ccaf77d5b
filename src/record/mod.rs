//! Records: one in-memory row of a model.
//!
//! A [`Record`] carries the current column values, the set of changed columns, the
//! related records resolved so far, the deferred builder calls of its next
//! statement, and the `loaded` / `saved` / `valid` flags.
//!
//! # Architecture
//!
//! - **mod.rs**: state, value access (`get`, `set`, `values`, `as_map`)
//! - **query.rs**: the fluent deferred-call API (`and_where`, `order_by`, ...)
//! - **persist.rs**: find / create / update / delete / count and validation
//! - **snapshot.rs**: serializable snapshots
//!
//! Relation traversal (`resolve_one`, `related_query`, `with`, `has`, `add`,
//! `remove`) lives in [`crate::relation`].

pub(crate) mod persist;
mod query;
mod snapshot;

pub use persist::ResultSet;
pub use snapshot::RecordSnapshot;

use crate::error::OrmError;
use crate::model::{FilterContext, ModelDef, ModelRegistry};
use crate::query::{ColumnMap, Direction, PendingQuery};
use crate::relation::RelationType;
use crate::value::{is_null, json_to_value, same_value, value_to_json, Row};
use indexmap::{IndexMap, IndexSet};
use sea_query::Value;
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::fmt;
use std::sync::Arc;

/// What a name resolves to on a record
#[derive(Debug)]
pub enum Field<'a> {
    /// A direct column
    Value(&'a Value),
    /// A one-to-one relation, resolved and cached
    One(&'a Record),
    /// A to-many relation: an unexecuted query scoped to the relation
    Many(Record),
}

/// Plain view of a record produced by [`Record::as_map`]
#[derive(Debug, Clone, PartialEq)]
pub enum MapValue {
    Value(Value),
    Record(IndexMap<String, MapValue>),
}

impl MapValue {
    pub fn to_json(&self) -> JsonValue {
        match self {
            MapValue::Value(value) => value_to_json(value),
            MapValue::Record(map) => JsonValue::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect(),
            ),
        }
    }
}

/// Keys `values()` takes from its input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expected {
    Column(String),
    /// Nested input for a one-to-one relation, with the keys to take from it
    Related {
        alias: String,
        expected: Option<Vec<Expected>>,
    },
}

impl Expected {
    pub fn related<I, E>(alias: impl Into<String>, expected: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<Expected>,
    {
        Expected::Related {
            alias: alias.into(),
            expected: Some(expected.into_iter().map(Into::into).collect()),
        }
    }
}

impl From<&str> for Expected {
    fn from(column: &str) -> Self {
        Expected::Column(column.to_string())
    }
}

impl From<String> for Expected {
    fn from(column: String) -> Self {
        Expected::Column(column)
    }
}

/// One row of a model, loaded or not
#[derive(Clone)]
pub struct Record {
    pub(crate) registry: Arc<ModelRegistry>,
    pub(crate) def: Arc<ModelDef>,
    pub(crate) columns: Arc<ColumnMap>,
    pub(crate) object: IndexMap<String, Value>,
    pub(crate) changed: IndexSet<String>,
    pub(crate) related: IndexMap<String, Record>,
    pub(crate) pk_value: Option<Value>,
    pub(crate) loaded: bool,
    pub(crate) saved: bool,
    pub(crate) valid: bool,
    pub(crate) sorting: Vec<(String, Direction)>,
    pub(crate) pending: PendingQuery,
    pub(crate) last_query: Option<String>,
}

impl Record {
    pub(crate) fn new(registry: Arc<ModelRegistry>, def: Arc<ModelDef>, columns: Arc<ColumnMap>) -> Self {
        let sorting = def.sorting().to_vec();
        let mut record = Self {
            registry,
            def,
            columns,
            object: IndexMap::new(),
            changed: IndexSet::new(),
            related: IndexMap::new(),
            pk_value: None,
            loaded: false,
            saved: false,
            valid: false,
            sorting,
            pending: PendingQuery::new(),
            last_query: None,
        };
        record.fill_empty();
        record
    }

    /// Every column set to its typed NULL
    fn fill_empty(&mut self) {
        self.object = self
            .columns
            .iter()
            .map(|(name, column)| (name.clone(), column.empty_value()))
            .collect();
    }

    /// Typed NULL for `column`, or a text NULL for unknown columns
    pub(crate) fn empty_value(&self, column: &str) -> Value {
        self.columns
            .get(column)
            .map(|def| def.empty_value())
            .unwrap_or(Value::String(None))
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    pub fn model(&self) -> &ModelDef {
        &self.def
    }

    /// Primary key value; `None` until the record is loaded or created
    pub fn pk(&self) -> Option<&Value> {
        self.pk_value.as_ref()
    }

    pub fn loaded(&self) -> bool {
        self.loaded
    }

    pub fn saved(&self) -> bool {
        self.saved
    }

    pub fn valid(&self) -> bool {
        self.valid
    }

    /// Columns changed since the last load or save, in change order
    pub fn changed(&self) -> impl Iterator<Item = &str> {
        self.changed.iter().map(String::as_str)
    }

    pub fn is_changed(&self, column: &str) -> bool {
        self.changed.contains(column)
    }

    pub fn object_name(&self) -> &str {
        self.def.object_name()
    }

    pub fn object_plural(&self) -> &str {
        self.def.object_plural()
    }

    pub fn table_name(&self) -> &str {
        self.def.table_name()
    }

    pub fn primary_key(&self) -> &str {
        self.def.primary_key()
    }

    /// Column metadata the record was built with
    pub fn table_columns(&self) -> &ColumnMap {
        &self.columns
    }

    /// Column metadata straight from the schema introspector, bypassing the cache
    pub fn list_columns(&self) -> Result<ColumnMap, OrmError> {
        if let Some(declared) = self.def.declared_columns() {
            return Ok(declared.clone());
        }
        let columns = self.registry.columns_for(&self.def, true)?;
        Ok(columns.as_ref().clone())
    }

    pub fn belongs_to(&self) -> IndexMap<&str, &crate::relation::RelationDef> {
        self.def.relations_of(RelationType::BelongsTo)
    }

    pub fn has_one(&self) -> IndexMap<&str, &crate::relation::RelationDef> {
        self.def.relations_of(RelationType::HasOne)
    }

    /// `has_many` relations, with or without a join table
    pub fn has_many(&self) -> IndexMap<&str, &crate::relation::RelationDef> {
        self.def.relations_of(RelationType::HasMany)
    }

    pub fn load_with(&self) -> &[String] {
        self.def.load_with()
    }

    pub fn sorting(&self) -> &[(String, Direction)] {
        &self.sorting
    }

    /// Replace the default ordering of this record's next selects
    pub fn set_sorting(&mut self, sorting: Vec<(String, Direction)>) -> &mut Self {
        self.sorting = sorting;
        self
    }

    /// SQL text of the last statement this record executed
    pub fn last_query(&self) -> Option<&str> {
        self.last_query.as_deref()
    }

    /// Validation labels: column names, overridden by declared labels
    pub fn labels(&self) -> IndexMap<String, String> {
        let mut labels: IndexMap<String, String> = self
            .columns
            .keys()
            .map(|column| (column.clone(), column.clone()))
            .collect();
        for (field, label) in self.def.labels() {
            labels.insert(field.clone(), label.clone());
        }
        labels
    }

    pub fn rules(&self) -> &IndexMap<String, Vec<crate::validation::Rule>> {
        self.def.rules()
    }

    /// Value of a direct column
    pub fn value(&self, column: &str) -> Result<&Value, OrmError> {
        self.object
            .get(column)
            .ok_or_else(|| OrmError::unknown_property(column, self.def.object_name()))
    }

    /// Resolve `name` as a column, a cached relation, or a declared relation
    ///
    /// Unresolved one-to-one relations are loaded and cached on first access.
    /// To-many relations come back as an unexecuted query.
    ///
    /// # Errors
    ///
    /// Returns `OrmError::UnknownProperty` if `name` is neither a column nor a
    /// relation of this model.
    pub fn get(&mut self, name: &str) -> Result<Field<'_>, OrmError> {
        if self.object.contains_key(name) {
            return self.value(name).map(Field::Value);
        }
        match self.def.relation(name).map(|rel| rel.rel_type) {
            Some(RelationType::HasMany) | Some(RelationType::HasManyThrough) => {
                self.related_query(name).map(Field::Many)
            }
            _ => self.resolve_one(name).map(|record| Field::One(&*record)),
        }
    }

    /// Assign a direct column
    ///
    /// The value runs through the model's filters first. Only a value different
    /// from the current one marks the column changed and clears `saved` and
    /// `valid`.
    ///
    /// # Errors
    ///
    /// Returns `OrmError::UnknownProperty` for anything but a direct column; use
    /// [`set_related`](Self::set_related) for `belongs_to` relations.
    pub fn set(&mut self, column: &str, value: impl Into<Value>) -> Result<&mut Self, OrmError> {
        if !self.object.contains_key(column) {
            return Err(OrmError::unknown_property(column, self.def.object_name()));
        }

        let value = self.run_filters(column, value.into());
        let unchanged = self
            .object
            .get(column)
            .map_or(false, |current| same_value(current, &value));
        if !unchanged {
            self.object.insert(column.to_string(), value);
            self.mark_changed(column);
        }
        Ok(self)
    }

    /// Attach `target` through a `belongs_to` relation and copy its key into the
    /// foreign key column
    pub fn set_related(&mut self, alias: &str, target: Record) -> Result<&mut Self, OrmError> {
        let foreign_key = match self.def.relation(alias) {
            Some(rel) if rel.rel_type == RelationType::BelongsTo => rel.foreign_key.clone(),
            _ => return Err(OrmError::unknown_property(alias, self.def.object_name())),
        };

        let key = target
            .pk()
            .cloned()
            .unwrap_or_else(|| self.empty_value(&foreign_key));
        self.related.insert(alias.to_string(), target);
        self.object.insert(foreign_key.clone(), key);
        self.mark_changed(&foreign_key);
        Ok(self)
    }

    fn mark_changed(&mut self, column: &str) {
        self.changed.insert(column.to_string());
        self.saved = false;
        self.valid = false;
    }

    fn run_filters(&self, column: &str, value: Value) -> Value {
        let ctx = FilterContext {
            field: column,
            record: self,
        };
        self.def
            .filters()
            .for_field(column)
            .fold(value, |value, filter| filter.apply(value, ctx))
    }

    /// Bulk assignment from form-like input
    ///
    /// Without `expected`, every table column except the primary key is taken
    /// from `input`. Keys missing from `input` are skipped; `Expected::Related`
    /// entries recurse into the relation's own `values()`.
    pub fn values(
        &mut self,
        input: &JsonMap<String, JsonValue>,
        expected: Option<&[Expected]>,
    ) -> Result<&mut Self, OrmError> {
        let defaults: Vec<Expected>;
        let expected = match expected {
            Some(expected) => expected,
            None => {
                let pk = self.def.primary_key();
                defaults = self
                    .columns
                    .keys()
                    .filter(|column| column.as_str() != pk)
                    .map(|column| Expected::Column(column.clone()))
                    .collect();
                &defaults
            }
        };

        for entry in expected {
            match entry {
                Expected::Column(column) => {
                    let Some(json) = input.get(column) else { continue };
                    let like = self
                        .object
                        .get(column)
                        .cloned()
                        .unwrap_or_else(|| self.empty_value(column));
                    self.set(column, json_to_value(json, &like))?;
                }
                Expected::Related { alias, expected } => {
                    let Some(json) = input.get(alias) else { continue };
                    let nested = json.as_object().ok_or_else(|| {
                        OrmError::invalid(format!("values for {} must be an object", alias))
                    })?;
                    self.resolve_one(alias)?.values(nested, expected.as_deref())?;
                }
            }
        }
        Ok(self)
    }

    /// Columns plus every related record resolved so far, recursively
    ///
    /// Unresolved relations are left out; nothing is queried.
    pub fn as_map(&self) -> IndexMap<String, MapValue> {
        let mut map: IndexMap<String, MapValue> = self
            .object
            .iter()
            .map(|(column, value)| (column.clone(), MapValue::Value(value.clone())))
            .collect();
        for (alias, record) in &self.related {
            map.insert(alias.clone(), MapValue::Record(record.as_map()));
        }
        map
    }

    pub fn to_json(&self) -> JsonValue {
        MapValue::Record(self.as_map()).to_json()
    }

    /// Whether `name` is a column, a resolved relation or a declared relation
    pub fn is_set(&self, name: &str) -> bool {
        self.object.contains_key(name) || self.related.contains_key(name) || self.def.relation(name).is_some()
    }

    /// Reset a column to NULL and forget it as changed; drops a cached relation
    pub fn unset(&mut self, name: &str) -> &mut Self {
        if self.object.contains_key(name) {
            let empty = self.empty_value(name);
            self.object.insert(name.to_string(), empty);
        }
        self.changed.shift_remove(name);
        self.related.shift_remove(name);
        self
    }

    /// Forget everything: empty columns, no changes, no relations, no pending calls
    pub fn clear(&mut self) -> &mut Self {
        self.related.clear();
        self.changed.clear();
        self.fill_empty();
        self.pk_value = None;
        self.loaded = false;
        self.saved = false;
        self.valid = false;
        self.pending.reset(true);
        self
    }

    /// Load one result row
    ///
    /// A non-null primary key marks the record loaded, saved and valid. Columns
    /// aliased `prefix:column` are routed into the related record `prefix`.
    pub(crate) fn load_values(&mut self, row: Row) -> Result<(), OrmError> {
        if let Some(pk) = row.get(self.def.primary_key()) {
            if is_null(pk) {
                self.pk_value = None;
                self.loaded = false;
                self.saved = false;
                self.valid = false;
            } else {
                self.loaded = true;
                self.saved = true;
                self.valid = true;
                self.pk_value = Some(pk.clone());
            }
        }

        let mut nested: IndexMap<String, Row> = IndexMap::new();
        for (column, value) in row {
            match column.split_once(':') {
                None => {
                    self.object.insert(column, value);
                }
                Some((prefix, rest)) => {
                    nested
                        .entry(prefix.to_string())
                        .or_default()
                        .insert(rest.to_string(), value);
                }
            }
        }

        for (alias, values) in nested {
            match self.related_slot(&alias)? {
                Some(target) => target.load_values(values)?,
                None => log::warn!(
                    "Ignoring result columns for {}, not a one-to-one relation of {}",
                    alias,
                    self.def.object_name()
                ),
            }
        }
        Ok(())
    }

    /// Cached related record for `alias`, creating an empty one for a declared
    /// one-to-one relation
    pub(crate) fn related_slot(&mut self, alias: &str) -> Result<Option<&mut Record>, OrmError> {
        if !self.related.contains_key(alias) {
            let model = match self.def.relation(alias) {
                Some(rel) if rel.is_one_to_one() => rel.model.clone(),
                _ => return Ok(None),
            };
            let target = self.registry.factory(&model)?;
            self.related.insert(alias.to_string(), target);
        }
        Ok(self.related.get_mut(alias))
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("model", &self.def.object_name())
            .field("pk", &self.pk_value)
            .field("object", &self.object)
            .field("changed", &self.changed)
            .field("related", &self.related)
            .field("loaded", &self.loaded)
            .field("saved", &self.saved)
            .field("valid", &self.valid)
            .finish()
    }
}

/// Renders the primary key, empty when unset
impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.pk_value.as_ref().and_then(crate::value::value_as_string) {
            Some(pk) => f.write_str(&pk),
            None => Ok(()),
        }
    }
}

/// Same model and same primary key, once both records are loaded
impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        if !(self.loaded && other.loaded) || self.def.object_name() != other.def.object_name() {
            return false;
        }
        match (&self.pk_value, &other.pk_value) {
            (Some(a), Some(b)) => same_value(a, b),
            _ => false,
        }
    }
}

impl From<&Record> for Value {
    fn from(record: &Record) -> Self {
        record
            .pk_value
            .clone()
            .unwrap_or_else(|| record.empty_value(record.def.primary_key()))
    }
}
