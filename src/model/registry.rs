//! Model registry.
//!
//! The registry owns everything records share: the executor, the schema
//! introspector, the inflector, the configuration, the column cache and the
//! normalized model definitions. It is built once, wrapped in an `Arc`, and never
//! mutated afterwards except through the column cache.

use super::def::{ModelDecl, ModelDef};
use crate::config::OrmConfig;
use crate::error::OrmError;
use crate::executor::{Backend, LifeError, LifeExecutor, SchemaIntrospector};
use crate::inflector::{EnglishInflector, Inflector};
use crate::query::{ColumnCache, ColumnMap, Op};
use crate::record::{Record, RecordSnapshot};
use indexmap::IndexMap;
use sea_query::Value;
use std::fmt;
use std::sync::Arc;

/// Builder for [`ModelRegistry`]
pub struct ModelRegistryBuilder {
    executor: Arc<dyn LifeExecutor>,
    introspector: Option<Arc<dyn SchemaIntrospector>>,
    inflector: Arc<dyn Inflector>,
    config: OrmConfig,
    decls: Vec<ModelDecl>,
}

impl ModelRegistryBuilder {
    /// Source of column metadata for models that do not declare their columns
    pub fn introspector(mut self, introspector: Arc<dyn SchemaIntrospector>) -> Self {
        self.introspector = Some(introspector);
        self
    }

    pub fn inflector(mut self, inflector: Arc<dyn Inflector>) -> Self {
        self.inflector = inflector;
        self
    }

    pub fn config(mut self, config: OrmConfig) -> Self {
        self.config = config;
        self
    }

    pub fn model(mut self, decl: ModelDecl) -> Self {
        self.decls.push(decl);
        self
    }

    /// Normalize every declaration and check that relation targets exist
    ///
    /// # Errors
    ///
    /// Returns `OrmError::Declaration` for duplicate model names, duplicate
    /// relation aliases, invalid timestamp formats, or relations that point at
    /// a model that was not declared.
    pub fn build(self) -> Result<Arc<ModelRegistry>, OrmError> {
        let mut models: IndexMap<String, Arc<ModelDef>> = IndexMap::new();
        for decl in self.decls {
            let def = decl.normalize(&self.config, self.inflector.as_ref())?;
            let name = def.object_name().to_string();
            if models.insert(name.clone(), Arc::new(def)).is_some() {
                return Err(OrmError::Declaration(format!("model {} is declared twice", name)));
            }
        }

        for (name, def) in &models {
            for (alias, relation) in def.relations() {
                if !models.contains_key(&relation.model) {
                    return Err(OrmError::Declaration(format!(
                        "relation {}.{} targets unknown model {}",
                        name, alias, relation.model
                    )));
                }
            }
        }

        log::debug!(
            "Model registry built with {} model(s) for {}",
            models.len(),
            self.config.backend
        );

        Ok(Arc::new(ModelRegistry {
            executor: self.executor,
            introspector: self.introspector,
            inflector: self.inflector,
            columns: ColumnCache::new(self.config.column_cache_ttl()),
            config: self.config,
            models,
        }))
    }
}

/// Shared, read-only model registry
pub struct ModelRegistry {
    executor: Arc<dyn LifeExecutor>,
    introspector: Option<Arc<dyn SchemaIntrospector>>,
    inflector: Arc<dyn Inflector>,
    config: OrmConfig,
    columns: ColumnCache,
    models: IndexMap<String, Arc<ModelDef>>,
}

impl fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("config", &self.config)
            .field("models", &self.models.keys().collect::<Vec<_>>())
            .field("cached_columns", &self.columns.len())
            .finish()
    }
}

impl ModelRegistry {
    /// Start a registry around `executor`
    pub fn builder(executor: Arc<dyn LifeExecutor>) -> ModelRegistryBuilder {
        ModelRegistryBuilder {
            executor,
            introspector: None,
            inflector: Arc::new(EnglishInflector),
            config: OrmConfig::default(),
            decls: Vec::new(),
        }
    }

    pub fn executor(&self) -> &dyn LifeExecutor {
        self.executor.as_ref()
    }

    pub fn inflector(&self) -> &dyn Inflector {
        self.inflector.as_ref()
    }

    pub fn config(&self) -> &OrmConfig {
        &self.config
    }

    pub fn backend(&self) -> Backend {
        self.config.backend
    }

    pub fn column_cache(&self) -> &ColumnCache {
        &self.columns
    }

    pub fn model(&self, name: &str) -> Result<&Arc<ModelDef>, OrmError> {
        self.models
            .get(name)
            .ok_or_else(|| OrmError::UnknownModel(name.to_string()))
    }

    pub fn models(&self) -> impl Iterator<Item = &Arc<ModelDef>> {
        self.models.values()
    }

    /// Column metadata of `def`, through the column cache
    ///
    /// Declared columns win over introspection. `force` drops the cached entry
    /// first.
    pub fn columns_for(&self, def: &ModelDef, force: bool) -> Result<Arc<ColumnMap>, OrmError> {
        if force {
            self.columns.invalidate(def.object_name());
        }
        let columns = self.columns.get_or_load(def.object_name(), || {
            if let Some(declared) = def.declared_columns() {
                return Ok(declared.clone());
            }
            match &self.introspector {
                Some(introspector) => introspector.list_columns(def.table_name()),
                None => Err(LifeError::Other(format!(
                    "no columns declared for model {} and no schema introspector configured",
                    def.object_name()
                ))),
            }
        })?;
        Ok(columns)
    }

    /// An empty, unloaded record of model `name`
    pub fn factory(self: &Arc<Self>, name: &str) -> Result<Record, OrmError> {
        let def = Arc::clone(self.model(name)?);
        self.instantiate(def)
    }

    pub(crate) fn instantiate(self: &Arc<Self>, def: Arc<ModelDef>) -> Result<Record, OrmError> {
        let columns = self.columns_for(&def, false)?;
        Ok(Record::new(Arc::clone(self), def, columns))
    }

    /// Record of model `name` loaded by primary key
    ///
    /// Not finding a row is not an error: the record comes back unloaded.
    pub fn find_by_pk(self: &Arc<Self>, name: &str, id: impl Into<Value>) -> Result<Record, OrmError> {
        let mut record = self.factory(name)?;
        let column = format!("{}.{}", record.table_name(), record.primary_key());
        record.and_where(column, Op::Eq, id.into()).find()?;
        Ok(record)
    }

    /// Record of model `name` loaded by one equality condition per entry
    pub fn find_where<I, K, V>(self: &Arc<Self>, name: &str, conditions: I) -> Result<Record, OrmError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut record = self.factory(name)?;
        for (column, value) in conditions {
            record.and_where(column, Op::Eq, value.into());
        }
        record.find()?;
        Ok(record)
    }

    /// Rebuild a record from a snapshot
    ///
    /// Loaded records are reloaded when `reload_on_wakeup` is set, so stale
    /// snapshots pick up the current row.
    pub fn restore(self: &Arc<Self>, snapshot: RecordSnapshot) -> Result<Record, OrmError> {
        let mut record = self.factory(&snapshot.model)?;
        record.apply_snapshot(snapshot)?;
        if self.config.reload_on_wakeup && record.loaded() {
            record.reload()?;
        }
        Ok(record)
    }
}
