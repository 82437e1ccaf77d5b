//! Terminal operations: statements built, executed and folded back into records.

use super::Record;
use crate::error::OrmError;
use crate::executor::{ExecResult, LifeError};
use crate::model::{ModelDef, ModelRegistry};
use crate::query::call::column_ref;
use crate::query::{CallKind, ColumnMap, Op};
use crate::validation::Validation;
use crate::value::{is_null, value_as_i64, Row};
use indexmap::IndexMap;
use sea_query::{
    Alias, Asterisk, ConditionalStatement, Expr, Func, OrderedStatement, Query, QueryStatementBuilder,
    SelectStatement, SimpleExpr, Value,
};
use std::sync::Arc;

#[cfg(feature = "tracing")]
use crate::tracing_helpers;

/// Rows of a `find_all()`, turned into records as they are iterated
#[derive(Debug)]
pub struct ResultSet {
    registry: Arc<ModelRegistry>,
    def: Arc<ModelDef>,
    columns: Arc<ColumnMap>,
    rows: std::vec::IntoIter<Row>,
}

impl ResultSet {
    /// Rows not yet iterated
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.len() == 0
    }
}

impl Iterator for ResultSet {
    type Item = Result<Record, OrmError>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.rows.next()?;
        let mut record = Record::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.def),
            Arc::clone(&self.columns),
        );
        Some(record.load_values(row).map(|()| record))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}

impl ExactSizeIterator for ResultSet {}

/// Read the `records_found` column of a COUNT(*) result
pub(crate) fn records_found(rows: &[Row], owner: &str) -> Result<u64, OrmError> {
    let count = rows
        .first()
        .and_then(|row| row.get("records_found"))
        .and_then(value_as_i64)
        .ok_or_else(|| OrmError::invalid(format!("count for {} returned no records_found value", owner)))?;
    u64::try_from(count)
        .map_err(|_| OrmError::invalid(format!("count for {} returned a negative value {}", owner, count)))
}

impl Record {
    /// Render and run a statement that returns rows
    pub(crate) fn fetch<S: QueryStatementBuilder>(&mut self, statement: &S) -> Result<Vec<Row>, OrmError> {
        let (sql, values) = statement.build_any(self.registry.backend().query_builder());
        log::debug!("{} query: {}", self.def.object_name(), sql);
        let rows = self.registry.executor().query_all(&sql, &values);
        self.last_query = Some(sql);
        Ok(rows?)
    }

    /// Render and run a statement that does not return rows
    pub(crate) fn exec<S: QueryStatementBuilder>(&mut self, statement: &S) -> Result<ExecResult, OrmError> {
        let (sql, values) = statement.build_any(self.registry.backend().query_builder());
        log::debug!("{} statement: {}", self.def.object_name(), sql);
        let result = self.registry.executor().execute(&sql, &values);
        self.last_query = Some(sql);
        Ok(result?)
    }

    fn apply_load_with(&mut self) -> Result<(), OrmError> {
        let def = Arc::clone(&self.def);
        for path in def.load_with() {
            self.with(path)?;
        }
        Ok(())
    }

    /// SELECT for `find` / `find_all`: pending calls, then the model's table,
    /// `table.*` and the default sorting unless an `order_by()` was replayed
    fn prepare_select(&mut self, single: bool) -> Result<SelectStatement, OrmError> {
        self.apply_load_with()?;
        let mut select = self.pending.build_select()?;
        let table = self.def.table_name();

        select.from(Alias::new(table));
        if single {
            select.limit(1);
        }
        select.column((Alias::new(table), Asterisk));

        if !self.pending.was_applied(CallKind::OrderBy) {
            for (column, direction) in &self.sorting {
                let column = if column.contains('.') {
                    column.clone()
                } else {
                    format!("{}.{}", table, column)
                };
                select.order_by(column_ref(&column), direction.to_order());
            }
        }
        Ok(select)
    }

    fn primary_key_value(&self) -> Result<Value, OrmError> {
        self.pk_value.clone().ok_or_else(|| {
            OrmError::invalid(format!("{} model has no primary key value", self.def.object_name()))
        })
    }

    fn changed_data(&self) -> IndexMap<String, Value> {
        self.changed
            .iter()
            .filter_map(|column| {
                self.object
                    .get(column)
                    .map(|value| (column.clone(), value.clone()))
            })
            .collect()
    }

    /// Load the first row matching the pending calls
    ///
    /// Zero rows is not an error: the record is cleared and stays unloaded.
    ///
    /// # Errors
    ///
    /// Returns `OrmError::InvalidOperation` if the record is already loaded or a
    /// pending call cannot be replayed, and `OrmError::Execution` if the query
    /// fails.
    pub fn find(&mut self) -> Result<&mut Self, OrmError> {
        if self.loaded {
            return Err(OrmError::invalid("Method find() cannot be called on loaded objects"));
        }

        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::record_span(self.def.object_name(), "find").entered();

        let result = self
            .prepare_select(true)
            .and_then(|select| self.fetch(&select));
        self.pending.reset(true);

        match result?.into_iter().next() {
            Some(row) => self.load_values(row)?,
            None => {
                self.clear();
            }
        }
        Ok(self)
    }

    /// Every row matching the pending calls, as records of this model
    ///
    /// The record itself is not modified, apart from its pending calls.
    pub fn find_all(&mut self) -> Result<ResultSet, OrmError> {
        if self.loaded {
            return Err(OrmError::invalid("Method find_all() cannot be called on loaded objects"));
        }

        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::record_span(self.def.object_name(), "find_all").entered();

        let result = self
            .prepare_select(false)
            .and_then(|select| self.fetch(&select));
        self.pending.reset(true);

        Ok(ResultSet {
            registry: Arc::clone(&self.registry),
            def: Arc::clone(&self.def),
            columns: Arc::clone(&self.columns),
            rows: result?.into_iter(),
        })
    }

    /// Number of rows matching the pending calls
    ///
    /// Pending `select()` calls are left out of the count and put back
    /// afterwards, so a `reset(false)` before counting keeps them for the next
    /// find.
    pub fn count_all(&mut self) -> Result<u64, OrmError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::record_span(self.def.object_name(), "count_all").entered();

        let result = self.apply_load_with().and_then(|()| {
            let selects = self.pending.take_selects();
            let built = self.pending.build_select();
            self.pending.restore_selects(selects);
            let mut select = built?;
            select
                .from(Alias::new(self.def.table_name()))
                .expr_as(Func::count(Expr::col(Asterisk)), Alias::new("records_found"));
            self.fetch(&select)
        });
        self.pending.reset(true);

        records_found(&result?, self.def.object_name())
    }

    /// Insert the changed columns as a new row
    ///
    /// Runs validation first unless the record is already valid. When the
    /// primary key was not set, the backend-generated identity is adopted
    /// (through `RETURNING` where the backend supports it).
    ///
    /// # Errors
    ///
    /// Returns `OrmError::InvalidOperation` if the record is loaded,
    /// `OrmError::ValidationFailed` if validation fails, and
    /// `OrmError::Execution` if the insert fails or reports no identity.
    pub fn create(&mut self, extra: Option<&mut Validation>) -> Result<&mut Self, OrmError> {
        if self.loaded {
            return Err(OrmError::invalid(format!(
                "Cannot create {} model because it is already loaded.",
                self.def.object_name()
            )));
        }

        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::record_span(self.def.object_name(), "create").entered();

        if !self.valid {
            self.check(extra)?;
        }

        let def = Arc::clone(&self.def);
        let mut data = self.changed_data();
        if let Some(stamp) = def.created_column() {
            let now = stamp.now()?;
            self.object.insert(stamp.column.clone(), now.clone());
            data.insert(stamp.column.clone(), now);
        }

        let pk = def.primary_key();
        let mut insert = Query::insert();
        insert.into_table(Alias::new(def.table_name()));
        if data.is_empty() {
            insert.or_default_values();
        } else {
            insert.columns(data.keys().map(|column| Alias::new(column.as_str())));
            insert
                .values(data.values().cloned().map(SimpleExpr::from))
                .map_err(|err| OrmError::invalid(err.to_string()))?;
        }

        let missing_identity = || {
            OrmError::Execution(LifeError::Other(format!(
                "insert into {} reported no value for {}",
                def.table_name(),
                pk
            )))
        };

        let id = match data.get(pk).filter(|value| !is_null(value)).cloned() {
            Some(id) => {
                self.exec(&insert)?;
                id
            }
            None if self.registry.backend().supports_returning() => {
                insert.returning_col(Alias::new(pk));
                self.fetch(&insert)?
                    .into_iter()
                    .next()
                    .and_then(|mut row| row.shift_remove(pk))
                    .filter(|value| !is_null(value))
                    .ok_or_else(missing_identity)?
            }
            None => self
                .exec(&insert)?
                .last_insert_id
                .filter(|value| !is_null(value))
                .ok_or_else(missing_identity)?,
        };

        self.object.insert(pk.to_string(), id.clone());
        self.pk_value = Some(id);
        self.loaded = true;
        self.saved = true;
        self.changed.clear();
        Ok(self)
    }

    /// Write the changed columns of a loaded record
    ///
    /// A record without changes is left alone and no statement is issued.
    pub fn update(&mut self, extra: Option<&mut Validation>) -> Result<&mut Self, OrmError> {
        if !self.loaded {
            return Err(OrmError::invalid(format!(
                "Cannot update {} model because it is not loaded.",
                self.def.object_name()
            )));
        }
        if self.changed.is_empty() {
            return Ok(self);
        }

        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::record_span(self.def.object_name(), "update").entered();

        if !self.valid {
            self.check(extra)?;
        }

        let def = Arc::clone(&self.def);
        let mut data = self.changed_data();
        if let Some(stamp) = def.updated_column() {
            let now = stamp.now()?;
            self.object.insert(stamp.column.clone(), now.clone());
            data.insert(stamp.column.clone(), now);
        }

        let pk = def.primary_key();
        let id = self.primary_key_value()?;
        let mut update = Query::update();
        update.table(Alias::new(def.table_name()));
        for (column, value) in &data {
            update.value(Alias::new(column.as_str()), value.clone());
        }
        update.and_where(Expr::col(Alias::new(pk)).eq(id));
        self.exec(&update)?;

        if let Some(new_pk) = data.get(pk) {
            self.pk_value = Some(new_pk.clone());
        }
        self.saved = true;
        self.changed.clear();
        Ok(self)
    }

    /// `update` when loaded, `create` otherwise
    pub fn save(&mut self, extra: Option<&mut Validation>) -> Result<&mut Self, OrmError> {
        if self.loaded {
            self.update(extra)
        } else {
            self.create(extra)
        }
    }

    /// Delete the row and clear the record; related rows are not touched
    pub fn delete(&mut self) -> Result<&mut Self, OrmError> {
        if !self.loaded {
            return Err(OrmError::invalid(format!(
                "Cannot delete {} model because it is not loaded.",
                self.def.object_name()
            )));
        }

        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::record_span(self.def.object_name(), "delete").entered();

        let id = self.primary_key_value()?;
        let mut delete = Query::delete();
        delete
            .from_table(Alias::new(self.def.table_name()))
            .and_where(Expr::col(Alias::new(self.def.primary_key())).eq(id));
        self.exec(&delete)?;
        Ok(self.clear())
    }

    /// UPDATE every row matching the pending calls; returns the affected row count
    pub fn update_all<I, K, V>(&mut self, values: I) -> Result<u64, OrmError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let values: Vec<(String, Value)> = values
            .into_iter()
            .map(|(column, value)| (column.into(), value.into()))
            .collect();
        if values.is_empty() {
            return Err(OrmError::invalid("update_all() needs at least one column"));
        }
        if let Some((column, _)) = values.iter().find(|(column, _)| !self.columns.contains_key(column)) {
            return Err(OrmError::unknown_property(column.as_str(), self.def.object_name()));
        }

        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::record_span(self.def.object_name(), "update_all").entered();

        let result = self
            .pending
            .build_update(self.def.table_name())
            .and_then(|mut update| {
                for (column, value) in values {
                    update.value(Alias::new(column.as_str()), value);
                }
                self.exec(&update)
            });
        self.pending.reset(true);
        Ok(result?.rows_affected)
    }

    /// DELETE every row matching the pending calls; returns the affected row count
    pub fn delete_all(&mut self) -> Result<u64, OrmError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::record_span(self.def.object_name(), "delete_all").entered();

        let result = self
            .pending
            .build_delete(self.def.table_name())
            .and_then(|delete| self.exec(&delete));
        self.pending.reset(true);
        Ok(result?.rows_affected)
    }

    /// Clear the record and, if it was loaded, find it again by primary key
    pub fn reload(&mut self) -> Result<&mut Self, OrmError> {
        let pk = self.pk_value.clone();
        let was_loaded = self.loaded;
        self.clear();

        if let (true, Some(pk)) = (was_loaded, pk) {
            let column = format!("{}.{}", self.def.table_name(), self.def.primary_key());
            self.and_where(column, Op::Eq, pk).find()?;
        }
        Ok(self)
    }

    /// Discard pending calls; `reset(false)` keeps them through the next terminal
    /// operation
    pub fn reset(&mut self, next: bool) -> &mut Self {
        self.pending.reset(next);
        self
    }

    /// Re-read column metadata through the cache; `force` drops the cached entry
    pub fn reload_columns(&mut self, force: bool) -> Result<&mut Self, OrmError> {
        self.columns = self.registry.columns_for(&self.def, force)?;
        Ok(self)
    }

    /// Validation of the current values against the model's rules and labels
    pub fn validation(&self) -> Validation {
        let mut validation = Validation::new(self.object.clone()).object(self.def.object_name());
        for (field, label) in self.labels() {
            validation = validation.label(field, label);
        }
        for (field, rules) in self.def.rules() {
            validation = validation.rules(field.clone(), rules.iter().cloned());
        }
        validation
    }

    /// Validate the record, plus an optional external validation
    ///
    /// Sets `valid` from the model's own rules.
    ///
    /// # Errors
    ///
    /// Returns `OrmError::ValidationFailed` when either validation fails; the
    /// external failures are carried in `ValidationErrors::external`.
    pub fn check(&mut self, extra: Option<&mut Validation>) -> Result<&mut Self, OrmError> {
        let external = match extra {
            Some(extra) => {
                if extra.check() {
                    None
                } else {
                    Some(extra.errors().clone())
                }
            }
            None => None,
        };

        let mut validation = self.validation();
        self.valid = validation.check();

        if !self.valid || external.is_some() {
            let mut errors = validation.into_errors();
            errors.external = external.map(Box::new);
            return Err(OrmError::ValidationFailed(errors));
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::Backend;
    use crate::config::OrmConfig;
    use crate::model::ModelDecl;
    use crate::query::{ColumnDefinition, Direction};
    use crate::test_helpers::{row, MockExecutor};
    use crate::validation::Rule;

    fn registry(executor: Arc<MockExecutor>, backend: Backend) -> Arc<ModelRegistry> {
        ModelRegistry::builder(executor)
            .config(OrmConfig {
                backend,
                ..OrmConfig::default()
            })
            .model(
                ModelDecl::new("post")
                    .column("id", ColumnDefinition::of_type("Integer").primary_key())
                    .column("title", ColumnDefinition::of_type("Text"))
                    .sorting("id", Direction::Desc)
                    .rule("title", Rule::not_empty()),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_find_applies_default_sorting() {
        let executor = Arc::new(MockExecutor::new());
        executor.push_rows(vec![row([("id", Value::Int(Some(1))), ("title", Value::from("a"))])]);
        let registry = registry(executor.clone(), Backend::Postgres);

        let mut post = registry.factory("post").unwrap();
        post.and_where("title", Op::Eq, "a").find().unwrap();

        assert!(post.loaded());
        assert_eq!(
            executor.statements(),
            vec![r#"SELECT "posts".* FROM "posts" WHERE "title" = $1 ORDER BY "posts"."id" DESC LIMIT $2"#]
        );
        assert_eq!(post.last_query(), Some(executor.statements()[0].as_str()));
    }

    #[test]
    fn test_order_by_suppresses_default_sorting() {
        let executor = Arc::new(MockExecutor::new());
        let registry = registry(executor.clone(), Backend::Postgres);

        let mut post = registry.factory("post").unwrap();
        let results = post.order_by("title", Direction::Asc).find_all().unwrap();

        assert!(results.is_empty());
        assert_eq!(
            executor.statements(),
            vec![r#"SELECT "posts".* FROM "posts" ORDER BY "title" ASC"#]
        );
    }

    #[test]
    fn test_find_on_loaded_record_fails() {
        let executor = Arc::new(MockExecutor::new());
        executor.push_rows(vec![row([("id", Value::Int(Some(1)))])]);
        let registry = registry(executor, Backend::Postgres);

        let mut post = registry.find_by_pk("post", 1).unwrap();
        assert!(matches!(post.find(), Err(OrmError::InvalidOperation(_))));
        assert!(matches!(post.find_all(), Err(OrmError::InvalidOperation(_))));
    }

    #[test]
    fn test_zero_rows_clears_record() {
        let executor = Arc::new(MockExecutor::new());
        let registry = registry(executor, Backend::Postgres);
        let post = registry.find_by_pk("post", 99).unwrap();
        assert!(!post.loaded());
        assert_eq!(post.pk(), None);
    }

    #[test]
    fn test_create_uses_last_insert_id_without_returning() {
        let executor = Arc::new(MockExecutor::new());
        executor.push_exec(ExecResult::with_insert_id(1, 12u64));
        let registry = registry(executor.clone(), Backend::Mysql);

        let mut post = registry.factory("post").unwrap();
        post.set("title", "Hello").unwrap();
        post.create(None).unwrap();

        assert!(post.loaded() && post.saved());
        assert_eq!(post.pk(), Some(&Value::BigUnsigned(Some(12))));
        assert_eq!(post.changed().count(), 0);
        assert_eq!(
            executor.statements(),
            vec!["INSERT INTO `posts` (`title`) VALUES (?)"]
        );
    }

    #[test]
    fn test_create_without_identity_fails() {
        let executor = Arc::new(MockExecutor::new());
        let registry = registry(executor, Backend::Mysql);
        let mut post = registry.factory("post").unwrap();
        post.set("title", "Hello").unwrap();
        assert!(matches!(post.create(None), Err(OrmError::Execution(_))));
        assert!(!post.loaded());
    }

    #[test]
    fn test_create_validates() {
        let executor = Arc::new(MockExecutor::new());
        let registry = registry(executor.clone(), Backend::Postgres);
        let mut post = registry.factory("post").unwrap();

        let err = post.create(None).unwrap_err();
        let errors = err.validation_errors().unwrap();
        assert_eq!(errors.get("title").unwrap().rule, "not_empty");
        assert!(executor.statements().is_empty());
    }

    #[test]
    fn test_update_and_delete_require_loaded() {
        let executor = Arc::new(MockExecutor::new());
        let registry = registry(executor, Backend::Postgres);
        let mut post = registry.factory("post").unwrap();
        assert!(matches!(post.update(None), Err(OrmError::InvalidOperation(_))));
        assert!(matches!(post.delete(), Err(OrmError::InvalidOperation(_))));
    }

    #[test]
    fn test_update_all_rejects_select_calls() {
        let executor = Arc::new(MockExecutor::new());
        let registry = registry(executor.clone(), Backend::Postgres);
        let mut post = registry.factory("post").unwrap();

        let err = post.group_by("title").update_all([("title", "x")]).unwrap_err();
        assert!(matches!(err, OrmError::InvalidOperation(_)));

        post.reset(true);
        let err = post.update_all([("colour", "red")]).unwrap_err();
        assert!(matches!(err, OrmError::UnknownProperty { .. }));
        assert!(executor.statements().is_empty());
    }

    #[test]
    fn test_delete_all_uses_pending_conditions() {
        let executor = Arc::new(MockExecutor::new());
        executor.push_exec(ExecResult::new(4));
        let registry = registry(executor.clone(), Backend::Postgres);
        let mut post = registry.factory("post").unwrap();

        let deleted = post.and_where("title", Op::Like, "draft%").delete_all().unwrap();
        assert_eq!(deleted, 4);
        assert_eq!(
            executor.statements(),
            vec![r#"DELETE FROM "posts" WHERE "title" LIKE $1"#]
        );
        assert!(post.pending_calls().is_empty());
    }

    #[test]
    fn test_failed_build_still_clears_pending_calls() {
        let executor = Arc::new(MockExecutor::new());
        executor.push_rows(vec![row([("id", Value::Int(Some(5))), ("title", Value::from("a"))])]);
        let registry = registry(executor.clone(), Backend::Postgres);
        let mut post = registry.factory("post").unwrap();

        post.on("a.x", Op::Eq, "b.y");
        assert!(matches!(post.find(), Err(OrmError::InvalidOperation(_))));
        assert!(post.pending_calls().is_empty());

        post.where_("posts.id", Op::Eq, 5).find().unwrap();
        assert!(post.loaded());
        assert_eq!(executor.statements().len(), 1);
    }

    #[test]
    fn test_failed_bulk_statements_clear_pending_calls() {
        let executor = Arc::new(MockExecutor::new());
        let registry = registry(executor.clone(), Backend::Postgres);
        let mut post = registry.factory("post").unwrap();

        post.group_by("title");
        assert!(post.delete_all().is_err());
        assert!(post.pending_calls().is_empty());

        post.on("a.x", Op::Eq, "b.y");
        assert!(post.find_all().is_err());
        assert!(post.pending_calls().is_empty());

        post.group_by("title");
        assert!(post.update_all([("title", "x")]).is_err());
        assert!(post.pending_calls().is_empty());
        assert!(executor.statements().is_empty());
    }

    #[test]
    fn test_count_without_records_found_is_an_error() {
        let executor = Arc::new(MockExecutor::new());
        executor.push_rows(vec![row([("count", Value::BigInt(Some(3)))])]);
        executor.push_rows(vec![row([("records_found", Value::BigInt(Some(-1)))])]);
        executor.push_rows(vec![row([("records_found", Value::BigInt(Some(3)))])]);
        let registry = registry(executor, Backend::Postgres);
        let mut post = registry.factory("post").unwrap();

        assert!(matches!(post.count_all(), Err(OrmError::InvalidOperation(_))));
        assert!(matches!(post.count_all(), Err(OrmError::InvalidOperation(_))));
        assert_eq!(post.count_all().unwrap(), 3);
    }

    #[test]
    fn test_create_fills_pattern_timestamp() {
        let executor = Arc::new(MockExecutor::new());
        executor.push_rows(vec![row([("id", Value::Int(Some(3)))])]);
        let registry = ModelRegistry::builder(executor.clone())
            .model(
                ModelDecl::new("post")
                    .column("id", ColumnDefinition::of_type("Integer").primary_key())
                    .column("title", ColumnDefinition::of_type("Text"))
                    .column("created", ColumnDefinition::of_type("Text"))
                    .created_column("created", crate::model::TimestampFormat::Pattern("%Y-%m-%d".into())),
            )
            .build()
            .unwrap();

        let mut post = registry.factory("post").unwrap();
        post.set("title", "Dated").unwrap().create(None).unwrap();

        let executed = executor.executed();
        assert_eq!(
            executed[0].sql,
            r#"INSERT INTO "posts" ("title", "created") VALUES ($1, $2) RETURNING "id""#
        );
        let Value::String(Some(created)) = &executed[0].values.0[1] else {
            panic!("created should be bound as text, got {:?}", executed[0].values.0[1]);
        };
        assert_eq!(created.len(), 10);
        assert!(chrono::NaiveDate::parse_from_str(created, "%Y-%m-%d").is_ok());
        assert_eq!(post.value("created").unwrap(), &executed[0].values.0[1]);
    }
}
