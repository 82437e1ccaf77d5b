//! Join table maintenance for `has_many` relations through a join table.
//!
//! `has`, `add` and `remove` work directly on the join table; the target records
//! are never loaded. An unloaded record or an empty key list is a cheap no-op.

use crate::error::OrmError;
use crate::record::Record;
use crate::relation::{RelationDef, RelationType};
use crate::record::persist::records_found;
use crate::value::same_value;
use sea_query::{Alias, Asterisk, ConditionalStatement, Expr, Func, Query, SimpleExpr, Value};

/// Join table, foreign key and far key of a relation through a join table
struct JoinTable<'a> {
    table: &'a str,
    foreign_key: &'a str,
    far_key: &'a str,
}

fn join_table<'a>(record: &Record, alias: &str, relation: Option<&'a RelationDef>) -> Result<JoinTable<'a>, OrmError> {
    let relation = relation.ok_or_else(|| OrmError::unknown_property(alias, record.object_name()))?;
    match (relation.rel_type, &relation.through, &relation.far_key) {
        (RelationType::HasManyThrough, Some(table), Some(far_key)) => Ok(JoinTable {
            table,
            foreign_key: &relation.foreign_key,
            far_key,
        }),
        _ => Err(OrmError::invalid(format!(
            "{}.{} is not a has_many relation through a join table",
            record.object_name(),
            alias
        ))),
    }
}

fn distinct_keys<K>(far_keys: K) -> Vec<Value>
where
    K: IntoIterator,
    K::Item: Into<Value>,
{
    let mut keys: Vec<Value> = Vec::new();
    for key in far_keys.into_iter().map(Into::into) {
        if !keys.iter().any(|known| same_value(known, &key)) {
            keys.push(key);
        }
    }
    keys
}

impl Record {
    /// Whether every key in `far_keys` is linked to this record
    ///
    /// Returns false without a query when the record is not loaded or
    /// `far_keys` is empty. Duplicate keys count once.
    ///
    /// # Errors
    ///
    /// Returns `OrmError::UnknownProperty` for an undeclared alias and
    /// `OrmError::InvalidOperation` for a relation without a join table.
    pub fn has<K>(&mut self, alias: &str, far_keys: K) -> Result<bool, OrmError>
    where
        K: IntoIterator,
        K::Item: Into<Value>,
    {
        let def = std::sync::Arc::clone(&self.def);
        let link = join_table(self, alias, def.relation(alias))?;
        let keys = distinct_keys(far_keys);
        let Some(pk) = self.pk_value.clone().filter(|_| self.loaded) else {
            return Ok(false);
        };
        if keys.is_empty() {
            return Ok(false);
        }

        #[cfg(feature = "tracing")]
        let _span = crate::tracing_helpers::record_span(def.object_name(), "has").entered();

        let expected = keys.len();
        let mut select = Query::select();
        select
            .expr_as(Func::count(Expr::col(Asterisk)), Alias::new("records_found"))
            .from(Alias::new(link.table))
            .and_where(Expr::col(Alias::new(link.foreign_key)).eq(pk))
            .and_where(Expr::col(Alias::new(link.far_key)).is_in(keys));

        let rows = self.fetch(&select)?;
        let found = records_found(&rows, def.object_name())?;
        Ok(usize::try_from(found).map_or(false, |found| found == expected))
    }

    /// Link this record to every key in `far_keys` with one multi-row INSERT
    pub fn add<K>(&mut self, alias: &str, far_keys: K) -> Result<&mut Self, OrmError>
    where
        K: IntoIterator,
        K::Item: Into<Value>,
    {
        let def = std::sync::Arc::clone(&self.def);
        let link = join_table(self, alias, def.relation(alias))?;
        let keys: Vec<Value> = far_keys.into_iter().map(Into::into).collect();
        let Some(pk) = self.pk_value.clone().filter(|_| self.loaded) else {
            return Ok(self);
        };
        if keys.is_empty() {
            return Ok(self);
        }

        #[cfg(feature = "tracing")]
        let _span = crate::tracing_helpers::record_span(def.object_name(), "add").entered();

        let mut insert = Query::insert();
        insert
            .into_table(Alias::new(link.table))
            .columns([Alias::new(link.foreign_key), Alias::new(link.far_key)]);
        for key in keys {
            insert
                .values([SimpleExpr::from(pk.clone()), SimpleExpr::from(key)])
                .map_err(|err| OrmError::invalid(err.to_string()))?;
        }
        self.exec(&insert)?;
        Ok(self)
    }

    /// Unlink the keys in `far_keys`, or every linked row when `far_keys` is `None`
    pub fn remove<K>(&mut self, alias: &str, far_keys: Option<K>) -> Result<&mut Self, OrmError>
    where
        K: IntoIterator,
        K::Item: Into<Value>,
    {
        let def = std::sync::Arc::clone(&self.def);
        let link = join_table(self, alias, def.relation(alias))?;
        let keys: Option<Vec<Value>> = far_keys.map(|keys| keys.into_iter().map(Into::into).collect());
        let Some(pk) = self.pk_value.clone().filter(|_| self.loaded) else {
            return Ok(self);
        };
        if keys.as_ref().map_or(false, Vec::is_empty) {
            return Ok(self);
        }

        #[cfg(feature = "tracing")]
        let _span = crate::tracing_helpers::record_span(def.object_name(), "remove").entered();

        let mut delete = Query::delete();
        delete
            .from_table(Alias::new(link.table))
            .and_where(Expr::col(Alias::new(link.foreign_key)).eq(pk));
        if let Some(keys) = keys {
            delete.and_where(Expr::col(Alias::new(link.far_key)).is_in(keys));
        }
        self.exec(&delete)?;
        Ok(self)
    }
}
