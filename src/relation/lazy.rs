//! Lazy relation resolution.
//!
//! One-to-one relations are loaded on first access and cached on the record, even
//! when no row matched: an unloaded related record means "resolved, absent".
//! To-many relations are never cached; every access yields a fresh, unexecuted
//! query on the target model that the caller can refine and run.

use crate::error::OrmError;
use crate::query::{JoinKind, Op};
use crate::record::Record;
use crate::relation::RelationType;
use crate::value::is_null;

impl Record {
    /// Related record of a `belongs_to` or `has_one` relation, loading it on
    /// first access
    ///
    /// A `belongs_to` whose foreign key is NULL, or a `has_one` on a record
    /// without a primary key, resolves to an empty record without a query.
    ///
    /// # Errors
    ///
    /// Returns `OrmError::UnknownProperty` if `alias` is not a one-to-one
    /// relation of this model, and `OrmError::Execution` if the query fails.
    pub fn resolve_one(&mut self, alias: &str) -> Result<&mut Record, OrmError> {
        if !self.related.contains_key(alias) {
            let relation = match self.def.relation(alias) {
                Some(rel) if rel.is_one_to_one() => rel.clone(),
                _ => return Err(OrmError::unknown_property(alias, self.def.object_name())),
            };

            #[cfg(feature = "tracing")]
            let _span = crate::tracing_helpers::relation_span(self.def.object_name(), alias).entered();

            let mut target = self.registry.factory(&relation.model)?;
            let key = match relation.rel_type {
                RelationType::BelongsTo => self
                    .object
                    .get(&relation.foreign_key)
                    .filter(|value| !is_null(value))
                    .cloned()
                    .map(|fk| (format!("{}.{}", target.table_name(), target.primary_key()), fk)),
                _ => self
                    .pk_value
                    .clone()
                    .map(|pk| (format!("{}.{}", target.table_name(), relation.foreign_key), pk)),
            };

            match key {
                Some((column, value)) => {
                    target.and_where(column, Op::Eq, value).find()?;
                }
                None => log::debug!(
                    "{}.{} has no key to resolve with, caching an empty record",
                    self.def.object_name(),
                    alias
                ),
            }
            self.related.insert(alias.to_string(), target);
        }

        self.related
            .get_mut(alias)
            .ok_or_else(|| OrmError::unknown_property(alias, self.def.object_name()))
    }

    /// Unexecuted query for the records of a `has_many` relation
    ///
    /// For a relation through a join table, the join table is joined on its far
    /// key and filtered on its foreign key.
    ///
    /// # Errors
    ///
    /// Returns `OrmError::UnknownProperty` if `alias` is not a `has_many`
    /// relation of this model.
    pub fn related_query(&self, alias: &str) -> Result<Record, OrmError> {
        let relation = match self.def.relation(alias) {
            Some(rel) if !rel.is_one_to_one() => rel,
            _ => return Err(OrmError::unknown_property(alias, self.def.object_name())),
        };

        let mut target = self.registry.factory(&relation.model)?;
        let pk = self
            .pk_value
            .clone()
            .unwrap_or_else(|| self.empty_value(self.def.primary_key()));

        match (&relation.through, &relation.far_key) {
            (Some(through), Some(far_key)) => {
                let target_key = format!("{}.{}", target.table_name(), target.primary_key());
                target
                    .join(through.as_str(), JoinKind::Inner)
                    .on(format!("{}.{}", through, far_key), Op::Eq, target_key)
                    .and_where(format!("{}.{}", through, relation.foreign_key), Op::Eq, pk);
            }
            _ => {
                let column = format!("{}.{}", target.table_name(), relation.foreign_key);
                target.and_where(column, Op::Eq, pk);
            }
        }
        Ok(target)
    }
}
