//! Eager loading through `with()`.
//!
//! `with("author:country")` joins every one-to-one relation along the path into
//! the record's next select. The target table of each step is aliased to its path
//! (`author`, `author:country`) and its columns are selected as `<path>:<column>`,
//! which is how result rows get routed back into nested related records.

use crate::error::OrmError;
use crate::query::{JoinKind, Op, QueryCall};
use crate::record::Record;
use crate::relation::{RelationDef, RelationType};

/// What joining the last step of a path needs to know
struct JoinStep {
    relation: RelationDef,
    parent_primary_key: String,
    target_table: String,
    target_primary_key: String,
    target_columns: Vec<String>,
}

impl Record {
    /// Join the one-to-one relation path `path` (segments separated by `:`) into
    /// the next select
    ///
    /// Unknown or to-many segments make the whole call a no-op, and a path that
    /// was already joined for the pending statement is not joined again. Parent
    /// paths are joined first.
    pub fn with(&mut self, path: &str) -> Result<&mut Self, OrmError> {
        if self.pending.has_with(path) {
            return Ok(self);
        }

        let aliases: Vec<&str> = path.split(':').collect();
        let Some(step) = self.join_step(&aliases)? else {
            log::warn!(
                "Ignoring with({}) on {}: not a path of one-to-one relations",
                path,
                self.def.object_name()
            );
            return Ok(self);
        };

        let parent_path = aliases[..aliases.len() - 1].join(":");
        let parent = if parent_path.is_empty() {
            self.def.table_name().to_string()
        } else {
            if !self.pending.has_with(&parent_path) {
                self.with(&parent_path)?;
            }
            parent_path
        };

        self.pending.mark_with(path);

        for column in &step.target_columns {
            self.pending.push(QueryCall::Select {
                column: format!("{}.{}", path, column),
                alias: Some(format!("{}:{}", path, column)),
            });
        }

        let (left, right) = match step.relation.rel_type {
            RelationType::BelongsTo => (
                format!("{}.{}", path, step.target_primary_key),
                format!("{}.{}", parent, step.relation.foreign_key),
            ),
            _ => (
                format!("{}.{}", parent, step.parent_primary_key),
                format!("{}.{}", path, step.relation.foreign_key),
            ),
        };

        log::debug!("{} joins {} as {}", self.def.object_name(), step.target_table, path);
        self.pending.push(QueryCall::Join {
            table: step.target_table,
            alias: Some(path.to_string()),
            kind: JoinKind::Left,
        });
        self.pending.push(QueryCall::On {
            left,
            op: Op::Eq,
            right,
        });
        Ok(self)
    }

    /// Walk `aliases` through cached (or freshly created, empty) related records
    fn join_step(&mut self, aliases: &[&str]) -> Result<Option<JoinStep>, OrmError> {
        let Some((first, rest)) = aliases.split_first() else {
            return Ok(None);
        };
        let relation = match self.def.relation(first) {
            Some(rel) if rel.is_one_to_one() => rel.clone(),
            _ => return Ok(None),
        };
        let parent_primary_key = self.def.primary_key().to_string();

        let Some(target) = self.related_slot(first)? else {
            return Ok(None);
        };
        if !rest.is_empty() {
            return target.join_step(rest);
        }

        Ok(Some(JoinStep {
            relation,
            parent_primary_key,
            target_table: target.table_name().to_string(),
            target_primary_key: target.primary_key().to_string(),
            target_columns: target.object.keys().cloned().collect(),
        }))
    }
}
