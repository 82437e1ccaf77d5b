//! Serializable record snapshots.
//!
//! A snapshot keeps only what is needed to rebuild a record later: its values,
//! change set, flags and sorting. Relations and pending calls are left out, and
//! [`ModelRegistry::restore`](crate::model::ModelRegistry::restore) reloads loaded
//! records so a stale snapshot never outlives the row it came from.

use super::Record;
use crate::error::OrmError;
use crate::query::Direction;
use crate::value::{json_to_value, value_to_json};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordSnapshot {
    pub model: String,
    pub primary_key_value: Option<JsonValue>,
    pub object: IndexMap<String, JsonValue>,
    pub changed: Vec<String>,
    pub loaded: bool,
    pub saved: bool,
    pub sorting: Vec<(String, Direction)>,
}

impl Record {
    pub fn snapshot(&self) -> RecordSnapshot {
        RecordSnapshot {
            model: self.def.object_name().to_string(),
            primary_key_value: self.pk_value.as_ref().map(value_to_json),
            object: self
                .object
                .iter()
                .map(|(column, value)| (column.clone(), value_to_json(value)))
                .collect(),
            changed: self.changed.iter().cloned().collect(),
            loaded: self.loaded,
            saved: self.saved,
            sorting: self.sorting.clone(),
        }
    }

    /// Overwrite state from a snapshot of the same model
    pub(crate) fn apply_snapshot(&mut self, snapshot: RecordSnapshot) -> Result<(), OrmError> {
        if snapshot.model != self.def.object_name() {
            return Err(OrmError::invalid(format!(
                "snapshot of {} cannot be restored into {}",
                snapshot.model,
                self.def.object_name()
            )));
        }

        for (column, json) in &snapshot.object {
            let like = self.empty_value(column);
            self.object.insert(column.clone(), json_to_value(json, &like));
        }
        let pk_like = self.empty_value(self.def.primary_key());
        self.pk_value = snapshot
            .primary_key_value
            .as_ref()
            .map(|json| json_to_value(json, &pk_like))
            .filter(|value| !crate::value::is_null(value));
        self.changed = snapshot.changed.into_iter().collect::<IndexSet<_>>();
        self.loaded = snapshot.loaded && self.pk_value.is_some();
        self.saved = snapshot.saved;
        self.valid = false;
        self.sorting = snapshot.sorting;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::config::OrmConfig;
    use crate::model::{ModelDecl, ModelRegistry};
    use crate::query::{ColumnDefinition, Direction};
    use crate::test_helpers::MockExecutor;
    use sea_query::Value;
    use std::sync::Arc;

    #[test]
    fn test_snapshot_survives_json() {
        let registry = ModelRegistry::builder(Arc::new(MockExecutor::new()))
            .config(OrmConfig {
                reload_on_wakeup: false,
                ..OrmConfig::default()
            })
            .model(
                ModelDecl::new("post")
                    .column("id", ColumnDefinition::of_type("Integer"))
                    .column("title", ColumnDefinition::of_type("Text"))
                    .sorting("title", Direction::Asc),
            )
            .build()
            .unwrap();

        let mut post = registry.factory("post").unwrap();
        post.set("title", "Draft").unwrap();
        let encoded = serde_json::to_string(&post.snapshot()).unwrap();

        let restored = registry.restore(serde_json::from_str(&encoded).unwrap()).unwrap();
        assert_eq!(restored.value("title").unwrap(), &Value::from("Draft"));
        assert!(restored.is_changed("title"));
        assert!(!restored.loaded());
        assert_eq!(restored.sorting(), &[("title".to_string(), Direction::Asc)]);
    }
}
