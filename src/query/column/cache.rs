//! Shared column metadata cache.
//!
//! One entry per model name. The first lookup for a model runs the loader (schema
//! introspection); concurrent lookups for the same model wait on the same
//! `OnceCell` so the introspector is called once. Entries live until invalidated,
//! or until the optional TTL passes.

use super::definition::ColumnDefinition;
use crate::executor::LifeError;
use dashmap::DashMap;
use indexmap::IndexMap;
use once_cell::sync::OnceCell;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Column name to definition, in table order
pub type ColumnMap = IndexMap<String, ColumnDefinition>;

#[derive(Debug)]
struct CachedColumns {
    loaded_at: Instant,
    columns: Arc<ColumnMap>,
}

/// Cache of column metadata keyed by model name
#[derive(Debug, Default)]
pub struct ColumnCache {
    entries: DashMap<String, Arc<OnceCell<CachedColumns>>>,
    ttl: Option<Duration>,
}

impl ColumnCache {
    /// Create a cache; `ttl = None` keeps entries until invalidated
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Columns for `model`, running `load` only if no live entry exists
    ///
    /// # Errors
    ///
    /// Returns the loader's error. A failed load leaves the entry empty so the
    /// next lookup retries.
    pub fn get_or_load<F>(&self, model: &str, load: F) -> Result<Arc<ColumnMap>, LifeError>
    where
        F: FnOnce() -> Result<ColumnMap, LifeError>,
    {
        let mut cell = self.cell(model);

        if let Some(cached) = cell.get() {
            if !self.is_expired(cached) {
                return Ok(Arc::clone(&cached.columns));
            }
            log::debug!("Column cache entry for {} expired", model);
            self.entries
                .remove_if(model, |_, current| Arc::ptr_eq(current, &cell));
            cell = self.cell(model);
        }

        let cached = cell.get_or_try_init(|| {
            let columns = load()?;
            log::info!("Loaded {} column(s) for model {}", columns.len(), model);
            Ok::<_, LifeError>(CachedColumns {
                loaded_at: Instant::now(),
                columns: Arc::new(columns),
            })
        })?;

        Ok(Arc::clone(&cached.columns))
    }

    /// Columns for `model` if already cached and live
    pub fn get(&self, model: &str) -> Option<Arc<ColumnMap>> {
        let cell = self.entries.get(model).map(|entry| Arc::clone(entry.value()))?;
        let cached = cell.get()?;
        if self.is_expired(cached) {
            return None;
        }
        Some(Arc::clone(&cached.columns))
    }

    /// Drop the entry for `model`; the next lookup reloads it
    pub fn invalidate(&self, model: &str) {
        self.entries.remove(model);
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of populated entries
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|entry| entry.value().get().is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn cell(&self, model: &str) -> Arc<OnceCell<CachedColumns>> {
        let entry = self
            .entries
            .entry(model.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()));
        Arc::clone(entry.value())
    }

    fn is_expired(&self, cached: &CachedColumns) -> bool {
        match self.ttl {
            Some(ttl) => cached.loaded_at.elapsed() >= ttl,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::thread;

    fn columns(names: &[&str]) -> ColumnMap {
        names
            .iter()
            .map(|name| (name.to_string(), ColumnDefinition::of_type("Integer")))
            .collect()
    }

    #[test]
    fn test_loads_once_per_model() {
        let cache = ColumnCache::new(None);
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let cols = cache
                .get_or_load("post", || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(columns(&["id", "title"]))
                })
                .unwrap();
            assert_eq!(cols.len(), 2);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_concurrent_first_population_collapses() {
        let cache = Arc::new(ColumnCache::new(None));
        let calls = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let calls = Arc::clone(&calls);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    cache
                        .get_or_load("user", || {
                            calls.fetch_add(1, Ordering::SeqCst);
                            thread::sleep(Duration::from_millis(20));
                            Ok(columns(&["id"]))
                        })
                        .unwrap()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap().len(), 1);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_load_is_retried() {
        let cache = ColumnCache::new(None);
        let err = cache
            .get_or_load("post", || Err(LifeError::Other("catalogue offline".into())))
            .unwrap_err();
        assert_eq!(err, LifeError::Other("catalogue offline".into()));
        assert!(cache.get("post").is_none());

        let cols = cache.get_or_load("post", || Ok(columns(&["id"]))).unwrap();
        assert_eq!(cols.len(), 1);
    }

    #[test]
    fn test_invalidate_forces_reload() {
        let cache = ColumnCache::new(None);
        cache.get_or_load("post", || Ok(columns(&["id"]))).unwrap();
        cache.invalidate("post");
        assert!(cache.get("post").is_none());

        let cols = cache
            .get_or_load("post", || Ok(columns(&["id", "title"])))
            .unwrap();
        assert_eq!(cols.len(), 2);
    }

    #[test]
    fn test_ttl_expiry_reloads() {
        let cache = ColumnCache::new(Some(Duration::from_millis(0)));
        cache.get_or_load("post", || Ok(columns(&["id"]))).unwrap();
        let cols = cache
            .get_or_load("post", || Ok(columns(&["id", "body"])))
            .unwrap();
        assert_eq!(cols.len(), 2);
    }
}
