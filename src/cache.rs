use std::any::Any;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::error::ClimateError;

type Entry = Arc<dyn Any + Send + Sync>;

/// No shard lock is held while a loader runs, so loaders may read other keys. When two
/// callers miss the same key at once both load and the first stored value is kept.
#[derive(Default)]
pub struct DatasetCache {
    entries: DashMap<String, Entry>,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_try_insert_with<T, F>(&self, key: &str, load: F) -> Result<Arc<T>, ClimateError>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> Result<T, ClimateError>,
    {
        let hit = self.entries.get(key).map(|entry| entry.value().clone());
        if let Some(entry) = hit {
            debug!(dataset = key, "cache hit");
            return downcast(key, entry);
        }

        debug!(dataset = key, "cache miss");
        let loaded: Entry = Arc::new(load()?);
        let stored = self
            .entries
            .entry(key.to_string())
            .or_insert(loaded)
            .value()
            .clone();
        downcast(key, stored)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn downcast<T: Any + Send + Sync>(key: &str, entry: Entry) -> Result<Arc<T>, ClimateError> {
    entry
        .downcast::<T>()
        .map_err(|_| ClimateError::CacheType(key.to_string()))
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn loader_runs_once_per_key() {
        let cache = DatasetCache::new();
        let calls = Cell::new(0);
        let load = || {
            calls.set(calls.get() + 1);
            Ok(vec![1.0, 2.0])
        };
        let first = cache.get_or_try_insert_with("co2-latest", load).unwrap();
        let second = cache
            .get_or_try_insert_with("co2-latest", || -> Result<Vec<f64>, ClimateError> {
                calls.set(calls.get() + 1);
                Ok(Vec::new())
            })
            .unwrap();
        assert_eq!(calls.get(), 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn errors_are_not_cached() {
        let cache = DatasetCache::new();
        let err = cache
            .get_or_try_insert_with::<u32, _>("snow", || Err(ClimateError::Http("down".to_string())))
            .unwrap_err();
        assert_matches!(err, ClimateError::Http(_));
        assert!(!cache.contains("snow"));
        let value = cache.get_or_try_insert_with("snow", || Ok(7u32)).unwrap();
        assert_eq!(*value, 7);
    }

    #[test]
    fn type_mismatch_is_reported() {
        let cache = DatasetCache::new();
        cache.get_or_try_insert_with("ph", || Ok(1u32)).unwrap();
        let err = cache
            .get_or_try_insert_with("ph", || Ok("text".to_string()))
            .unwrap_err();
        assert_matches!(err, ClimateError::CacheType(ref key) if key == "ph");
    }

    #[test]
    fn loaders_may_read_other_keys() {
        let cache = DatasetCache::new();
        let total = cache
            .get_or_try_insert_with("overview", || {
                let part = cache.get_or_try_insert_with("part", || Ok(20u32))?;
                Ok(*part + 1)
            })
            .unwrap();
        assert_eq!(*total, 21);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn concurrent_misses_share_first_value() {
        let cache = DatasetCache::new();
        let values: Vec<Arc<u32>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4u32)
                .map(|idx| {
                    let cache = &cache;
                    scope.spawn(move || cache.get_or_try_insert_with("sea-ice", || Ok(idx)).unwrap())
                })
                .collect();
            handles.into_iter().map(|handle| handle.join().unwrap()).collect()
        });
        assert!(values.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
        assert_eq!(cache.len(), 1);
    }
}
