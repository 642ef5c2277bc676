//! Memo cache for secondary config values.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::OnceCell;
use tracing::debug;

use super::ConfigValue;
use crate::Error;

/// Shared `filename -> value` cache for secondary configs.
///
/// Handles are cheap to clone and all clones see the same entries. Every
/// context produced from one bootstrap holds a handle to the same cache, so a
/// filename is evaluated at most once no matter which copy asks for it.
///
/// Each filename owns its own once-cell: concurrent first requests for the same
/// filename run the loader once and the others wait for its result, while
/// requests for different filenames never block each other. Entries are never
/// evicted.
#[derive(Clone, Default)]
pub struct ConfigCache {
    entries: Arc<DashMap<String, Arc<OnceCell<ConfigValue>>>>,
}

impl ConfigCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached value for `filename`, running `load` on a miss.
    ///
    /// A failed `load` stores nothing, so a later call evaluates again.
    /// Calling this for the same filename from inside its own `load` blocks
    /// forever.
    pub fn get_or_load<F>(&self, filename: &str, load: F) -> Result<ConfigValue, Error>
    where
        F: FnOnce() -> Result<ConfigValue, Error>,
    {
        let cell = self.cell(filename);

        if let Some(value) = cell.get() {
            debug!(filename, "config cache hit");
            return Ok(value.clone());
        }

        let result = cell.get_or_try_init(|| {
            debug!(filename, "config cache miss, evaluating source");
            load()
        });
        match result {
            Ok(value) => Ok(value.clone()),
            Err(e) => {
                self.forget_empty(filename, &cell);
                Err(e)
            }
        }
    }

    /// Returns the cached value for `filename` without loading anything.
    pub fn get(&self, filename: &str) -> Option<ConfigValue> {
        self.entries
            .get(filename)
            .and_then(|cell| cell.get().cloned())
    }

    /// True when `filename` has been loaded successfully.
    pub fn contains(&self, filename: &str) -> bool {
        self.get(filename).is_some()
    }

    /// Number of filenames holding a value.
    pub fn len(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.value().get().is_some())
            .count()
    }

    /// True when no filename holds a value yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when both handles point at the same cache.
    pub fn same_cache(&self, other: &ConfigCache) -> bool {
        Arc::ptr_eq(&self.entries, &other.entries)
    }

    fn cell(&self, filename: &str) -> Arc<OnceCell<ConfigValue>> {
        if let Some(cell) = self.entries.get(filename) {
            return Arc::clone(&cell);
        }
        // The shard guard is dropped at the end of this statement, before
        // `load` runs, so loaders may request other filenames.
        Arc::clone(&self.entries.entry(filename.to_owned()).or_default())
    }

    /// Drops the empty cell left behind by a failed load.
    ///
    /// Only the map and `cell` may hold it: a caller still waiting on the same
    /// cell will retry the load into it, so it has to stay reachable.
    fn forget_empty(&self, filename: &str, cell: &Arc<OnceCell<ConfigValue>>) {
        self.entries.remove_if(filename, |_, current| {
            Arc::ptr_eq(current, cell)
                && current.get().is_none()
                && Arc::strong_count(current) == 2
        });
    }
}

impl fmt::Debug for ConfigCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigCache")
            .field("entries", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::thread;

    #[test]
    fn test_loads_once_per_filename() {
        let cache = ConfigCache::new();
        let calls = AtomicUsize::new(0);
        let load = || -> Result<ConfigValue, Error> {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(ConfigValue::new(7_i64))
        };

        let first = cache.get_or_load("db.toml", load).unwrap();
        let second = cache.get_or_load("db.toml", load).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(ConfigValue::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_failed_load_is_not_cached() {
        let cache = ConfigCache::new();

        let err = cache
            .get_or_load("mail.toml", || {
                Err(Error::MissingConfigFile("mail.toml".into()))
            })
            .unwrap_err();
        assert!(matches!(err, Error::MissingConfigFile(_)));
        assert!(!cache.contains("mail.toml"));
        assert!(cache.is_empty());
        assert_eq!(cache.entries.len(), 0);

        let value = cache
            .get_or_load("mail.toml", || Ok(ConfigValue::new(String::from("smtp"))))
            .unwrap();
        assert_eq!(value.downcast::<String>().unwrap().as_str(), "smtp");
    }

    #[test]
    fn test_repeated_misses_leave_no_entries() {
        let cache = ConfigCache::new();

        for i in 0..100 {
            let filename = format!("optional-{i}.toml");
            let result = cache.get_or_load(&filename, || {
                Err(Error::MissingConfigFile(filename.clone().into()))
            });
            assert!(result.is_err());
        }

        assert_eq!(cache.entries.len(), 0);
    }

    #[test]
    fn test_clones_share_entries() {
        let cache = ConfigCache::new();
        let other = cache.clone();
        cache
            .get_or_load("a.toml", || Ok(ConfigValue::new(1_u8)))
            .unwrap();

        assert!(other.contains("a.toml"));
        assert!(cache.same_cache(&other));
        assert!(!cache.same_cache(&ConfigCache::new()));
    }

    #[test]
    fn test_concurrent_first_access_evaluates_once() {
        const THREADS: usize = 8;
        let cache = ConfigCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(THREADS));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let cache = cache.clone();
                let calls = Arc::clone(&calls);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    cache
                        .get_or_load("shared.toml", || {
                            calls.fetch_add(1, Ordering::SeqCst);
                            thread::sleep(std::time::Duration::from_millis(20));
                            Ok(ConfigValue::new(String::from("value")))
                        })
                        .unwrap()
                })
            })
            .collect();

        let values: Vec<ConfigValue> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(values.windows(2).all(|w| ConfigValue::ptr_eq(&w[0], &w[1])));
    }

    #[test]
    fn test_loader_may_request_other_filenames() {
        let cache = ConfigCache::new();
        let outer = cache
            .get_or_load("outer.toml", || {
                let inner = cache.get_or_load("inner.toml", || Ok(ConfigValue::new(2_u32)))?;
                Ok(ConfigValue::new(*inner.downcast::<u32>().unwrap() + 1))
            })
            .unwrap();

        assert_eq!(*outer.downcast::<u32>().unwrap(), 3);
        assert_eq!(cache.len(), 2);
    }
}
