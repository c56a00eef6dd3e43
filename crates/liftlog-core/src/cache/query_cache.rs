use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Result;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::{CacheKey, CacheStore, CachedData, MemoryStore};

/// Which entries an invalidation removes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invalidate {
    Key(CacheKey),
    Keys(Vec<CacheKey>),
    /// Every key whose first part matches
    Prefix(String),
    All,
}

impl Invalidate {
    fn matches(&self, key: &CacheKey) -> bool {
        match self {
            Invalidate::Key(k) => k == key,
            Invalidate::Keys(keys) => keys.contains(key),
            Invalidate::Prefix(prefix) => key.prefix() == Some(prefix.as_str()),
            Invalidate::All => true,
        }
    }
}

/// Usage counters, shown in debug logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
    /// Entries currently held in memory
    pub entries: usize,
}

struct Inner {
    entries: HashMap<CacheKey, CachedData<Value>>,
    store: Box<dyn CacheStore>,
    hits: u64,
    misses: u64,
    writes: u64,
}

/// Process-wide query cache.
///
/// Clone is cheap: every clone shares the same entries. Values are kept as
/// JSON snapshots and every read deserializes a fresh owned copy, so callers
/// can mutate what they get without touching the cache.
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<Mutex<Inner>>,
}

impl QueryCache {
    pub fn new(store: impl CacheStore + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                entries: HashMap::new(),
                store: Box::new(store),
                hits: 0,
                misses: 0,
                writes: 0,
            })),
        }
    }

    /// Cache with no persistence
    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic while holding the lock leaves plain data behind; keep using it.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Cached value for `key`, without touching the network
    pub fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        self.get_entry(key).map(|entry| entry.data)
    }

    /// Cached value along with when it was fetched
    pub fn get_entry<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<CachedData<T>> {
        let snapshot = self.snapshot(key);
        let Some(snapshot) = snapshot else {
            self.lock().misses += 1;
            return None;
        };

        match snapshot.decode::<T>() {
            Ok(entry) => {
                self.lock().hits += 1;
                Some(entry)
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Cached value has unexpected shape, dropping it");
                self.invalidate(Invalidate::Key(key.clone()));
                self.lock().misses += 1;
                None
            }
        }
    }

    /// Memory first, then the persistent store (promoting a store hit)
    fn snapshot(&self, key: &CacheKey) -> Option<CachedData<Value>> {
        let mut inner = self.lock();
        if let Some(entry) = inner.entries.get(key) {
            return Some(entry.clone());
        }

        match inner.store.load(&key.to_string()) {
            Ok(Some(entry)) => {
                debug!(key = %key, "Cache entry loaded from store");
                inner.entries.insert(key.clone(), entry.clone());
                Some(entry)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to load cache entry from store");
                None
            }
        }
    }

    /// Insert or overwrite the value for `key`
    pub fn set<T: Serialize>(&self, key: &CacheKey, value: &T) {
        let data = match serde_json::to_value(value) {
            Ok(data) => data,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to serialize value for cache");
                return;
            }
        };
        let entry = CachedData::new(data);

        let mut inner = self.lock();
        if let Err(e) = inner.store.store(&key.to_string(), &entry) {
            warn!(key = %key, error = %e, "Failed to persist cache entry");
        }
        inner.entries.insert(key.clone(), entry);
        inner.writes += 1;
    }

    /// Remove matching entries from memory and the persistent store
    pub fn invalidate(&self, scope: Invalidate) {
        let mut inner = self.lock();

        if scope == Invalidate::All {
            inner.entries.clear();
            if let Err(e) = inner.store.clear() {
                warn!(error = %e, "Failed to clear cache store");
            }
            debug!("Cache cleared");
            return;
        }

        inner.entries.retain(|key, _| !scope.matches(key));

        let stored: Vec<String> = match &scope {
            Invalidate::Key(key) => vec![key.to_string()],
            Invalidate::Keys(keys) => keys.iter().map(ToString::to_string).collect(),
            _ => match inner.store.keys() {
                Ok(keys) => keys
                    .into_iter()
                    .filter(|k| CacheKey::parse(k).is_some_and(|key| scope.matches(&key)))
                    .collect(),
                Err(e) => {
                    warn!(error = %e, "Failed to list cache store keys");
                    Vec::new()
                }
            },
        };
        for key in &stored {
            if let Err(e) = inner.store.remove(key) {
                warn!(key = %key, error = %e, "Failed to remove cache entry from store");
            }
        }
        debug!(?scope, "Cache invalidated");
    }

    /// Return the cached value, or await `producer`, cache its value and
    /// return it. A failing producer leaves the cache untouched.
    ///
    /// The lock is never held while the producer runs, so two concurrent
    /// misses on the same key may both call their producers; the last one
    /// to finish wins.
    pub async fn fetch_or_populate<T, F, Fut>(&self, key: &CacheKey, producer: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(value) = self.get(key) {
            debug!(key = %key, "Cache hit");
            return Ok(value);
        }

        debug!(key = %key, "Cache miss, fetching");
        let value = producer().await?;
        self.set(key, &value);
        Ok(value)
    }

    /// Age of an entry for display, e.g. "5m ago"
    pub fn age_display(&self, key: &CacheKey) -> Option<String> {
        self.snapshot(key).map(|entry| entry.age_display())
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.snapshot(key).is_some()
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            writes: inner.writes,
            entries: inner.entries.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::FileStore;
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Store whose every operation fails
    struct BrokenStore;

    impl CacheStore for BrokenStore {
        fn load(&self, _key: &str) -> Result<Option<CachedData<Value>>> {
            Err(anyhow!("disk on fire"))
        }
        fn store(&mut self, _key: &str, _entry: &CachedData<Value>) -> Result<()> {
            Err(anyhow!("disk on fire"))
        }
        fn remove(&mut self, _key: &str) -> Result<()> {
            Err(anyhow!("disk on fire"))
        }
        fn keys(&self) -> Result<Vec<String>> {
            Err(anyhow!("disk on fire"))
        }
        fn clear(&mut self) -> Result<()> {
            Err(anyhow!("disk on fire"))
        }
    }

    // ===== get / set =====

    #[test]
    fn test_get_miss_and_hit() {
        let cache = QueryCache::in_memory();
        let key = CacheKey::exercises();
        assert_eq!(cache.get::<Vec<String>>(&key), None);

        cache.set(&key, &vec!["Squat".to_string()]);
        assert_eq!(cache.get::<Vec<String>>(&key), Some(vec!["Squat".to_string()]));

        cache.set(&key, &vec!["Deadlift".to_string()]);
        let stats = cache.stats();
        assert_eq!(
            stats,
            CacheStats {
                hits: 1,
                misses: 1,
                writes: 2,
                entries: 1
            }
        );
    }

    #[test]
    fn test_reads_are_owned_copies() {
        let cache = QueryCache::in_memory();
        let key = CacheKey::workouts("u1");
        cache.set(&key, &vec![1, 2]);

        let mut copy: Vec<i32> = cache.get(&key).unwrap();
        copy.push(3);
        assert_eq!(cache.get::<Vec<i32>>(&key), Some(vec![1, 2]));
    }

    #[test]
    fn test_clones_share_entries() {
        let cache = QueryCache::in_memory();
        let other = cache.clone();
        other.set(&CacheKey::exercises(), &"shared");
        assert_eq!(cache.get::<String>(&CacheKey::exercises()).as_deref(), Some("shared"));
    }

    #[test]
    fn test_wrong_shape_is_a_miss() {
        let cache = QueryCache::in_memory();
        let key = CacheKey::exercises();
        cache.set(&key, &"not a list");
        assert_eq!(cache.get::<Vec<u32>>(&key), None);
        assert!(!cache.contains(&key));
    }

    #[test]
    fn test_broken_store_never_fails_reads() {
        let cache = QueryCache::new(BrokenStore);
        let key = CacheKey::exercises();
        assert_eq!(cache.get::<u32>(&key), None);
        cache.set(&key, &7u32);
        assert_eq!(cache.get::<u32>(&key), Some(7));
        cache.invalidate(Invalidate::Prefix("exercises".into()));
        cache.invalidate(Invalidate::All);
        assert_eq!(cache.get::<u32>(&key), None);
    }

    // ===== invalidate =====

    #[test]
    fn test_invalidate_scopes() {
        let cache = QueryCache::in_memory();
        let detail_a = CacheKey::workout_detail("a");
        let detail_b = CacheKey::workout_detail("b");
        let workouts = CacheKey::workouts("u1");
        let exercises = CacheKey::exercises();
        for key in [&detail_a, &detail_b, &workouts, &exercises] {
            cache.set(key, &1);
        }

        cache.invalidate(Invalidate::Key(detail_a.clone()));
        assert!(!cache.contains(&detail_a));
        assert!(cache.contains(&detail_b));

        cache.invalidate(Invalidate::Prefix("workout-exercises".into()));
        assert!(!cache.contains(&detail_b));
        assert!(cache.contains(&workouts));

        cache.invalidate(Invalidate::Keys(vec![workouts.clone()]));
        assert!(!cache.contains(&workouts));
        assert!(cache.contains(&exercises));

        cache.invalidate(Invalidate::All);
        assert!(!cache.contains(&exercises));
    }

    #[test]
    fn test_persisted_entries_reload_and_invalidate() {
        let dir = tempfile::tempdir().unwrap();
        let key = CacheKey::workout_detail("w1");
        {
            let cache = QueryCache::new(FileStore::new(dir.path()).unwrap());
            cache.set(&key, &vec!["row"]);
            cache.set(&CacheKey::workout_detail("w2"), &vec!["row"]);
        }

        // A fresh process sees the stored entry
        let cache = QueryCache::new(FileStore::new(dir.path()).unwrap());
        assert_eq!(cache.get::<Vec<String>>(&key), Some(vec!["row".to_string()]));

        // Prefix invalidation reaches entries that were never loaded into memory
        cache.invalidate(Invalidate::Prefix("workout-exercises".into()));
        let cache = QueryCache::new(FileStore::new(dir.path()).unwrap());
        assert!(!cache.contains(&key));
        assert!(!cache.contains(&CacheKey::workout_detail("w2")));
    }

    // ===== fetch_or_populate =====

    #[tokio::test]
    async fn test_warm_key_skips_producer() {
        let cache = QueryCache::in_memory();
        let key = CacheKey::new(["workouts"]);
        cache.set(&key, &vec!["w1", "w2"]);

        let calls = AtomicUsize::new(0);
        let value: Vec<String> = cache
            .fetch_or_populate(&key, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(vec!["w1".to_string(), "w2".to_string(), "w3".to_string()])
            })
            .await
            .unwrap();

        assert_eq!(value, vec!["w1", "w2"]);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invalidate_then_fetch_calls_producer() {
        let cache = QueryCache::in_memory();
        let key = CacheKey::new(["workouts"]);
        cache.set(&key, &vec!["w1", "w2"]);
        cache.invalidate(Invalidate::Key(key.clone()));

        let calls = AtomicUsize::new(0);
        let value: Vec<String> = cache
            .fetch_or_populate(&key, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(vec!["w1".to_string(), "w2".to_string(), "w3".to_string()])
            })
            .await
            .unwrap();

        assert_eq!(value.len(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.get::<Vec<String>>(&key).map(|v| v.len()), Some(3));
    }

    #[tokio::test]
    async fn test_producer_failure_leaves_cache_unchanged() {
        let cache = QueryCache::in_memory();
        let key = CacheKey::exercises();

        let result: Result<Vec<String>> = cache
            .fetch_or_populate(&key, || async { Err(anyhow!("offline")) })
            .await;

        assert_eq!(result.unwrap_err().to_string(), "offline");
        assert!(!cache.contains(&key));
    }

    #[test]
    fn test_decode_snapshot() {
        let entry = CachedData::new(serde_json::json!([1, 2]));
        let decoded: CachedData<Vec<u8>> = entry.clone().decode().unwrap();
        assert_eq!(decoded.data, vec![1, 2]);
        assert_eq!(decoded.cached_at, entry.cached_at);
    }
}
