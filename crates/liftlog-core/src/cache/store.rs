//! Persistence backends for the query cache.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::debug;

use super::CachedData;

/// Subdirectory of the user cache directory holding query files
const QUERIES_DIR: &str = "queries";

/// Persistent backing for cached queries, keyed by the string form of a
/// [`super::CacheKey`].
///
/// Errors are returned to the cache, which logs them and carries on with
/// its in-memory state. A store must never be the reason a read fails.
pub trait CacheStore: Send {
    /// Load an entry, or None when the key was never stored.
    fn load(&self, key: &str) -> Result<Option<CachedData<Value>>>;

    /// Insert or overwrite an entry.
    fn store(&mut self, key: &str, entry: &CachedData<Value>) -> Result<()>;

    /// Remove an entry. Removing a missing key is not an error.
    fn remove(&mut self, key: &str) -> Result<()>;

    /// Every stored key, used for prefix invalidation.
    fn keys(&self) -> Result<Vec<String>>;

    /// Remove every entry.
    fn clear(&mut self) -> Result<()>;
}

// ============================================================================
// File store
// ============================================================================

/// One JSON file per key under `<cache dir>/queries/`.
///
/// File names escape every byte outside `[A-Za-z0-9-]` as `_xx` so they can
/// be decoded back into keys.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(cache_dir: &Path) -> Result<Self> {
        let dir = cache_dir.join(QUERIES_DIR);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create cache directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", encode_file_name(key)))
    }
}

impl CacheStore for FileStore {
    fn load(&self, key: &str) -> Result<Option<CachedData<Value>>> {
        let path = self.path(key);
        if !path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read cache file: {}", key))?;
        let cached = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse cache file: {}", key))?;
        Ok(Some(cached))
    }

    fn store(&mut self, key: &str, entry: &CachedData<Value>) -> Result<()> {
        let contents = serde_json::to_string(entry)?;
        std::fs::write(self.path(key), contents)
            .with_context(|| format!("Failed to write cache file: {}", key))?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let path = self.path(key);
        if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to remove cache file: {}", key))?;
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let Some(stem) = path
                .extension()
                .filter(|ext| *ext == "json")
                .and(path.file_stem())
                .and_then(|s| s.to_str())
            else {
                continue;
            };
            match decode_file_name(stem) {
                Some(key) => keys.push(key),
                None => debug!(file = %path.display(), "Skipping unrecognized cache file"),
            }
        }
        Ok(keys)
    }

    fn clear(&mut self) -> Result<()> {
        for key in self.keys()? {
            self.remove(&key)?;
        }
        Ok(())
    }
}

fn encode_file_name(key: &str) -> String {
    let mut out = String::with_capacity(key.len() * 2);
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            out.push(byte as char);
        } else {
            out.push_str(&format!("_{:02x}", byte));
        }
    }
    out
}

fn decode_file_name(name: &str) -> Option<String> {
    let bytes = name.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'_' {
            let hex = name.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

// ============================================================================
// Memory store
// ============================================================================

/// Non-persistent store, for tests and for running without a cache dir.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, CachedData<Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<CachedData<Value>>> {
        Ok(self.entries.get(key).cloned())
    }

    fn store(&mut self, key: &str, entry: &CachedData<Value>) -> Result<()> {
        self.entries.insert(key.to_string(), entry.clone());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.entries.keys().cloned().collect())
    }

    fn clear(&mut self) -> Result<()> {
        self.entries.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_file_name_encoding() {
        let key = r#"["workout-exercises","a1 b"]"#;
        let encoded = encode_file_name(key);
        assert!(encoded
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert_eq!(decode_file_name(&encoded).as_deref(), Some(key));
        assert_eq!(decode_file_name("_zz"), None);
        assert_eq!(decode_file_name("_2"), None);
    }

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path()).unwrap();
        let key = r#"["workouts","u1"]"#;
        assert!(store.load(key).unwrap().is_none());

        let entry = CachedData::new(json!([{"id": "w1"}]));
        store.store(key, &entry).unwrap();
        assert_eq!(store.load(key).unwrap(), Some(entry));
        assert_eq!(store.keys().unwrap(), vec![key.to_string()]);

        store.remove(key).unwrap();
        store.remove(key).unwrap();
        assert!(store.load(key).unwrap().is_none());
    }

    #[test]
    fn test_file_store_survives_reopen_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut store = FileStore::new(dir.path()).unwrap();
            store.store(r#"["exercises"]"#, &CachedData::new(json!([]))).unwrap();
            store.store(r#"["workouts","u1"]"#, &CachedData::new(json!([]))).unwrap();
        }

        let mut store = FileStore::new(dir.path()).unwrap();
        let mut keys = store.keys().unwrap();
        keys.sort();
        assert_eq!(keys, vec![r#"["exercises"]"#, r#"["workouts","u1"]"#]);

        store.clear().unwrap();
        assert!(store.keys().unwrap().is_empty());
    }

    #[test]
    fn test_file_store_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();
        let key = r#"["exercises"]"#;
        std::fs::write(store.path(key), "{not json").unwrap();
        assert!(store.load(key).is_err());
    }
}
