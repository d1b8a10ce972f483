//! Persisted session store: durable key/value strings.
//!
//! The store has no behavior of its own. The session and tenant managers
//! are its only readers and writers, and each owns a disjoint set of
//! [`keys`], so no cross-manager locking is needed.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::StoreError;

/// The keys the managers write.
pub mod keys {
    pub const ACCESS_TOKEN: &str = "access_token";
    pub const REFRESH_TOKEN: &str = "refresh_token";
    pub const USER: &str = "user_data";
    pub const CURRENT_TENANT: &str = "current_tenant";

    /// One-shot post-login redirect target, taken on callback completion.
    pub const CALLBACK_URL: &str = "auth_callback_url";

    /// The keys that together make up a restorable session.
    pub const SESSION: [&str; 3] = [ACCESS_TOKEN, REFRESH_TOKEN, USER];
}

/// A durable string key/value space.
///
/// Reads are infallible: a missing or unreadable value is simply absent.
/// Writes can fail; callers treat them as best-effort.
pub trait SessionStore: Send + Sync + 'static {
    fn get(&self, key: &str) -> Option<String>;

    /// # Errors
    /// Returns a [`StoreError`] if the value could not be made durable.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Removing an absent key is not an error.
    ///
    /// # Errors
    /// Returns a [`StoreError`] if the removal could not be made durable.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// A process-local store. Nothing survives a restart, which makes it the
/// right choice for tests and for embedding where the host persists
/// state itself.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `key` currently holds a value.
    pub fn contains(&self, key: &str) -> bool {
        lock(&self.entries).contains_key(key)
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.entries).is_empty()
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.entries).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        lock(&self.entries).insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        lock(&self.entries).remove(key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FileStore
// ---------------------------------------------------------------------------

/// A store backed by a single JSON object file.
///
/// The whole map is held in memory and rewritten on every change, via a
/// temporary file and a rename so a crash never leaves a half-written
/// file behind. Session state is a handful of short strings, so the
/// rewrite is cheap.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Opens (or prepares to create) the store at `path`.
    ///
    /// A missing file is an empty store. A file that isn't a JSON object
    /// of strings is treated as corrupt: it is discarded and the store
    /// starts empty, the same way a corrupt snapshot is handled.
    ///
    /// # Errors
    /// Returns [`StoreError::Io`] if the file exists but can't be read.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "store file is corrupt, starting empty"
                    );
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                BTreeMap::new()
            }
            Err(e) => return Err(StoreError::Io(e)),
        };
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let text =
            serde_json::to_string_pretty(entries).map_err(StoreError::Encode)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, text)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl SessionStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.entries).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = lock(&self.entries);
        entries.insert(key.to_string(), value.to_string());
        self.flush(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = lock(&self.entries);
        if entries.remove(key).is_none() {
            return Ok(());
        }
        self.flush(&entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_set_get_remove() {
        let store = MemoryStore::new();
        assert!(store.is_empty());

        store.set(keys::ACCESS_TOKEN, "a").unwrap();
        assert_eq!(store.get(keys::ACCESS_TOKEN).as_deref(), Some("a"));
        assert_eq!(store.len(), 1);

        store.remove(keys::ACCESS_TOKEN).unwrap();
        assert!(!store.contains(keys::ACCESS_TOKEN));
    }

    #[test]
    fn test_memory_store_remove_absent_is_ok() {
        let store = MemoryStore::new();
        assert!(store.remove("nothing").is_ok());
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        {
            let store = FileStore::open(&path).unwrap();
            store.set(keys::REFRESH_TOKEN, "r-1").unwrap();
            store.set(keys::USER, r#"{"id":"u"}"#).unwrap();
        }

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get(keys::REFRESH_TOKEN).as_deref(), Some("r-1"));
        assert_eq!(reopened.get(keys::USER).as_deref(), Some(r#"{"id":"u"}"#));
    }

    #[test]
    fn test_file_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();

        let store = FileStore::open(dir.path().join("absent.json")).unwrap();

        assert_eq!(store.get(keys::ACCESS_TOKEN), None);
    }

    #[test]
    fn test_file_store_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{ this is not json").unwrap();

        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.get(keys::ACCESS_TOKEN), None);

        // The next write replaces the corrupt file with a valid one.
        store.set(keys::ACCESS_TOKEN, "a").unwrap();
        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get(keys::ACCESS_TOKEN).as_deref(), Some("a"));
    }

    #[test]
    fn test_file_store_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/session.json");

        let store = FileStore::open(&path).unwrap();
        store.set(keys::CURRENT_TENANT, "{}").unwrap();

        assert!(path.exists());
    }

    #[test]
    fn test_file_store_remove_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let store = FileStore::open(&path).unwrap();
        store.set(keys::CALLBACK_URL, "/servers").unwrap();

        store.remove(keys::CALLBACK_URL).unwrap();

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get(keys::CALLBACK_URL), None);
    }
}
