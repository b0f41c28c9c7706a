//! Key-value store mocks
//!
//! - [`FailingStore`]: every operation errors, for exercising fallback paths
//! - [`RecordingStore`]: in-memory store that keeps a log of every write

use composable_state_core::storage::{KeyValueStore, StorageError};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Store whose every operation fails with [`StorageError::Unavailable`]
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingStore;

impl KeyValueStore for FailingStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::Unavailable(format!("read of {key} refused")))
    }

    fn set(&self, key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable(format!("write of {key} refused")))
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable(format!("removal of {key} refused")))
    }
}

#[derive(Debug, Default)]
struct Recorded {
    entries: HashMap<String, String>,
    writes: Vec<(String, String)>,
}

/// In-memory store that records every `set` call in order
///
/// # Example
///
/// ```
/// use composable_state_core::storage::KeyValueStore;
/// use composable_state_testing::RecordingStore;
///
/// let store = RecordingStore::with_entry("todos", "[]");
/// let _ = store.set("todos", "[1]");
/// assert_eq!(store.write_count(), 1);
/// assert_eq!(store.last_write("todos").as_deref(), Some("[1]"));
/// ```
#[derive(Debug, Default)]
pub struct RecordingStore {
    inner: Mutex<Recorded>,
}

impl RecordingStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-seeded with one entry (not counted as a write)
    #[must_use]
    pub fn with_entry(key: &str, value: &str) -> Self {
        let store = Self::new();
        store
            .lock()
            .entries
            .insert(key.to_string(), value.to_string());
        store
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Recorded> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of `set` calls so far
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.lock().writes.len()
    }

    /// The value most recently written under `key`
    #[must_use]
    pub fn last_write(&self, key: &str) -> Option<String> {
        self.lock()
            .writes
            .iter()
            .rev()
            .find(|(written, _)| written == key)
            .map(|(_, value)| value.clone())
    }
}

impl KeyValueStore for RecordingStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock().entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut recorded = self.lock();
        recorded.entries.insert(key.to_string(), value.to_string());
        recorded.writes.push((key.to_string(), value.to_string()));
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.lock().entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failing_store_fails_everything() {
        let store = FailingStore;
        assert!(store.get("k").is_err());
        assert!(store.set("k", "v").is_err());
        assert!(store.remove("k").is_err());
    }

    #[test]
    fn test_recording_store_tracks_writes() {
        let store = RecordingStore::with_entry("k", "seed");
        assert_eq!(store.write_count(), 0);
        assert!(matches!(store.get("k"), Ok(Some(value)) if value == "seed"));

        assert!(store.set("k", "one").is_ok());
        assert!(store.set("k", "two").is_ok());
        assert_eq!(store.write_count(), 2);
        assert_eq!(store.last_write("k").as_deref(), Some("two"));
        assert_eq!(store.last_write("other"), None);
    }
}
