//! Key-value store backends.
//!
//! - [`InMemoryStore`]: process-local map, the default when no directory is configured
//! - [`FileStore`]: one `<key>.json` file per entry inside a directory

use composable_state_core::storage::{KeyValueStore, StorageError};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{PoisonError, RwLock};

/// In-memory key-value store
///
/// # Example
///
/// ```
/// use composable_state_core::storage::KeyValueStore;
/// use composable_state_runtime::InMemoryStore;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let store = InMemoryStore::new();
/// store.set("todos", "[]")?;
/// assert_eq!(store.get("todos")?.as_deref(), Some("[]"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl InMemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the store holds no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for InMemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

/// File-backed key-value store
///
/// Each key maps to `<dir>/<key>.json`. Keys must be a single plain path
/// component; anything that could escape the directory is rejected.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `dir`, creating the directory if needed
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Directory holding the entries
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let mut components = Path::new(key).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) if !key.contains(['/', '\\']) => {
                let mut file = name.to_os_string();
                file.push(".json");
                Ok(self.dir.join(file))
            },
            _ => Err(StorageError::InvalidKey(key.to_string())),
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        // Write-then-rename so readers never observe a truncated entry
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)?;
        if let Err(error) = std::fs::rename(&tmp, &path) {
            if let Err(cleanup) = std::fs::remove_file(&tmp) {
                tracing::warn!(key, path = %tmp.display(), %cleanup, "Failed to remove temp file");
            }
            return Err(error.into());
        }
        tracing::trace!(key, path = %path.display(), "Wrote storage entry");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error.into()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_roundtrip_and_remove() {
        let store = InMemoryStore::new();
        assert!(store.is_empty());
        assert_eq!(store.get("missing").unwrap(), None);

        store.set("todos", "[1]").unwrap();
        store.set("todos", "[2]").unwrap();
        assert_eq!(store.get("todos").unwrap().as_deref(), Some("[2]"));
        assert_eq!(store.len(), 1);

        store.remove("todos").unwrap();
        store.remove("todos").unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_file_store_persists_between_instances() {
        let dir = tempfile::tempdir().unwrap();

        let store = FileStore::open(dir.path()).unwrap();
        store.set("todos", r#"[{"id":1}]"#).unwrap();
        assert!(dir.path().join("todos.json").exists());

        let reopened = FileStore::open(dir.path()).unwrap();
        assert_eq!(
            reopened.get("todos").unwrap().as_deref(),
            Some(r#"[{"id":1}]"#)
        );
    }

    #[test]
    fn test_file_store_failed_rename_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        // A non-empty directory at the target path makes the rename fail
        std::fs::create_dir_all(dir.path().join("todos.json").join("occupied")).unwrap();

        assert!(matches!(store.set("todos", "[]"), Err(StorageError::Io(_))));
        assert!(!dir.path().join("todos.json.tmp").exists());
    }

    #[test]
    fn test_file_store_missing_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();

        assert_eq!(store.get("nothing").unwrap(), None);
        store.remove("nothing").unwrap();
    }

    #[test]
    fn test_file_store_rejects_escaping_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();

        for key in ["../outside", "a/b", "", "..", "/etc/passwd"] {
            assert!(
                matches!(store.set(key, "x"), Err(StorageError::InvalidKey(_))),
                "key {key:?} should be rejected"
            );
        }
    }
}
