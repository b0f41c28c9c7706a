//! Key-value text storage for container persistence.
//!
//! Containers that support persistence read one named entry when they are
//! constructed and overwrite the same entry after each mutation. The store
//! only deals in text; containers own their serialization format.
//!
//! Storage failures are never fatal to a container. Callers catch the
//! [`StorageError`], log it and fall back to their in-memory state.
//!
//! # Implementations
//!
//! - `InMemoryStore` and `FileStore` (in `composable-state-runtime`)
//! - `FailingStore` (in `composable-state-testing`): always errors

use thiserror::Error;

/// Errors that can occur during key-value store operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The key cannot be used by this store (e.g. it would escape its directory).
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    /// The backing store is not available.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// General I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Synchronous key-value store holding text entries.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` so they can be shared through an
/// `Arc<dyn KeyValueStore>` between a container's environment and the
/// effects it spawns.
pub trait KeyValueStore: Send + Sync {
    /// Read the entry stored under `key`.
    ///
    /// Returns `Ok(None)` when there is no such entry.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the store cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous entry.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the store cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove the entry stored under `key`. Removing a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the store cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}
