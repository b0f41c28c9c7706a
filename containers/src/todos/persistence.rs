//! Saving and restoring todo lists through a [`KeyValueStore`].
//!
//! The list is stored as one JSON array under a single key. Writes happen in
//! effects, so two saves may race; each save carries the state revision it
//! was taken from and a save older than the last successful one is dropped.

use super::types::TodoItem;
use composable_state_core::{effect::Effect, storage::KeyValueStore};
use std::sync::{Arc, Mutex, PoisonError};

/// Key a todo list is stored under unless configured otherwise
pub const DEFAULT_STORAGE_KEY: &str = "todos";

/// Persists one todo list under one key
#[derive(Clone)]
pub struct TodoPersistence {
    storage: Arc<dyn KeyValueStore>,
    key: String,
    last_written: Arc<Mutex<u64>>,
}

impl std::fmt::Debug for TodoPersistence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TodoPersistence")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl TodoPersistence {
    /// Persist under `key` in `storage`
    #[must_use]
    pub fn new(storage: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
            last_written: Arc::new(Mutex::new(0)),
        }
    }

    /// The storage key
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Read the saved list, or `fallback` when nothing usable is stored
    ///
    /// Unreadable storage and malformed data are logged and fall back; they
    /// never fail construction of a list.
    #[must_use]
    pub fn load(&self, fallback: Vec<TodoItem>) -> Vec<TodoItem> {
        match self.storage.get(&self.key) {
            Ok(Some(text)) => match serde_json::from_str::<Vec<TodoItem>>(&text) {
                Ok(todos) => {
                    tracing::debug!(key = %self.key, count = todos.len(), "Restored todos");
                    todos
                },
                Err(error) => {
                    tracing::warn!(key = %self.key, %error, "Stored todos are malformed, using initial list");
                    fallback
                },
            },
            Ok(None) => fallback,
            Err(error) => {
                tracing::warn!(key = %self.key, %error, "Failed to load todos, using initial list");
                fallback
            },
        }
    }

    /// Effect writing `todos` as revision `revision`
    ///
    /// The list is serialized immediately so the effect owns a snapshot.
    #[must_use]
    pub fn save_effect<A>(&self, revision: u64, todos: &[TodoItem]) -> Effect<A>
    where
        A: Send + 'static,
    {
        let json = match serde_json::to_string(todos) {
            Ok(json) => json,
            Err(error) => {
                tracing::warn!(key = %self.key, %error, "Failed to serialize todos");
                return Effect::None;
            },
        };

        let persistence = self.clone();
        Effect::Future(Box::pin(async move {
            let key = persistence.key.clone();
            let written =
                tokio::task::spawn_blocking(move || persistence.write(revision, &json)).await;
            if let Err(error) = written {
                tracing::warn!(%key, revision, %error, "Save task failed");
            }
            None
        }))
    }

    /// Write `json` unless a newer revision is already stored
    pub(crate) fn write(&self, revision: u64, json: &str) {
        let mut last_written = self
            .last_written
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if revision <= *last_written {
            tracing::trace!(key = %self.key, revision, last = *last_written, "Skipping stale save");
            return;
        }

        match self.storage.set(&self.key, json) {
            Ok(()) => {
                *last_written = revision;
                metrics::counter!("todos.saves").increment(1);
            },
            Err(error) => {
                metrics::counter!("todos.save_failures").increment(1);
                tracing::warn!(key = %self.key, revision, %error, "Failed to save todos");
            },
        }
    }
}
