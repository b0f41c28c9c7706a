//! Todo list with optional auto-save.
//!
//! Items carry an id, text, completion flag, priority, tags and timestamps.
//! When auto-save is on and a [`KeyValueStore`] is supplied, the list is
//! restored at construction and saved as JSON after every change.

mod persistence;
mod reducer;
mod types;

pub use persistence::{TodoPersistence, DEFAULT_STORAGE_KEY};
pub use reducer::{TodoAction, TodoEnvironment, TodoReducer};
pub use types::{Priority, TodoId, TodoItem, TodoPatch, TodoState, TodosByPriority};

use composable_state_core::{environment::Clock, storage::KeyValueStore};
use composable_state_runtime::{Store, StoreError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Construction options for a [`TodoList`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TodoOptions {
    /// Items used when nothing is restored from storage
    pub initial_todos: Vec<TodoItem>,
    /// Restore at construction and save after every change
    pub auto_save: bool,
    /// Storage key of the list
    pub storage_key: String,
}

impl Default for TodoOptions {
    fn default() -> Self {
        Self {
            initial_todos: Vec::new(),
            auto_save: false,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
        }
    }
}

impl TodoOptions {
    /// Empty in-memory list
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from these items
    #[must_use]
    pub fn with_initial_todos(mut self, todos: Vec<TodoItem>) -> Self {
        self.initial_todos = todos;
        self
    }

    /// Turn auto-save on or off
    #[must_use]
    pub const fn with_auto_save(mut self, auto_save: bool) -> Self {
        self.auto_save = auto_save;
        self
    }

    /// Store under `key`
    #[must_use]
    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }
}

/// Todo list container
#[derive(Clone)]
pub struct TodoList {
    store: Store<TodoState, TodoAction, TodoEnvironment, TodoReducer>,
}

impl TodoList {
    /// Create a list
    ///
    /// Persistence is wired only when `options.auto_save` is set and a
    /// `storage` is given; the saved list then replaces `initial_todos`.
    #[must_use]
    pub fn new(
        options: TodoOptions,
        clock: Arc<dyn Clock>,
        storage: Option<Arc<dyn KeyValueStore>>,
    ) -> Self {
        let mut environment = TodoEnvironment::new(clock);
        match storage {
            Some(storage) if options.auto_save => {
                environment = environment.with_persistence(storage, options.storage_key);
            },
            None if options.auto_save => {
                tracing::debug!("Auto-save requested without storage, keeping todos in memory");
            },
            _ => {},
        }

        let todos = match &environment.persistence {
            Some(persistence) => persistence.load(options.initial_todos),
            None => options.initial_todos,
        };

        Self {
            store: Store::new(TodoState::from_todos(todos), TodoReducer::new(), environment),
        }
    }

    /// Dispatch an action and wait for its save, if any
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] once the store is shut down.
    pub async fn dispatch(&self, action: TodoAction) -> Result<(), StoreError> {
        let mut handle = self.store.send(action).await?;
        handle.wait().await;
        Ok(())
    }

    /// Append a todo
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] once the store is shut down.
    pub async fn add<I, T>(&self, text: &str, priority: Priority, tags: I) -> Result<(), StoreError>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let tags: BTreeSet<String> = tags.into_iter().map(Into::into).collect();
        self.dispatch(TodoAction::Add {
            text: text.to_string(),
            priority,
            tags,
        })
        .await
    }

    /// Delete a todo
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] once the store is shut down.
    pub async fn remove(&self, id: TodoId) -> Result<(), StoreError> {
        self.dispatch(TodoAction::Remove(id)).await
    }

    /// Flip a todo's completion flag
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] once the store is shut down.
    pub async fn toggle(&self, id: TodoId) -> Result<(), StoreError> {
        self.dispatch(TodoAction::Toggle(id)).await
    }

    /// Merge `patch` into a todo
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] once the store is shut down.
    pub async fn update(&self, id: TodoId, patch: TodoPatch) -> Result<(), StoreError> {
        self.dispatch(TodoAction::Update { id, patch }).await
    }

    /// Delete completed todos
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] once the store is shut down.
    pub async fn clear_completed(&self) -> Result<(), StoreError> {
        self.dispatch(TodoAction::ClearCompleted).await
    }

    /// Mark all active if all are completed, otherwise mark all completed
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] once the store is shut down.
    pub async fn toggle_all(&self) -> Result<(), StoreError> {
        self.dispatch(TodoAction::ToggleAll).await
    }

    /// Read derived values from the current state
    pub async fn with_state<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&TodoState) -> T,
    {
        self.store.state(f).await
    }

    /// Copy of the current items
    pub async fn todos(&self) -> Vec<TodoItem> {
        self.store.state(|state| state.todos().to_vec()).await
    }

    /// Current state
    pub async fn snapshot(&self) -> TodoState {
        self.store.state(TodoState::clone).await
    }
}
