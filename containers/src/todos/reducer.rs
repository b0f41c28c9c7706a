//! Todo list reducer.

use super::persistence::TodoPersistence;
use super::types::{Priority, TodoId, TodoItem, TodoPatch, TodoState};
use composable_state_core::{
    effect::Effect, environment::Clock, reducer::Reducer, smallvec, storage::KeyValueStore,
    SmallVec,
};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Todo list actions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TodoAction {
    /// Append a new active todo
    Add {
        /// Description, trimmed on insert
        text: String,
        /// Priority bucket
        priority: Priority,
        /// Tags
        tags: BTreeSet<String>,
    },
    /// Delete a todo
    Remove(TodoId),
    /// Flip a todo's completion flag
    Toggle(TodoId),
    /// Merge a patch into a todo
    Update {
        /// Target todo
        id: TodoId,
        /// Fields to replace
        patch: TodoPatch,
    },
    /// Delete every completed todo
    ClearCompleted,
    /// Mark all active if all are completed, otherwise mark all completed
    ToggleAll,
}

impl TodoAction {
    /// Add a medium priority todo without tags
    #[must_use]
    pub fn add(text: impl Into<String>) -> Self {
        Self::Add {
            text: text.into(),
            priority: Priority::default(),
            tags: BTreeSet::new(),
        }
    }
}

/// Dependencies of the todo reducer
#[derive(Clone)]
pub struct TodoEnvironment {
    /// Source of creation and update timestamps
    pub clock: Arc<dyn Clock>,
    /// Where changes are saved, if auto-save is on
    pub persistence: Option<TodoPersistence>,
}

impl TodoEnvironment {
    /// In-memory environment
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            persistence: None,
        }
    }

    /// Save every change under `key` in `storage`
    #[must_use]
    pub fn with_persistence(mut self, storage: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        self.persistence = Some(TodoPersistence::new(storage, key));
        self
    }
}

/// Todo list reducer
#[derive(Debug, Clone, Copy, Default)]
pub struct TodoReducer;

impl TodoReducer {
    /// Create a new reducer
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Apply `action`, returning whether the list changed
    fn apply(state: &mut TodoState, action: TodoAction, env: &TodoEnvironment) -> bool {
        match action {
            TodoAction::Add {
                text,
                priority,
                tags,
            } => {
                let Some(id) = state.next_id() else {
                    tracing::warn!("Todo ids exhausted, ignoring add");
                    return false;
                };
                let todo = TodoItem::new(id, &text, priority, tags, env.clock.now());
                tracing::debug!(id, "Added todo");
                state.todos_mut().push(todo);
                true
            },
            TodoAction::Remove(id) => {
                let before = state.total();
                state.todos_mut().retain(|todo| todo.id != id);
                Self::found(id, state.total() != before)
            },
            TodoAction::Toggle(id) => {
                let now = env.clock.now();
                let todo = state.get_mut(id).map(|todo| {
                    todo.completed = !todo.completed;
                    todo.touch(now);
                });
                Self::found(id, todo.is_some())
            },
            TodoAction::Update { id, patch } => {
                let now = env.clock.now();
                let todo = state.get_mut(id).map(|todo| {
                    patch.apply(todo);
                    todo.touch(now);
                });
                Self::found(id, todo.is_some())
            },
            TodoAction::ClearCompleted => {
                let before = state.total();
                state.todos_mut().retain(|todo| !todo.completed);
                state.total() != before
            },
            TodoAction::ToggleAll => {
                let target = !state.all_completed();
                let now = env.clock.now();
                for todo in state.todos_mut().iter_mut() {
                    todo.completed = target;
                    todo.touch(now);
                }
                state.total() > 0
            },
        }
    }

    fn found(id: TodoId, found: bool) -> bool {
        if !found {
            tracing::debug!(id, "No todo with this id, ignoring");
        }
        found
    }
}

impl Reducer for TodoReducer {
    type State = TodoState;
    type Action = TodoAction;
    type Environment = TodoEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        if !Self::apply(state, action, env) {
            return smallvec![Effect::None];
        }

        state.revision += 1;
        match &env.persistence {
            Some(persistence) => smallvec![persistence.save_effect(state.revision, state.todos())],
            None => smallvec![Effect::None],
        }
    }
}
