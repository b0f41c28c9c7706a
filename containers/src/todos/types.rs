//! Domain types for the todo list.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;

/// Identifier of a todo item, unique within one list
pub type TodoId = u64;

/// Priority bucket of a todo
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Low priority
    Low,
    /// Medium priority (the default)
    #[default]
    Medium,
    /// High priority
    High,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// A single todo item
///
/// Serialized with camelCase keys and RFC 3339 timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoItem {
    /// Unique identifier
    pub id: TodoId,
    /// Trimmed description
    pub text: String,
    /// Whether the todo is done
    pub completed: bool,
    /// Priority bucket
    #[serde(default)]
    pub priority: Priority,
    /// Tags, kept sorted and unique
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// When the todo was added
    pub created_at: DateTime<Utc>,
    /// When the todo last changed, never earlier than `created_at`
    pub updated_at: DateTime<Utc>,
}

impl TodoItem {
    /// Create an active todo stamped at `now`
    #[must_use]
    pub fn new(
        id: TodoId,
        text: &str,
        priority: Priority,
        tags: BTreeSet<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            text: text.trim().to_string(),
            completed: false,
            priority,
            tags,
            created_at: now,
            updated_at: now,
        }
    }

    /// Stamp a modification at `now`, keeping `updated_at >= created_at`
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now.max(self.created_at);
    }

    /// Whether the todo carries `tag`
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

/// Partial update applied by `TodoAction::Update`
///
/// `None` fields are left untouched. The id and creation time can never be
/// changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TodoPatch {
    /// New text
    pub text: Option<String>,
    /// New completion flag
    pub completed: Option<bool>,
    /// New priority
    pub priority: Option<Priority>,
    /// Replacement tag set
    pub tags: Option<BTreeSet<String>>,
}

impl TodoPatch {
    /// An empty patch
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the text
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Replace the completion flag
    #[must_use]
    pub const fn completed(mut self, completed: bool) -> Self {
        self.completed = Some(completed);
        self
    }

    /// Replace the priority
    #[must_use]
    pub const fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Replace the tags
    #[must_use]
    pub fn tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    /// Merge the patch into `todo`
    pub(crate) fn apply(self, todo: &mut TodoItem) {
        if let Some(text) = self.text {
            todo.text = text;
        }
        if let Some(completed) = self.completed {
            todo.completed = completed;
        }
        if let Some(priority) = self.priority {
            todo.priority = priority;
        }
        if let Some(tags) = self.tags {
            todo.tags = tags;
        }
    }
}

/// Todos grouped by priority, in list order within each group
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodosByPriority<'a> {
    /// High priority todos
    pub high: Vec<&'a TodoItem>,
    /// Medium priority todos
    pub medium: Vec<&'a TodoItem>,
    /// Low priority todos
    pub low: Vec<&'a TodoItem>,
}

/// State of the todo list
///
/// The list is private so ids stay unique: items only enter through
/// [`TodoState::from_todos`] or the reducer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoState {
    todos: Vec<TodoItem>,
    /// Bumped on every mutation; orders persisted snapshots
    pub(crate) revision: u64,
}

impl TodoState {
    /// An empty list
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a list from existing items, dropping any repeated id.
    ///
    /// An `updated_at` earlier than `created_at` is raised to `created_at`.
    #[must_use]
    pub fn from_todos(todos: Vec<TodoItem>) -> Self {
        let mut seen = HashSet::new();
        let todos = todos
            .into_iter()
            .filter(|todo| {
                let fresh = seen.insert(todo.id);
                if !fresh {
                    tracing::warn!(id = todo.id, "Dropping todo with duplicate id");
                }
                fresh
            })
            .map(|mut todo| {
                todo.updated_at = todo.updated_at.max(todo.created_at);
                todo
            })
            .collect();

        Self { todos, revision: 0 }
    }

    /// All todos in insertion order
    #[must_use]
    pub fn todos(&self) -> &[TodoItem] {
        &self.todos
    }

    /// Look up a todo
    #[must_use]
    pub fn get(&self, id: TodoId) -> Option<&TodoItem> {
        self.todos.iter().find(|todo| todo.id == id)
    }

    pub(crate) fn get_mut(&mut self, id: TodoId) -> Option<&mut TodoItem> {
        self.todos.iter_mut().find(|todo| todo.id == id)
    }

    pub(crate) fn todos_mut(&mut self) -> &mut Vec<TodoItem> {
        &mut self.todos
    }

    /// Id the next added todo will get: max existing id + 1, or 1 when empty.
    ///
    /// `None` once the max id is `TodoId::MAX`.
    #[must_use]
    pub fn next_id(&self) -> Option<TodoId> {
        self.todos
            .iter()
            .map(|todo| todo.id)
            .max()
            .map_or(Some(1), |max| max.checked_add(1))
    }

    /// Number of todos
    #[must_use]
    pub fn total(&self) -> usize {
        self.todos.len()
    }

    /// Number of completed todos
    #[must_use]
    pub fn completed(&self) -> usize {
        self.todos.iter().filter(|todo| todo.completed).count()
    }

    /// Number of active todos
    #[must_use]
    pub fn active(&self) -> usize {
        self.total() - self.completed()
    }

    /// Whether every todo is completed (true for an empty list)
    #[must_use]
    pub fn all_completed(&self) -> bool {
        self.todos.iter().all(|todo| todo.completed)
    }

    /// Completed share as a whole percentage, rounding halves up; 0 when empty
    #[must_use]
    pub fn completion_percentage(&self) -> u32 {
        let total = self.total();
        if total == 0 {
            return 0;
        }
        let rounded = (self.completed() * 200 + total) / (total * 2);
        u32::try_from(rounded).unwrap_or(100)
    }

    /// Every tag used by any todo, sorted and without duplicates
    #[must_use]
    pub fn all_tags(&self) -> Vec<String> {
        self.todos
            .iter()
            .flat_map(|todo| todo.tags.iter())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .cloned()
            .collect()
    }

    /// Todos grouped by priority
    #[must_use]
    pub fn by_priority_groups(&self) -> TodosByPriority<'_> {
        let mut groups = TodosByPriority::default();
        for todo in &self.todos {
            match todo.priority {
                Priority::High => groups.high.push(todo),
                Priority::Medium => groups.medium.push(todo),
                Priority::Low => groups.low.push(todo),
            }
        }
        groups
    }

    /// Todos carrying `tag`
    #[must_use]
    pub fn by_tag(&self, tag: &str) -> Vec<&TodoItem> {
        self.todos.iter().filter(|todo| todo.has_tag(tag)).collect()
    }

    /// Todos with the given priority
    #[must_use]
    pub fn by_priority(&self, priority: Priority) -> Vec<&TodoItem> {
        self.todos
            .iter()
            .filter(|todo| todo.priority == priority)
            .collect()
    }
}
