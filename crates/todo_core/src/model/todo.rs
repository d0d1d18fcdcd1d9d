//! Todo record.
//!
//! # Invariants
//! - `id` is assigned by the store, immutable, and never reused.
//! - `deleted_at == None` means active; `Some(ms)` means in trash.
//! - A trashed todo keeps its last `display_order`.

use serde::{Deserialize, Serialize};

/// Store-assigned todo identifier.
pub type TodoId = i64;

/// One to-do item as persisted in `todos`.
///
/// Serialized in camelCase to match the request layer wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: TodoId,
    pub title: String,
    pub completed: bool,
    /// 1-based rank among active todos.
    pub display_order: i64,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Unix epoch milliseconds. Rank writes do not bump this.
    pub updated_at: i64,
    /// Soft delete tombstone, Unix epoch milliseconds.
    pub deleted_at: Option<i64>,
}

impl Todo {
    /// Returns whether this todo takes part in the active ordering.
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }

    /// Returns whether this todo is in the trash.
    pub fn is_trashed(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Input for creating one todo.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTodo {
    pub title: String,
    #[serde(default)]
    pub completed: bool,
    /// Explicit rank. `None` appends after the last active todo.
    #[serde(default)]
    pub display_order: Option<i64>,
}

impl NewTodo {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Field update for one active todo. Both fields are overwritten.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TodoChanges {
    pub title: String,
    #[serde(default)]
    pub completed: bool,
}
