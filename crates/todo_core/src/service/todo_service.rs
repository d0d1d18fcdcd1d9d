//! Todo ordering engine.
//!
//! # Responsibility
//! - Validate caller input above the repository layer.
//! - Expose list, create, update, move, soft-delete, restore and permanent
//!   delete as use-case calls.
//! - Emit metadata-only operation events.
//!
//! # Invariants
//! - Ranks passed to `move_todo` must be positive.
//! - Shift ranges trust the caller-supplied old rank. A stale old rank is
//!   not detected and leaves duplicate or missing ranks behind.
//! - Soft delete leaves a rank gap; only permanent delete compacts.

use crate::model::ordering::RankAudit;
use crate::model::todo::{NewTodo, Todo, TodoChanges, TodoId};
use crate::repo::todo_repo::{MoveOutcome, TodoRepoError, TodoRepository};
use log::{debug, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Coarse failure class surfaced to request layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input or a semantically invalid request.
    Validation,
    /// Referenced todo is absent from the queried scope.
    NotFound,
    /// Transaction or connection failure; nothing was persisted.
    Storage,
}

/// Errors from todo service operations.
#[derive(Debug)]
pub enum TodoServiceError {
    /// Title is blank after trim.
    InvalidTitle,
    /// A rank argument is below 1.
    InvalidRank { field: &'static str, value: i64 },
    /// Target todo does not exist in the queried scope.
    NotFound(TodoId),
    /// Restore target is not in the trash.
    NotInTrash(TodoId),
    /// Repository-level failure.
    Repo(TodoRepoError),
}

impl TodoServiceError {
    /// Maps this error onto the validation/not-found/storage taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidTitle | Self::InvalidRank { .. } | Self::NotInTrash(_) => {
                ErrorKind::Validation
            }
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Repo(_) => ErrorKind::Storage,
        }
    }
}

impl Display for TodoServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTitle => write!(f, "todo title must not be blank"),
            Self::InvalidRank { field, value } => {
                write!(f, "{field} must be a positive rank, got {value}")
            }
            Self::NotFound(id) => write!(f, "todo not found: {id}"),
            Self::NotInTrash(id) => write!(f, "todo {id} is not in trash, cannot restore"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TodoServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TodoRepoError> for TodoServiceError {
    fn from(value: TodoRepoError) -> Self {
        match value {
            TodoRepoError::NotFound(id) => Self::NotFound(id),
            TodoRepoError::NotInTrash(id) => Self::NotInTrash(id),
            other => Self::Repo(other),
        }
    }
}

pub type TodoServiceResult<T> = Result<T, TodoServiceError>;

/// Ordering engine facade over an injected repository.
pub struct TodoService<R: TodoRepository> {
    repo: R,
}

impl<R: TodoRepository> TodoService<R> {
    /// Creates service from repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Lists active todos in rank order.
    pub fn list_active(&self) -> TodoServiceResult<Vec<Todo>> {
        self.repo.list_active().map_err(Into::into)
    }

    /// Lists trashed todos. Rank carries no meaning here.
    pub fn list_trashed(&self) -> TodoServiceResult<Vec<Todo>> {
        self.repo.list_trashed().map_err(Into::into)
    }

    /// Loads one todo by id.
    pub fn get_todo(
        &self,
        id: TodoId,
        include_trashed: bool,
    ) -> TodoServiceResult<Option<Todo>> {
        self.repo.get_todo(id, include_trashed).map_err(Into::into)
    }

    /// Creates one todo, appending it at the end unless a rank is given.
    pub fn create_todo(&self, input: NewTodo) -> TodoServiceResult<Todo> {
        let title = normalize_title(&input.title)?;
        if let Some(rank) = input.display_order {
            ensure_positive_rank("displayOrder", rank)?;
        }

        let todo = self.repo.create_todo(&NewTodo { title, ..input })?;
        info!(
            "event=todo_create module=ordering status=ok id={} display_order={}",
            todo.id, todo.display_order
        );
        Ok(todo)
    }

    /// Overwrites title and completed flag of one active todo.
    pub fn update_todo(&self, id: TodoId, changes: TodoChanges) -> TodoServiceResult<Todo> {
        let title = normalize_title(&changes.title)?;
        let todo = self
            .repo
            .update_todo(id, &TodoChanges { title, ..changes })?;
        info!("event=todo_update module=ordering status=ok id={id}");
        Ok(todo)
    }

    /// Moves one active todo from `old_rank` to `new_rank`.
    ///
    /// # Contract
    /// - Equal ranks are a successful no-op; no transaction is opened.
    /// - Peers in the displaced window shift by exactly one; the whole move
    ///   commits or nothing does.
    /// - `old_rank` is trusted, not re-read from the store.
    pub fn move_todo(
        &self,
        id: TodoId,
        old_rank: i64,
        new_rank: i64,
    ) -> TodoServiceResult<MoveOutcome> {
        ensure_positive_rank("oldIndex", old_rank)?;
        ensure_positive_rank("newIndex", new_rank)?;

        debug!("event=todo_move module=ordering status=start id={id} old={old_rank} new={new_rank}");
        match self.repo.move_todo(id, old_rank, new_rank) {
            Ok(outcome) => {
                match outcome.window {
                    Some(window) => info!(
                        "event=todo_move module=ordering status=ok id={id} old={old_rank} new={new_rank} direction={:?} shifted={}",
                        window.direction, outcome.shifted
                    ),
                    None => info!(
                        "event=todo_move module=ordering status=unchanged id={id} rank={new_rank}"
                    ),
                }
                Ok(outcome)
            }
            Err(err) => {
                warn!(
                    "event=todo_move module=ordering status=error id={id} old={old_rank} new={new_rank} error={err}"
                );
                Err(err.into())
            }
        }
    }

    /// Moves one active todo into the trash. Peers keep their ranks.
    pub fn soft_delete_todo(&self, id: TodoId) -> TodoServiceResult<()> {
        self.repo.soft_delete_todo(id)?;
        info!("event=todo_trash module=ordering status=ok id={id}");
        Ok(())
    }

    /// Brings one trashed todo back at its stored rank.
    ///
    /// The restored rank is not renormalized and may collide with a peer.
    pub fn restore_todo(&self, id: TodoId) -> TodoServiceResult<Todo> {
        let todo = self.repo.restore_todo(id)?;
        info!(
            "event=todo_restore module=ordering status=ok id={id} display_order={}",
            todo.display_order
        );
        Ok(todo)
    }

    /// Deletes one todo for good and closes its rank gap.
    ///
    /// Returns how many rows moved down one rank.
    pub fn purge_todo(&self, id: TodoId) -> TodoServiceResult<usize> {
        match self.repo.purge_todo(id) {
            Ok(shifted) => {
                info!("event=todo_purge module=ordering status=ok id={id} shifted={shifted}");
                Ok(shifted)
            }
            Err(err) => {
                warn!("event=todo_purge module=ordering status=error id={id} error={err}");
                Err(err.into())
            }
        }
    }

    /// Checks active ranks against `1..=N` without repairing anything.
    pub fn audit_active_order(&self) -> TodoServiceResult<RankAudit> {
        let active = self.repo.list_active()?;
        let audit = RankAudit::from_ranks(active.iter().map(|todo| todo.display_order));
        if !audit.is_dense() {
            warn!(
                "event=rank_audit module=ordering status=degraded len={} duplicates={:?} gaps={:?}",
                audit.len, audit.duplicates, audit.gaps
            );
        }
        Ok(audit)
    }
}

fn normalize_title(value: &str) -> TodoServiceResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(TodoServiceError::InvalidTitle);
    }
    Ok(trimmed.to_string())
}

fn ensure_positive_rank(field: &'static str, value: i64) -> TodoServiceResult<()> {
    if value < 1 {
        return Err(TodoServiceError::InvalidRank { field, value });
    }
    Ok(())
}
