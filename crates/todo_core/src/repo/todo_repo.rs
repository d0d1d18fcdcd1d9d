//! Todo repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Own every SQL statement touching the `todos` table.
//! - Run each rank-mutating operation as one immediate transaction.
//!
//! # Invariants
//! - Active listing is deterministic: `display_order ASC, id ASC`.
//! - Move shifts only active peers; permanent delete shifts every row above
//!   the removed rank, trashed rows included.
//! - Any error before `commit()` drops the transaction, which rolls back.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::ordering::ShiftWindow;
use crate::model::todo::{NewTodo, Todo, TodoChanges, TodoId};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

const TODO_SELECT_SQL: &str = "SELECT
    id,
    title,
    completed,
    display_order,
    created_at,
    updated_at,
    deleted_at
FROM todos";

const TODO_COLUMNS: [&str; 7] = [
    "id",
    "title",
    "completed",
    "display_order",
    "created_at",
    "updated_at",
    "deleted_at",
];

/// Result type used by todo repository operations.
pub type TodoRepoResult<T> = Result<T, TodoRepoError>;

/// Errors from todo repository operations.
#[derive(Debug)]
pub enum TodoRepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Target todo does not exist in the queried scope.
    NotFound(TodoId),
    /// Restore target exists but is not in the trash.
    NotInTrash(TodoId),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is missing from expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Persisted row cannot be converted to a valid `Todo`.
    InvalidData(String),
}

impl Display for TodoRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "todo not found: {id}"),
            Self::NotInTrash(id) => write!(f, "todo {id} is not in trash, cannot restore"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "todo repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "todo repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "todo repository requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted todo data: {message}"),
        }
    }
}

impl Error for TodoRepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for TodoRepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for TodoRepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// What a completed move did to the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveOutcome {
    /// `None` when old and new rank were equal and nothing was written.
    pub window: Option<ShiftWindow>,
    /// Number of peers whose rank changed by one.
    pub shifted: usize,
}

impl MoveOutcome {
    fn unchanged() -> Self {
        Self {
            window: None,
            shifted: 0,
        }
    }
}

/// Repository interface for todo storage and ordering writes.
pub trait TodoRepository {
    /// Inserts one todo, appending it when no rank is given.
    fn create_todo(&self, input: &NewTodo) -> TodoRepoResult<Todo>;
    /// Loads one todo, optionally looking into the trash.
    fn get_todo(&self, id: TodoId, include_trashed: bool) -> TodoRepoResult<Option<Todo>>;
    /// Lists active todos by rank.
    fn list_active(&self) -> TodoRepoResult<Vec<Todo>>;
    /// Lists trashed todos, most recently trashed first.
    fn list_trashed(&self) -> TodoRepoResult<Vec<Todo>>;
    /// Overwrites title and completed flag of one active todo.
    fn update_todo(&self, id: TodoId, changes: &TodoChanges) -> TodoRepoResult<Todo>;
    /// Moves one active todo from `old_rank` to `new_rank`, shifting peers.
    fn move_todo(&self, id: TodoId, old_rank: i64, new_rank: i64) -> TodoRepoResult<MoveOutcome>;
    /// Tombstones one active todo without renumbering peers.
    fn soft_delete_todo(&self, id: TodoId) -> TodoRepoResult<()>;
    /// Clears the tombstone of one trashed todo.
    fn restore_todo(&self, id: TodoId) -> TodoRepoResult<Todo>;
    /// Removes one todo for good and closes its rank gap.
    fn purge_todo(&self, id: TodoId) -> TodoRepoResult<usize>;
}

/// SQLite-backed todo repository over a borrowed, migrated connection.
pub struct SqliteTodoRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTodoRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> TodoRepoResult<Self> {
        ensure_todo_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl TodoRepository for SqliteTodoRepository<'_> {
    fn create_todo(&self, input: &NewTodo) -> TodoRepoResult<Todo> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let display_order = match input.display_order {
            Some(rank) => rank,
            None => next_display_order(&tx)?,
        };

        tx.execute(
            "INSERT INTO todos (title, completed, display_order)
             VALUES (?1, ?2, ?3);",
            params![input.title.as_str(), input.completed, display_order],
        )?;
        let id = tx.last_insert_rowid();
        let todo = load_required_todo(&tx, id, false)?;

        tx.commit()?;
        Ok(todo)
    }

    fn get_todo(&self, id: TodoId, include_trashed: bool) -> TodoRepoResult<Option<Todo>> {
        load_todo(self.conn, id, include_trashed)
    }

    fn list_active(&self) -> TodoRepoResult<Vec<Todo>> {
        query_todos(
            self.conn,
            &format!(
                "{TODO_SELECT_SQL}
                 WHERE deleted_at IS NULL
                 ORDER BY display_order ASC, id ASC;"
            ),
        )
    }

    fn list_trashed(&self) -> TodoRepoResult<Vec<Todo>> {
        query_todos(
            self.conn,
            &format!(
                "{TODO_SELECT_SQL}
                 WHERE deleted_at IS NOT NULL
                 ORDER BY deleted_at DESC, id ASC;"
            ),
        )
    }

    fn update_todo(&self, id: TodoId, changes: &TodoChanges) -> TodoRepoResult<Todo> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            "UPDATE todos
             SET title = ?2,
                 completed = ?3,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1
               AND deleted_at IS NULL;",
            params![id, changes.title.as_str(), changes.completed],
        )?;
        if changed == 0 {
            return Err(TodoRepoError::NotFound(id));
        }

        let todo = load_required_todo(&tx, id, false)?;
        tx.commit()?;
        Ok(todo)
    }

    fn move_todo(
        &self,
        id: TodoId,
        old_rank: i64,
        new_rank: i64,
    ) -> TodoRepoResult<MoveOutcome> {
        let Some(window) = ShiftWindow::for_move(old_rank, new_rank) else {
            return Ok(MoveOutcome::unchanged());
        };

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            "UPDATE todos
             SET display_order = ?2
             WHERE id = ?1
               AND deleted_at IS NULL;",
            params![id, new_rank],
        )?;
        if changed == 0 {
            return Err(TodoRepoError::NotFound(id));
        }

        let shifted = tx.execute(
            "UPDATE todos
             SET display_order = display_order + ?4
             WHERE id != ?1
               AND deleted_at IS NULL
               AND display_order BETWEEN ?2 AND ?3;",
            params![id, window.low, window.high, window.delta()],
        )?;

        tx.commit()?;
        Ok(MoveOutcome {
            window: Some(window),
            shifted,
        })
    }

    fn soft_delete_todo(&self, id: TodoId) -> TodoRepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE todos
             SET deleted_at = (strftime('%s', 'now') * 1000),
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1
               AND deleted_at IS NULL;",
            [id],
        )?;
        if changed == 0 {
            return Err(TodoRepoError::NotFound(id));
        }
        Ok(())
    }

    fn restore_todo(&self, id: TodoId) -> TodoRepoResult<Todo> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let deleted_at: Option<Option<i64>> = tx
            .query_row(
                "SELECT deleted_at FROM todos WHERE id = ?1;",
                [id],
                |row| row.get(0),
            )
            .optional()?;

        match deleted_at {
            None => return Err(TodoRepoError::NotFound(id)),
            Some(None) => return Err(TodoRepoError::NotInTrash(id)),
            Some(Some(_)) => {}
        }

        tx.execute(
            "UPDATE todos
             SET deleted_at = NULL,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            [id],
        )?;
        let todo = load_required_todo(&tx, id, false)?;

        tx.commit()?;
        Ok(todo)
    }

    fn purge_todo(&self, id: TodoId) -> TodoRepoResult<usize> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let rank: i64 = tx
            .query_row(
                "SELECT display_order FROM todos WHERE id = ?1;",
                [id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or(TodoRepoError::NotFound(id))?;

        tx.execute("DELETE FROM todos WHERE id = ?1;", [id])?;
        let shifted = tx.execute(
            "UPDATE todos
             SET display_order = display_order - 1
             WHERE display_order > ?1;",
            [rank],
        )?;

        tx.commit()?;
        Ok(shifted)
    }
}

fn next_display_order(conn: &Connection) -> TodoRepoResult<i64> {
    let next = conn.query_row(
        "SELECT COALESCE(MAX(display_order), 0) + 1
         FROM todos
         WHERE deleted_at IS NULL;",
        [],
        |row| row.get(0),
    )?;
    Ok(next)
}

fn load_todo(
    conn: &Connection,
    id: TodoId,
    include_trashed: bool,
) -> TodoRepoResult<Option<Todo>> {
    let mut stmt = conn.prepare(&format!(
        "{TODO_SELECT_SQL}
         WHERE id = ?1
           AND (?2 = 1 OR deleted_at IS NULL);"
    ))?;
    let mut rows = stmt.query(params![id, include_trashed])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_todo_row(row)?));
    }
    Ok(None)
}

fn load_required_todo(
    conn: &Connection,
    id: TodoId,
    include_trashed: bool,
) -> TodoRepoResult<Todo> {
    load_todo(conn, id, include_trashed)?.ok_or(TodoRepoError::NotFound(id))
}

fn query_todos(conn: &Connection, sql: &str) -> TodoRepoResult<Vec<Todo>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([])?;
    let mut todos = Vec::new();
    while let Some(row) = rows.next()? {
        todos.push(parse_todo_row(row)?);
    }
    Ok(todos)
}

fn parse_todo_row(row: &Row<'_>) -> TodoRepoResult<Todo> {
    let completed = match row.get::<_, i64>("completed")? {
        0 => false,
        1 => true,
        other => {
            return Err(TodoRepoError::InvalidData(format!(
                "invalid completed value `{other}` in todos.completed"
            )));
        }
    };

    Ok(Todo {
        id: row.get("id")?,
        title: row.get("title")?,
        completed,
        display_order: row.get("display_order")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        deleted_at: row.get("deleted_at")?,
    })
}

fn ensure_todo_connection_ready(conn: &Connection) -> TodoRepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(TodoRepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, "todos")? {
        return Err(TodoRepoError::MissingRequiredTable("todos"));
    }

    let present = table_columns(conn, "todos")?;
    if let Some(column) = TODO_COLUMNS
        .into_iter()
        .find(|column| !present.iter().any(|name| name == column))
    {
        return Err(TodoRepoError::MissingRequiredColumn {
            table: "todos",
            column,
        });
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> TodoRepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_columns(conn: &Connection, table: &str) -> TodoRepoResult<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    let mut columns = Vec::new();
    while let Some(row) = rows.next()? {
        columns.push(row.get(1)?);
    }
    Ok(columns)
}
