//! Core domain logic for the todo backend.
//! Owns the todo store, its schema, and the rank ordering engine.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::CoreConfig;
pub use logging::{default_log_level, init_logging, logging_status, LogLevel};
pub use model::ordering::{MoveDirection, RankAudit, ShiftWindow};
pub use model::todo::{NewTodo, Todo, TodoChanges, TodoId};
pub use repo::todo_repo::{
    MoveOutcome, SqliteTodoRepository, TodoRepoError, TodoRepoResult, TodoRepository,
};
pub use service::todo_service::{ErrorKind, TodoService, TodoServiceError, TodoServiceResult};

/// Minimal health-check API for smoke probes.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
