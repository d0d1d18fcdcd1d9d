//! Process configuration resolved from the environment.
//!
//! # Invariants
//! - Blank values are treated as unset.
//! - Resolution never fails; unusable values surface later when the store
//!   or logger is opened.

use crate::logging::default_log_level;
use std::path::PathBuf;

/// Environment key for the SQLite database file.
pub const DB_PATH_ENV: &str = "TODO_DB_PATH";
/// Environment key for the log level (`trace|debug|info|warn|error`).
pub const LOG_LEVEL_ENV: &str = "TODO_LOG_LEVEL";
/// Environment key for the absolute log directory. Unset disables file logs.
pub const LOG_DIR_ENV: &str = "TODO_LOG_DIR";

const DEFAULT_DB_FILE_NAME: &str = "todo_core.sqlite3";

/// Resolved runtime settings for the store and logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    pub log_level: String,
    pub log_dir: Option<PathBuf>,
}

impl CoreConfig {
    /// Reads configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        Self {
            db_path: read(DB_PATH_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_DB_FILE_NAME)),
            log_level: read(LOG_LEVEL_ENV).unwrap_or_else(|| default_log_level().to_string()),
            log_dir: read(LOG_DIR_ENV).map(PathBuf::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CoreConfig, DB_PATH_ENV, LOG_DIR_ENV, LOG_LEVEL_ENV};
    use crate::logging::default_log_level;
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn config_from(pairs: &[(&str, &str)]) -> CoreConfig {
        let values = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<HashMap<_, _>>();
        CoreConfig::from_lookup(|key| values.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = config_from(&[]);
        assert_eq!(
            config.db_path,
            std::env::temp_dir().join("todo_core.sqlite3")
        );
        assert_eq!(config.log_level, default_log_level());
        assert_eq!(config.log_dir, None);
    }

    #[test]
    fn explicit_values_are_trimmed() {
        let config = config_from(&[
            (DB_PATH_ENV, " /var/lib/todo/todo.db "),
            (LOG_LEVEL_ENV, "warn"),
            (LOG_DIR_ENV, "/var/log/todo"),
        ]);
        assert_eq!(config.db_path, PathBuf::from("/var/lib/todo/todo.db"));
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/todo")));
    }

    #[test]
    fn blank_values_count_as_unset() {
        let config = config_from(&[(LOG_DIR_ENV, "   "), (LOG_LEVEL_ENV, "")]);
        assert_eq!(config.log_dir, None);
        assert_eq!(config.log_level, default_log_level());
    }
}
