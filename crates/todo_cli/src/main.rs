//! Command-line driver for the todo backend.
//!
//! # Responsibility
//! - Resolve configuration from `TODO_*` environment variables.
//! - Dispatch one subcommand to the request layer and print its JSON body.
//! - Exit non-zero when the request fails.

use clap::{ArgAction, Parser, Subcommand};
use log::info;
use serde_json::{json, Value};
use std::process::ExitCode;
use todo_api::{ApiResponse, TodoApi};
use todo_core::{CoreConfig, TodoId};

#[derive(Parser, Debug)]
#[command(
    name = "todo_cli",
    version,
    about = "Drive the todo store from the command line",
    long_about = "Drive the todo store from the command line.\n\nThe store location and logging are read from TODO_DB_PATH, TODO_LOG_LEVEL and TODO_LOG_DIR."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Print core health and version.
    Ping,
    /// List active todos in rank order.
    List,
    /// List trashed todos.
    Trash,
    /// Append a todo after the last active one.
    Add {
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,
    },
    /// Set the completed flag, keeping the title.
    Done {
        id: TodoId,
        #[arg(action = ArgAction::Set, required = true, value_name = "true|false")]
        completed: bool,
    },
    /// Change the title, keeping the completed flag.
    Rename {
        id: TodoId,
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,
    },
    /// Move a todo from rank OLD to rank NEW.
    #[command(allow_negative_numbers = true)]
    Move { id: TodoId, old: i64, new: i64 },
    /// Move a todo into the trash.
    Delete { id: TodoId },
    /// Bring a trashed todo back at its stored rank.
    Restore { id: TodoId },
    /// Delete a todo for good and close its rank gap.
    Purge { id: TodoId },
    /// Check active ranks for gaps and duplicates.
    Audit,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if cli.command == Command::Ping {
        return print_response(&ping());
    }

    let config = CoreConfig::from_env();
    if let Some(log_dir) = config.log_dir.as_ref().and_then(|dir| dir.to_str()) {
        if let Err(err) = todo_core::init_logging(&config.log_level, log_dir) {
            eprintln!("logging disabled: {err}");
        }
    }

    let api = match TodoApi::from_config(&config) {
        Ok(api) => api,
        Err(err) => {
            eprintln!(
                "failed to open todo store `{}`: {err}",
                config.db_path.display()
            );
            return ExitCode::FAILURE;
        }
    };
    info!(
        "event=cli_command module=cli status=start command={:?} db_path={}",
        cli.command,
        config.db_path.display()
    );

    print_response(&dispatch(&api, cli.command))
}

fn dispatch(api: &TodoApi, command: Command) -> ApiResponse {
    match command {
        Command::Ping => ping(),
        Command::List => api.list_todos(),
        Command::Trash => api.list_trashed(),
        Command::Audit => api.audit_order(),
        Command::Add { title } => {
            let body = json!({ "title": title.join(" ") });
            api.create_todo(&body.to_string())
        }
        Command::Done { id, completed } => match find_active(api, id) {
            Some(todo) => {
                let body = json!({ "title": todo["title"], "completed": completed });
                api.update_todo(&id.to_string(), &body.to_string())
            }
            None => not_found(id),
        },
        Command::Rename { id, title } => match find_active(api, id) {
            Some(todo) => {
                let body = json!({ "title": title.join(" "), "completed": todo["completed"] });
                api.update_todo(&id.to_string(), &body.to_string())
            }
            None => not_found(id),
        },
        Command::Move { id, old, new } => {
            let body = json!({ "itemId": id, "oldIndex": old, "newIndex": new });
            api.reorder(&body.to_string())
        }
        Command::Delete { id } => api.delete_todo(&id.to_string()),
        Command::Restore { id } => api.restore_todo(&id.to_string()),
        Command::Purge { id } => api.purge_todo(&id.to_string()),
    }
}

fn ping() -> ApiResponse {
    ApiResponse {
        status: 200,
        body: json!({
            "ping": todo_core::ping(),
            "version": todo_core::core_version(),
        }),
    }
}

fn find_active(api: &TodoApi, id: TodoId) -> Option<Value> {
    let listed = api.list_todos();
    listed
        .body
        .as_array()?
        .iter()
        .find(|todo| todo["id"].as_i64() == Some(id))
        .cloned()
}

fn not_found(id: TodoId) -> ApiResponse {
    ApiResponse {
        status: 404,
        body: json!({ "error": format!("no active todo with id {id}") }),
    }
}

fn print_response(response: &ApiResponse) -> ExitCode {
    let rendered = serde_json::to_string_pretty(&response.body)
        .unwrap_or_else(|_| response.body.to_string());
    if response.is_success() {
        println!("{rendered}");
        ExitCode::SUCCESS
    } else {
        eprintln!("status={} {rendered}", response.status);
        ExitCode::FAILURE
    }
}
