//! Request-layer API over the todo ordering engine.
//!
//! # Responsibility
//! - Map each todo endpoint onto one engine call.
//! - Decode JSON request bodies and path ids.
//! - Encode results as `(status, json body)` envelopes.
//!
//! # Invariants
//! - Calls never panic; every failure becomes an error envelope.
//! - Validation failures are 400, missing todos 404, storage failures 500.
//! - The store handle is owned by `TodoApi`; there is no global connection.

use log::warn;
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path;
use todo_core::db::{open_db, open_db_in_memory, DbResult};
use todo_core::{
    CoreConfig, ErrorKind, NewTodo, SqliteTodoRepository, TodoChanges, TodoId, TodoService,
    TodoServiceError, TodoServiceResult,
};

/// Response envelope returned by every endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    /// HTTP-style status code.
    pub status: u16,
    /// JSON payload: a todo, a todo array, `{"message"}` or `{"error"}`.
    pub body: Value,
}

impl ApiResponse {
    fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    fn message(message: &str) -> Self {
        Self::ok(json!({ "message": message }))
    }

    fn error(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({ "error": message.into() }),
        }
    }

    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Reorder request body: `{"itemId", "newIndex", "oldIndex"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReorderRequest {
    item_id: TodoId,
    new_index: i64,
    old_index: i64,
}

/// Todo endpoints bound to one migrated SQLite connection.
pub struct TodoApi {
    conn: Connection,
}

impl TodoApi {
    /// Wraps an already migrated connection.
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Opens the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        open_db(path).map(Self::new)
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> DbResult<Self> {
        open_db_in_memory().map(Self::new)
    }

    /// Opens the database configured in `config`.
    pub fn from_config(config: &CoreConfig) -> DbResult<Self> {
        Self::open(&config.db_path)
    }

    /// Underlying connection, for tooling and tests.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// `GET /api/todos/`: active todos in rank order.
    pub fn list_todos(&self) -> ApiResponse {
        respond("list_todos", self.with_service(|service| service.list_active()))
    }

    /// `GET /api/todos/trashed`: trashed todos.
    pub fn list_trashed(&self) -> ApiResponse {
        respond(
            "list_trashed",
            self.with_service(|service| service.list_trashed()),
        )
    }

    /// `POST /api/todos/`: creates a todo from `{"title", "completed"?, "displayOrder"?}`.
    pub fn create_todo(&self, body: &str) -> ApiResponse {
        let input = match decode_body::<NewTodo>(body) {
            Ok(input) => input,
            Err(response) => return response,
        };
        respond(
            "create_todo",
            self.with_service(|service| service.create_todo(input)),
        )
    }

    /// `PUT /api/todos/:id`: overwrites `{"title", "completed"}`.
    pub fn update_todo(&self, id: &str, body: &str) -> ApiResponse {
        let id = match parse_id(id) {
            Ok(id) => id,
            Err(response) => return response,
        };
        let changes = match decode_body::<TodoChanges>(body) {
            Ok(changes) => changes,
            Err(response) => return response,
        };
        respond(
            "update_todo",
            self.with_service(|service| service.update_todo(id, changes)),
        )
    }

    /// `PUT /api/todos/order`: moves one todo from `oldIndex` to `newIndex`.
    pub fn reorder(&self, body: &str) -> ApiResponse {
        let request = match decode_body::<ReorderRequest>(body) {
            Ok(request) => request,
            Err(response) => return response,
        };
        let result = self.with_service(|service| {
            service.move_todo(request.item_id, request.old_index, request.new_index)
        });
        match result {
            Ok(outcome) if outcome.window.is_none() => ApiResponse::message("Todo order unchanged"),
            Ok(_) => ApiResponse::message("Todo order updated successfully"),
            Err(err) => failure("reorder", &err),
        }
    }

    /// `DELETE /api/todos/:id`: moves a todo into the trash.
    pub fn delete_todo(&self, id: &str) -> ApiResponse {
        let id = match parse_id(id) {
            Ok(id) => id,
            Err(response) => return response,
        };
        match self.with_service(|service| service.soft_delete_todo(id)) {
            Ok(()) => ApiResponse::message("todo deleted"),
            Err(err) => failure("delete_todo", &err),
        }
    }

    /// `PUT /api/todos/:id/restore`: brings a trashed todo back.
    pub fn restore_todo(&self, id: &str) -> ApiResponse {
        let id = match parse_id(id) {
            Ok(id) => id,
            Err(response) => return response,
        };
        respond(
            "restore_todo",
            self.with_service(|service| service.restore_todo(id)),
        )
    }

    /// `DELETE /api/todos/:id/permanent`: removes a todo and compacts ranks.
    pub fn purge_todo(&self, id: &str) -> ApiResponse {
        let id = match parse_id(id) {
            Ok(id) => id,
            Err(response) => return response,
        };
        match self.with_service(|service| service.purge_todo(id)) {
            Ok(_) => ApiResponse::message("Todo permanently deleted"),
            Err(err) => failure("purge_todo", &err),
        }
    }

    /// Rank audit of the active list, for diagnostics.
    pub fn audit_order(&self) -> ApiResponse {
        match self.with_service(|service| service.audit_active_order()) {
            Ok(audit) => ApiResponse::ok(json!({
                "len": audit.len,
                "dense": audit.is_dense(),
                "duplicates": audit.duplicates,
                "gaps": audit.gaps,
            })),
            Err(err) => failure("audit_order", &err),
        }
    }

    fn with_service<T>(
        &self,
        f: impl FnOnce(&TodoService<SqliteTodoRepository<'_>>) -> TodoServiceResult<T>,
    ) -> TodoServiceResult<T> {
        let repo = SqliteTodoRepository::try_new(&self.conn)?;
        f(&TodoService::new(repo))
    }
}

fn respond<T: serde::Serialize>(endpoint: &str, result: TodoServiceResult<T>) -> ApiResponse {
    match result {
        Ok(value) => match serde_json::to_value(value) {
            Ok(body) => ApiResponse::ok(body),
            Err(err) => ApiResponse::error(500, format!("{endpoint} failed: {err}")),
        },
        Err(err) => failure(endpoint, &err),
    }
}

fn failure(endpoint: &str, err: &TodoServiceError) -> ApiResponse {
    match err.kind() {
        ErrorKind::Validation => ApiResponse::error(400, err.to_string()),
        ErrorKind::NotFound => ApiResponse::error(404, err.to_string()),
        ErrorKind::Storage => {
            warn!("event=api_request module=api status=error endpoint={endpoint} error={err}");
            ApiResponse::error(500, format!("{endpoint} failed: {err}"))
        }
    }
}

fn decode_body<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, ApiResponse> {
    serde_json::from_str(body)
        .map_err(|err| ApiResponse::error(400, format!("Invalid request body: {err}")))
}

fn parse_id(raw: &str) -> Result<TodoId, ApiResponse> {
    raw.trim()
        .parse::<TodoId>()
        .map_err(|_| ApiResponse::error(400, format!("invalid todo id `{}`", raw.trim())))
}

#[cfg(test)]
mod tests {
    use super::TodoApi;
    use serde_json::Value;

    fn api_with(titles: &[&str]) -> (TodoApi, Vec<String>) {
        let api = TodoApi::open_in_memory().unwrap();
        let ids = titles
            .iter()
            .map(|title| {
                let response = api.create_todo(&format!(r#"{{"title":"{title}"}}"#));
                assert_eq!(response.status, 200, "{}", response.body);
                response.body["id"].as_i64().unwrap().to_string()
            })
            .collect();
        (api, ids)
    }

    fn active_titles(api: &TodoApi) -> Vec<String> {
        let response = api.list_todos();
        assert!(response.is_success());
        response
            .body
            .as_array()
            .unwrap()
            .iter()
            .map(|todo| todo["title"].as_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn create_returns_todo_with_camel_case_fields() {
        let api = TodoApi::open_in_memory().unwrap();

        let response = api.create_todo(r#"{"title":"write docs","completed":true}"#);

        assert_eq!(response.status, 200);
        assert_eq!(response.body["title"], "write docs");
        assert_eq!(response.body["completed"], true);
        assert_eq!(response.body["displayOrder"], 1);
        assert_eq!(response.body["deletedAt"], Value::Null);
    }

    #[test]
    fn malformed_bodies_and_ids_are_bad_requests() {
        let (api, ids) = api_with(&["a"]);

        let bad_json = api.create_todo("{title:");
        assert_eq!(bad_json.status, 400);
        assert!(bad_json.body["error"]
            .as_str()
            .unwrap()
            .starts_with("Invalid request body"));

        assert_eq!(api.reorder(r#"{"itemId":1}"#).status, 400);
        assert_eq!(api.delete_todo("abc").status, 400);
        assert_eq!(api.update_todo(&ids[0], r#"{"title":"  "}"#).status, 400);
    }

    #[test]
    fn reorder_moves_item_and_reports_message() {
        let (api, ids) = api_with(&["a", "b", "c", "d", "e"]);

        let response = api.reorder(&format!(
            r#"{{"itemId":{},"newIndex":2,"oldIndex":5}}"#,
            ids[4]
        ));

        assert_eq!(response.status, 200);
        assert_eq!(response.body["message"], "Todo order updated successfully");
        assert_eq!(active_titles(&api), vec!["a", "e", "b", "c", "d"]);
    }

    #[test]
    fn reorder_to_same_index_is_unchanged() {
        let (api, ids) = api_with(&["a", "b"]);

        let response = api.reorder(&format!(
            r#"{{"itemId":{},"newIndex":1,"oldIndex":1}}"#,
            ids[0]
        ));

        assert_eq!(response.body["message"], "Todo order unchanged");
        assert_eq!(active_titles(&api), vec!["a", "b"]);
    }

    #[test]
    fn reorder_of_unknown_item_is_not_found() {
        let (api, _) = api_with(&["a", "b"]);

        let response = api.reorder(r#"{"itemId":77,"newIndex":1,"oldIndex":2}"#);
        assert_eq!(response.status, 404);
    }

    #[test]
    fn trash_restore_and_purge_flow() {
        let (api, ids) = api_with(&["a", "b", "c"]);

        assert_eq!(api.delete_todo(&ids[1]).body["message"], "todo deleted");
        assert_eq!(active_titles(&api), vec!["a", "c"]);
        let trashed = api.list_trashed();
        assert_eq!(trashed.body.as_array().unwrap().len(), 1);

        let not_trashed = api.restore_todo(&ids[0]);
        assert_eq!(not_trashed.status, 400);

        let restored = api.restore_todo(&ids[1]);
        assert_eq!(restored.status, 200);
        assert_eq!(restored.body["displayOrder"], 2);
        assert_eq!(active_titles(&api), vec!["a", "b", "c"]);

        let purged = api.purge_todo(&ids[0]);
        assert_eq!(purged.body["message"], "Todo permanently deleted");
        let orders = api
            .list_todos()
            .body
            .as_array()
            .unwrap()
            .iter()
            .map(|todo| todo["displayOrder"].as_i64().unwrap())
            .collect::<Vec<_>>();
        assert_eq!(orders, vec![1, 2]);

        assert_eq!(api.purge_todo(&ids[0]).status, 404);
        assert_eq!(api.restore_todo("404").status, 404);
    }

    #[test]
    fn update_overwrites_fields() {
        let (api, ids) = api_with(&["draft"]);

        let response = api.update_todo(&ids[0], r#"{"title":"final","completed":true}"#);

        assert_eq!(response.status, 200);
        assert_eq!(response.body["title"], "final");
        assert_eq!(response.body["completed"], true);
    }

    #[test]
    fn storage_failures_map_to_internal_error() {
        let (api, ids) = api_with(&["a", "b", "c"]);
        api.connection()
            .execute_batch(
                "CREATE TRIGGER fail_any_shift
                 BEFORE UPDATE OF display_order ON todos
                 WHEN OLD.id = 2
                 BEGIN
                     SELECT RAISE(ABORT, 'disk on fire');
                 END;",
            )
            .unwrap();

        let response = api.reorder(&format!(
            r#"{{"itemId":{},"newIndex":1,"oldIndex":3}}"#,
            ids[2]
        ));

        assert_eq!(response.status, 500);
        assert!(response.body["error"]
            .as_str()
            .unwrap()
            .contains("disk on fire"));
        assert_eq!(active_titles(&api), vec!["a", "b", "c"]);
    }

    #[test]
    fn audit_reports_density() {
        let (api, ids) = api_with(&["a", "b", "c"]);
        api.delete_todo(&ids[0]);

        let audit = api.audit_order();
        assert_eq!(audit.body["dense"], false);
        assert_eq!(audit.body["gaps"], serde_json::json!([1]));
    }

    #[test]
    fn on_disk_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("api.db");

        let api = TodoApi::open(&path).unwrap();
        assert_eq!(api.create_todo(r#"{"title":"persisted"}"#).status, 200);
        drop(api);

        let reopened = TodoApi::open(&path).unwrap();
        assert_eq!(active_titles(&reopened), vec!["persisted"]);
    }
}
