use axum::http::StatusCode;
use axum_test::{TestResponse, TestServer};
use rusqlite::Connection;
use serde_json::Value;

use crate::{AppState, build_router};

/// A server for the full router backed by a fresh in-memory database.
pub(crate) fn get_test_server() -> TestServer {
    let connection =
        Connection::open_in_memory().expect("Could not open in-memory SQLite database");
    let state = AppState::new(connection)
        .expect("Could not create app state")
        .with_static_dir("static-files-for-tests-do-not-exist");

    TestServer::try_new(build_router(state)).expect("Could not create test server.")
}

/// POST `body` to `path`, check that it was created and return the response body.
pub(crate) async fn must_create(server: &TestServer, path: &str, body: Value) -> Value {
    let response = server.post(path).json(&body).await;

    assert_eq!(
        response.status_code(),
        StatusCode::CREATED,
        "could not create {path}: {}",
        response.text()
    );

    response.json()
}

#[track_caller]
pub(crate) fn assert_error(response: &TestResponse, status: StatusCode, code: &str, message: &str) {
    assert_eq!(response.status_code(), status, "{}", response.text());

    let body: Value = response.json();
    assert_eq!(body["error"]["code"], code, "{body}");
    assert_eq!(body["error"]["message"], message, "{body}");
}
