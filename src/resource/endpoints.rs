//! Generic JSON endpoints for [Resource]s.

use std::sync::{Arc, Mutex, MutexGuard};

use axum::{
    Json,
    extract::{FromRef, Path, State},
    http::{StatusCode, header::LOCATION},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{
    AppState, DatabaseId, Error,
    endpoints::format_endpoint,
    payload::JsonPayload,
    resource::{Resource, store},
};

/// The state needed by the resource endpoints.
#[derive(Debug, Clone)]
pub struct ResourceState {
    /// The database connection for managing resources.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ResourceState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Acquire the shared database connection.
///
/// # Errors
/// Returns [Error::DatabaseLockError] if the lock is poisoned.
pub fn lock_connection(
    db_connection: &Mutex<Connection>,
) -> Result<MutexGuard<'_, Connection>, Error> {
    db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })
}

/// Parse an ID taken from the request path.
///
/// # Errors
/// Returns [Error::InvalidId] naming `resource` if `raw_id` is not a
/// positive integer.
pub fn parse_id(raw_id: &str, resource: &'static str) -> Result<DatabaseId, Error> {
    raw_id
        .parse::<DatabaseId>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or(Error::InvalidId(resource))
}

/// List every resource of one kind.
pub async fn list_endpoint<R: Resource>(
    State(state): State<ResourceState>,
) -> Result<Json<Vec<R>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    store::list::<R>(&connection).map(Json)
}

/// Get a single resource.
pub async fn get_endpoint<R: Resource>(
    State(state): State<ResourceState>,
    Path(raw_id): Path<String>,
) -> Result<Json<R>, Error> {
    let id = parse_id(&raw_id, R::NAME)?;
    let connection = lock_connection(&state.db_connection)?;

    store::get::<R>(id, &connection).map(Json)
}

/// Create a resource, responding with `201 Created` and its location.
pub async fn create_endpoint<R: Resource>(
    State(state): State<ResourceState>,
    JsonPayload(payload): JsonPayload<R::Payload>,
) -> Result<Response, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let created = store::create::<R>(payload, &connection)?;
    let location = format_endpoint(R::ENDPOINT, created.id());

    Ok((StatusCode::CREATED, [(LOCATION, location)], Json(created)).into_response())
}

/// Replace a resource.
pub async fn update_endpoint<R: Resource>(
    State(state): State<ResourceState>,
    Path(raw_id): Path<String>,
    JsonPayload(payload): JsonPayload<R::Payload>,
) -> Result<Json<R>, Error> {
    let id = parse_id(&raw_id, R::NAME)?;
    let connection = lock_connection(&state.db_connection)?;

    store::update::<R>(id, payload, &connection).map(Json)
}

/// Delete a resource, responding with `204 No Content`.
pub async fn delete_endpoint<R: Resource>(
    State(state): State<ResourceState>,
    Path(raw_id): Path<String>,
) -> Result<StatusCode, Error> {
    let id = parse_id(&raw_id, R::NAME)?;
    let connection = lock_connection(&state.db_connection)?;

    store::delete::<R>(id, &connection)?;

    Ok(StatusCode::NO_CONTENT)
}
