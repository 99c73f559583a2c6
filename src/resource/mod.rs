//! The validated CRUD resource shared by every entity of the API.
//!
//! An entity implements [Resource] once: how to normalize its payload, which
//! references and uniqueness rules to check, and how to read and write its
//! rows. The generic functions in this module and the handlers in
//! [endpoints] then provide create, read, update, delete and list for it.

mod endpoints;
mod store;

use rusqlite::Connection;
use serde::{Serialize, de::DeserializeOwned};

use crate::{DatabaseId, Error};

pub use endpoints::{
    ResourceState, create_endpoint, delete_endpoint, get_endpoint, list_endpoint, lock_connection,
    parse_id, update_endpoint,
};
pub use store::{create, delete, get, list, update};

/// Alias for the number of rows changed by an `UPDATE` or `DELETE`.
pub type RowsAffected = usize;

/// A machine-readable code and a human-readable message describing a 409
/// conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conflict {
    /// The error code, e.g. "duplicate_currency".
    pub code: &'static str,
    /// The message shown to the client.
    pub message: &'static str,
}

/// A column in another table that refers to a resource by ID.
///
/// While any row holds a reference, the resource cannot be deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dependent {
    /// The referring table.
    pub table: &'static str,
    /// The column holding the ID of the resource.
    pub column: &'static str,
}

impl Dependent {
    /// The rows of `table` that refer to the resource via `column`.
    pub const fn new(table: &'static str, column: &'static str) -> Self {
        Self { table, column }
    }
}

/// An entity stored in its own table and managed through the JSON API.
pub trait Resource: Serialize + Send + Sized + 'static {
    /// The human-readable name used in error messages, e.g. "bank account".
    const NAME: &'static str;

    /// The database table holding the rows.
    const TABLE: &'static str;

    /// The endpoint for a single resource, used for the `Location` header.
    const ENDPOINT: &'static str;

    /// Reported when a uniqueness rule is broken.
    const DUPLICATE: Conflict = Conflict {
        code: "duplicate_record",
        message: "record must be unique",
    };

    /// Reported when deletion is blocked by one of the [Resource::DEPENDENTS].
    const IN_USE: Conflict = Conflict {
        code: "record_in_use",
        message: "record is in use",
    };

    /// Reported when the database rejects a write because a referenced row
    /// is missing.
    const MISSING_REFERENCE: &'static str = "referenced records must exist";

    /// The columns in other tables that refer to this resource.
    const DEPENDENTS: &'static [Dependent] = &[];

    /// The request body for creating or replacing the resource.
    type Payload: DeserializeOwned + Send + 'static;

    /// The payload after normalization and field validation.
    type Draft;

    /// The database ID of the resource.
    fn id(&self) -> DatabaseId;

    /// Trim, case-fold and range check the fields of `payload`.
    ///
    /// # Errors
    /// Returns [Error::InvalidPayload] naming the first invalid field.
    fn normalize(payload: Self::Payload) -> Result<Self::Draft, Error>;

    /// Check references and uniqueness against the stored rows.
    ///
    /// `id` is the resource being replaced, and is `None` when creating.
    fn check(draft: &Self::Draft, id: Option<DatabaseId>, connection: &Connection)
    -> Result<(), Error>;

    /// Insert `draft` and return the new row's ID.
    fn insert(draft: &Self::Draft, connection: &Connection) -> Result<DatabaseId, rusqlite::Error>;

    /// Replace the row `id` with `draft`.
    fn replace(
        id: DatabaseId,
        draft: &Self::Draft,
        connection: &Connection,
    ) -> Result<RowsAffected, rusqlite::Error>;

    /// Read the row `id`, or `None` if there is no such row.
    fn select(id: DatabaseId, connection: &Connection) -> Result<Option<Self>, rusqlite::Error>;

    /// Read every row ordered by ID.
    fn select_all(connection: &Connection) -> Result<Vec<Self>, rusqlite::Error>;
}
