//! Normalization and checks shared by the payloads of every resource.
//!
//! The functions return [Error::InvalidPayload] with the message shown to
//! the client, so the wording of each message is part of the API.

use rusqlite::Connection;
use time::{Date, macros::format_description};

use crate::{DatabaseId, Error};

/// Trim `value` and reject it if nothing is left.
pub fn required_text(value: &str, field: &str) -> Result<String, Error> {
    let value = value.trim();

    if value.is_empty() {
        return Err(Error::invalid(format!("{field} is required")));
    }

    Ok(value.to_owned())
}

/// Trim `value`, turning blank text into `None`.
pub fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}

/// Reject IDs that cannot refer to a database row.
pub fn positive_id(value: DatabaseId, field: &str) -> Result<DatabaseId, Error> {
    if value <= 0 {
        return Err(Error::invalid(format!("{field} must be a positive integer")));
    }

    Ok(value)
}

/// Reject amounts that are not finite or not greater than zero.
pub fn positive_amount(value: f64, field: &str) -> Result<f64, Error> {
    if !value.is_finite() || value <= 0.0 {
        return Err(Error::invalid(format!("{field} must be greater than zero")));
    }

    Ok(value)
}

/// Reject NaN and infinite numbers.
pub fn finite_number(value: f64, field: &str) -> Result<f64, Error> {
    if !value.is_finite() {
        return Err(Error::invalid(format!("{field} must be a finite number")));
    }

    Ok(value)
}

/// Parse a calendar date written as `YYYY-MM-DD`.
pub fn iso_date(value: &str, field: &str) -> Result<Date, Error> {
    Date::parse(value.trim(), format_description!("[year]-[month]-[day]"))
        .map_err(|_| Error::invalid(format!("{field} must be a valid date in YYYY-MM-DD format")))
}

/// Compare two names ignoring case.
pub fn same_text(left: &str, right: &str) -> bool {
    left.to_lowercase() == right.to_lowercase()
}

/// Check whether the row with `id` exists in `table`.
///
/// `table` must be one of the application's table names, never user input.
pub fn row_exists(connection: &Connection, table: &str, id: DatabaseId) -> Result<bool, Error> {
    let exists = connection
        .prepare_cached(&format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = ?1)"))?
        .query_row([id], |row| row.get(0))?;

    Ok(exists)
}

/// Fail with `message` if the row with `id` does not exist in `table`.
pub fn require_reference(
    connection: &Connection,
    table: &str,
    id: DatabaseId,
    message: &str,
) -> Result<(), Error> {
    if row_exists(connection, table, id)? {
        Ok(())
    } else {
        Err(Error::invalid(message))
    }
}
