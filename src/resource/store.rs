//! Generic database operations for [Resource]s.

use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::{
    DatabaseId, Error,
    resource::{Dependent, Resource},
    validation::row_exists,
};

/// Validate `payload` and store it as a new resource.
///
/// # Errors
/// Returns [Error::InvalidPayload] for invalid fields or missing references,
/// or [Error::Duplicate] if the resource would break a uniqueness rule.
pub fn create<R: Resource>(payload: R::Payload, connection: &Connection) -> Result<R, Error> {
    let draft = R::normalize(payload)?;
    R::check(&draft, None, connection)?;

    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Immediate)?;
    let id = R::insert(&draft, &transaction).map_err(write_error::<R>)?;
    let created = get::<R>(id, &transaction)?;
    transaction.commit()?;

    tracing::info!("created {} {id}", R::NAME);

    Ok(created)
}

/// Read the resource with `id`.
///
/// # Errors
/// Returns [Error::NotFound] if there is no such resource.
pub fn get<R: Resource>(id: DatabaseId, connection: &Connection) -> Result<R, Error> {
    R::select(id, connection)?.ok_or(Error::NotFound(R::NAME))
}

/// Read every resource of one kind ordered by ID.
pub fn list<R: Resource>(connection: &Connection) -> Result<Vec<R>, Error> {
    Ok(R::select_all(connection)?)
}

/// Validate `payload` and use it to replace the resource with `id`.
///
/// # Errors
/// Returns [Error::NotFound] if there is no such resource, and otherwise the
/// same errors as [create].
pub fn update<R: Resource>(
    id: DatabaseId,
    payload: R::Payload,
    connection: &Connection,
) -> Result<R, Error> {
    let draft = R::normalize(payload)?;

    if !row_exists(connection, R::TABLE, id)? {
        return Err(Error::NotFound(R::NAME));
    }

    R::check(&draft, Some(id), connection)?;

    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Immediate)?;
    let rows_affected = R::replace(id, &draft, &transaction).map_err(write_error::<R>)?;

    if rows_affected == 0 {
        return Err(Error::NotFound(R::NAME));
    }

    let updated = get::<R>(id, &transaction)?;
    transaction.commit()?;

    tracing::info!("updated {} {id}", R::NAME);

    Ok(updated)
}

/// Delete the resource with `id`.
///
/// # Errors
/// Returns [Error::NotFound] if there is no such resource, or
/// [Error::InUse] while other rows refer to it.
pub fn delete<R: Resource>(id: DatabaseId, connection: &Connection) -> Result<(), Error> {
    if !row_exists(connection, R::TABLE, id)? {
        return Err(Error::NotFound(R::NAME));
    }

    for dependent in R::DEPENDENTS {
        if is_referenced(dependent, id, connection)? {
            tracing::debug!(
                "cannot delete {} {id}, it is referenced by {}.{}",
                R::NAME,
                dependent.table,
                dependent.column
            );
            return Err(Error::InUse(R::IN_USE));
        }
    }

    let rows_affected = connection
        .execute(&format!("DELETE FROM {} WHERE id = ?1", R::TABLE), [id])
        .map_err(delete_error::<R>)?;

    if rows_affected == 0 {
        return Err(Error::NotFound(R::NAME));
    }

    tracing::info!("deleted {} {id}", R::NAME);

    Ok(())
}

fn is_referenced(
    dependent: &Dependent,
    id: DatabaseId,
    connection: &Connection,
) -> Result<bool, Error> {
    let referenced = connection
        .prepare_cached(&format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = ?1)",
            dependent.table, dependent.column
        ))?
        .query_row([id], |row| row.get(0))?;

    Ok(referenced)
}

/// Translate constraint failures on `INSERT` and `UPDATE` into the errors of `R`.
fn write_error<R: Resource>(error: rusqlite::Error) -> Error {
    match error {
        // Code 2067 occurs when a UNIQUE constraint failed.
        rusqlite::Error::SqliteFailure(sql_error, _) if sql_error.extended_code == 2067 => {
            Error::Duplicate(R::DUPLICATE)
        }
        // Code 787 occurs when a FOREIGN KEY constraint failed.
        rusqlite::Error::SqliteFailure(sql_error, _) if sql_error.extended_code == 787 => {
            Error::invalid(R::MISSING_REFERENCE)
        }
        error => error.into(),
    }
}

/// Translate constraint failures on `DELETE` into the errors of `R`.
fn delete_error<R: Resource>(error: rusqlite::Error) -> Error {
    match error {
        // Code 787 occurs when a FOREIGN KEY constraint failed.
        rusqlite::Error::SqliteFailure(sql_error, _) if sql_error.extended_code == 787 => {
            Error::InUse(R::IN_USE)
        }
        error => error.into(),
    }
}
