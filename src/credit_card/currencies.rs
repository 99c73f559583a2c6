//! The set of currencies linked to each credit card.
//!
//! Replacing the set reconciles the stored links with the requested ones:
//! links for removed currencies are deleted, links for new currencies are
//! inserted and the rest are left untouched, keeping their IDs.

use std::collections::BTreeSet;

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
};
use rusqlite::{Connection, Row, Transaction, TransactionBehavior};
use serde::{Deserialize, Serialize};
use serde_json::{Deserializer, Value, error::Category};

use crate::{
    DatabaseId, Error,
    credit_card::CreditCard,
    resource::{Resource, ResourceState, lock_connection, parse_id},
    validation::row_exists,
};

/// A link between a credit card and one of its currencies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditCardCurrency {
    /// The ID of the link.
    pub id: DatabaseId,
    /// The linked card.
    pub credit_card_id: DatabaseId,
    /// The linked currency.
    pub currency_id: DatabaseId,
}

/// A missing or `null` list replaces the links with the empty set.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct CurrencyIdsPayload {
    currency_ids: Option<Vec<DatabaseId>>,
}

/// De-duplicate and sort `currency_ids`.
///
/// # Errors
/// Returns [Error::InvalidPayload] if any ID is not a positive integer.
pub(super) fn normalize_currency_ids(
    currency_ids: &[DatabaseId],
) -> Result<BTreeSet<DatabaseId>, Error> {
    if currency_ids.iter().any(|id| *id <= 0) {
        return Err(Error::invalid(
            "currency_ids must contain only positive integers",
        ));
    }

    Ok(currency_ids.iter().copied().collect())
}

/// Fail unless every currency in `currency_ids` exists.
pub(super) fn require_currencies(
    currency_ids: &BTreeSet<DatabaseId>,
    connection: &Connection,
) -> Result<(), Error> {
    for currency_id in currency_ids {
        if !row_exists(connection, "currency", *currency_id)? {
            return Err(Error::invalid("all currencies must exist"));
        }
    }

    Ok(())
}

/// The IDs of the currencies linked to a card in ascending order.
pub(super) fn select_currency_ids(
    credit_card_id: DatabaseId,
    connection: &Connection,
) -> Result<Vec<DatabaseId>, rusqlite::Error> {
    connection
        .prepare(
            "SELECT currency_id FROM credit_card_currency
            WHERE credit_card_id = ?1 ORDER BY currency_id ASC",
        )?
        .query_map([credit_card_id], |row| row.get(0))?
        .collect()
}

/// Make the links of a card match `wanted`.
pub(super) fn reconcile_currencies(
    credit_card_id: DatabaseId,
    wanted: &BTreeSet<DatabaseId>,
    connection: &Connection,
) -> Result<(), rusqlite::Error> {
    let current: BTreeSet<DatabaseId> = select_currency_ids(credit_card_id, connection)?
        .into_iter()
        .collect();

    let mut delete_link = connection.prepare_cached(
        "DELETE FROM credit_card_currency WHERE credit_card_id = ?1 AND currency_id = ?2",
    )?;
    for currency_id in current.difference(wanted) {
        delete_link.execute((credit_card_id, currency_id))?;
    }

    let mut insert_link = connection.prepare_cached(
        "INSERT INTO credit_card_currency (credit_card_id, currency_id) VALUES (?1, ?2)",
    )?;
    for currency_id in wanted.difference(&current) {
        insert_link.execute((credit_card_id, currency_id))?;
    }

    tracing::debug!(
        "credit card {credit_card_id} currencies changed from {current:?} to {wanted:?}"
    );

    Ok(())
}

/// Retrieve the currency links of a card ordered by currency.
///
/// # Errors
/// Returns [Error::NotFound] if the card does not exist.
pub fn get_credit_card_currencies(
    credit_card_id: DatabaseId,
    connection: &Connection,
) -> Result<Vec<CreditCardCurrency>, Error> {
    if !row_exists(connection, CreditCard::TABLE, credit_card_id)? {
        return Err(Error::NotFound(CreditCard::NAME));
    }

    connection
        .prepare(
            "SELECT id, credit_card_id, currency_id FROM credit_card_currency
            WHERE credit_card_id = ?1 ORDER BY currency_id ASC",
        )?
        .query_map([credit_card_id], map_row)?
        .map(|maybe_link| maybe_link.map_err(|error| error.into()))
        .collect()
}

/// Replace the currencies of a card with `currency_ids`.
///
/// Duplicate IDs are ignored and calling this function again with the same
/// IDs changes nothing.
///
/// # Errors
/// Returns [Error::InvalidPayload] for non-positive or unknown currency IDs,
/// or [Error::NotFound] if the card does not exist.
pub fn replace_credit_card_currencies(
    credit_card_id: DatabaseId,
    currency_ids: &[DatabaseId],
    connection: &Connection,
) -> Result<Vec<CreditCardCurrency>, Error> {
    let wanted = normalize_currency_ids(currency_ids)?;

    if !row_exists(connection, CreditCard::TABLE, credit_card_id)? {
        return Err(Error::NotFound(CreditCard::NAME));
    }

    require_currencies(&wanted, connection)?;

    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Immediate)?;
    reconcile_currencies(credit_card_id, &wanted, &transaction)?;
    transaction.commit()?;

    get_credit_card_currencies(credit_card_id, connection)
}

/// List the currency links of a card.
pub async fn get_credit_card_currencies_endpoint(
    State(state): State<ResourceState>,
    Path(raw_id): Path<String>,
) -> Result<Json<Vec<CreditCardCurrency>>, Error> {
    let credit_card_id = parse_id(&raw_id, CreditCard::NAME)?;
    let connection = lock_connection(&state.db_connection)?;

    get_credit_card_currencies(credit_card_id, &connection).map(Json)
}

/// Replace the currencies of a card with those in a `{"currency_ids": [...]}` body.
///
/// The card must exist before the body is looked at.
pub async fn replace_credit_card_currencies_endpoint(
    State(state): State<ResourceState>,
    Path(raw_id): Path<String>,
    body: Bytes,
) -> Result<Json<Vec<CreditCardCurrency>>, Error> {
    let credit_card_id = parse_id(&raw_id, CreditCard::NAME)?;
    let connection = lock_connection(&state.db_connection)?;

    if !row_exists(&connection, CreditCard::TABLE, credit_card_id)? {
        return Err(Error::NotFound(CreditCard::NAME));
    }

    let currency_ids = parse_currency_ids(&body)?;

    replace_credit_card_currencies(credit_card_id, &currency_ids, &connection).map(Json)
}

/// Decode the body of a currency replacement, describing exactly what is wrong with it.
fn parse_currency_ids(body: &[u8]) -> Result<Vec<DatabaseId>, Error> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(Error::invalid("request body must not be empty"));
    }

    let mut values = Deserializer::from_slice(body).into_iter::<Value>();

    let value = match values.next() {
        Some(Ok(value)) => value,
        Some(Err(_)) | None => {
            return Err(Error::invalid("request body contains malformed JSON"));
        }
    };

    if !value.is_object() {
        return Err(Error::invalid("request body must be a JSON object"));
    }

    let payload = serde_json::from_value::<CurrencyIdsPayload>(value).map_err(|error| {
        match error.classify() {
            Category::Data => match unknown_field(&error.to_string()) {
                Some(field) => {
                    Error::invalid(format!("request body contains unknown field \"{field}\""))
                }
                None => Error::invalid("currency_ids must be an array of integers"),
            },
            Category::Syntax | Category::Eof | Category::Io => {
                Error::invalid("request body contains malformed JSON")
            }
        }
    })?;

    if values.next().is_some() {
        return Err(Error::invalid("request body must contain a single JSON object"));
    }

    Ok(payload.currency_ids.unwrap_or_default())
}

/// Extract the field name from serde's "unknown field `name`, expected ..." message.
fn unknown_field(message: &str) -> Option<&str> {
    message
        .strip_prefix("unknown field `")?
        .split('`')
        .next()
}

fn map_row(row: &Row) -> Result<CreditCardCurrency, rusqlite::Error> {
    Ok(CreditCardCurrency {
        id: row.get(0)?,
        credit_card_id: row.get(1)?,
        currency_id: row.get(2)?,
    })
}
