//! Balances of a credit card cycle, one per currency.
//!
//! Balances are nested under their cycle, so every operation takes the
//! cycle ID from the route and treats a balance of another cycle as missing.
//! Create and update validate the payload before looking up the cycle.

use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, header::LOCATION},
    response::{IntoResponse, Response},
};
use rusqlite::{Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::{
    DatabaseId, Error,
    credit_card_cycle::CreditCardCycle,
    endpoints::{self, format_endpoint},
    payload::JsonPayload,
    resource::{Conflict, Resource, ResourceState, lock_connection, parse_id},
    validation::{finite_number, positive_id, require_reference, row_exists},
};

const BALANCE_NAME: &str = "credit card cycle balance";

const DUPLICATE_BALANCE: Conflict = Conflict {
    code: "duplicate_credit_card_cycle_balance",
    message: "credit card cycle and currency combination must be unique",
};

/// The amount owed in one currency for a credit card cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditCardCycleBalance {
    /// The ID of the balance.
    pub id: DatabaseId,
    /// The cycle the balance belongs to.
    pub credit_card_cycle_id: DatabaseId,
    /// The currency of the balance.
    pub currency_id: DatabaseId,
    /// The amount owed.
    pub balance: f64,
    /// Whether the balance has been paid.
    pub paid: bool,
}

/// The request body for creating or replacing a cycle balance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CycleBalancePayload {
    /// The cycle the balance belongs to, which must match the cycle in the route.
    pub credit_card_cycle_id: DatabaseId,
    /// The currency of the balance.
    pub currency_id: DatabaseId,
    /// The amount owed, zero when omitted.
    pub balance: Option<f64>,
    /// Whether the balance has been paid, false when omitted.
    pub paid: Option<bool>,
}

struct CycleBalanceDraft {
    currency_id: DatabaseId,
    balance: f64,
    paid: bool,
}

impl CycleBalancePayload {
    fn normalize(self, cycle_id: DatabaseId) -> Result<CycleBalanceDraft, Error> {
        let payload_cycle_id = positive_id(self.credit_card_cycle_id, "credit_card_cycle_id")?;
        let currency_id = positive_id(self.currency_id, "currency_id")?;

        if payload_cycle_id != cycle_id {
            return Err(Error::invalid("credit_card_cycle_id must match route id"));
        }

        Ok(CycleBalanceDraft {
            currency_id,
            balance: finite_number(self.balance.unwrap_or(0.0), "balance")?,
            paid: self.paid.unwrap_or(false),
        })
    }
}

/// Create the balance of a cycle in one currency.
///
/// # Errors
/// Returns [Error::InvalidPayload] for invalid fields, [Error::NotFound] if
/// the cycle does not exist, [Error::InvalidPayload] for an unknown currency,
/// or [Error::Duplicate] if the cycle already has a balance in the currency.
pub fn create_cycle_balance(
    cycle_id: DatabaseId,
    payload: CycleBalancePayload,
    connection: &Connection,
) -> Result<CreditCardCycleBalance, Error> {
    let draft = payload.normalize(cycle_id)?;
    require_cycle(cycle_id, connection)?;
    check_balance(cycle_id, &draft, None, connection)?;

    connection
        .execute(
            "INSERT INTO credit_card_cycle_balance (credit_card_cycle_id, currency_id, balance, paid)
            VALUES (?1, ?2, ?3, ?4)",
            (cycle_id, draft.currency_id, draft.balance, draft.paid),
        )
        .map_err(write_error)?;
    let id = connection.last_insert_rowid();

    tracing::info!("created balance {id} of credit card cycle {cycle_id}");

    get_cycle_balance(cycle_id, id, connection)
}

/// Retrieve a balance of a cycle.
///
/// # Errors
/// Returns [Error::NotFound] if the cycle does not exist or has no balance with `balance_id`.
pub fn get_cycle_balance(
    cycle_id: DatabaseId,
    balance_id: DatabaseId,
    connection: &Connection,
) -> Result<CreditCardCycleBalance, Error> {
    require_cycle(cycle_id, connection)?;

    connection
        .prepare(
            "SELECT id, credit_card_cycle_id, currency_id, balance, paid
            FROM credit_card_cycle_balance WHERE id = ?1 AND credit_card_cycle_id = ?2",
        )?
        .query_row((balance_id, cycle_id), map_row)
        .optional()?
        .ok_or(Error::NotFound(BALANCE_NAME))
}

/// Retrieve the balances of a cycle ordered by ID.
///
/// # Errors
/// Returns [Error::NotFound] if the cycle does not exist.
pub fn get_cycle_balances(
    cycle_id: DatabaseId,
    connection: &Connection,
) -> Result<Vec<CreditCardCycleBalance>, Error> {
    require_cycle(cycle_id, connection)?;

    connection
        .prepare(
            "SELECT id, credit_card_cycle_id, currency_id, balance, paid
            FROM credit_card_cycle_balance WHERE credit_card_cycle_id = ?1 ORDER BY id ASC",
        )?
        .query_map([cycle_id], map_row)?
        .map(|maybe_balance| maybe_balance.map_err(|error| error.into()))
        .collect()
}

/// Replace a balance of a cycle.
///
/// # Errors
/// Returns the errors of [get_cycle_balance] and [create_cycle_balance].
pub fn update_cycle_balance(
    cycle_id: DatabaseId,
    balance_id: DatabaseId,
    payload: CycleBalancePayload,
    connection: &Connection,
) -> Result<CreditCardCycleBalance, Error> {
    let draft = payload.normalize(cycle_id)?;
    get_cycle_balance(cycle_id, balance_id, connection)?;
    check_balance(cycle_id, &draft, Some(balance_id), connection)?;

    connection
        .execute(
            "UPDATE credit_card_cycle_balance SET currency_id = ?1, balance = ?2, paid = ?3
            WHERE id = ?4 AND credit_card_cycle_id = ?5",
            (draft.currency_id, draft.balance, draft.paid, balance_id, cycle_id),
        )
        .map_err(write_error)?;

    tracing::info!("updated balance {balance_id} of credit card cycle {cycle_id}");

    get_cycle_balance(cycle_id, balance_id, connection)
}

/// Delete a balance of a cycle.
///
/// # Errors
/// Returns [Error::NotFound] if the cycle does not exist or has no balance with `balance_id`.
pub fn delete_cycle_balance(
    cycle_id: DatabaseId,
    balance_id: DatabaseId,
    connection: &Connection,
) -> Result<(), Error> {
    require_cycle(cycle_id, connection)?;

    let rows_affected = connection.execute(
        "DELETE FROM credit_card_cycle_balance WHERE id = ?1 AND credit_card_cycle_id = ?2",
        (balance_id, cycle_id),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound(BALANCE_NAME));
    }

    tracing::info!("deleted balance {balance_id} of credit card cycle {cycle_id}");

    Ok(())
}

fn require_cycle(cycle_id: DatabaseId, connection: &Connection) -> Result<(), Error> {
    if row_exists(connection, CreditCardCycle::TABLE, cycle_id)? {
        Ok(())
    } else {
        Err(Error::NotFound(CreditCardCycle::NAME))
    }
}

fn check_balance(
    cycle_id: DatabaseId,
    draft: &CycleBalanceDraft,
    balance_id: Option<DatabaseId>,
    connection: &Connection,
) -> Result<(), Error> {
    require_reference(connection, "currency", draft.currency_id, "currency must exist")?;

    let is_duplicate: bool = connection
        .prepare(
            "SELECT EXISTS(
                SELECT 1 FROM credit_card_cycle_balance
                WHERE credit_card_cycle_id = ?1 AND currency_id = ?2 AND id IS NOT ?3
            )",
        )?
        .query_row((cycle_id, draft.currency_id, balance_id), |row| row.get(0))?;

    if is_duplicate {
        return Err(Error::Duplicate(DUPLICATE_BALANCE));
    }

    Ok(())
}

fn write_error(error: rusqlite::Error) -> Error {
    match error {
        // Code 2067 occurs when a UNIQUE constraint failed.
        rusqlite::Error::SqliteFailure(sql_error, _) if sql_error.extended_code == 2067 => {
            Error::Duplicate(DUPLICATE_BALANCE)
        }
        // Code 787 occurs when a FOREIGN KEY constraint failed.
        rusqlite::Error::SqliteFailure(sql_error, _) if sql_error.extended_code == 787 => {
            Error::invalid("credit card cycle and currency must exist")
        }
        error => error.into(),
    }
}

fn map_row(row: &Row) -> Result<CreditCardCycleBalance, rusqlite::Error> {
    Ok(CreditCardCycleBalance {
        id: row.get(0)?,
        credit_card_cycle_id: row.get(1)?,
        currency_id: row.get(2)?,
        balance: row.get(3)?,
        paid: row.get(4)?,
    })
}

fn parse_balance_path(raw_cycle_id: &str, raw_balance_id: &str) -> Result<(DatabaseId, DatabaseId), Error> {
    Ok((
        parse_id(raw_cycle_id, CreditCardCycle::NAME)?,
        parse_id(raw_balance_id, BALANCE_NAME)?,
    ))
}

/// List the balances of a cycle.
pub async fn list_cycle_balances_endpoint(
    State(state): State<ResourceState>,
    Path(raw_cycle_id): Path<String>,
) -> Result<Json<Vec<CreditCardCycleBalance>>, Error> {
    let cycle_id = parse_id(&raw_cycle_id, CreditCardCycle::NAME)?;
    let connection = lock_connection(&state.db_connection)?;

    get_cycle_balances(cycle_id, &connection).map(Json)
}

/// Create a balance for a cycle, responding with `201 Created` and its location.
pub async fn create_cycle_balance_endpoint(
    State(state): State<ResourceState>,
    Path(raw_cycle_id): Path<String>,
    JsonPayload(payload): JsonPayload<CycleBalancePayload>,
) -> Result<Response, Error> {
    let cycle_id = parse_id(&raw_cycle_id, CreditCardCycle::NAME)?;
    let connection = lock_connection(&state.db_connection)?;
    let balance = create_cycle_balance(cycle_id, payload, &connection)?;
    let location = format_endpoint(
        &format_endpoint(endpoints::CYCLE_BALANCE, cycle_id),
        balance.id,
    );

    Ok((StatusCode::CREATED, [(LOCATION, location)], Json(balance)).into_response())
}

/// Get a balance of a cycle.
pub async fn get_cycle_balance_endpoint(
    State(state): State<ResourceState>,
    Path((raw_cycle_id, raw_balance_id)): Path<(String, String)>,
) -> Result<Json<CreditCardCycleBalance>, Error> {
    let (cycle_id, balance_id) = parse_balance_path(&raw_cycle_id, &raw_balance_id)?;
    let connection = lock_connection(&state.db_connection)?;

    get_cycle_balance(cycle_id, balance_id, &connection).map(Json)
}

/// Replace a balance of a cycle.
pub async fn update_cycle_balance_endpoint(
    State(state): State<ResourceState>,
    Path((raw_cycle_id, raw_balance_id)): Path<(String, String)>,
    JsonPayload(payload): JsonPayload<CycleBalancePayload>,
) -> Result<Json<CreditCardCycleBalance>, Error> {
    let (cycle_id, balance_id) = parse_balance_path(&raw_cycle_id, &raw_balance_id)?;
    let connection = lock_connection(&state.db_connection)?;

    update_cycle_balance(cycle_id, balance_id, payload, &connection).map(Json)
}

/// Delete a balance of a cycle, responding with `204 No Content`.
pub async fn delete_cycle_balance_endpoint(
    State(state): State<ResourceState>,
    Path((raw_cycle_id, raw_balance_id)): Path<(String, String)>,
) -> Result<StatusCode, Error> {
    let (cycle_id, balance_id) = parse_balance_path(&raw_cycle_id, &raw_balance_id)?;
    let connection = lock_connection(&state.db_connection)?;

    delete_cycle_balance(cycle_id, balance_id, &connection)?;

    Ok(StatusCode::NO_CONTENT)
}


#[cfg(test)]
mod cycle_balance_endpoint_tests {
    use axum::http::StatusCode;
    use serde_json::{Value, json};

    use crate::{
        endpoints::{self, format_endpoint},
        test_utils::{assert_error, get_test_server, must_create},
    };

    #[tokio::test]
    async fn balances_round_trip() {
        let server = get_test_server();
        let bank = must_create(
            &server,
            endpoints::BANKS,
            json!({"name": "Galicia", "country": "AR"}),
        )
        .await;
        let person = must_create(&server, endpoints::PEOPLE, json!({"name": "Ana"})).await;
        let currency = must_create(
            &server,
            endpoints::CURRENCIES,
            json!({"name": "Peso", "code": "ARS"}),
        )
        .await;
        let card = must_create(
            &server,
            endpoints::CREDIT_CARDS,
            json!({"bank_id": bank["id"], "person_id": person["id"], "number": "4111"}),
        )
        .await;
        let cycle = must_create(
            &server,
            endpoints::CREDIT_CARD_CYCLES,
            json!({
                "credit_card_id": card["id"],
                "closing_date": "2025-03-01",
                "due_date": "2025-03-10",
            }),
        )
        .await;
        let cycle_id = cycle["id"].as_i64().unwrap();
        let balances_path = format_endpoint(endpoints::CYCLE_BALANCES, cycle_id);

        let response = server
            .post(&balances_path)
            .json(&json!({
                "credit_card_cycle_id": cycle_id,
                "currency_id": currency["id"],
                "balance": 99.5,
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let balance: Value = response.json();
        let balance_path = format_endpoint(
            &format_endpoint(endpoints::CYCLE_BALANCE, cycle_id),
            balance["id"].as_i64().unwrap(),
        );
        assert_eq!(response.header("location"), balance_path.as_str());
        assert_eq!(balance["paid"], false);

        server
            .put(&balance_path)
            .json(&json!({
                "credit_card_cycle_id": cycle_id,
                "currency_id": currency["id"],
                "balance": 99.5,
                "paid": true,
            }))
            .await
            .assert_status_ok();

        let balances: Value = server.get(&balances_path).await.json();
        assert_eq!(balances[0]["paid"], true);

        let response = server
            .post(&balances_path)
            .json(&json!({"credit_card_cycle_id": cycle_id, "currency_id": currency["id"]}))
            .await;
        assert_error(
            &response,
            StatusCode::CONFLICT,
            "duplicate_credit_card_cycle_balance",
            "credit card cycle and currency combination must be unique",
        );

        server
            .delete(&balance_path)
            .await
            .assert_status(StatusCode::NO_CONTENT);
        let balances: Value = server.get(&balances_path).await.json();
        assert_eq!(balances, json!([]));
    }

    #[tokio::test]
    async fn payload_is_validated_before_cycle_lookup() {
        let server = get_test_server();
        let path = format_endpoint(endpoints::CYCLE_BALANCES, 4);

        let response = server.post(&path).json(&json!({"currency_id": 1})).await;
        assert_error(
            &response,
            StatusCode::BAD_REQUEST,
            "invalid_payload",
            "credit_card_cycle_id must be a positive integer",
        );

        let response = server
            .post(&path)
            .json(&json!({"credit_card_cycle_id": 4, "currency_id": 1}))
            .await;
        assert_error(
            &response,
            StatusCode::NOT_FOUND,
            "not_found",
            "credit card cycle not found",
        );
    }

    #[tokio::test]
    async fn missing_cycle_is_not_found() {
        let server = get_test_server();

        let response = server
            .get(&format_endpoint(endpoints::CYCLE_BALANCES, 4))
            .await;

        assert_error(
            &response,
            StatusCode::NOT_FOUND,
            "not_found",
            "credit card cycle not found",
        );
    }
}
