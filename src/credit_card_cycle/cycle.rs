//! The credit card cycle resource.

use rusqlite::{Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    DatabaseId, Error, endpoints,
    resource::{Conflict, Resource, RowsAffected},
    validation::{iso_date, positive_id, require_reference},
};

/// A billing period of a credit card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditCardCycle {
    /// The ID of the cycle.
    pub id: DatabaseId,
    /// The card the cycle belongs to.
    pub credit_card_id: DatabaseId,
    /// The last day of purchases billed in this cycle.
    pub closing_date: Date,
    /// The day payment is due, never before the closing date.
    pub due_date: Date,
}

/// The request body for creating or replacing a credit card cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreditCardCyclePayload {
    /// The card the cycle belongs to.
    pub credit_card_id: DatabaseId,
    /// The closing date as `YYYY-MM-DD`.
    pub closing_date: String,
    /// The due date as `YYYY-MM-DD`.
    pub due_date: String,
}

/// A validated [CreditCardCyclePayload].
#[derive(Debug)]
pub struct CreditCardCycleDraft {
    credit_card_id: DatabaseId,
    closing_date: Date,
    due_date: Date,
}

impl Resource for CreditCardCycle {
    const NAME: &'static str = "credit card cycle";
    const TABLE: &'static str = "credit_card_cycle";
    const ENDPOINT: &'static str = endpoints::CREDIT_CARD_CYCLE;
    const DUPLICATE: Conflict = Conflict {
        code: "duplicate_credit_card_cycle",
        message: "credit card cycle already exists",
    };
    const MISSING_REFERENCE: &'static str = "credit card must exist";

    type Payload = CreditCardCyclePayload;
    type Draft = CreditCardCycleDraft;

    fn id(&self) -> DatabaseId {
        self.id
    }

    fn normalize(payload: CreditCardCyclePayload) -> Result<CreditCardCycleDraft, Error> {
        let credit_card_id = positive_id(payload.credit_card_id, "credit_card_id")?;
        let closing_date = iso_date(&payload.closing_date, "closing_date")?;
        let due_date = iso_date(&payload.due_date, "due_date")?;

        if due_date < closing_date {
            return Err(Error::invalid("due_date must be on or after closing_date"));
        }

        Ok(CreditCardCycleDraft {
            credit_card_id,
            closing_date,
            due_date,
        })
    }

    fn check(
        draft: &CreditCardCycleDraft,
        id: Option<DatabaseId>,
        connection: &Connection,
    ) -> Result<(), Error> {
        require_reference(
            connection,
            "credit_card",
            draft.credit_card_id,
            Self::MISSING_REFERENCE,
        )?;

        let is_duplicate: bool = connection
            .prepare(
                "SELECT EXISTS(
                    SELECT 1 FROM credit_card_cycle
                    WHERE credit_card_id = ?1 AND closing_date = ?2 AND due_date = ?3
                    AND id IS NOT ?4
                )",
            )?
            .query_row(
                (draft.credit_card_id, draft.closing_date, draft.due_date, id),
                |row| row.get(0),
            )?;

        if is_duplicate {
            return Err(Error::Duplicate(Self::DUPLICATE));
        }

        Ok(())
    }

    fn insert(
        draft: &CreditCardCycleDraft,
        connection: &Connection,
    ) -> Result<DatabaseId, rusqlite::Error> {
        connection.execute(
            "INSERT INTO credit_card_cycle (credit_card_id, closing_date, due_date)
            VALUES (?1, ?2, ?3)",
            (draft.credit_card_id, draft.closing_date, draft.due_date),
        )?;

        Ok(connection.last_insert_rowid())
    }

    fn replace(
        id: DatabaseId,
        draft: &CreditCardCycleDraft,
        connection: &Connection,
    ) -> Result<RowsAffected, rusqlite::Error> {
        connection.execute(
            "UPDATE credit_card_cycle SET credit_card_id = ?1, closing_date = ?2, due_date = ?3
            WHERE id = ?4",
            (draft.credit_card_id, draft.closing_date, draft.due_date, id),
        )
    }

    fn select(id: DatabaseId, connection: &Connection) -> Result<Option<Self>, rusqlite::Error> {
        connection
            .prepare(
                "SELECT id, credit_card_id, closing_date, due_date
                FROM credit_card_cycle WHERE id = ?1",
            )?
            .query_row([id], map_row)
            .optional()
    }

    fn select_all(connection: &Connection) -> Result<Vec<Self>, rusqlite::Error> {
        connection
            .prepare(
                "SELECT id, credit_card_id, closing_date, due_date
                FROM credit_card_cycle ORDER BY id ASC",
            )?
            .query_map([], map_row)?
            .collect()
    }
}

/// Create the credit card cycle table and the table of cycle balances.
///
/// Balances belong to their cycle and are deleted with it.
pub fn create_credit_card_cycle_tables(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS credit_card_cycle (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            credit_card_id INTEGER NOT NULL REFERENCES credit_card(id),
            closing_date TEXT NOT NULL,
            due_date TEXT NOT NULL,
            UNIQUE (credit_card_id, closing_date, due_date),
            CHECK (due_date >= closing_date)
        );

        CREATE TABLE IF NOT EXISTS credit_card_cycle_balance (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            credit_card_cycle_id INTEGER NOT NULL
                REFERENCES credit_card_cycle(id) ON DELETE CASCADE,
            currency_id INTEGER NOT NULL REFERENCES currency(id),
            balance REAL NOT NULL DEFAULT 0,
            paid INTEGER NOT NULL DEFAULT 0,
            UNIQUE (credit_card_cycle_id, currency_id)
        );",
    )?;

    Ok(())
}

fn map_row(row: &Row) -> Result<CreditCardCycle, rusqlite::Error> {
    Ok(CreditCardCycle {
        id: row.get(0)?,
        credit_card_id: row.get(1)?,
        closing_date: row.get(2)?,
        due_date: row.get(3)?,
    })
}

#[cfg(test)]
mod credit_card_cycle_tests {
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        DatabaseId, Error,
        resource::{Resource, create, delete, list, update},
        test_utils::get_test_connection,
    };

    use super::{CreditCardCycle, CreditCardCyclePayload};

    fn insert_card(connection: &Connection) -> DatabaseId {
        connection
            .execute_batch(
                "INSERT INTO bank (name, country) VALUES ('Galicia', 'AR');
                INSERT INTO person (name) VALUES ('Ana');
                INSERT INTO credit_card (bank_id, person_id, number) VALUES (1, 1, '4111');",
            )
            .expect("Could not insert test card");

        connection.last_insert_rowid()
    }

    fn payload(credit_card_id: DatabaseId, closing: &str, due: &str) -> CreditCardCyclePayload {
        CreditCardCyclePayload {
            credit_card_id,
            closing_date: closing.to_owned(),
            due_date: due.to_owned(),
        }
    }

    #[test]
    fn create_parses_dates() {
        let connection = get_test_connection();
        let card_id = insert_card(&connection);

        let cycle =
            create::<CreditCardCycle>(payload(card_id, "2025-01-28", "2025-02-10"), &connection)
                .expect("Could not create cycle");

        assert_eq!(cycle.closing_date, date!(2025 - 01 - 28));
        assert_eq!(cycle.due_date, date!(2025 - 02 - 10));
    }

    #[test]
    fn due_date_before_closing_date_is_rejected_and_not_stored() {
        let connection = get_test_connection();
        let card_id = insert_card(&connection);

        let result =
            create::<CreditCardCycle>(payload(card_id, "2025-02-10", "2025-02-09"), &connection);

        assert_eq!(
            result,
            Err(Error::invalid("due_date must be on or after closing_date"))
        );
        assert_eq!(list::<CreditCardCycle>(&connection), Ok(vec![]));
    }

    #[test]
    fn same_day_due_date_is_allowed() {
        let connection = get_test_connection();
        let card_id = insert_card(&connection);

        let result =
            create::<CreditCardCycle>(payload(card_id, "2025-02-10", "2025-02-10"), &connection);

        assert!(result.is_ok(), "{result:?}");
    }

    #[test]
    fn invalid_dates_are_rejected() {
        let connection = get_test_connection();
        let card_id = insert_card(&connection);

        assert_eq!(
            create::<CreditCardCycle>(payload(card_id, "2025-13-01", "2025-02-10"), &connection),
            Err(Error::invalid(
                "closing_date must be a valid date in YYYY-MM-DD format"
            ))
        );
        assert_eq!(
            create::<CreditCardCycle>(payload(card_id, "2025-02-01", "tomorrow"), &connection),
            Err(Error::invalid(
                "due_date must be a valid date in YYYY-MM-DD format"
            ))
        );
    }

    #[test]
    fn missing_card_is_rejected() {
        let connection = get_test_connection();

        let result = create::<CreditCardCycle>(payload(3, "2025-02-01", "2025-02-10"), &connection);

        assert_eq!(result, Err(Error::invalid("credit card must exist")));
    }

    #[test]
    fn duplicate_cycle_is_rejected() {
        let connection = get_test_connection();
        let card_id = insert_card(&connection);
        create::<CreditCardCycle>(payload(card_id, "2025-02-01", "2025-02-10"), &connection)
            .unwrap();

        let result =
            create::<CreditCardCycle>(payload(card_id, "2025-02-01", "2025-02-10"), &connection);

        assert_eq!(result, Err(Error::Duplicate(CreditCardCycle::DUPLICATE)));
    }

    #[test]
    fn update_can_move_dates() {
        let connection = get_test_connection();
        let card_id = insert_card(&connection);
        let cycle =
            create::<CreditCardCycle>(payload(card_id, "2025-02-01", "2025-02-10"), &connection)
                .unwrap();

        let updated = update::<CreditCardCycle>(
            cycle.id,
            payload(card_id, "2025-02-02", "2025-02-12"),
            &connection,
        )
        .expect("Could not update cycle");

        assert_eq!(updated.due_date, date!(2025 - 02 - 12));
    }

    #[test]
    fn delete_removes_balances() {
        let connection = get_test_connection();
        let card_id = insert_card(&connection);
        let cycle =
            create::<CreditCardCycle>(payload(card_id, "2025-02-01", "2025-02-10"), &connection)
                .unwrap();
        connection
            .execute_batch(
                "INSERT INTO currency (name, code) VALUES ('Peso', 'ARS');
                INSERT INTO credit_card_cycle_balance (credit_card_cycle_id, currency_id, balance)
                VALUES (1, 1, 100);",
            )
            .unwrap();

        assert_eq!(delete::<CreditCardCycle>(cycle.id, &connection), Ok(()));

        let balances: i64 = connection
            .query_row(
                "SELECT COUNT(*) FROM credit_card_cycle_balance",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(balances, 0);
    }
}
