//! Purchases paid off in a fixed number of monthly installments on a credit card.

use rusqlite::{Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    DatabaseId, Error, endpoints,
    resource::{Conflict, Resource, RowsAffected},
    validation::{iso_date, positive_amount, positive_id, require_reference, required_text, same_text},
};

/// A purchase split into installments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditCardInstallment {
    /// The ID of the installment plan.
    pub id: DatabaseId,
    /// The card the purchase was made with.
    pub credit_card_id: DatabaseId,
    /// The currency of the purchase.
    pub currency_id: DatabaseId,
    /// What was bought.
    pub concept: String,
    /// The amount of each installment.
    pub amount: f64,
    /// The date of the first installment.
    pub start_date: Date,
    /// The number of installments.
    pub count: i64,
}

/// The request body for creating or replacing a credit card installment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreditCardInstallmentPayload {
    /// The card the purchase was made with.
    pub credit_card_id: DatabaseId,
    /// The currency of the purchase.
    pub currency_id: DatabaseId,
    /// What was bought.
    pub concept: String,
    /// The amount of each installment.
    pub amount: f64,
    /// The date of the first installment as `YYYY-MM-DD`.
    pub start_date: String,
    /// The number of installments.
    pub count: i64,
}

/// A validated [CreditCardInstallmentPayload].
#[derive(Debug)]
pub struct CreditCardInstallmentDraft {
    credit_card_id: DatabaseId,
    currency_id: DatabaseId,
    concept: String,
    amount: f64,
    start_date: Date,
    count: i64,
}

impl Resource for CreditCardInstallment {
    const NAME: &'static str = "credit card installment";
    const TABLE: &'static str = "credit_card_installment";
    const ENDPOINT: &'static str = endpoints::CREDIT_CARD_INSTALLMENT;
    const DUPLICATE: Conflict = Conflict {
        code: "duplicate_credit_card_installment",
        message: "credit card, currency and concept combination must be unique",
    };
    const MISSING_REFERENCE: &'static str = "credit card and currency must exist";

    type Payload = CreditCardInstallmentPayload;
    type Draft = CreditCardInstallmentDraft;

    fn id(&self) -> DatabaseId {
        self.id
    }

    fn normalize(
        payload: CreditCardInstallmentPayload,
    ) -> Result<CreditCardInstallmentDraft, Error> {
        let credit_card_id = positive_id(payload.credit_card_id, "credit_card_id")?;
        let currency_id = positive_id(payload.currency_id, "currency_id")?;
        let concept = required_text(&payload.concept, "concept")?;
        let amount = positive_amount(payload.amount, "amount")?;
        let start_date = iso_date(&payload.start_date, "start_date")?;

        if payload.count <= 0 {
            return Err(Error::invalid("count must be greater than zero"));
        }

        Ok(CreditCardInstallmentDraft {
            credit_card_id,
            currency_id,
            concept,
            amount,
            start_date,
            count: payload.count,
        })
    }

    fn check(
        draft: &CreditCardInstallmentDraft,
        id: Option<DatabaseId>,
        connection: &Connection,
    ) -> Result<(), Error> {
        require_reference(
            connection,
            "credit_card",
            draft.credit_card_id,
            "credit card must exist",
        )?;
        require_reference(connection, "currency", draft.currency_id, "currency must exist")?;

        let is_duplicate = connection
            .prepare(
                "SELECT concept FROM credit_card_installment
                WHERE credit_card_id = ?1 AND currency_id = ?2 AND id IS NOT ?3",
            )?
            .query_map((draft.credit_card_id, draft.currency_id, id), |row| {
                row.get::<_, String>(0)
            })?
            .collect::<Result<Vec<_>, _>>()?
            .iter()
            .any(|concept| same_text(concept, &draft.concept));

        if is_duplicate {
            return Err(Error::Duplicate(Self::DUPLICATE));
        }

        Ok(())
    }

    fn insert(
        draft: &CreditCardInstallmentDraft,
        connection: &Connection,
    ) -> Result<DatabaseId, rusqlite::Error> {
        connection.execute(
            "INSERT INTO credit_card_installment
            (credit_card_id, currency_id, concept, amount, start_date, count)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            (
                draft.credit_card_id,
                draft.currency_id,
                &draft.concept,
                draft.amount,
                draft.start_date,
                draft.count,
            ),
        )?;

        Ok(connection.last_insert_rowid())
    }

    fn replace(
        id: DatabaseId,
        draft: &CreditCardInstallmentDraft,
        connection: &Connection,
    ) -> Result<RowsAffected, rusqlite::Error> {
        connection.execute(
            "UPDATE credit_card_installment
            SET credit_card_id = ?1, currency_id = ?2, concept = ?3, amount = ?4,
                start_date = ?5, count = ?6
            WHERE id = ?7",
            (
                draft.credit_card_id,
                draft.currency_id,
                &draft.concept,
                draft.amount,
                draft.start_date,
                draft.count,
                id,
            ),
        )
    }

    fn select(id: DatabaseId, connection: &Connection) -> Result<Option<Self>, rusqlite::Error> {
        connection
            .prepare(
                "SELECT id, credit_card_id, currency_id, concept, amount, start_date, count
                FROM credit_card_installment WHERE id = ?1",
            )?
            .query_row([id], map_row)
            .optional()
    }

    fn select_all(connection: &Connection) -> Result<Vec<Self>, rusqlite::Error> {
        connection
            .prepare(
                "SELECT id, credit_card_id, currency_id, concept, amount, start_date, count
                FROM credit_card_installment ORDER BY id ASC",
            )?
            .query_map([], map_row)?
            .collect()
    }
}

/// Create the credit card installment table.
pub fn create_credit_card_installment_table(
    connection: &Connection,
) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS credit_card_installment (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            credit_card_id INTEGER NOT NULL REFERENCES credit_card(id),
            currency_id INTEGER NOT NULL REFERENCES currency(id),
            concept TEXT NOT NULL,
            amount REAL NOT NULL CHECK (amount > 0),
            start_date TEXT NOT NULL,
            count INTEGER NOT NULL CHECK (count > 0),
            UNIQUE (credit_card_id, currency_id, concept COLLATE NOCASE)
        );",
    )?;

    Ok(())
}

fn map_row(row: &Row) -> Result<CreditCardInstallment, rusqlite::Error> {
    Ok(CreditCardInstallment {
        id: row.get(0)?,
        credit_card_id: row.get(1)?,
        currency_id: row.get(2)?,
        concept: row.get(3)?,
        amount: row.get(4)?,
        start_date: row.get(5)?,
        count: row.get(6)?,
    })
}

#[cfg(test)]
mod credit_card_installment_tests {
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        CreditCard, DatabaseId, Error,
        resource::{Resource, create, delete, get, update},
        test_utils::get_test_connection,
    };

    use super::{CreditCardInstallment, CreditCardInstallmentPayload};

    /// Insert one credit card and the currencies 1 (ARS) and 2 (USD).
    fn insert_card_and_currencies(connection: &Connection) {
        connection
            .execute_batch(
                "INSERT INTO bank (name, country) VALUES ('Galicia', 'AR');
                INSERT INTO person (name) VALUES ('Ana');
                INSERT INTO credit_card (bank_id, person_id, number) VALUES (1, 1, '4111');
                INSERT INTO currency (name, code) VALUES ('Peso', 'ARS');
                INSERT INTO currency (name, code) VALUES ('Dollar', 'USD');",
            )
            .expect("Could not insert test data");
    }

    fn payload(currency_id: DatabaseId, concept: &str) -> CreditCardInstallmentPayload {
        CreditCardInstallmentPayload {
            credit_card_id: 1,
            currency_id,
            concept: concept.to_owned(),
            amount: 12500.0,
            start_date: "2025-04-05".to_owned(),
            count: 6,
        }
    }

    #[test]
    fn create_succeeds() {
        let connection = get_test_connection();
        insert_card_and_currencies(&connection);

        let installment =
            create::<CreditCardInstallment>(payload(1, "  Refrigerator "), &connection)
                .expect("Could not create installment");

        assert_eq!(installment.concept, "Refrigerator");
        assert_eq!(installment.start_date, date!(2025 - 04 - 05));
        assert_eq!(installment.count, 6);
        assert_eq!(
            get::<CreditCardInstallment>(installment.id, &connection),
            Ok(installment)
        );
    }

    #[test]
    fn create_fails_on_invalid_fields() {
        let connection = get_test_connection();
        insert_card_and_currencies(&connection);

        let cases = [
            (
                CreditCardInstallmentPayload {
                    credit_card_id: 0,
                    ..payload(1, "TV")
                },
                "credit_card_id must be a positive integer",
            ),
            (payload(0, "TV"), "currency_id must be a positive integer"),
            (payload(1, " "), "concept is required"),
            (
                CreditCardInstallmentPayload {
                    amount: 0.0,
                    ..payload(1, "TV")
                },
                "amount must be greater than zero",
            ),
            (
                CreditCardInstallmentPayload {
                    start_date: "2025-02-30".to_owned(),
                    ..payload(1, "TV")
                },
                "start_date must be a valid date in YYYY-MM-DD format",
            ),
            (
                CreditCardInstallmentPayload {
                    count: 0,
                    ..payload(1, "TV")
                },
                "count must be greater than zero",
            ),
        ];

        for (payload, message) in cases {
            assert_eq!(
                create::<CreditCardInstallment>(payload, &connection),
                Err(Error::invalid(message))
            );
        }
    }

    #[test]
    fn create_fails_on_missing_references() {
        let connection = get_test_connection();
        insert_card_and_currencies(&connection);

        assert_eq!(
            create::<CreditCardInstallment>(
                CreditCardInstallmentPayload {
                    credit_card_id: 7,
                    ..payload(1, "TV")
                },
                &connection
            ),
            Err(Error::invalid("credit card must exist"))
        );
        assert_eq!(
            create::<CreditCardInstallment>(payload(7, "TV"), &connection),
            Err(Error::invalid("currency must exist"))
        );
    }

    #[test]
    fn same_concept_is_unique_per_card_and_currency() {
        let connection = get_test_connection();
        insert_card_and_currencies(&connection);
        create::<CreditCardInstallment>(payload(1, "TV"), &connection).unwrap();

        let duplicate = create::<CreditCardInstallment>(payload(1, "tv"), &connection);
        let other_currency = create::<CreditCardInstallment>(payload(2, "TV"), &connection);

        assert_eq!(
            duplicate,
            Err(Error::Duplicate(CreditCardInstallment::DUPLICATE))
        );
        assert!(other_currency.is_ok(), "{other_currency:?}");
    }

    #[test]
    fn update_can_change_currency() {
        let connection = get_test_connection();
        insert_card_and_currencies(&connection);
        let installment = create::<CreditCardInstallment>(payload(1, "TV"), &connection).unwrap();

        let updated = update::<CreditCardInstallment>(installment.id, payload(2, "TV"), &connection)
            .expect("Could not update installment");

        assert_eq!(updated.currency_id, 2);
    }

    #[test]
    fn update_of_missing_installment_is_not_found() {
        let connection = get_test_connection();
        insert_card_and_currencies(&connection);

        assert_eq!(
            update::<CreditCardInstallment>(3, payload(1, "TV"), &connection),
            Err(Error::NotFound("credit card installment"))
        );
    }

    #[test]
    fn installment_blocks_deleting_its_card() {
        let connection = get_test_connection();
        insert_card_and_currencies(&connection);
        let installment = create::<CreditCardInstallment>(payload(1, "TV"), &connection).unwrap();

        assert_eq!(
            delete::<CreditCard>(1, &connection),
            Err(Error::InUse(CreditCard::IN_USE))
        );

        delete::<CreditCardInstallment>(installment.id, &connection).unwrap();
        assert_eq!(delete::<CreditCard>(1, &connection), Ok(()));
    }
}
