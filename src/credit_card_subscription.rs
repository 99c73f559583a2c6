//! Recurring charges billed to a credit card every cycle.

use rusqlite::{Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::{
    DatabaseId, Error, endpoints,
    resource::{Conflict, Resource, RowsAffected},
    validation::{positive_amount, positive_id, require_reference, required_text, same_text},
};

/// A subscription charged to a credit card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditCardSubscription {
    /// The ID of the subscription.
    pub id: DatabaseId,
    /// The card the subscription is charged to.
    pub credit_card_id: DatabaseId,
    /// The currency of the charge.
    pub currency_id: DatabaseId,
    /// What the subscription is for, e.g. "Streaming".
    pub concept: String,
    /// The amount charged each cycle.
    pub amount: f64,
}

/// The request body for creating or replacing a credit card subscription.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreditCardSubscriptionPayload {
    /// The card the subscription is charged to.
    pub credit_card_id: DatabaseId,
    /// The currency of the charge.
    pub currency_id: DatabaseId,
    /// What the subscription is for.
    pub concept: String,
    /// The amount charged each cycle.
    pub amount: f64,
}

impl Resource for CreditCardSubscription {
    const NAME: &'static str = "credit card subscription";
    const TABLE: &'static str = "credit_card_subscription";
    const ENDPOINT: &'static str = endpoints::CREDIT_CARD_SUBSCRIPTION;
    const DUPLICATE: Conflict = Conflict {
        code: "duplicate_credit_card_subscription",
        message: "credit card, currency and concept combination must be unique",
    };
    const MISSING_REFERENCE: &'static str = "credit card and currency must exist";

    type Payload = CreditCardSubscriptionPayload;
    type Draft = CreditCardSubscriptionPayload;

    fn id(&self) -> DatabaseId {
        self.id
    }

    fn normalize(
        payload: CreditCardSubscriptionPayload,
    ) -> Result<CreditCardSubscriptionPayload, Error> {
        Ok(CreditCardSubscriptionPayload {
            credit_card_id: positive_id(payload.credit_card_id, "credit_card_id")?,
            currency_id: positive_id(payload.currency_id, "currency_id")?,
            concept: required_text(&payload.concept, "concept")?,
            amount: positive_amount(payload.amount, "amount")?,
        })
    }

    fn check(
        draft: &CreditCardSubscriptionPayload,
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
                "SELECT concept FROM credit_card_subscription
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
        draft: &CreditCardSubscriptionPayload,
        connection: &Connection,
    ) -> Result<DatabaseId, rusqlite::Error> {
        connection.execute(
            "INSERT INTO credit_card_subscription (credit_card_id, currency_id, concept, amount)
            VALUES (?1, ?2, ?3, ?4)",
            (
                draft.credit_card_id,
                draft.currency_id,
                &draft.concept,
                draft.amount,
            ),
        )?;

        Ok(connection.last_insert_rowid())
    }

    fn replace(
        id: DatabaseId,
        draft: &CreditCardSubscriptionPayload,
        connection: &Connection,
    ) -> Result<RowsAffected, rusqlite::Error> {
        connection.execute(
            "UPDATE credit_card_subscription
            SET credit_card_id = ?1, currency_id = ?2, concept = ?3, amount = ?4
            WHERE id = ?5",
            (
                draft.credit_card_id,
                draft.currency_id,
                &draft.concept,
                draft.amount,
                id,
            ),
        )
    }

    fn select(id: DatabaseId, connection: &Connection) -> Result<Option<Self>, rusqlite::Error> {
        connection
            .prepare(
                "SELECT id, credit_card_id, currency_id, concept, amount
                FROM credit_card_subscription WHERE id = ?1",
            )?
            .query_row([id], map_row)
            .optional()
    }

    fn select_all(connection: &Connection) -> Result<Vec<Self>, rusqlite::Error> {
        connection
            .prepare(
                "SELECT id, credit_card_id, currency_id, concept, amount
                FROM credit_card_subscription ORDER BY id ASC",
            )?
            .query_map([], map_row)?
            .collect()
    }
}

/// Create the credit card subscription table.
pub fn create_credit_card_subscription_table(
    connection: &Connection,
) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS credit_card_subscription (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            credit_card_id INTEGER NOT NULL REFERENCES credit_card(id),
            currency_id INTEGER NOT NULL REFERENCES currency(id),
            concept TEXT NOT NULL,
            amount REAL NOT NULL CHECK (amount > 0),
            UNIQUE (credit_card_id, currency_id, concept COLLATE NOCASE)
        );",
    )?;

    Ok(())
}

fn map_row(row: &Row) -> Result<CreditCardSubscription, rusqlite::Error> {
    Ok(CreditCardSubscription {
        id: row.get(0)?,
        credit_card_id: row.get(1)?,
        currency_id: row.get(2)?,
        concept: row.get(3)?,
        amount: row.get(4)?,
    })
}
