//! The credit card resource.

use std::collections::{BTreeMap, BTreeSet};

use rusqlite::{Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::{
    DatabaseId, Error,
    credit_card::currencies::{
        normalize_currency_ids, reconcile_currencies, require_currencies, select_currency_ids,
    },
    endpoints,
    resource::{Conflict, Dependent, Resource, RowsAffected},
    validation::{optional_text, positive_id, require_reference, required_text, same_text},
};

/// A credit card issued by a bank to a person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditCard {
    /// The ID of the card.
    pub id: DatabaseId,
    /// The issuing bank.
    pub bank_id: DatabaseId,
    /// The card holder.
    pub person_id: DatabaseId,
    /// The card number, unique across all cards.
    pub number: String,
    /// An optional nickname for the card.
    pub name: Option<String>,
    /// The currencies the card can be charged in, in ascending order.
    pub currency_ids: Vec<DatabaseId>,
}

/// The request body for creating or replacing a credit card.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreditCardPayload {
    /// The issuing bank.
    pub bank_id: DatabaseId,
    /// The card holder.
    pub person_id: DatabaseId,
    /// The card number.
    pub number: String,
    /// An optional nickname, stored as `null` when blank.
    pub name: Option<String>,
    /// The currencies of the card.
    ///
    /// The card's links are replaced with this set, so omitting it or sending
    /// `null` leaves the card with no currencies.
    pub currency_ids: Option<Vec<DatabaseId>>,
}

/// A validated [CreditCardPayload].
#[derive(Debug)]
pub struct CreditCardDraft {
    bank_id: DatabaseId,
    person_id: DatabaseId,
    number: String,
    name: Option<String>,
    currency_ids: BTreeSet<DatabaseId>,
}

impl Resource for CreditCard {
    const NAME: &'static str = "credit card";
    const TABLE: &'static str = "credit_card";
    const ENDPOINT: &'static str = endpoints::CREDIT_CARD;
    const DUPLICATE: Conflict = Conflict {
        code: "duplicate_credit_card",
        message: "credit card number must be unique",
    };
    const IN_USE: Conflict = Conflict {
        code: "credit_card_in_use",
        message: "credit card is in use",
    };
    const MISSING_REFERENCE: &'static str = "bank and person must exist";
    const DEPENDENTS: &'static [Dependent] = &[
        Dependent::new("credit_card_cycle", "credit_card_id"),
        Dependent::new("credit_card_installment", "credit_card_id"),
        Dependent::new("credit_card_subscription", "credit_card_id"),
    ];

    type Payload = CreditCardPayload;
    type Draft = CreditCardDraft;

    fn id(&self) -> DatabaseId {
        self.id
    }

    fn normalize(payload: CreditCardPayload) -> Result<CreditCardDraft, Error> {
        Ok(CreditCardDraft {
            bank_id: positive_id(payload.bank_id, "bank_id")?,
            person_id: positive_id(payload.person_id, "person_id")?,
            number: required_text(&payload.number, "number")?,
            name: optional_text(payload.name.as_deref()),
            currency_ids: normalize_currency_ids(
                payload.currency_ids.as_deref().unwrap_or_default(),
            )?,
        })
    }

    fn check(
        draft: &CreditCardDraft,
        id: Option<DatabaseId>,
        connection: &Connection,
    ) -> Result<(), Error> {
        require_reference(connection, "bank", draft.bank_id, "bank must exist")?;
        require_reference(connection, "person", draft.person_id, "person must exist")?;

        require_currencies(&draft.currency_ids, connection)?;

        let is_duplicate = connection
            .prepare("SELECT number FROM credit_card WHERE id IS NOT ?1")?
            .query_map([id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?
            .iter()
            .any(|number| same_text(number, &draft.number));

        if is_duplicate {
            return Err(Error::Duplicate(Self::DUPLICATE));
        }

        Ok(())
    }

    fn insert(draft: &CreditCardDraft, connection: &Connection) -> Result<DatabaseId, rusqlite::Error> {
        connection.execute(
            "INSERT INTO credit_card (bank_id, person_id, number, name) VALUES (?1, ?2, ?3, ?4)",
            (draft.bank_id, draft.person_id, &draft.number, &draft.name),
        )?;
        let id = connection.last_insert_rowid();
        reconcile_currencies(id, &draft.currency_ids, connection)?;

        Ok(id)
    }

    fn replace(
        id: DatabaseId,
        draft: &CreditCardDraft,
        connection: &Connection,
    ) -> Result<RowsAffected, rusqlite::Error> {
        let rows_affected = connection.execute(
            "UPDATE credit_card SET bank_id = ?1, person_id = ?2, number = ?3, name = ?4
            WHERE id = ?5",
            (draft.bank_id, draft.person_id, &draft.number, &draft.name, id),
        )?;

        if rows_affected > 0 {
            reconcile_currencies(id, &draft.currency_ids, connection)?;
        }

        Ok(rows_affected)
    }

    fn select(id: DatabaseId, connection: &Connection) -> Result<Option<Self>, rusqlite::Error> {
        let card = connection
            .prepare("SELECT id, bank_id, person_id, number, name FROM credit_card WHERE id = ?1")?
            .query_row([id], map_row)
            .optional()?;

        let Some(mut card) = card else {
            return Ok(None);
        };
        card.currency_ids = select_currency_ids(card.id, connection)?;

        Ok(Some(card))
    }

    fn select_all(connection: &Connection) -> Result<Vec<Self>, rusqlite::Error> {
        let mut currency_ids: BTreeMap<DatabaseId, Vec<DatabaseId>> = BTreeMap::new();
        let mut links = connection.prepare(
            "SELECT credit_card_id, currency_id FROM credit_card_currency
            ORDER BY credit_card_id ASC, currency_id ASC",
        )?;
        for link in links.query_map([], |row| {
            Ok((row.get::<_, DatabaseId>(0)?, row.get::<_, DatabaseId>(1)?))
        })? {
            let (card_id, currency_id) = link?;
            currency_ids.entry(card_id).or_default().push(currency_id);
        }

        connection
            .prepare("SELECT id, bank_id, person_id, number, name FROM credit_card ORDER BY id ASC")?
            .query_map([], map_row)?
            .map(|maybe_card| {
                maybe_card.map(|mut card| {
                    card.currency_ids = currency_ids.remove(&card.id).unwrap_or_default();
                    card
                })
            })
            .collect()
    }
}

/// Create the credit card table and the table linking cards to currencies.
pub fn create_credit_card_tables(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS credit_card (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            bank_id INTEGER NOT NULL REFERENCES bank(id),
            person_id INTEGER NOT NULL REFERENCES person(id),
            number TEXT NOT NULL UNIQUE COLLATE NOCASE,
            name TEXT
        );

        CREATE TABLE IF NOT EXISTS credit_card_currency (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            credit_card_id INTEGER NOT NULL REFERENCES credit_card(id) ON DELETE CASCADE,
            currency_id INTEGER NOT NULL REFERENCES currency(id),
            UNIQUE (credit_card_id, currency_id)
        );",
    )?;

    Ok(())
}

fn map_row(row: &Row) -> Result<CreditCard, rusqlite::Error> {
    Ok(CreditCard {
        id: row.get(0)?,
        bank_id: row.get(1)?,
        person_id: row.get(2)?,
        number: row.get(3)?,
        name: row.get(4)?,
        currency_ids: Vec::new(),
    })
}
