//! Banks, identified by their name and the country they operate in.

use rusqlite::{Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::{
    DatabaseId, Error,
    country::country_exists,
    endpoints,
    resource::{Conflict, Dependent, Resource, RowsAffected},
    validation::{required_text, same_text},
};

/// A bank that holds accounts and issues credit cards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bank {
    /// The ID of the bank.
    pub id: DatabaseId,
    /// The name of the bank.
    pub name: String,
    /// The ISO code of the country the bank is in.
    pub country: String,
}

/// The request body for creating or replacing a bank.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BankPayload {
    /// The name of the bank.
    pub name: String,
    /// The ISO code of a seeded country, in any case.
    pub country: String,
}

impl Resource for Bank {
    const NAME: &'static str = "bank";
    const TABLE: &'static str = "bank";
    const ENDPOINT: &'static str = endpoints::BANK;
    const DUPLICATE: Conflict = Conflict {
        code: "duplicate_bank",
        message: "name and country combination must be unique",
    };
    const IN_USE: Conflict = Conflict {
        code: "bank_in_use",
        message: "bank is in use",
    };
    const MISSING_REFERENCE: &'static str = "country must exist";
    const DEPENDENTS: &'static [Dependent] = &[
        Dependent::new("bank_account", "bank_id"),
        Dependent::new("credit_card", "bank_id"),
    ];

    type Payload = BankPayload;
    type Draft = BankPayload;

    fn id(&self) -> DatabaseId {
        self.id
    }

    fn normalize(payload: BankPayload) -> Result<BankPayload, Error> {
        Ok(BankPayload {
            name: required_text(&payload.name, "name")?,
            country: required_text(&payload.country, "country")?.to_uppercase(),
        })
    }

    fn check(
        draft: &BankPayload,
        id: Option<DatabaseId>,
        connection: &Connection,
    ) -> Result<(), Error> {
        if !country_exists(&draft.country, connection)? {
            return Err(Error::invalid(Self::MISSING_REFERENCE));
        }

        let is_duplicate = connection
            .prepare("SELECT id, name, country FROM bank WHERE country = ?1 AND id IS NOT ?2")?
            .query_map((&draft.country, id), map_row)?
            .collect::<Result<Vec<_>, _>>()?
            .iter()
            .any(|bank| same_text(&bank.name, &draft.name));

        if is_duplicate {
            return Err(Error::Duplicate(Self::DUPLICATE));
        }

        Ok(())
    }

    fn insert(draft: &BankPayload, connection: &Connection) -> Result<DatabaseId, rusqlite::Error> {
        connection.execute(
            "INSERT INTO bank (name, country) VALUES (?1, ?2)",
            (&draft.name, &draft.country),
        )?;

        Ok(connection.last_insert_rowid())
    }

    fn replace(
        id: DatabaseId,
        draft: &BankPayload,
        connection: &Connection,
    ) -> Result<RowsAffected, rusqlite::Error> {
        connection.execute(
            "UPDATE bank SET name = ?1, country = ?2 WHERE id = ?3",
            (&draft.name, &draft.country, id),
        )
    }

    fn select(id: DatabaseId, connection: &Connection) -> Result<Option<Self>, rusqlite::Error> {
        connection
            .prepare("SELECT id, name, country FROM bank WHERE id = ?1")?
            .query_row([id], map_row)
            .optional()
    }

    fn select_all(connection: &Connection) -> Result<Vec<Self>, rusqlite::Error> {
        connection
            .prepare("SELECT id, name, country FROM bank ORDER BY id ASC")?
            .query_map([], map_row)?
            .collect()
    }
}

/// Create the bank table.
pub fn create_bank_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS bank (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            country TEXT NOT NULL REFERENCES country(code),
            UNIQUE (name COLLATE NOCASE, country)
        );",
    )?;

    Ok(())
}

fn map_row(row: &Row) -> Result<Bank, rusqlite::Error> {
    Ok(Bank {
        id: row.get(0)?,
        name: row.get(1)?,
        country: row.get(2)?,
    })
}
