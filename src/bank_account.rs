//! Bank accounts, each held at one bank in one currency.

use rusqlite::{Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::{
    DatabaseId, Error, endpoints,
    resource::{Conflict, Dependent, Resource, RowsAffected},
    validation::{finite_number, positive_id, require_reference, required_text, same_text},
};

/// An account at a bank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankAccount {
    /// The ID of the account.
    pub id: DatabaseId,
    /// The bank holding the account.
    pub bank_id: DatabaseId,
    /// The currency of the account.
    pub currency_id: DatabaseId,
    /// The account number as printed by the bank.
    pub account_number: String,
    /// The current balance, which may be negative.
    pub balance: f64,
}

/// The request body for creating or replacing a bank account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BankAccountPayload {
    /// The bank holding the account.
    pub bank_id: DatabaseId,
    /// The currency of the account.
    pub currency_id: DatabaseId,
    /// The account number as printed by the bank.
    pub account_number: String,
    /// The current balance, zero when omitted.
    pub balance: f64,
}

impl Resource for BankAccount {
    const NAME: &'static str = "bank account";
    const TABLE: &'static str = "bank_account";
    const ENDPOINT: &'static str = endpoints::BANK_ACCOUNT;
    const DUPLICATE: Conflict = Conflict {
        code: "duplicate_bank_account",
        message: "bank, currency and account number combination must be unique",
    };
    const IN_USE: Conflict = Conflict {
        code: "bank_account_in_use",
        message: "bank account is in use",
    };
    const MISSING_REFERENCE: &'static str = "bank and currency must exist";
    const DEPENDENTS: &'static [Dependent] =
        &[Dependent::new("\"transaction\"", "bank_account_id")];

    type Payload = BankAccountPayload;
    type Draft = BankAccountPayload;

    fn id(&self) -> DatabaseId {
        self.id
    }

    fn normalize(payload: BankAccountPayload) -> Result<BankAccountPayload, Error> {
        Ok(BankAccountPayload {
            bank_id: positive_id(payload.bank_id, "bank_id")?,
            currency_id: positive_id(payload.currency_id, "currency_id")?,
            account_number: required_text(&payload.account_number, "account_number")?,
            balance: finite_number(payload.balance, "balance")?,
        })
    }

    fn check(
        draft: &BankAccountPayload,
        id: Option<DatabaseId>,
        connection: &Connection,
    ) -> Result<(), Error> {
        require_reference(connection, "bank", draft.bank_id, "bank must exist")?;
        require_reference(connection, "currency", draft.currency_id, "currency must exist")?;

        let is_duplicate = connection
            .prepare(
                "SELECT account_number FROM bank_account
                WHERE bank_id = ?1 AND currency_id = ?2 AND id IS NOT ?3",
            )?
            .query_map((draft.bank_id, draft.currency_id, id), |row| {
                row.get::<_, String>(0)
            })?
            .collect::<Result<Vec<_>, _>>()?
            .iter()
            .any(|account_number| same_text(account_number, &draft.account_number));

        if is_duplicate {
            return Err(Error::Duplicate(Self::DUPLICATE));
        }

        Ok(())
    }

    fn insert(
        draft: &BankAccountPayload,
        connection: &Connection,
    ) -> Result<DatabaseId, rusqlite::Error> {
        connection.execute(
            "INSERT INTO bank_account (bank_id, currency_id, account_number, balance)
            VALUES (?1, ?2, ?3, ?4)",
            (
                draft.bank_id,
                draft.currency_id,
                &draft.account_number,
                draft.balance,
            ),
        )?;

        Ok(connection.last_insert_rowid())
    }

    fn replace(
        id: DatabaseId,
        draft: &BankAccountPayload,
        connection: &Connection,
    ) -> Result<RowsAffected, rusqlite::Error> {
        connection.execute(
            "UPDATE bank_account
            SET bank_id = ?1, currency_id = ?2, account_number = ?3, balance = ?4
            WHERE id = ?5",
            (
                draft.bank_id,
                draft.currency_id,
                &draft.account_number,
                draft.balance,
                id,
            ),
        )
    }

    fn select(id: DatabaseId, connection: &Connection) -> Result<Option<Self>, rusqlite::Error> {
        connection
            .prepare(
                "SELECT id, bank_id, currency_id, account_number, balance
                FROM bank_account WHERE id = ?1",
            )?
            .query_row([id], map_row)
            .optional()
    }

    fn select_all(connection: &Connection) -> Result<Vec<Self>, rusqlite::Error> {
        connection
            .prepare(
                "SELECT id, bank_id, currency_id, account_number, balance
                FROM bank_account ORDER BY id ASC",
            )?
            .query_map([], map_row)?
            .collect()
    }
}

/// Create the bank account table.
pub fn create_bank_account_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS bank_account (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            bank_id INTEGER NOT NULL REFERENCES bank(id),
            currency_id INTEGER NOT NULL REFERENCES currency(id),
            account_number TEXT NOT NULL,
            balance REAL NOT NULL DEFAULT 0,
            UNIQUE (bank_id, currency_id, account_number COLLATE NOCASE)
        );",
    )?;

    Ok(())
}

fn map_row(row: &Row) -> Result<BankAccount, rusqlite::Error> {
    Ok(BankAccount {
        id: row.get(0)?,
        bank_id: row.get(1)?,
        currency_id: row.get(2)?,
        account_number: row.get(3)?,
        balance: row.get(4)?,
    })
}
