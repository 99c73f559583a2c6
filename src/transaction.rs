//! Income and expenses recorded against a bank account.

use std::{fmt::Display, str::FromStr};

use rusqlite::{
    Connection, OptionalExtension, Row, ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    DatabaseId, Error, endpoints,
    resource::{Resource, RowsAffected},
    validation::{iso_date, optional_text, positive_amount, positive_id, require_reference},
};

/// Whether money was earned or spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Money earned.
    Income,
    /// Money spent.
    Expense,
}

impl TransactionType {
    /// The name used in JSON and in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "income",
            TransactionType::Expense => "expense",
        }
    }
}

impl Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = Error;

    /// Parse a type ignoring surrounding whitespace and case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "income" => Ok(TransactionType::Income),
            "expense" => Ok(TransactionType::Expense),
            _ => Err(Error::invalid("type must be either income or expense")),
        }
    }
}

impl ToSql for TransactionType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TransactionType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error| FromSqlError::Other(Box::new(error)))
    }
}

/// A single income or expense.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: DatabaseId,
    /// When the transaction happened.
    pub transaction_date: Date,
    /// Whether money was earned or spent.
    #[serde(rename = "type")]
    pub kind: TransactionType,
    /// The amount of money, always positive.
    pub amount: f64,
    /// Free text about the transaction.
    pub notes: Option<String>,
    /// Who made the transaction.
    pub person_id: DatabaseId,
    /// The account the money moved through.
    pub bank_account_id: DatabaseId,
    /// The category of the transaction.
    pub category_id: DatabaseId,
}

/// The request body for creating or replacing a transaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionPayload {
    /// The date as `YYYY-MM-DD`.
    pub transaction_date: String,
    /// Either "income" or "expense", in any case.
    #[serde(rename = "type")]
    pub kind: String,
    /// The amount of money, must be positive.
    pub amount: f64,
    /// Free text, blank notes are stored as null.
    pub notes: Option<String>,
    /// Who made the transaction.
    pub person_id: DatabaseId,
    /// The account the money moved through.
    pub bank_account_id: DatabaseId,
    /// The category of the transaction.
    pub category_id: DatabaseId,
}

/// A validated [TransactionPayload].
#[derive(Debug)]
pub struct TransactionDraft {
    transaction_date: Date,
    kind: TransactionType,
    amount: f64,
    notes: Option<String>,
    person_id: DatabaseId,
    bank_account_id: DatabaseId,
    category_id: DatabaseId,
}

impl Resource for Transaction {
    const NAME: &'static str = "transaction";
    const TABLE: &'static str = "\"transaction\"";
    const ENDPOINT: &'static str = endpoints::TRANSACTION;
    const MISSING_REFERENCE: &'static str =
        "person, bank account and transaction category must exist";

    type Payload = TransactionPayload;
    type Draft = TransactionDraft;

    fn id(&self) -> DatabaseId {
        self.id
    }

    fn normalize(payload: TransactionPayload) -> Result<TransactionDraft, Error> {
        if payload.transaction_date.trim().is_empty() {
            return Err(Error::invalid("transaction_date is required"));
        }

        Ok(TransactionDraft {
            transaction_date: iso_date(&payload.transaction_date, "transaction_date")?,
            kind: payload.kind.parse()?,
            amount: positive_amount(payload.amount, "amount")?,
            notes: optional_text(payload.notes.as_deref()),
            person_id: positive_id(payload.person_id, "person_id")?,
            bank_account_id: positive_id(payload.bank_account_id, "bank_account_id")?,
            category_id: positive_id(payload.category_id, "category_id")?,
        })
    }

    fn check(
        draft: &TransactionDraft,
        _id: Option<DatabaseId>,
        connection: &Connection,
    ) -> Result<(), Error> {
        require_reference(connection, "person", draft.person_id, "person must exist")?;
        require_reference(
            connection,
            "bank_account",
            draft.bank_account_id,
            "bank account must exist",
        )?;
        require_reference(
            connection,
            "transaction_category",
            draft.category_id,
            "transaction category must exist",
        )
    }

    fn insert(draft: &TransactionDraft, connection: &Connection) -> Result<DatabaseId, rusqlite::Error> {
        connection.execute(
            "INSERT INTO \"transaction\"
            (transaction_date, type, amount, notes, person_id, bank_account_id, category_id)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            (
                draft.transaction_date,
                draft.kind,
                draft.amount,
                &draft.notes,
                draft.person_id,
                draft.bank_account_id,
                draft.category_id,
            ),
        )?;

        Ok(connection.last_insert_rowid())
    }

    fn replace(
        id: DatabaseId,
        draft: &TransactionDraft,
        connection: &Connection,
    ) -> Result<RowsAffected, rusqlite::Error> {
        connection.execute(
            "UPDATE \"transaction\"
            SET transaction_date = ?1, type = ?2, amount = ?3, notes = ?4,
                person_id = ?5, bank_account_id = ?6, category_id = ?7
            WHERE id = ?8",
            (
                draft.transaction_date,
                draft.kind,
                draft.amount,
                &draft.notes,
                draft.person_id,
                draft.bank_account_id,
                draft.category_id,
                id,
            ),
        )
    }

    fn select(id: DatabaseId, connection: &Connection) -> Result<Option<Self>, rusqlite::Error> {
        connection
            .prepare(
                "SELECT id, transaction_date, type, amount, notes, person_id, bank_account_id, category_id
                FROM \"transaction\" WHERE id = ?1",
            )?
            .query_row([id], map_row)
            .optional()
    }

    fn select_all(connection: &Connection) -> Result<Vec<Self>, rusqlite::Error> {
        connection
            .prepare(
                "SELECT id, transaction_date, type, amount, notes, person_id, bank_account_id, category_id
                FROM \"transaction\" ORDER BY id ASC",
            )?
            .query_map([], map_row)?
            .collect()
    }
}

/// Create the transaction table.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            transaction_date TEXT NOT NULL,
            type TEXT NOT NULL CHECK (type IN ('income', 'expense')),
            amount REAL NOT NULL CHECK (amount > 0),
            notes TEXT,
            person_id INTEGER NOT NULL REFERENCES person(id),
            bank_account_id INTEGER NOT NULL REFERENCES bank_account(id),
            category_id INTEGER NOT NULL REFERENCES transaction_category(id)
        );

        CREATE INDEX IF NOT EXISTS idx_transaction_date ON \"transaction\"(transaction_date);",
    )?;

    Ok(())
}

fn map_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    Ok(Transaction {
        id: row.get(0)?,
        transaction_date: row.get(1)?,
        kind: row.get(2)?,
        amount: row.get(3)?,
        notes: row.get(4)?,
        person_id: row.get(5)?,
        bank_account_id: row.get(6)?,
        category_id: row.get(7)?,
    })
}

#[cfg(test)]
mod transaction_type_tests {
    use crate::Error;

    use super::TransactionType;

    #[test]
    fn parses_any_case() {
        assert_eq!(" Income ".parse(), Ok(TransactionType::Income));
        assert_eq!("EXPENSE".parse(), Ok(TransactionType::Expense));
    }

    #[test]
    fn rejects_other_values() {
        assert_eq!(
            "transfer".parse::<TransactionType>(),
            Err(Error::invalid("type must be either income or expense"))
        );
        assert_eq!(
            "".parse::<TransactionType>(),
            Err(Error::invalid("type must be either income or expense"))
        );
    }
}
