//! Database initialization for the application's SQLite database.

use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::{
    bank::create_bank_table,
    bank_account::create_bank_account_table,
    country::{create_country_table, seed_countries},
    credit_card::create_credit_card_tables,
    credit_card_cycle::create_credit_card_cycle_tables,
    credit_card_installment::create_credit_card_installment_table,
    credit_card_subscription::create_credit_card_subscription_table,
    currency::create_currency_table,
    person::create_person_table,
    transaction::create_transaction_table,
    transaction_category::create_transaction_category_table,
};

/// Create all the tables and indexes for the application and seed the
/// reference data.
///
/// Foreign key enforcement is turned on for `connection`. Calling this
/// function on an initialized database is a no-op apart from that.
///
/// # Errors
/// Returns an error if there is an SQL error.
pub fn initialize(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.pragma_update(None, "foreign_keys", true)?;

    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    // Tables are created in dependency order.
    create_country_table(&transaction)?;
    create_currency_table(&transaction)?;
    create_bank_table(&transaction)?;
    create_person_table(&transaction)?;
    create_transaction_category_table(&transaction)?;
    create_bank_account_table(&transaction)?;
    create_credit_card_tables(&transaction)?;
    create_credit_card_cycle_tables(&transaction)?;
    create_credit_card_installment_table(&transaction)?;
    create_credit_card_subscription_table(&transaction)?;
    create_transaction_table(&transaction)?;

    seed_countries(&transaction)?;

    transaction.commit()?;

    tracing::debug!("database initialized");

    Ok(())
}
