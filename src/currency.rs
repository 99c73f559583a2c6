//! Currencies that accounts, cards and balances are denominated in.

use rusqlite::{Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::{
    DatabaseId, Error, endpoints,
    resource::{Conflict, Dependent, Resource, RowsAffected},
    validation::{required_text, same_text},
};

/// A currency such as "US Dollar" with the code "USD".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    /// The ID of the currency.
    pub id: DatabaseId,
    /// The display name.
    pub name: String,
    /// The upper-case currency code.
    pub code: String,
}

/// The request body for creating or replacing a currency.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurrencyPayload {
    /// The display name.
    pub name: String,
    /// The currency code, stored in upper case.
    pub code: String,
}

impl Resource for Currency {
    const NAME: &'static str = "currency";
    const TABLE: &'static str = "currency";
    const ENDPOINT: &'static str = endpoints::CURRENCY;
    const DUPLICATE: Conflict = Conflict {
        code: "duplicate_currency",
        message: "name and code must be unique",
    };
    const IN_USE: Conflict = Conflict {
        code: "currency_in_use",
        message: "currency is in use",
    };
    const DEPENDENTS: &'static [Dependent] = &[
        Dependent::new("bank_account", "currency_id"),
        Dependent::new("credit_card_currency", "currency_id"),
        Dependent::new("credit_card_cycle_balance", "currency_id"),
        Dependent::new("credit_card_installment", "currency_id"),
        Dependent::new("credit_card_subscription", "currency_id"),
    ];

    type Payload = CurrencyPayload;
    type Draft = CurrencyPayload;

    fn id(&self) -> DatabaseId {
        self.id
    }

    fn normalize(payload: CurrencyPayload) -> Result<CurrencyPayload, Error> {
        Ok(CurrencyPayload {
            name: required_text(&payload.name, "name")?,
            code: required_text(&payload.code, "code")?.to_uppercase(),
        })
    }

    fn check(
        draft: &CurrencyPayload,
        id: Option<DatabaseId>,
        connection: &Connection,
    ) -> Result<(), Error> {
        let is_duplicate = Currency::select_all(connection)?
            .iter()
            .filter(|currency| Some(currency.id) != id)
            .any(|currency| {
                same_text(&currency.name, &draft.name) || same_text(&currency.code, &draft.code)
            });

        if is_duplicate {
            return Err(Error::Duplicate(Self::DUPLICATE));
        }

        Ok(())
    }

    fn insert(draft: &CurrencyPayload, connection: &Connection) -> Result<DatabaseId, rusqlite::Error> {
        connection.execute(
            "INSERT INTO currency (name, code) VALUES (?1, ?2)",
            (&draft.name, &draft.code),
        )?;

        Ok(connection.last_insert_rowid())
    }

    fn replace(
        id: DatabaseId,
        draft: &CurrencyPayload,
        connection: &Connection,
    ) -> Result<RowsAffected, rusqlite::Error> {
        connection.execute(
            "UPDATE currency SET name = ?1, code = ?2 WHERE id = ?3",
            (&draft.name, &draft.code, id),
        )
    }

    fn select(id: DatabaseId, connection: &Connection) -> Result<Option<Self>, rusqlite::Error> {
        connection
            .prepare("SELECT id, name, code FROM currency WHERE id = ?1")?
            .query_row([id], map_row)
            .optional()
    }

    fn select_all(connection: &Connection) -> Result<Vec<Self>, rusqlite::Error> {
        connection
            .prepare("SELECT id, name, code FROM currency ORDER BY id ASC")?
            .query_map([], map_row)?
            .collect()
    }
}

/// Create the currency table.
pub fn create_currency_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS currency (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE COLLATE NOCASE,
            code TEXT NOT NULL UNIQUE COLLATE NOCASE
        );",
    )?;

    Ok(())
}

fn map_row(row: &Row) -> Result<Currency, rusqlite::Error> {
    Ok(Currency {
        id: row.get(0)?,
        name: row.get(1)?,
        code: row.get(2)?,
    })
}

#[cfg(test)]
mod currency_tests {
    use crate::{
        Error,
        resource::{Resource, create, delete, get, list, update},
        test_utils::get_test_connection,
    };

    use super::{Currency, CurrencyPayload};

    fn payload(name: &str, code: &str) -> CurrencyPayload {
        CurrencyPayload {
            name: name.to_owned(),
            code: code.to_owned(),
        }
    }

    #[test]
    fn create_trims_and_upper_cases_code() {
        let connection = get_test_connection();

        let currency = create::<Currency>(payload("  Peso argentino ", " ars "), &connection)
            .expect("Could not create currency");

        assert!(currency.id > 0);
        assert_eq!(currency.name, "Peso argentino");
        assert_eq!(currency.code, "ARS");
    }

    #[test]
    fn create_fails_on_blank_fields() {
        let connection = get_test_connection();

        assert_eq!(
            create::<Currency>(payload(" ", "USD"), &connection),
            Err(Error::invalid("name is required"))
        );
        assert_eq!(
            create::<Currency>(payload("Dollar", ""), &connection),
            Err(Error::invalid("code is required"))
        );
    }

    #[test]
    fn create_fails_on_used_name_or_code_ignoring_case() {
        let connection = get_test_connection();
        create::<Currency>(payload("Euro", "EUR"), &connection).unwrap();

        assert_eq!(
            create::<Currency>(payload("EURO", "XEU"), &connection),
            Err(Error::Duplicate(Currency::DUPLICATE))
        );
        assert_eq!(
            create::<Currency>(payload("Other euro", "eur"), &connection),
            Err(Error::Duplicate(Currency::DUPLICATE))
        );
        assert_eq!(list::<Currency>(&connection).unwrap().len(), 1);
    }

    #[test]
    fn update_can_keep_its_own_name_and_code() {
        let connection = get_test_connection();
        let currency = create::<Currency>(payload("Euro", "EUR"), &connection).unwrap();

        let updated = update::<Currency>(currency.id, payload("euro", "EUR"), &connection)
            .expect("Could not update currency");

        assert_eq!(updated.name, "euro");
        assert_eq!(get::<Currency>(currency.id, &connection), Ok(updated));
    }

    #[test]
    fn update_fails_on_another_currency_code() {
        let connection = get_test_connection();
        create::<Currency>(payload("Euro", "EUR"), &connection).unwrap();
        let dollar = create::<Currency>(payload("Dollar", "USD"), &connection).unwrap();

        let result = update::<Currency>(dollar.id, payload("Dollar", "EUR"), &connection);

        assert_eq!(result, Err(Error::Duplicate(Currency::DUPLICATE)));
    }

    #[test]
    fn update_missing_currency_returns_not_found() {
        let connection = get_test_connection();

        let result = update::<Currency>(42, payload("Euro", "EUR"), &connection);

        assert_eq!(result, Err(Error::NotFound("currency")));
    }

    #[test]
    fn ids_are_not_reused_after_delete() {
        let connection = get_test_connection();
        let first = create::<Currency>(payload("Euro", "EUR"), &connection).unwrap();
        delete::<Currency>(first.id, &connection).unwrap();

        let second = create::<Currency>(payload("Euro", "EUR"), &connection).unwrap();

        assert!(second.id > first.id);
    }

    #[test]
    fn delete_fails_while_an_account_uses_the_currency() {
        let connection = get_test_connection();
        let currency = create::<Currency>(payload("Euro", "EUR"), &connection).unwrap();
        connection
            .execute("INSERT INTO bank (name, country) VALUES ('Banco', 'ES')", ())
            .unwrap();
        let bank_id = connection.last_insert_rowid();
        connection
            .execute(
                "INSERT INTO bank_account (bank_id, currency_id, account_number, balance)
                VALUES (?1, ?2, '001', 0)",
                (bank_id, currency.id),
            )
            .unwrap();

        let result = delete::<Currency>(currency.id, &connection);

        assert_eq!(result, Err(Error::InUse(Currency::IN_USE)));
        assert!(get::<Currency>(currency.id, &connection).is_ok());
    }
}
