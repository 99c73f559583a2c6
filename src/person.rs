//! People who hold credit cards and make transactions.

use rusqlite::{Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::{
    DatabaseId, Error, endpoints,
    resource::{Conflict, Dependent, Resource, RowsAffected},
    validation::required_text,
};

/// A person in the household.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    /// The ID of the person.
    pub id: DatabaseId,
    /// The person's name.
    pub name: String,
}

/// The request body for creating or replacing a person.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonPayload {
    /// The person's name.
    pub name: String,
}

impl Resource for Person {
    const NAME: &'static str = "person";
    const TABLE: &'static str = "person";
    const ENDPOINT: &'static str = endpoints::PERSON;
    const IN_USE: Conflict = Conflict {
        code: "person_in_use",
        message: "person is in use",
    };
    const DEPENDENTS: &'static [Dependent] = &[
        Dependent::new("credit_card", "person_id"),
        Dependent::new("\"transaction\"", "person_id"),
    ];

    type Payload = PersonPayload;
    type Draft = PersonPayload;

    fn id(&self) -> DatabaseId {
        self.id
    }

    fn normalize(payload: PersonPayload) -> Result<PersonPayload, Error> {
        Ok(PersonPayload {
            name: required_text(&payload.name, "name")?,
        })
    }

    fn check(_: &PersonPayload, _: Option<DatabaseId>, _: &Connection) -> Result<(), Error> {
        Ok(())
    }

    fn insert(draft: &PersonPayload, connection: &Connection) -> Result<DatabaseId, rusqlite::Error> {
        connection.execute("INSERT INTO person (name) VALUES (?1)", (&draft.name,))?;

        Ok(connection.last_insert_rowid())
    }

    fn replace(
        id: DatabaseId,
        draft: &PersonPayload,
        connection: &Connection,
    ) -> Result<RowsAffected, rusqlite::Error> {
        connection.execute(
            "UPDATE person SET name = ?1 WHERE id = ?2",
            (&draft.name, id),
        )
    }

    fn select(id: DatabaseId, connection: &Connection) -> Result<Option<Self>, rusqlite::Error> {
        connection
            .prepare("SELECT id, name FROM person WHERE id = ?1")?
            .query_row([id], map_row)
            .optional()
    }

    fn select_all(connection: &Connection) -> Result<Vec<Self>, rusqlite::Error> {
        connection
            .prepare("SELECT id, name FROM person ORDER BY id ASC")?
            .query_map([], map_row)?
            .collect()
    }
}

/// Create the person table.
pub fn create_person_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS person (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL
        );",
    )?;

    Ok(())
}

fn map_row(row: &Row) -> Result<Person, rusqlite::Error> {
    Ok(Person {
        id: row.get(0)?,
        name: row.get(1)?,
    })
}
