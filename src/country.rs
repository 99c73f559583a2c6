//! Countries that banks can be registered in.
//!
//! The table is seeded with ISO 3166-1 alpha-2 codes and is read-only
//! through the API.

use axum::{Json, extract::State};
use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    resource::{ResourceState, lock_connection},
};

/// A country identified by its ISO 3166-1 alpha-2 code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    /// The upper-case two letter code, e.g. "AR".
    pub code: String,
    /// The English short name.
    pub name: String,
}

const COUNTRIES: &[(&str, &str)] = &[
    ("AD", "Andorra"),
    ("AE", "United Arab Emirates"),
    ("AR", "Argentina"),
    ("AT", "Austria"),
    ("AU", "Australia"),
    ("BE", "Belgium"),
    ("BO", "Bolivia"),
    ("BR", "Brazil"),
    ("CA", "Canada"),
    ("CH", "Switzerland"),
    ("CL", "Chile"),
    ("CN", "China"),
    ("CO", "Colombia"),
    ("CR", "Costa Rica"),
    ("CU", "Cuba"),
    ("CZ", "Czechia"),
    ("DE", "Germany"),
    ("DK", "Denmark"),
    ("DO", "Dominican Republic"),
    ("EC", "Ecuador"),
    ("EG", "Egypt"),
    ("ES", "Spain"),
    ("FI", "Finland"),
    ("FR", "France"),
    ("GB", "United Kingdom"),
    ("GR", "Greece"),
    ("GT", "Guatemala"),
    ("HK", "Hong Kong"),
    ("HN", "Honduras"),
    ("HU", "Hungary"),
    ("ID", "Indonesia"),
    ("IE", "Ireland"),
    ("IL", "Israel"),
    ("IN", "India"),
    ("IS", "Iceland"),
    ("IT", "Italy"),
    ("JP", "Japan"),
    ("KR", "South Korea"),
    ("LU", "Luxembourg"),
    ("MA", "Morocco"),
    ("MX", "Mexico"),
    ("MY", "Malaysia"),
    ("NG", "Nigeria"),
    ("NI", "Nicaragua"),
    ("NL", "Netherlands"),
    ("NO", "Norway"),
    ("NZ", "New Zealand"),
    ("PA", "Panama"),
    ("PE", "Peru"),
    ("PH", "Philippines"),
    ("PL", "Poland"),
    ("PR", "Puerto Rico"),
    ("PT", "Portugal"),
    ("PY", "Paraguay"),
    ("RO", "Romania"),
    ("SE", "Sweden"),
    ("SG", "Singapore"),
    ("SV", "El Salvador"),
    ("TH", "Thailand"),
    ("TR", "Türkiye"),
    ("TW", "Taiwan"),
    ("UA", "Ukraine"),
    ("US", "United States"),
    ("UY", "Uruguay"),
    ("VE", "Venezuela"),
    ("VN", "Viet Nam"),
    ("ZA", "South Africa"),
];

/// Create the country table.
pub fn create_country_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS country (
            code TEXT PRIMARY KEY NOT NULL,
            name TEXT NOT NULL
        );",
    )?;

    Ok(())
}

/// Insert the known countries, skipping those already present.
pub fn seed_countries(connection: &Connection) -> Result<(), rusqlite::Error> {
    let mut statement =
        connection.prepare("INSERT OR IGNORE INTO country (code, name) VALUES (?1, ?2)")?;

    for &(code, name) in COUNTRIES {
        statement.execute((code, name))?;
    }

    Ok(())
}

/// Retrieve all countries ordered by code.
pub fn get_all_countries(connection: &Connection) -> Result<Vec<Country>, Error> {
    connection
        .prepare("SELECT code, name FROM country ORDER BY code ASC")?
        .query_map([], map_row)?
        .map(|maybe_country| maybe_country.map_err(|error| error.into()))
        .collect()
}

/// Check whether `code` is a known country code.
pub fn country_exists(code: &str, connection: &Connection) -> Result<bool, Error> {
    let exists = connection
        .prepare_cached("SELECT EXISTS(SELECT 1 FROM country WHERE code = ?1)")?
        .query_row([code], |row| row.get(0))?;

    Ok(exists)
}

/// List the countries.
pub async fn list_countries_endpoint(
    State(state): State<ResourceState>,
) -> Result<Json<Vec<Country>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_all_countries(&connection).map(Json)
}

fn map_row(row: &Row) -> Result<Country, rusqlite::Error> {
    Ok(Country {
        code: row.get(0)?,
        name: row.get(1)?,
    })
}
