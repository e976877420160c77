//! The household, the boundary that every other record belongs to.

use std::fmt::Display;

use rusqlite::{
    Connection, Row, ToSql,
    types::{FromSql, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, name::Name, serde_fields::timestamp};

/// The ID of a household.
///
/// Handlers receive the caller's household ID from the auth middleware as a
/// request extension and pass it to every query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HouseholdId(i64);

impl HouseholdId {
    /// Create a household ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// The ID as an integer.
    pub fn as_i64(self) -> i64 {
        self.0
    }
}

impl Display for HouseholdId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ToSql for HouseholdId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        self.0.to_sql()
    }
}

impl FromSql for HouseholdId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        i64::column_result(value).map(HouseholdId)
    }
}

/// A group of people sharing a budget.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Household {
    /// The ID of the household.
    pub id: HouseholdId,
    /// The display name of the household.
    pub name: Name,
    /// When the household was created.
    #[serde(serialize_with = "timestamp::serialize")]
    pub created_at: OffsetDateTime,
}

/// Create the household table.
pub fn create_household_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS household (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        (),
    )?;

    Ok(())
}

/// Create a household and return it with its generated ID.
pub fn create_household(name: &str, connection: &Connection) -> Result<Household, Error> {
    let name = Name::new(name)?;

    connection
        .prepare(
            "INSERT INTO household (name, created_at) VALUES (?1, ?2)
            RETURNING id, name, created_at",
        )?
        .query_row((name, OffsetDateTime::now_utc()), map_row)
        .map_err(Error::from)
}

/// Retrieve a household by ID.
///
/// # Errors
///
/// Returns [Error::NotFound] if there is no household with the given ID.
pub fn get_household(id: HouseholdId, connection: &Connection) -> Result<Household, Error> {
    connection
        .prepare("SELECT id, name, created_at FROM household WHERE id = ?1")?
        .query_row([id], map_row)
        .map_err(Error::from)
}

fn map_row(row: &Row) -> Result<Household, rusqlite::Error> {
    Ok(Household {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: row.get(2)?,
    })
}
