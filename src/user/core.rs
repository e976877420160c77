//! Defines the household member model and its database queries.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Error,
    database_id::UserId,
    household::HouseholdId,
    name::Name,
    serde_fields::{nullable, timestamp},
};

/// The only way users authenticate: the household's shared PIN.
pub const PIN_AUTH_TYPE: &str = "pin";

/// A member of a household.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    /// The ID of the user.
    pub id: UserId,
    /// The household the user belongs to.
    pub household_id: HouseholdId,
    /// The user's display name.
    pub name: Name,
    /// The user's email address, if given.
    pub email: Option<String>,
    /// How the user authenticates, always "pin".
    pub auth_type: String,
    /// Whether the user has not been deleted.
    pub is_active: bool,
    /// When the user was created.
    #[serde(serialize_with = "timestamp::serialize")]
    pub created_at: OffsetDateTime,
}

/// The data for creating a user.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewUser {
    /// The user's display name.
    pub name: Name,
    /// The user's email address.
    #[serde(default)]
    pub email: Option<String>,
}

/// The changes to make to a user. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UserPatch {
    /// The new display name.
    pub name: Option<Name>,
    /// The new email address, `Some(None)` clears it.
    #[serde(default, deserialize_with = "nullable")]
    pub email: Option<Option<String>>,
    /// Reactivate or deactivate the user.
    pub is_active: Option<bool>,
}

/// Create the user table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user (
                id INTEGER PRIMARY KEY,
                household_id INTEGER NOT NULL REFERENCES household(id),
                name TEXT NOT NULL,
                email TEXT,
                auth_type TEXT NOT NULL DEFAULT 'pin',
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL
                )",
        (),
    )?;

    Ok(())
}

const USER_COLUMNS: &str = "id, household_id, name, email, auth_type, is_active, created_at";

/// Create and insert a new user into the database.
///
/// # Errors
///
/// Returns an [Error::InvalidReference] if the household does not exist or
/// [Error::SqlError] if an SQL related error occurred.
pub fn create_user(
    household_id: HouseholdId,
    new_user: &NewUser,
    connection: &Connection,
) -> Result<User, Error> {
    connection
        .prepare(&format!(
            "INSERT INTO user (household_id, name, email, auth_type, is_active, created_at)
            VALUES (?1, ?2, ?3, ?4, 1, ?5)
            RETURNING {USER_COLUMNS}"
        ))?
        .query_row(
            (
                household_id,
                &new_user.name,
                &new_user.email,
                PIN_AUTH_TYPE,
                OffsetDateTime::now_utc(),
            ),
            map_row_to_user,
        )
        .map_err(Error::from)
}

/// Get a user of the household by ID, active or not.
///
/// # Errors
///
/// Returns [Error::NotFound] if the user does not exist or belongs to another household.
pub fn get_user(
    household_id: HouseholdId,
    user_id: UserId,
    connection: &Connection,
) -> Result<User, Error> {
    connection
        .prepare(&format!(
            "SELECT {USER_COLUMNS} FROM user WHERE id = ?1 AND household_id = ?2"
        ))?
        .query_row((user_id, household_id), map_row_to_user)
        .map_err(Error::from)
}

/// List the household's users ordered by ID.
///
/// Deactivated users are only included if `include_inactive` is true.
pub fn list_users(
    household_id: HouseholdId,
    include_inactive: bool,
    connection: &Connection,
) -> Result<Vec<User>, Error> {
    connection
        .prepare(&format!(
            "SELECT {USER_COLUMNS} FROM user
            WHERE household_id = ?1 AND (is_active = 1 OR ?2)
            ORDER BY id ASC"
        ))?
        .query_map((household_id, include_inactive), map_row_to_user)?
        .map(|maybe_user| maybe_user.map_err(Error::from))
        .collect()
}

/// Apply `patch` to a user and return the updated user.
///
/// # Errors
///
/// Returns [Error::NotFound] if the user does not exist or belongs to another household.
pub fn update_user(
    household_id: HouseholdId,
    user_id: UserId,
    patch: &UserPatch,
    connection: &Connection,
) -> Result<User, Error> {
    let user = get_user(household_id, user_id, connection)?;

    let name = patch.name.as_ref().unwrap_or(&user.name);
    let email = patch.email.as_ref().unwrap_or(&user.email);
    let is_active = patch.is_active.unwrap_or(user.is_active);

    connection
        .prepare(&format!(
            "UPDATE user SET name = ?1, email = ?2, is_active = ?3
            WHERE id = ?4 AND household_id = ?5
            RETURNING {USER_COLUMNS}"
        ))?
        .query_row(
            (name, email, is_active, user_id, household_id),
            map_row_to_user,
        )
        .map_err(Error::from)
}

/// Soft delete a user. Their transactions are kept.
///
/// # Errors
///
/// Returns [Error::NotFound] if the user does not exist or belongs to another household.
pub fn deactivate_user(
    household_id: HouseholdId,
    user_id: UserId,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE user SET is_active = 0 WHERE id = ?1 AND household_id = ?2",
        (user_id, household_id),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// The user that pays for a transaction when none is given: the household's
/// first active user.
///
/// # Errors
///
/// Returns [Error::NoDefaultUser] if the household has no active users.
pub fn default_payer(household_id: HouseholdId, connection: &Connection) -> Result<UserId, Error> {
    connection
        .prepare(
            "SELECT id FROM user WHERE household_id = ?1 AND is_active = 1 ORDER BY id ASC LIMIT 1",
        )?
        .query_row([household_id], |row| row.get(0))
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::NoDefaultUser,
            error => error.into(),
        })
}

/// Map a database row to a [User].
pub fn map_row_to_user(row: &Row) -> Result<User, rusqlite::Error> {
    Ok(User {
        id: row.get(0)?,
        household_id: row.get(1)?,
        name: row.get(2)?,
        email: row.get(3)?,
        auth_type: row.get(4)?,
        is_active: row.get(5)?,
        created_at: row.get(6)?,
    })
}
