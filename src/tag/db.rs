//! Database operations for tags and the links between tags and transactions.

use rusqlite::{Connection, Row};
use serde::Serialize;

use crate::{
    Error,
    database_id::{TagId, TransactionId},
    household::HouseholdId,
    name::Name,
};

/// A free-form label attached to transactions, e.g. "holiday".
///
/// Tag names are unique within a household.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Hash)]
pub struct Tag {
    pub id: TagId,
    pub name: Name,
}

/// Initialize the tag table and indexes.
pub fn create_tag_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS tag (
            id INTEGER PRIMARY KEY,
            household_id INTEGER NOT NULL REFERENCES household(id),
            name TEXT NOT NULL,
            UNIQUE(household_id, name)
        );

        CREATE INDEX IF NOT EXISTS idx_tag_name ON tag(name);",
    )?;

    Ok(())
}

/// Initialize the table linking transactions to tags.
pub fn create_transaction_tag_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS transaction_tag (
            transaction_id INTEGER NOT NULL REFERENCES \"transaction\"(id) ON DELETE CASCADE,
            tag_id INTEGER NOT NULL REFERENCES tag(id) ON DELETE CASCADE,
            PRIMARY KEY (transaction_id, tag_id)
        );

        CREATE INDEX IF NOT EXISTS idx_transaction_tag_tag ON transaction_tag(tag_id);",
    )?;

    Ok(())
}

/// Get the household's tag called `name`, creating it if it does not exist.
pub fn get_or_create_tag(
    household_id: HouseholdId,
    name: &Name,
    connection: &Connection,
) -> Result<Tag, Error> {
    connection.execute(
        "INSERT INTO tag (household_id, name) VALUES (?1, ?2)
        ON CONFLICT (household_id, name) DO NOTHING",
        (household_id, name),
    )?;

    connection
        .prepare("SELECT id, name FROM tag WHERE household_id = ?1 AND name = ?2")?
        .query_row((household_id, name), map_row)
        .map_err(Error::from)
}

/// Replace the tags of a transaction with `names`, creating any new tags.
///
/// Duplicate names are linked once.
pub fn set_transaction_tags(
    household_id: HouseholdId,
    transaction_id: TransactionId,
    names: &[Name],
    connection: &Connection,
) -> Result<(), Error> {
    connection.execute(
        "DELETE FROM transaction_tag WHERE transaction_id = ?1",
        [transaction_id],
    )?;

    for name in names {
        let tag = get_or_create_tag(household_id, name, connection)?;
        connection.execute(
            "INSERT OR IGNORE INTO transaction_tag (transaction_id, tag_id) VALUES (?1, ?2)",
            (transaction_id, tag.id),
        )?;
    }

    Ok(())
}

/// The names of the tags on a transaction, in alphabetical order.
pub fn get_transaction_tag_names(
    transaction_id: TransactionId,
    connection: &Connection,
) -> Result<Vec<Name>, Error> {
    connection
        .prepare(
            "SELECT tag.name FROM tag
            INNER JOIN transaction_tag ON transaction_tag.tag_id = tag.id
            WHERE transaction_tag.transaction_id = ?1
            ORDER BY tag.name ASC",
        )?
        .query_map([transaction_id], |row| row.get(0))?
        .map(|maybe_name| maybe_name.map_err(Error::from))
        .collect()
}

fn map_row(row: &Row) -> Result<Tag, rusqlite::Error> {
    let id = row.get(0)?;
    let name = row.get(1)?;

    Ok(Tag { id, name })
}
