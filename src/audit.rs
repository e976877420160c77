//! An append-only log of changes made to transactions.

use rusqlite::Connection;
use serde::Serialize;
use time::OffsetDateTime;

use crate::{Error, database_id::UserId};

/// What was done to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    Create,
    Update,
    Delete,
}

impl AuditAction {
    fn as_str(self) -> &'static str {
        match self {
            AuditAction::Create => "create",
            AuditAction::Update => "update",
            AuditAction::Delete => "delete",
        }
    }
}

pub fn create_audit_log_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS audit_log (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL REFERENCES user(id),
            entity TEXT NOT NULL,
            entity_id INTEGER NOT NULL,
            action TEXT NOT NULL,
            payload TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        (),
    )?;

    Ok(())
}

/// Append an entry recording that `user_id` performed `action` on the
/// `entity` with ID `entity_id`. `payload` is stored as JSON text.
///
/// Call this with the same connection or SQL transaction as the change so
/// that the entry is only kept if the change is.
pub fn record_audit_entry<P: Serialize>(
    user_id: UserId,
    entity: &str,
    entity_id: i64,
    action: AuditAction,
    payload: &P,
    connection: &Connection,
) -> Result<(), Error> {
    let payload = serde_json::to_string(payload)
        .map_err(|error| Error::JsonSerialization(error.to_string()))?;

    connection.execute(
        "INSERT INTO audit_log (user_id, entity, entity_id, action, payload, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        (
            user_id,
            entity,
            entity_id,
            action.as_str(),
            payload,
            OffsetDateTime::now_utc(),
        ),
    )?;

    Ok(())
}
