//! Creates the application's database schema and provides helpers shared by the data access code.

use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, TransactionBehavior, Transaction as SqlTransaction};

use crate::{
    Error,
    account::create_account_table,
    audit::create_audit_log_table,
    budget::create_budget_table,
    category::create_category_table,
    household::{HouseholdId, create_household_table},
    tag::{create_tag_table, create_transaction_tag_table},
    transaction::{create_receipt_table, create_transaction_item_table, create_transaction_table},
    user::create_user_table,
};

/// Create all of the application's tables if they do not exist.
///
/// Foreign key enforcement is switched on for `connection`.
///
/// # Errors
///
/// Returns an error if a table could not be created, in which case none of
/// the tables are created.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    connection.execute_batch("PRAGMA foreign_keys = ON;")?;

    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_household_table(&transaction)?;
    create_user_table(&transaction)?;
    create_account_table(&transaction)?;
    create_category_table(&transaction)?;
    create_transaction_table(&transaction)?;
    create_transaction_item_table(&transaction)?;
    create_receipt_table(&transaction)?;
    create_tag_table(&transaction)?;
    create_transaction_tag_table(&transaction)?;
    create_budget_table(&transaction)?;
    create_audit_log_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}

/// Acquire the database lock.
///
/// # Errors
///
/// Returns [Error::DatabaseLockError] if the lock is poisoned.
pub fn lock_connection(
    db_connection: &Mutex<Connection>,
) -> Result<MutexGuard<'_, Connection>, Error> {
    db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })
}

/// Tables whose rows belong directly to a household.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HouseholdTable {
    /// The `user` table.
    User,
    /// The `account` table.
    Account,
    /// The `category` table.
    Category,
    /// The `"transaction"` table.
    Transaction,
}

impl HouseholdTable {
    fn exists_query(self) -> &'static str {
        match self {
            HouseholdTable::User => {
                "SELECT EXISTS(SELECT 1 FROM user WHERE id = ?1 AND household_id = ?2)"
            }
            HouseholdTable::Account => {
                "SELECT EXISTS(SELECT 1 FROM account WHERE id = ?1 AND household_id = ?2)"
            }
            HouseholdTable::Category => {
                "SELECT EXISTS(SELECT 1 FROM category WHERE id = ?1 AND household_id = ?2)"
            }
            HouseholdTable::Transaction => {
                "SELECT EXISTS(SELECT 1 FROM \"transaction\" WHERE id = ?1 AND household_id = ?2)"
            }
        }
    }

    fn active_query(self) -> &'static str {
        match self {
            HouseholdTable::User => {
                "SELECT EXISTS(SELECT 1 FROM user WHERE id = ?1 AND household_id = ?2 AND is_active = 1)"
            }
            HouseholdTable::Account => {
                "SELECT EXISTS(SELECT 1 FROM account WHERE id = ?1 AND household_id = ?2 AND is_active = 1)"
            }
            HouseholdTable::Category => {
                "SELECT EXISTS(SELECT 1 FROM category WHERE id = ?1 AND household_id = ?2 AND is_active = 1)"
            }
            HouseholdTable::Transaction => self.exists_query(),
        }
    }
}

/// Whether a row with `id` exists in `table` and belongs to `household_id`.
pub fn row_exists(
    table: HouseholdTable,
    household_id: HouseholdId,
    id: i64,
    connection: &Connection,
) -> Result<bool, Error> {
    connection
        .prepare_cached(table.exists_query())?
        .query_row((id, household_id), |row| row.get(0))
        .map_err(Error::from)
}

/// Check that `id` refers to a row of `table` in `household_id`.
///
/// # Errors
///
/// Returns [Error::InvalidReference] naming `field` if the row does not exist
/// or belongs to another household.
pub fn ensure_reference(
    table: HouseholdTable,
    field: &'static str,
    household_id: HouseholdId,
    id: i64,
    connection: &Connection,
) -> Result<(), Error> {
    if row_exists(table, household_id, id, connection)? {
        Ok(())
    } else {
        Err(Error::InvalidReference(field))
    }
}

/// Check that `id` refers to a row of `table` in `household_id` that has not
/// been deactivated.
///
/// Transactions cannot be deactivated, so for them this is the same as
/// [ensure_reference].
///
/// # Errors
///
/// Returns [Error::InvalidReference] naming `field` if the row does not
/// exist, belongs to another household or is inactive.
pub fn ensure_active_reference(
    table: HouseholdTable,
    field: &'static str,
    household_id: HouseholdId,
    id: i64,
    connection: &Connection,
) -> Result<(), Error> {
    let is_active: bool = connection
        .prepare_cached(table.active_query())?
        .query_row((id, household_id), |row| row.get(0))?;

    if is_active {
        Ok(())
    } else {
        Err(Error::InvalidReference(field))
    }
}
