use std::{fmt::Display, str::FromStr};

use rusqlite::{
    Connection, Row, ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};

use crate::{Error, database_id::AccountId, household::HouseholdId, name::Name};

/// The kind of payment instrument an account represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// Physical cash, e.g. a wallet.
    Cash,
    /// A bank account.
    Bank,
    /// A credit card.
    Card,
    /// A prepaid IC card, e.g. a transit card.
    Ic,
    /// Anything else.
    Other,
}

impl AccountType {
    /// The name stored in the database and used in JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Cash => "cash",
            AccountType::Bank => "bank",
            AccountType::Card => "card",
            AccountType::Ic => "ic",
            AccountType::Other => "other",
        }
    }
}

impl Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AccountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cash" => Ok(AccountType::Cash),
            "bank" => Ok(AccountType::Bank),
            "card" => Ok(AccountType::Card),
            "ic" => Ok(AccountType::Ic),
            "other" => Ok(AccountType::Other),
            other => Err(format!("unknown account type \"{other}\"")),
        }
    }
}

impl ToSql for AccountType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for AccountType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|_| FromSqlError::InvalidType)
    }
}

/// A payment instrument or source of money, e.g. a wallet or a credit card.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Account {
    /// The id for the account.
    pub id: AccountId,
    /// The household that owns the account.
    pub household_id: HouseholdId,
    /// The display name of the account.
    pub name: Name,
    /// What kind of account it is.
    #[serde(rename = "type")]
    pub account_type: AccountType,
    /// Whether the account has not been deleted.
    pub is_active: bool,
}

pub fn create_account_table(connection: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS account (
            id INTEGER PRIMARY KEY,
            household_id INTEGER NOT NULL REFERENCES household(id),
            name TEXT NOT NULL,
            type TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1
        )",
        (),
    )?;

    Ok(())
}

pub fn map_row_to_account(row: &rusqlite::Row) -> Result<Account, rusqlite::Error> {
    let id = row.get(0)?;
    let household_id = row.get(1)?;
    let name = row.get(2)?;
    let account_type = row.get(3)?;
    let is_active = row.get(4)?;

    Ok(Account {
        id,
        household_id,
        name,
        account_type,
        is_active,
    })
}

const ACCOUNT_COLUMNS: &str = "id, household_id, name, type, is_active";

/// Get an account of the household by ID, whether or not it has been deleted.
///
/// # Errors
/// Returns [Error::NotFound] if the account does not exist or belongs to another household.
pub fn get_account(
    household_id: HouseholdId,
    account_id: AccountId,
    connection: &Connection,
) -> Result<Account, Error> {
    connection
        .prepare(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM account WHERE id = ?1 AND household_id = ?2"
        ))?
        .query_row((account_id, household_id), map_row_to_account)
        .map_err(Error::from)
}

/// List the household's accounts ordered by ID.
///
/// Deleted accounts are only included if `include_inactive` is true.
pub fn list_accounts(
    household_id: HouseholdId,
    include_inactive: bool,
    connection: &Connection,
) -> Result<Vec<Account>, Error> {
    connection
        .prepare(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM account
            WHERE household_id = ?1 AND (is_active = 1 OR ?2)
            ORDER BY id ASC"
        ))?
        .query_map((household_id, include_inactive), map_row_to_account)?
        .map(|maybe_account| maybe_account.map_err(Error::from))
        .collect()
}

/// The account a transaction is paid from when none is given: the
/// household's first active cash account.
///
/// # Errors
/// Returns [Error::NoDefaultAccount] if the household has no active cash account.
pub fn default_cash_account(
    household_id: HouseholdId,
    connection: &Connection,
) -> Result<AccountId, Error> {
    connection
        .prepare(
            "SELECT id FROM account
            WHERE household_id = ?1 AND type = 'cash' AND is_active = 1
            ORDER BY id ASC LIMIT 1",
        )?
        .query_row([household_id], |row: &Row| row.get(0))
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::NoDefaultAccount,
            error => error.into(),
        })
}

#[cfg(test)]
mod create_table_tests {
    use rusqlite::Connection;

    use super::create_account_table;

    #[test]
    fn sql_is_valid() {
        let connection =
            Connection::open_in_memory().expect("Could not initialise in-memory SQLite database");

        assert_eq!(Ok(()), create_account_table(&connection));
    }
}
