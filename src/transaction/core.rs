//! Defines the core data models and database queries for transactions.

use std::{fmt::Display, str::FromStr};

use rusqlite::{
    Connection, Row, ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{
    Error,
    database_id::{AccountId, CategoryId, TransactionId, TransactionItemId, UserId},
    db::{HouseholdTable, ensure_reference},
    fixed_point::{FixedPoint, SplitRatio},
    household::HouseholdId,
    name::Name,
};

// ============================================================================
// MODELS
// ============================================================================

/// Whether money left the household, came in, or moved between accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Money spent.
    Expense,
    /// Money earned.
    Income,
    /// Money moved from `account_id` to `counter_account_id`.
    Transfer,
}

impl TransactionType {
    /// The name stored in the database and used in JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Expense => "expense",
            TransactionType::Income => "income",
            TransactionType::Transfer => "transfer",
        }
    }
}

impl Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "expense" => Ok(TransactionType::Expense),
            "income" => Ok(TransactionType::Income),
            "transfer" => Ok(TransactionType::Transfer),
            other => Err(format!("unknown transaction type \"{other}\"")),
        }
    }
}

impl ToSql for TransactionType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TransactionType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|_| FromSqlError::InvalidType)
    }
}

/// An expense, income or transfer as stored in the database.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The household the transaction belongs to.
    pub household_id: HouseholdId,
    /// When the transaction happened.
    pub date: Date,
    /// Whether this is an expense, income or transfer.
    pub transaction_type: TransactionType,
    /// The total amount of money, always positive.
    pub amount_total: FixedPoint,
    /// The account the money was paid from or into.
    pub account_id: AccountId,
    /// The other side of a transfer.
    pub counter_account_id: Option<AccountId>,
    /// What the money was for.
    pub category_id: Option<CategoryId>,
    /// The household member who paid.
    pub payer_user_id: UserId,
    /// The fraction of the amount attributed to the payer.
    pub split_ratio_payer: SplitRatio,
    /// A free text note.
    pub memo: Option<String>,
    /// Whether a receipt is attached.
    pub has_receipt: bool,
    /// The user who recorded the transaction.
    pub created_by: UserId,
    /// When the transaction was recorded.
    pub created_at: OffsetDateTime,
    /// When the transaction was last changed.
    pub updated_at: OffsetDateTime,
}

/// A line item of a transaction, e.g. one product on a receipt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionItem {
    /// The ID of the item.
    pub id: TransactionItemId,
    /// The transaction the item belongs to.
    #[serde(skip)]
    pub transaction_id: TransactionId,
    /// What was bought.
    pub name: Name,
    /// How many were bought.
    pub quantity: FixedPoint,
    /// The price of one unit.
    pub unit_price: FixedPoint,
    /// The amount of the transaction total this item accounts for.
    pub amount: FixedPoint,
    /// The item's category, which may differ from the transaction's.
    pub category_id: Option<CategoryId>,
}

fn default_quantity() -> FixedPoint {
    FixedPoint::ONE
}

/// The data for a line item of a new or updated transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTransactionItem {
    /// What was bought.
    pub name: Name,
    /// How many were bought, defaults to 1.
    #[serde(default = "default_quantity")]
    pub quantity: FixedPoint,
    /// The price of one unit, defaults to 0.
    #[serde(default)]
    pub unit_price: FixedPoint,
    /// The amount of the transaction total this item accounts for.
    pub amount: FixedPoint,
    /// The item's category.
    #[serde(default)]
    pub category_id: Option<CategoryId>,
}

impl From<TransactionItem> for NewTransactionItem {
    fn from(item: TransactionItem) -> Self {
        Self {
            name: item.name,
            quantity: item.quantity,
            unit_price: item.unit_price,
            amount: item.amount,
            category_id: item.category_id,
        }
    }
}

// ============================================================================
// TABLES
// ============================================================================

pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
            id INTEGER PRIMARY KEY,
            household_id INTEGER NOT NULL REFERENCES household(id),
            date TEXT NOT NULL,
            type TEXT NOT NULL,
            amount_total INTEGER NOT NULL CHECK (amount_total > 0),
            account_id INTEGER NOT NULL REFERENCES account(id),
            counter_account_id INTEGER REFERENCES account(id),
            category_id INTEGER REFERENCES category(id),
            payer_user_id INTEGER NOT NULL REFERENCES user(id),
            split_ratio_payer INTEGER NOT NULL DEFAULT 50
                CHECK (split_ratio_payer BETWEEN 0 AND 100),
            memo TEXT,
            has_receipt INTEGER NOT NULL DEFAULT 0,
            created_by INTEGER NOT NULL REFERENCES user(id),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_transaction_household_date
            ON \"transaction\"(household_id, date);
        CREATE INDEX IF NOT EXISTS idx_transaction_category ON \"transaction\"(category_id);",
    )?;

    Ok(())
}

pub fn create_transaction_item_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS transaction_item (
            id INTEGER PRIMARY KEY,
            transaction_id INTEGER NOT NULL REFERENCES \"transaction\"(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            quantity INTEGER NOT NULL DEFAULT 100,
            unit_price INTEGER NOT NULL DEFAULT 0,
            amount INTEGER NOT NULL,
            category_id INTEGER REFERENCES category(id)
        );

        CREATE INDEX IF NOT EXISTS idx_transaction_item_transaction
            ON transaction_item(transaction_id);",
    )?;

    Ok(())
}

/// Receipts are only ever removed along with their transaction.
pub fn create_receipt_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS receipt (
            id INTEGER PRIMARY KEY,
            transaction_id INTEGER NOT NULL REFERENCES \"transaction\"(id) ON DELETE CASCADE,
            filename TEXT NOT NULL,
            mime_type TEXT NOT NULL,
            size INTEGER NOT NULL,
            storage_path TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        (),
    )?;

    Ok(())
}

// ============================================================================
// QUERIES
// ============================================================================

/// The columns selected for a [Transaction], in the order [map_transaction_row] expects.
pub const TRANSACTION_COLUMNS: &str = "id, household_id, date, type, amount_total, account_id, \
    counter_account_id, category_id, payer_user_id, split_ratio_payer, memo, has_receipt, \
    created_by, created_at, updated_at";

/// Get a transaction of the household by ID.
///
/// # Errors
/// Returns [Error::NotFound] if the transaction does not exist or belongs to another household.
pub fn get_transaction(
    household_id: HouseholdId,
    transaction_id: TransactionId,
    connection: &Connection,
) -> Result<Transaction, Error> {
    connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" WHERE id = ?1 AND household_id = ?2"
        ))?
        .query_row((transaction_id, household_id), map_transaction_row)
        .map_err(Error::from)
}

/// Get the line items of a transaction in the order they were added.
pub fn get_transaction_items(
    transaction_id: TransactionId,
    connection: &Connection,
) -> Result<Vec<TransactionItem>, Error> {
    connection
        .prepare(
            "SELECT id, transaction_id, name, quantity, unit_price, amount, category_id
            FROM transaction_item WHERE transaction_id = ?1 ORDER BY id ASC",
        )?
        .query_map([transaction_id], map_item_row)?
        .map(|maybe_item| maybe_item.map_err(Error::from))
        .collect()
}

/// Insert `items` as the line items of a transaction.
pub fn insert_transaction_items(
    transaction_id: TransactionId,
    items: &[NewTransactionItem],
    connection: &Connection,
) -> Result<(), Error> {
    let mut statement = connection.prepare(
        "INSERT INTO transaction_item (transaction_id, name, quantity, unit_price, amount, category_id)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;

    for item in items {
        statement.execute((
            transaction_id,
            &item.name,
            item.quantity,
            item.unit_price,
            item.amount,
            item.category_id,
        ))?;
    }

    Ok(())
}

/// Check the amounts of a transaction and its line items.
///
/// # Errors
/// Returns an error if:
/// - `amount_total` is zero or negative,
/// - `amount_total` or an item's amount, quantity or unit price is greater
///   than [FixedPoint::MAX],
/// - an item has a negative amount, quantity or unit price,
/// - there are items and their amounts do not add up to `amount_total`
///   within [FixedPoint::TOLERANCE].
pub fn validate_amounts(
    amount_total: FixedPoint,
    items: &[NewTransactionItem],
) -> Result<(), Error> {
    if !amount_total.is_positive() {
        return Err(Error::NonPositiveAmount("amount_total"));
    }
    amount_total.ensure_storable("amount_total")?;

    for item in items {
        if item.amount.is_negative() {
            return Err(Error::NegativeAmount("item amount"));
        }
        if item.quantity.is_negative() {
            return Err(Error::NegativeAmount("item quantity"));
        }
        if item.unit_price.is_negative() {
            return Err(Error::NegativeAmount("item unit_price"));
        }
        item.amount.ensure_storable("item amount")?;
        item.quantity.ensure_storable("item quantity")?;
        item.unit_price.ensure_storable("item unit_price")?;
    }

    if items.is_empty() {
        return Ok(());
    }

    let items_total = items
        .iter()
        .try_fold(FixedPoint::ZERO, |total, item| total.checked_add(item.amount))
        .ok_or(Error::AmountTooLarge("sum of item amounts"))?;

    if items_total.abs_diff(amount_total) > FixedPoint::TOLERANCE {
        return Err(Error::ItemTotalMismatch {
            items_total,
            amount_total,
        });
    }

    Ok(())
}

/// Check that the category of every item belongs to the household.
pub fn validate_item_categories(
    household_id: HouseholdId,
    items: &[NewTransactionItem],
    connection: &Connection,
) -> Result<(), Error> {
    items
        .iter()
        .filter_map(|item| item.category_id)
        .try_for_each(|category_id| {
            ensure_reference(
                HouseholdTable::Category,
                "items.category_id",
                household_id,
                category_id,
                connection,
            )
        })
}

/// Map a row selected with [TRANSACTION_COLUMNS] to a [Transaction].
pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    Ok(Transaction {
        id: row.get(0)?,
        household_id: row.get(1)?,
        date: row.get(2)?,
        transaction_type: row.get(3)?,
        amount_total: row.get(4)?,
        account_id: row.get(5)?,
        counter_account_id: row.get(6)?,
        category_id: row.get(7)?,
        payer_user_id: row.get(8)?,
        split_ratio_payer: row.get(9)?,
        memo: row.get(10)?,
        has_receipt: row.get(11)?,
        created_by: row.get(12)?,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
    })
}

fn map_item_row(row: &Row) -> Result<TransactionItem, rusqlite::Error> {
    Ok(TransactionItem {
        id: row.get(0)?,
        transaction_id: row.get(1)?,
        name: row.get(2)?,
        quantity: row.get(3)?,
        unit_price: row.get(4)?,
        amount: row.get(5)?,
        category_id: row.get(6)?,
    })
}
