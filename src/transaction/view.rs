//! The transaction as sent to clients, with its related records resolved.

use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use time::{Date, OffsetDateTime};

use crate::{
    Error,
    fixed_point::{FixedPoint, SplitRatio, split_amount},
    name::Name,
    serde_fields::{date, timestamp},
    tag::get_transaction_tag_names,
    transaction::core::{Transaction, TransactionItem, TransactionType, get_transaction_items},
};

/// The ID and name of a related record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntitySummary {
    /// The ID of the record.
    pub id: i64,
    /// The display name of the record.
    pub name: Name,
}

/// A transaction with its account, category, payer, items and tags.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionView {
    pub id: i64,
    #[serde(with = "date")]
    pub date: Date,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub amount_total: FixedPoint,
    pub account: Option<EntitySummary>,
    pub counter_account: Option<EntitySummary>,
    pub category: Option<EntitySummary>,
    pub payer_user: Option<EntitySummary>,
    pub memo: Option<String>,
    pub split_ratio_payer: SplitRatio,
    /// The payer's part of the total.
    pub payer_share: FixedPoint,
    /// The part of the total attributed to the other household member.
    pub other_share: FixedPoint,
    pub has_receipt: bool,
    #[serde(serialize_with = "timestamp::serialize")]
    pub created_at: OffsetDateTime,
    #[serde(serialize_with = "timestamp::serialize")]
    pub updated_at: OffsetDateTime,
    pub items: Vec<TransactionItem>,
    pub tags: Vec<Name>,
}

/// Resolve the records a transaction refers to.
///
/// Deleted accounts, categories and users are still resolved so that old
/// transactions keep their names.
pub fn hydrate_transaction(
    transaction: Transaction,
    connection: &Connection,
) -> Result<TransactionView, Error> {
    let account = get_summary(Summary::Account, Some(transaction.account_id), connection)?;
    let counter_account =
        get_summary(Summary::Account, transaction.counter_account_id, connection)?;
    let category = get_summary(Summary::Category, transaction.category_id, connection)?;
    let payer_user = get_summary(Summary::User, Some(transaction.payer_user_id), connection)?;
    let items = get_transaction_items(transaction.id, connection)?;
    let tags = get_transaction_tag_names(transaction.id, connection)?;
    let shares = split_amount(transaction.amount_total, transaction.split_ratio_payer);

    Ok(TransactionView {
        id: transaction.id,
        date: transaction.date,
        transaction_type: transaction.transaction_type,
        amount_total: transaction.amount_total,
        account,
        counter_account,
        category,
        payer_user,
        memo: transaction.memo,
        split_ratio_payer: transaction.split_ratio_payer,
        payer_share: shares.payer_share,
        other_share: shares.other_share,
        has_receipt: transaction.has_receipt,
        created_at: transaction.created_at,
        updated_at: transaction.updated_at,
        items,
        tags,
    })
}

#[derive(Debug, Clone, Copy)]
enum Summary {
    Account,
    Category,
    User,
}

fn get_summary(
    summary: Summary,
    id: Option<i64>,
    connection: &Connection,
) -> Result<Option<EntitySummary>, Error> {
    let Some(id) = id else {
        return Ok(None);
    };

    let query = match summary {
        Summary::Account => "SELECT id, name FROM account WHERE id = ?1",
        Summary::Category => "SELECT id, name FROM category WHERE id = ?1",
        Summary::User => "SELECT id, name FROM user WHERE id = ?1",
    };

    connection
        .prepare_cached(query)?
        .query_row([id], |row| {
            Ok(EntitySummary {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })
        .optional()
        .map_err(Error::from)
}
