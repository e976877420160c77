//! Defines the endpoint and database function for updating a transaction.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Path, State},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{
    AppState, Error,
    api_json::ApiJson,
    audit::{AuditAction, record_audit_entry},
    database_id::{AccountId, CategoryId, TransactionId, UserId},
    db::{HouseholdTable, ensure_active_reference, lock_connection},
    fixed_point::{FixedPoint, SplitRatio},
    household::HouseholdId,
    name::Name,
    serde_fields::{nullable, option_date},
    tag::set_transaction_tags,
    transaction::{
        core::{
            NewTransactionItem, TRANSACTION_COLUMNS, Transaction, TransactionType,
            get_transaction, get_transaction_items, insert_transaction_items,
            map_transaction_row, validate_amounts, validate_item_categories,
        },
        create_endpoint::TransactionSaved,
    },
};

/// The state needed to edit a transaction.
#[derive(Debug, Clone)]
pub struct EditTransactionState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for EditTransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The changes to make to a transaction.
///
/// Absent fields are left unchanged. For the optional references and the
/// memo, an explicit `null` clears the value. A supplied `items` or `tags`
/// list replaces the existing one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionPatch {
    #[serde(default, with = "option_date", skip_serializing_if = "Option::is_none")]
    pub date: Option<Date>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub transaction_type: Option<TransactionType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_total: Option<FixedPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<AccountId>,
    #[serde(
        default,
        deserialize_with = "nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub counter_account_id: Option<Option<AccountId>>,
    #[serde(
        default,
        deserialize_with = "nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub category_id: Option<Option<CategoryId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payer_user_id: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub split_ratio_payer: Option<SplitRatio>,
    #[serde(
        default,
        deserialize_with = "nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub memo: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<NewTransactionItem>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<Name>>,
}

/// A route handler for updating a transaction.
pub async fn edit_transaction_endpoint(
    State(state): State<EditTransactionState>,
    Extension(household_id): Extension<HouseholdId>,
    Path(transaction_id): Path<TransactionId>,
    ApiJson(patch): ApiJson<TransactionPatch>,
) -> Result<ApiJson<TransactionSaved>, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let transaction = update_transaction(household_id, transaction_id, &patch, &connection)?;

    tracing::info!("Updated transaction {transaction_id} in household {household_id}");

    Ok(ApiJson(TransactionSaved::new(
        "Transaction updated successfully",
        &transaction,
    )))
}

/// Apply `patch` to a transaction, replacing its items and tags if given.
///
/// When the items or the total change and the transaction ends up with
/// items, the item amounts must still add up to the total.
///
/// # Errors
/// Returns an error if:
/// - the transaction does not exist or belongs to another household,
/// - the amounts are invalid, see [validate_amounts],
/// - a newly referenced account, category or user is not in the household
///   or has been deactivated,
/// - there was an SQL error.
pub fn update_transaction(
    household_id: HouseholdId,
    transaction_id: TransactionId,
    patch: &TransactionPatch,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let tx = connection.unchecked_transaction()?;
    let existing = get_transaction(household_id, transaction_id, &tx)?;

    let amount_total = patch.amount_total.unwrap_or(existing.amount_total);

    match &patch.items {
        Some(items) => validate_amounts(amount_total, items)?,
        None if patch.amount_total.is_some() => {
            let current_items: Vec<NewTransactionItem> =
                get_transaction_items(transaction_id, &tx)?
                    .into_iter()
                    .map(NewTransactionItem::from)
                    .collect();
            validate_amounts(amount_total, &current_items)?;
        }
        None => {}
    }

    if let Some(account_id) = patch.account_id.filter(|id| *id != existing.account_id) {
        ensure_active_reference(
            HouseholdTable::Account,
            "account_id",
            household_id,
            account_id,
            &tx,
        )?;
    }
    if let Some(Some(counter_account_id)) = patch
        .counter_account_id
        .filter(|id| *id != existing.counter_account_id)
    {
        ensure_active_reference(
            HouseholdTable::Account,
            "counter_account_id",
            household_id,
            counter_account_id,
            &tx,
        )?;
    }
    if let Some(Some(category_id)) = patch.category_id.filter(|id| *id != existing.category_id) {
        ensure_active_reference(
            HouseholdTable::Category,
            "category_id",
            household_id,
            category_id,
            &tx,
        )?;
    }
    if let Some(payer_user_id) = patch
        .payer_user_id
        .filter(|id| *id != existing.payer_user_id)
    {
        ensure_active_reference(
            HouseholdTable::User,
            "payer_user_id",
            household_id,
            payer_user_id,
            &tx,
        )?;
    }
    if let Some(items) = &patch.items {
        validate_item_categories(household_id, items, &tx)?;
    }

    let transaction = tx
        .prepare(&format!(
            "UPDATE \"transaction\" SET date = ?1, type = ?2, amount_total = ?3, account_id = ?4, \
            counter_account_id = ?5, category_id = ?6, payer_user_id = ?7, split_ratio_payer = ?8, \
            memo = ?9, updated_at = ?10
            WHERE id = ?11 AND household_id = ?12
            RETURNING {TRANSACTION_COLUMNS}"
        ))?
        .query_row(
            rusqlite::params![
                patch.date.unwrap_or(existing.date),
                patch.transaction_type.unwrap_or(existing.transaction_type),
                amount_total,
                patch.account_id.unwrap_or(existing.account_id),
                patch
                    .counter_account_id
                    .unwrap_or(existing.counter_account_id),
                patch.category_id.unwrap_or(existing.category_id),
                patch.payer_user_id.unwrap_or(existing.payer_user_id),
                patch.split_ratio_payer.unwrap_or(existing.split_ratio_payer),
                patch.memo.clone().unwrap_or(existing.memo),
                OffsetDateTime::now_utc(),
                transaction_id,
                household_id,
            ],
            map_transaction_row,
        )?;

    if let Some(items) = &patch.items {
        tx.execute(
            "DELETE FROM transaction_item WHERE transaction_id = ?1",
            [transaction_id],
        )?;
        insert_transaction_items(transaction_id, items, &tx)?;
    }

    if let Some(tags) = &patch.tags {
        set_transaction_tags(household_id, transaction_id, tags, &tx)?;
    }

    record_audit_entry(
        transaction.payer_user_id,
        "transaction",
        transaction_id,
        AuditAction::Update,
        patch,
        &tx,
    )?;

    tx.commit()?;

    Ok(transaction)
}


#[cfg(test)]
mod endpoint_tests {
    use axum::{Extension, Router, http::StatusCode, routing::put};
    use serde_json::{Value, json};
    use time::macros::date;

    use crate::{
        endpoints::{self, format_endpoint},
        test_utils::{get_test_server, get_test_state_with_household, new_expense},
        transaction::create_endpoint::create_transaction,
    };

    use super::edit_transaction_endpoint;

    #[tokio::test]
    async fn responds_with_updated_summary() {
        let (state, household) = get_test_state_with_household();
        let transaction_id = {
            let connection = state.db_connection.lock().unwrap();
            create_transaction(household.id, &new_expense(date!(2025 - 01 - 10), 10), &connection)
                .unwrap()
                .id
        };
        let app = Router::new()
            .route(endpoints::TRANSACTION, put(edit_transaction_endpoint))
            .layer(Extension(household.id))
            .with_state(state);
        let server = get_test_server(app);

        let response = server
            .put(&format_endpoint(endpoints::TRANSACTION, transaction_id))
            .json(&json!({"date": "2025-02-01", "amount_total": 25.5}))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["message"], "Transaction updated successfully");
        assert_eq!(body["id"], transaction_id);
        assert_eq!(body["date"], "2025-02-01");
        assert_eq!(body["amount_total"].as_f64(), Some(25.5));
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let (state, household) = get_test_state_with_household();
        let app = Router::new()
            .route(endpoints::TRANSACTION, put(edit_transaction_endpoint))
            .layer(Extension(household.id))
            .with_state(state);
        let server = get_test_server(app);

        server
            .put("/api/transactions/999")
            .json(&json!({"memo": "nothing here"}))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }
}
