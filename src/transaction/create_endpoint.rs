//! Defines the endpoint and database function for recording a new transaction.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    http::StatusCode,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{
    AppState, Error,
    account::default_cash_account,
    api_json::ApiJson,
    audit::{AuditAction, record_audit_entry},
    database_id::{AccountId, CategoryId, TransactionId, UserId},
    db::{HouseholdTable, ensure_active_reference, lock_connection},
    fixed_point::{FixedPoint, SplitRatio},
    household::HouseholdId,
    name::Name,
    serde_fields::date,
    tag::set_transaction_tags,
    transaction::core::{
        NewTransactionItem, TRANSACTION_COLUMNS, Transaction, TransactionType,
        insert_transaction_items, map_transaction_row, validate_amounts,
        validate_item_categories,
    },
    user::default_payer,
};

/// The state needed to create a transaction.
#[derive(Debug, Clone)]
pub struct CreateTransactionState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CreateTransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The request body for creating a transaction.
///
/// Only `date`, `type` and `amount_total` are required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTransaction {
    /// When the transaction happened.
    #[serde(with = "date")]
    pub date: Date,
    /// Whether this is an expense, income or transfer.
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// The total amount, must be positive.
    pub amount_total: FixedPoint,
    /// Defaults to the household's first active cash account.
    #[serde(default)]
    pub account_id: Option<AccountId>,
    /// The destination of a transfer.
    #[serde(default)]
    pub counter_account_id: Option<AccountId>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    /// Defaults to the household's first active user.
    #[serde(default)]
    pub payer_user_id: Option<UserId>,
    /// Defaults to an even split.
    #[serde(default)]
    pub split_ratio_payer: Option<SplitRatio>,
    #[serde(default)]
    pub memo: Option<String>,
    /// The line items, which must add up to `amount_total` if given.
    #[serde(default)]
    pub items: Vec<NewTransactionItem>,
    /// Tag names, created on first use.
    #[serde(default)]
    pub tags: Vec<Name>,
}

/// The response body after creating or updating a transaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionSaved {
    pub message: String,
    pub id: TransactionId,
    #[serde(with = "date")]
    pub date: Date,
    pub amount_total: FixedPoint,
}

impl TransactionSaved {
    pub(crate) fn new(message: &str, transaction: &Transaction) -> Self {
        Self {
            message: message.to_owned(),
            id: transaction.id,
            date: transaction.date,
            amount_total: transaction.amount_total,
        }
    }
}

/// A route handler for recording a new transaction.
pub async fn create_transaction_endpoint(
    State(state): State<CreateTransactionState>,
    Extension(household_id): Extension<HouseholdId>,
    ApiJson(new_transaction): ApiJson<NewTransaction>,
) -> Result<(StatusCode, ApiJson<TransactionSaved>), Error> {
    let connection = lock_connection(&state.db_connection)?;
    let transaction = create_transaction(household_id, &new_transaction, &connection)?;

    tracing::info!(
        "Created {} transaction {} for {} in household {household_id}",
        transaction.transaction_type,
        transaction.id,
        transaction.amount_total
    );

    Ok((
        StatusCode::CREATED,
        ApiJson(TransactionSaved::new(
            "Transaction created successfully",
            &transaction,
        )),
    ))
}

/// Create a transaction along with its items, tags and audit entry.
///
/// Everything is written in one SQL transaction: if any part fails, nothing
/// is saved.
///
/// # Errors
/// Returns an error if:
/// - the amounts are invalid, see [validate_amounts],
/// - a referenced account, category or user is not in the household or has
///   been deactivated,
/// - no account or payer was given and the household has no default,
/// - there was an SQL error.
pub fn create_transaction(
    household_id: HouseholdId,
    new_transaction: &NewTransaction,
    connection: &Connection,
) -> Result<Transaction, Error> {
    validate_amounts(new_transaction.amount_total, &new_transaction.items)?;

    let tx = connection.unchecked_transaction()?;

    let account_id = match new_transaction.account_id {
        Some(account_id) => {
            ensure_active_reference(
                HouseholdTable::Account,
                "account_id",
                household_id,
                account_id,
                &tx,
            )?;
            account_id
        }
        None => default_cash_account(household_id, &tx)?,
    };

    if let Some(counter_account_id) = new_transaction.counter_account_id {
        ensure_active_reference(
            HouseholdTable::Account,
            "counter_account_id",
            household_id,
            counter_account_id,
            &tx,
        )?;
    }

    if let Some(category_id) = new_transaction.category_id {
        ensure_active_reference(
            HouseholdTable::Category,
            "category_id",
            household_id,
            category_id,
            &tx,
        )?;
    }

    let payer_user_id = match new_transaction.payer_user_id {
        Some(user_id) => {
            ensure_active_reference(
                HouseholdTable::User,
                "payer_user_id",
                household_id,
                user_id,
                &tx,
            )?;
            user_id
        }
        None => default_payer(household_id, &tx)?,
    };

    validate_item_categories(household_id, &new_transaction.items, &tx)?;

    let now = OffsetDateTime::now_utc();
    let transaction = tx
        .prepare(&format!(
            "INSERT INTO \"transaction\" (household_id, date, type, amount_total, account_id, \
            counter_account_id, category_id, payer_user_id, split_ratio_payer, memo, has_receipt, \
            created_by, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 0, ?8, ?11, ?11)
            RETURNING {TRANSACTION_COLUMNS}"
        ))?
        .query_row(
            rusqlite::params![
                household_id,
                new_transaction.date,
                new_transaction.transaction_type,
                new_transaction.amount_total,
                account_id,
                new_transaction.counter_account_id,
                new_transaction.category_id,
                payer_user_id,
                new_transaction.split_ratio_payer.unwrap_or_default(),
                new_transaction.memo,
                now,
            ],
            map_transaction_row,
        )?;

    insert_transaction_items(transaction.id, &new_transaction.items, &tx)?;
    set_transaction_tags(household_id, transaction.id, &new_transaction.tags, &tx)?;
    record_audit_entry(
        transaction.created_by,
        "transaction",
        transaction.id,
        AuditAction::Create,
        new_transaction,
        &tx,
    )?;

    tx.commit()?;

    Ok(transaction)
}


#[cfg(test)]
mod endpoint_tests {
    use axum::{Extension, Router, http::StatusCode, routing::post};
    use serde_json::{Value, json};

    use crate::{
        endpoints,
        test_utils::{get_test_server, get_test_state_with_household},
    };

    use super::create_transaction_endpoint;

    fn get_test_app() -> axum_test::TestServer {
        let (state, household) = get_test_state_with_household();
        let app = Router::new()
            .route(endpoints::TRANSACTIONS, post(create_transaction_endpoint))
            .layer(Extension(household.id))
            .with_state(state);

        get_test_server(app)
    }

    #[tokio::test]
    async fn responds_with_id_date_and_total() {
        let server = get_test_app();

        let response = server
            .post(endpoints::TRANSACTIONS)
            .json(&json!({"date": "2025-01-15", "type": "expense", "amount_total": 1580}))
            .await;

        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        assert_eq!(body["message"], "Transaction created successfully");
        assert_eq!(body["date"], "2025-01-15");
        assert_eq!(body["amount_total"].as_f64(), Some(1580.0));
        assert!(body["id"].is_i64());
    }

    #[tokio::test]
    async fn missing_required_field_is_bad_request() {
        let server = get_test_app();

        server
            .post(endpoints::TRANSACTIONS)
            .json(&json!({"date": "2025-01-15", "amount_total": 1580}))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn malformed_date_is_bad_request() {
        let server = get_test_app();

        server
            .post(endpoints::TRANSACTIONS)
            .json(&json!({"date": "15/01/2025", "type": "expense", "amount_total": 1580}))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn zero_amount_is_bad_request() {
        let server = get_test_app();

        let response = server
            .post(endpoints::TRANSACTIONS)
            .json(&json!({"date": "2025-01-15", "type": "expense", "amount_total": 0}))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(
            response.json::<Value>()["detail"],
            "amount_total must be greater than zero"
        );
    }

    #[tokio::test]
    async fn amount_too_large_to_store_is_bad_request() {
        let server = get_test_app();

        let response = server
            .post(endpoints::TRANSACTIONS)
            .json(&json!({"date": "2025-01-15", "type": "expense", "amount_total": 1e27}))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(
            response.json::<Value>()["detail"],
            "amount_total cannot be greater than 9999999999.99"
        );

        server
            .post(endpoints::TRANSACTIONS)
            .json(&json!({"date": "2025-01-15", "type": "expense", "amount_total": 1580}))
            .await
            .assert_status(StatusCode::CREATED);
    }

    #[tokio::test]
    async fn split_ratio_out_of_range_is_bad_request() {
        let server = get_test_app();

        server
            .post(endpoints::TRANSACTIONS)
            .json(&json!({
                "date": "2025-01-15",
                "type": "expense",
                "amount_total": 1580,
                "split_ratio_payer": 1.2,
            }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }
}
