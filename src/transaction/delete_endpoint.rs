//! Defines the endpoint and database function for deleting a transaction.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Path, State},
};
use rusqlite::Connection;
use serde_json::json;

use crate::{
    AppState, Error,
    api_json::{ApiJson, DeleteResponse},
    audit::{AuditAction, record_audit_entry},
    database_id::TransactionId,
    db::lock_connection,
    household::HouseholdId,
    transaction::core::get_transaction,
};

/// The state needed to delete a transaction.
#[derive(Debug, Clone)]
pub struct DeleteTransactionState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DeleteTransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for deleting a transaction along with its items.
pub async fn delete_transaction_endpoint(
    State(state): State<DeleteTransactionState>,
    Extension(household_id): Extension<HouseholdId>,
    Path(transaction_id): Path<TransactionId>,
) -> Result<ApiJson<DeleteResponse>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    delete_transaction(household_id, transaction_id, &connection).inspect_err(|error| {
        tracing::warn!("Could not delete transaction {transaction_id}: {error}");
    })?;

    Ok(ApiJson(DeleteResponse::new(
        "Transaction deleted successfully",
        transaction_id,
    )))
}

/// Delete a transaction, its items, tag links and receipts.
///
/// # Errors
/// Returns [Error::NotFound] if the transaction does not exist or belongs to another household.
pub fn delete_transaction(
    household_id: HouseholdId,
    transaction_id: TransactionId,
    connection: &Connection,
) -> Result<(), Error> {
    let tx = connection.unchecked_transaction()?;
    let transaction = get_transaction(household_id, transaction_id, &tx)?;

    tx.execute(
        "DELETE FROM transaction_item WHERE transaction_id = ?1",
        [transaction_id],
    )?;
    tx.execute(
        "DELETE FROM transaction_tag WHERE transaction_id = ?1",
        [transaction_id],
    )?;
    tx.execute("DELETE FROM receipt WHERE transaction_id = ?1", [transaction_id])?;
    tx.execute(
        "DELETE FROM \"transaction\" WHERE id = ?1 AND household_id = ?2",
        (transaction_id, household_id),
    )?;

    record_audit_entry(
        transaction.payer_user_id,
        "transaction",
        transaction_id,
        AuditAction::Delete,
        &json!({ "id": transaction_id }),
        &tx,
    )?;

    tx.commit()?;

    Ok(())
}


#[cfg(test)]
mod endpoint_tests {
    use axum::{Extension, Router, http::StatusCode, routing::delete};
    use serde_json::Value;
    use time::macros::date;

    use crate::{
        endpoints::{self, format_endpoint},
        test_utils::{get_test_server, get_test_state_with_household, new_expense},
        transaction::create_endpoint::create_transaction,
    };

    use super::delete_transaction_endpoint;

    #[tokio::test]
    async fn deletes_then_reports_not_found() {
        let (state, household) = get_test_state_with_household();
        let transaction_id = {
            let connection = state.db_connection.lock().unwrap();
            create_transaction(household.id, &new_expense(date!(2025 - 01 - 10), 10), &connection)
                .unwrap()
                .id
        };
        let app = Router::new()
            .route(endpoints::TRANSACTION, delete(delete_transaction_endpoint))
            .layer(Extension(household.id))
            .with_state(state);
        let server = get_test_server(app);
        let path = format_endpoint(endpoints::TRANSACTION, transaction_id);

        let response = server.delete(&path).await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["message"], "Transaction deleted successfully");
        assert_eq!(body["id"], transaction_id);

        server
            .delete(&path)
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }
}
