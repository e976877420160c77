//! Defines the endpoint for creating a new account.
use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    http::StatusCode,
};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    account::{Account, AccountType, map_row_to_account},
    api_json::ApiJson,
    db::lock_connection,
    household::HouseholdId,
    name::Name,
};

/// The state needed to create an account.
#[derive(Debug, Clone)]
pub struct CreateAccountState {
    /// The database connection for managing accounts.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CreateAccountState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The data for creating an account.
#[derive(Debug, Clone, Deserialize)]
pub struct NewAccount {
    /// The display name of the account.
    pub name: Name,
    /// What kind of account it is.
    #[serde(rename = "type")]
    pub account_type: AccountType,
}

/// A route handler for creating a new account, responds with the created account.
pub async fn create_account_endpoint(
    State(state): State<CreateAccountState>,
    Extension(household_id): Extension<HouseholdId>,
    ApiJson(new_account): ApiJson<NewAccount>,
) -> Result<(StatusCode, ApiJson<Account>), Error> {
    let connection = lock_connection(&state.db_connection)?;
    let account = create_account(household_id, &new_account, &connection)?;

    tracing::info!(
        "Created {} account {} in household {household_id}",
        account.account_type,
        account.id
    );

    Ok((StatusCode::CREATED, ApiJson(account)))
}

/// Create an active account in the household.
pub fn create_account(
    household_id: HouseholdId,
    new_account: &NewAccount,
    connection: &Connection,
) -> Result<Account, Error> {
    connection
        .prepare(
            "INSERT INTO account (household_id, name, type, is_active) VALUES (?1, ?2, ?3, 1)
            RETURNING id, household_id, name, type, is_active",
        )?
        .query_row(
            (household_id, &new_account.name, new_account.account_type),
            map_row_to_account,
        )
        .map_err(Error::from)
}

#[cfg(test)]
mod tests {
    use axum::{Extension, Router, http::StatusCode, routing::post};
    use serde_json::json;

    use crate::{
        account::{AccountType, get_account},
        endpoints,
        test_utils::{get_test_server, get_test_state_with_household},
    };

    use super::create_account_endpoint;

    #[tokio::test]
    async fn creates_account() {
        let (state, household) = get_test_state_with_household();
        let connection = state.db_connection.clone();
        let app = Router::new()
            .route(endpoints::ACCOUNTS, post(create_account_endpoint))
            .layer(Extension(household.id))
            .with_state(state);
        let server = get_test_server(app);

        let response = server
            .post(endpoints::ACCOUNTS)
            .json(&json!({"name": "Suica", "type": "ic"}))
            .await;

        response.assert_status(StatusCode::CREATED);
        let id = response.json::<serde_json::Value>()["id"].as_i64().unwrap();
        let account = get_account(household.id, id, &connection.lock().unwrap()).unwrap();
        assert_eq!(account.name.as_ref(), "Suica");
        assert_eq!(account.account_type, AccountType::Ic);
        assert!(account.is_active);
    }

    #[tokio::test]
    async fn rejects_unknown_type() {
        let (state, household) = get_test_state_with_household();
        let app = Router::new()
            .route(endpoints::ACCOUNTS, post(create_account_endpoint))
            .layer(Extension(household.id))
            .with_state(state);
        let server = get_test_server(app);

        server
            .post(endpoints::ACCOUNTS)
            .json(&json!({"name": "Wallet", "type": "crypto"}))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }
}
