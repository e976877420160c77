//! Defines the endpoint for listing a household's accounts.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    account::{Account, list_accounts},
    api_json::{ApiJson, ApiQuery},
    db::lock_connection,
    household::HouseholdId,
};

/// The state needed to list accounts.
#[derive(Debug, Clone)]
pub struct ListAccountsState {
    db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ListAccountsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListAccountsQuery {
    #[serde(default)]
    include_inactive: bool,
}

/// A route handler that responds with the household's active accounts, or
/// all of them with `?include_inactive=true`.
pub async fn list_accounts_endpoint(
    State(state): State<ListAccountsState>,
    Extension(household_id): Extension<HouseholdId>,
    ApiQuery(query): ApiQuery<ListAccountsQuery>,
) -> Result<ApiJson<Vec<Account>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    list_accounts(household_id, query.include_inactive, &connection).map(ApiJson)
}
