//! Defines the endpoint for deleting an account.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Path, State},
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    api_json::{ApiJson, DeleteResponse},
    database_id::AccountId,
    db::lock_connection,
    household::HouseholdId,
};

/// The state needed to delete an account.
#[derive(Debug, Clone)]
pub struct DeleteAccountState {
    /// The database connection for managing account.
    db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DeleteAccountState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for deleting an account.
///
/// The account is only marked inactive so that transactions paid from it
/// still resolve.
pub async fn delete_account_endpoint(
    State(state): State<DeleteAccountState>,
    Extension(household_id): Extension<HouseholdId>,
    Path(account_id): Path<AccountId>,
) -> Result<ApiJson<DeleteResponse>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    deactivate_account(household_id, account_id, &connection).inspect_err(|error| {
        tracing::warn!("Could not delete account {account_id}: {error}");
    })?;

    Ok(ApiJson(DeleteResponse::new(
        "Account deleted successfully",
        account_id,
    )))
}

/// Mark an account as inactive.
///
/// # Errors
/// Returns [Error::NotFound] if the account does not exist or belongs to another household.
pub fn deactivate_account(
    household_id: HouseholdId,
    account_id: AccountId,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE account SET is_active = 0 WHERE id = :id AND household_id = :household_id",
        rusqlite::named_params! {":id": account_id, ":household_id": household_id},
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::{
        Error,
        account::{get_account, list_accounts},
        test_utils::{create_test_household, get_test_connection},
    };

    use super::deactivate_account;

    #[test]
    fn deleted_account_is_kept_but_not_listed() {
        let connection = get_test_connection();
        let household = create_test_household(&connection);

        deactivate_account(household.id, household.bank_account_id, &connection).unwrap();

        let account = get_account(household.id, household.bank_account_id, &connection).unwrap();
        assert!(!account.is_active);
        let active = list_accounts(household.id, false, &connection).unwrap();
        assert!(active.iter().all(|account| account.id != household.bank_account_id));
        let all = list_accounts(household.id, true, &connection).unwrap();
        assert!(all.iter().any(|account| account.id == household.bank_account_id));
    }

    #[test]
    fn deleting_missing_account_is_not_found() {
        let connection = get_test_connection();
        let household = create_test_household(&connection);

        assert_eq!(
            deactivate_account(household.id, 999, &connection),
            Err(Error::NotFound)
        );
    }
}
