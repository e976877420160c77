//! Defines the endpoint for editing an account.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Path, State},
};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    account::{Account, AccountType, get_account, map_row_to_account},
    api_json::ApiJson,
    database_id::AccountId,
    db::lock_connection,
    household::HouseholdId,
    name::Name,
};

/// The state needed to edit an account.
#[derive(Debug, Clone)]
pub struct EditAccountState {
    /// The database connection for managing accounts.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for EditAccountState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The changes to make to an account. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountPatch {
    /// The new display name.
    pub name: Option<Name>,
    /// The new account type.
    #[serde(rename = "type")]
    pub account_type: Option<AccountType>,
    /// Restore or delete the account.
    pub is_active: Option<bool>,
}

/// A route handler for editing an account, responds with the updated account.
pub async fn edit_account_endpoint(
    State(state): State<EditAccountState>,
    Extension(household_id): Extension<HouseholdId>,
    Path(account_id): Path<AccountId>,
    ApiJson(patch): ApiJson<AccountPatch>,
) -> Result<ApiJson<Account>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    update_account(household_id, account_id, &patch, &connection).map(ApiJson)
}

/// Apply `patch` to an account.
///
/// # Errors
/// Returns [Error::NotFound] if the account does not exist or belongs to another household.
pub fn update_account(
    household_id: HouseholdId,
    account_id: AccountId,
    patch: &AccountPatch,
    connection: &Connection,
) -> Result<Account, Error> {
    let account = get_account(household_id, account_id, connection)?;

    connection
        .prepare(
            "UPDATE account SET name = ?1, type = ?2, is_active = ?3
            WHERE id = ?4 AND household_id = ?5
            RETURNING id, household_id, name, type, is_active",
        )?
        .query_row(
            (
                patch.name.as_ref().unwrap_or(&account.name),
                patch.account_type.unwrap_or(account.account_type),
                patch.is_active.unwrap_or(account.is_active),
                account_id,
                household_id,
            ),
            map_row_to_account,
        )
        .map_err(Error::from)
}

#[cfg(test)]
mod tests {
    use crate::{
        Error,
        account::AccountType,
        name::Name,
        test_utils::{create_test_household, get_test_connection},
    };

    use super::{AccountPatch, update_account};

    #[test]
    fn updates_given_fields() {
        let connection = get_test_connection();
        let household = create_test_household(&connection);

        let account = update_account(
            household.id,
            household.bank_account_id,
            &AccountPatch {
                name: Some(Name::new("Joint savings").unwrap()),
                ..Default::default()
            },
            &connection,
        )
        .unwrap();

        assert_eq!(account.name.as_ref(), "Joint savings");
        assert_eq!(account.account_type, AccountType::Bank);
        assert!(account.is_active);
    }

    #[test]
    fn account_in_other_household_is_not_found() {
        let connection = get_test_connection();
        let ours = create_test_household(&connection);
        let theirs = create_test_household(&connection);

        assert_eq!(
            update_account(
                ours.id,
                theirs.bank_account_id,
                &AccountPatch::default(),
                &connection
            ),
            Err(Error::NotFound)
        );
    }
}
