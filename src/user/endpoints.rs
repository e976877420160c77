//! Route handlers for listing, creating, editing and deleting household members.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Path, State},
    http::StatusCode,
};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    api_json::{ApiJson, ApiQuery, DeleteResponse},
    database_id::UserId,
    db::lock_connection,
    household::HouseholdId,
    user::core::{
        NewUser, User, UserPatch, create_user, deactivate_user, list_users, update_user,
    },
};

/// The state needed to manage users.
#[derive(Debug, Clone)]
pub struct UserState {
    /// The database connection for managing users.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for UserState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The query string for listing users.
#[derive(Debug, Default, Deserialize)]
pub struct ListUsersQuery {
    /// Whether to include deleted users.
    #[serde(default)]
    pub include_inactive: bool,
}

/// A route handler for listing the household's users.
pub async fn list_users_endpoint(
    State(state): State<UserState>,
    Extension(household_id): Extension<HouseholdId>,
    ApiQuery(query): ApiQuery<ListUsersQuery>,
) -> Result<ApiJson<Vec<User>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    list_users(household_id, query.include_inactive, &connection).map(ApiJson)
}

/// A route handler for adding a user to the household.
pub async fn create_user_endpoint(
    State(state): State<UserState>,
    Extension(household_id): Extension<HouseholdId>,
    ApiJson(new_user): ApiJson<NewUser>,
) -> Result<(StatusCode, ApiJson<User>), Error> {
    let connection = lock_connection(&state.db_connection)?;
    let user = create_user(household_id, &new_user, &connection)?;

    tracing::info!("Created user {} in household {household_id}", user.id);

    Ok((StatusCode::CREATED, ApiJson(user)))
}

/// A route handler for editing a user.
pub async fn edit_user_endpoint(
    State(state): State<UserState>,
    Extension(household_id): Extension<HouseholdId>,
    Path(user_id): Path<UserId>,
    ApiJson(patch): ApiJson<UserPatch>,
) -> Result<ApiJson<User>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    update_user(household_id, user_id, &patch, &connection).map(ApiJson)
}

/// A route handler for soft deleting a user.
pub async fn delete_user_endpoint(
    State(state): State<UserState>,
    Extension(household_id): Extension<HouseholdId>,
    Path(user_id): Path<UserId>,
) -> Result<ApiJson<DeleteResponse>, Error> {
    let connection = lock_connection(&state.db_connection)?;
    deactivate_user(household_id, user_id, &connection)?;

    Ok(ApiJson(DeleteResponse::new("User deleted successfully", user_id)))
}

#[cfg(test)]
mod tests {
    use axum::{
        Extension, Router,
        http::StatusCode,
        routing::{get, put},
    };
    use serde_json::{Value, json};

    use crate::{
        endpoints::{self, format_endpoint},
        test_utils::{TestHousehold, get_test_server, get_test_state_with_household},
    };

    use super::{create_user_endpoint, delete_user_endpoint, edit_user_endpoint, list_users_endpoint};

    fn get_test_app() -> (axum_test::TestServer, TestHousehold) {
        let (state, household) = get_test_state_with_household();
        let app = Router::new()
            .route(
                endpoints::USERS,
                get(list_users_endpoint).post(create_user_endpoint),
            )
            .route(
                endpoints::USER,
                put(edit_user_endpoint).delete(delete_user_endpoint),
            )
            .layer(Extension(household.id))
            .with_state(state);

        (get_test_server(app), household)
    }

    #[tokio::test]
    async fn create_then_list() {
        let (server, _) = get_test_app();

        server
            .post(endpoints::USERS)
            .json(&json!({"name": "Ren", "email": "ren@example.com"}))
            .await
            .assert_status(StatusCode::CREATED);

        let users: Vec<Value> = server.get(endpoints::USERS).await.json();
        assert_eq!(users.len(), 3);
        assert_eq!(users[2]["name"], "Ren");
        assert_eq!(users[2]["auth_type"], "pin");
    }

    #[tokio::test]
    async fn create_without_name_is_bad_request() {
        let (server, _) = get_test_app();

        server
            .post(endpoints::USERS)
            .json(&json!({"email": "ren@example.com"}))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn deleted_user_is_listed_only_with_include_inactive() {
        let (server, household) = get_test_app();

        let response = server
            .delete(&format_endpoint(endpoints::USER, household.partner_id))
            .await;
        response.assert_status_ok();
        response.assert_json(&json!({
            "message": "User deleted successfully",
            "id": household.partner_id,
        }));

        let active: Vec<Value> = server.get(endpoints::USERS).await.json();
        let all: Vec<Value> = server
            .get(endpoints::USERS)
            .add_query_param("include_inactive", true)
            .await
            .json();
        assert_eq!(active.len(), 1);
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn edit_missing_user_is_not_found() {
        let (server, _) = get_test_app();

        server
            .put("/api/users/999")
            .json(&json!({"name": "Nobody"}))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }
}
