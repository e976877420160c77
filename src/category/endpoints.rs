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
    category::core::{
        Category, CategoryPatch, NewCategory, create_category, deactivate_category,
        list_categories, update_category,
    },
    database_id::CategoryId,
    db::lock_connection,
    household::HouseholdId,
};

/// The state needed to manage categories.
#[derive(Debug, Clone)]
pub struct CategoryState {
    /// The database connection for managing categories.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CategoryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListCategoriesQuery {
    #[serde(default)]
    include_inactive: bool,
}

pub async fn list_categories_endpoint(
    State(state): State<CategoryState>,
    Extension(household_id): Extension<HouseholdId>,
    ApiQuery(query): ApiQuery<ListCategoriesQuery>,
) -> Result<ApiJson<Vec<Category>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    list_categories(household_id, query.include_inactive, &connection).map(ApiJson)
}

pub async fn create_category_endpoint(
    State(state): State<CategoryState>,
    Extension(household_id): Extension<HouseholdId>,
    ApiJson(new_category): ApiJson<NewCategory>,
) -> Result<(StatusCode, ApiJson<Category>), Error> {
    let connection = lock_connection(&state.db_connection)?;
    let category = create_category(household_id, &new_category, &connection)?;

    Ok((StatusCode::CREATED, ApiJson(category)))
}

pub async fn edit_category_endpoint(
    State(state): State<CategoryState>,
    Extension(household_id): Extension<HouseholdId>,
    Path(category_id): Path<CategoryId>,
    ApiJson(patch): ApiJson<CategoryPatch>,
) -> Result<ApiJson<Category>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    update_category(household_id, category_id, &patch, &connection).map(ApiJson)
}

pub async fn delete_category_endpoint(
    State(state): State<CategoryState>,
    Extension(household_id): Extension<HouseholdId>,
    Path(category_id): Path<CategoryId>,
) -> Result<ApiJson<DeleteResponse>, Error> {
    let connection = lock_connection(&state.db_connection)?;
    deactivate_category(household_id, category_id, &connection)?;

    Ok(ApiJson(DeleteResponse::new(
        "Category deleted successfully",
        category_id,
    )))
}
