//! The route handlers for listing, creating and bulk updating budgets.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    http::StatusCode,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    api_json::{ApiJson, ApiQuery},
    budget::{
        core::{Budget, BudgetStatus, NewBudget, create_budget, list_budget_status, upsert_budget},
        month::BudgetMonth,
    },
    database_id::CategoryId,
    db::lock_connection,
    fixed_point::FixedPoint,
    household::HouseholdId,
};

/// The state needed for the budget endpoints.
#[derive(Debug, Clone)]
pub struct BudgetState {
    /// The database connection for managing budgets.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The timezone that decides the current month.
    pub local_timezone: String,
}

impl FromRef<AppState> for BudgetState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.config.timezone.clone(),
        }
    }
}

/// The query parameters shared by endpoints that take a budget month.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MonthQuery {
    /// The month as YYYYMM, defaults to the current month.
    pub month: Option<String>,
}

impl MonthQuery {
    /// Parse the requested month, falling back to the current month in `timezone`.
    pub fn resolve(&self, timezone: &str) -> Result<BudgetMonth, Error> {
        match self.month.as_deref() {
            Some(text) => BudgetMonth::parse(text),
            None => BudgetMonth::current(timezone).inspect_err(|error| {
                tracing::error!("Could not get the current month: {error}");
            }),
        }
    }
}

/// The budgets of a month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetList {
    pub budgets: Vec<BudgetStatus>,
    pub month: BudgetMonth,
}

/// One entry of a bulk budget update. Entries missing any field are skipped.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BudgetEntry {
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub amount_limit: Option<FixedPoint>,
    #[serde(default)]
    pub month: Option<BudgetMonth>,
}

/// The response to a bulk budget update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkUpdateResponse {
    pub message: String,
    /// The number of budgets created or updated.
    pub count: usize,
}

/// A route handler that responds with the budgets for a month and how much
/// of each has been spent.
pub async fn list_budgets_endpoint(
    State(state): State<BudgetState>,
    Extension(household_id): Extension<HouseholdId>,
    ApiQuery(query): ApiQuery<MonthQuery>,
) -> Result<ApiJson<BudgetList>, Error> {
    let month = query.resolve(&state.local_timezone)?;
    let connection = lock_connection(&state.db_connection)?;
    let budgets = list_budget_status(household_id, month, &connection)?;

    Ok(ApiJson(BudgetList { budgets, month }))
}

/// A route handler for creating a budget.
pub async fn create_budget_endpoint(
    State(state): State<BudgetState>,
    Extension(household_id): Extension<HouseholdId>,
    ApiJson(new_budget): ApiJson<NewBudget>,
) -> Result<(StatusCode, ApiJson<Budget>), Error> {
    let connection = lock_connection(&state.db_connection)?;
    let budget = create_budget(household_id, &new_budget, &connection)?;

    tracing::info!(
        "Created budget {} for category {} in {}",
        budget.id,
        budget.category_id,
        budget.month
    );

    Ok((StatusCode::CREATED, ApiJson(budget)))
}

/// A route handler for setting many budget limits at once.
pub async fn bulk_update_budgets_endpoint(
    State(state): State<BudgetState>,
    Extension(household_id): Extension<HouseholdId>,
    ApiJson(entries): ApiJson<Vec<BudgetEntry>>,
) -> Result<ApiJson<BulkUpdateResponse>, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let count = bulk_upsert_budgets(household_id, &entries, &connection)?;

    Ok(ApiJson(BulkUpdateResponse {
        message: "Budgets updated".to_owned(),
        count,
    }))
}

/// Create or update a budget for each complete entry, skipping entries with
/// missing fields, and return how many were written.
///
/// All entries are written in one SQL transaction: if one is invalid, none
/// are saved.
pub fn bulk_upsert_budgets(
    household_id: HouseholdId,
    entries: &[BudgetEntry],
    connection: &Connection,
) -> Result<usize, Error> {
    let tx = connection.unchecked_transaction()?;
    let mut count = 0;

    for entry in entries {
        let (Some(category_id), Some(amount_limit), Some(month)) =
            (entry.category_id, entry.amount_limit, entry.month)
        else {
            tracing::debug!("Skipping incomplete budget entry {entry:?}");
            continue;
        };

        upsert_budget(household_id, category_id, month, amount_limit, &tx)?;
        count += 1;
    }

    tx.commit()?;

    Ok(count)
}

#[cfg(test)]
mod bulk_upsert_tests {
    use crate::{
        Error,
        budget::{core::find_budget, month::BudgetMonth},
        fixed_point::FixedPoint,
        test_utils::{create_test_household, get_test_connection},
    };

    use super::{BudgetEntry, bulk_upsert_budgets};

    #[test]
    fn skips_incomplete_entries() {
        let connection = get_test_connection();
        let household = create_test_household(&connection);
        let month = BudgetMonth::parse("202501").unwrap();
        let entries = vec![
            BudgetEntry {
                category_id: Some(household.food_category_id),
                amount_limit: Some(FixedPoint::from(500)),
                month: Some(month),
            },
            BudgetEntry {
                category_id: Some(household.rent_category_id),
                amount_limit: None,
                month: Some(month),
            },
            BudgetEntry::default(),
        ];

        let count = bulk_upsert_budgets(household.id, &entries, &connection).unwrap();

        assert_eq!(count, 1);
        assert!(
            find_budget(household.id, household.rent_category_id, month, &connection)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn allows_zero_limit() {
        let connection = get_test_connection();
        let household = create_test_household(&connection);
        let month = BudgetMonth::parse("202501").unwrap();

        let count = bulk_upsert_budgets(
            household.id,
            &[BudgetEntry {
                category_id: Some(household.food_category_id),
                amount_limit: Some(FixedPoint::ZERO),
                month: Some(month),
            }],
            &connection,
        )
        .unwrap();

        assert_eq!(count, 1);
    }

    #[test]
    fn invalid_entry_saves_nothing() {
        let connection = get_test_connection();
        let household = create_test_household(&connection);
        let month = BudgetMonth::parse("202501").unwrap();
        let entries = vec![
            BudgetEntry {
                category_id: Some(household.food_category_id),
                amount_limit: Some(FixedPoint::from(500)),
                month: Some(month),
            },
            BudgetEntry {
                category_id: Some(household.rent_category_id),
                amount_limit: Some(FixedPoint::from(-1)),
                month: Some(month),
            },
        ];

        let result = bulk_upsert_budgets(household.id, &entries, &connection);

        assert_eq!(result, Err(Error::NegativeAmount("amount_limit")));
        assert!(
            find_budget(household.id, household.food_category_id, month, &connection)
                .unwrap()
                .is_none()
        );
    }
}

#[cfg(test)]
mod endpoint_tests {
    use axum::{
        Extension, Router,
        http::StatusCode,
        routing::get,
    };
    use serde_json::{Value, json};

    use crate::{
        endpoints,
        test_utils::{get_test_server, get_test_state_with_household},
    };

    use super::{bulk_update_budgets_endpoint, create_budget_endpoint, list_budgets_endpoint};

    fn get_test_app() -> (axum_test::TestServer, crate::test_utils::TestHousehold) {
        let (state, household) = get_test_state_with_household();
        let app = Router::new()
            .route(
                endpoints::BUDGETS,
                get(list_budgets_endpoint)
                    .post(create_budget_endpoint)
                    .put(bulk_update_budgets_endpoint),
            )
            .layer(Extension(household.id))
            .with_state(state);

        (get_test_server(app), household)
    }

    #[tokio::test]
    async fn second_create_for_same_month_is_conflict() {
        let (server, household) = get_test_app();
        let body = json!({
            "category_id": household.food_category_id,
            "amount_limit": 60000,
            "month": "202501",
        });

        server
            .post(endpoints::BUDGETS)
            .json(&body)
            .await
            .assert_status(StatusCode::CREATED);
        server
            .post(endpoints::BUDGETS)
            .json(&body)
            .await
            .assert_status(StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn create_without_month_is_bad_request() {
        let (server, household) = get_test_app();

        server
            .post(endpoints::BUDGETS)
            .json(&json!({"category_id": household.food_category_id, "amount_limit": 100}))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn lists_budgets_for_requested_month() {
        let (server, household) = get_test_app();
        server
            .put(endpoints::BUDGETS)
            .json(&json!([
                {"category_id": household.food_category_id, "amount_limit": 300, "month": "202503"},
                {"category_id": household.rent_category_id, "amount_limit": 900, "month": "202504"},
                {"category_id": household.rent_category_id, "month": "202503"},
            ]))
            .await
            .assert_json(&json!({"message": "Budgets updated", "count": 2}));

        let body: Value = server
            .get(endpoints::BUDGETS)
            .add_query_param("month", "202503")
            .await
            .json();

        assert_eq!(body["month"], "202503");
        let budgets = body["budgets"].as_array().unwrap();
        assert_eq!(budgets.len(), 1);
        assert_eq!(budgets[0]["category_name"], "Food");
        assert_eq!(budgets[0]["amount_spent"].as_f64(), Some(0.0));
        assert_eq!(budgets[0]["amount_remaining"].as_f64(), Some(300.0));
        assert_eq!(budgets[0]["percentage"].as_f64(), Some(0.0));
    }

    #[tokio::test]
    async fn invalid_month_is_bad_request() {
        let (server, _) = get_test_app();

        let response = server
            .get(endpoints::BUDGETS)
            .add_query_param("month", "2025-01")
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(
            response.json::<Value>()["detail"],
            "invalid month \"2025-01\", use YYYYMM"
        );
    }

    #[tokio::test]
    async fn defaults_to_current_month() {
        let (server, _) = get_test_app();

        let body: Value = server.get(endpoints::BUDGETS).await.json();

        assert_eq!(body["month"].as_str().map(str::len), Some(6));
        assert_eq!(body["budgets"], json!([]));
    }
}
