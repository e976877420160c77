//! The monthly summary of income, expenses and budgets.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
};
use rusqlite::{Connection, named_params};
use serde::Serialize;

use crate::{
    AppState, Error,
    api_json::{ApiJson, ApiQuery},
    budget::{BudgetMonth, BudgetStatus, MonthQuery, list_budget_status},
    database_id::CategoryId,
    db::lock_connection,
    fixed_point::FixedPoint,
    household::HouseholdId,
    name::Name,
};

/// The state needed for the monthly report.
#[derive(Debug, Clone)]
pub struct MonthlyReportState {
    /// The database connection for reading transactions and budgets.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The timezone that decides the current month.
    pub local_timezone: String,
}

impl FromRef<AppState> for MonthlyReportState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.config.timezone.clone(),
        }
    }
}

/// The expenses of one category in a month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    /// `None` for expenses without a category.
    pub category_id: Option<CategoryId>,
    pub category_name: Option<Name>,
    pub amount: FixedPoint,
}

/// Income, expenses and budget usage for a month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyReport {
    pub month: BudgetMonth,
    pub total_income: FixedPoint,
    pub total_expenses: FixedPoint,
    /// Income minus expenses.
    pub net_amount: FixedPoint,
    /// Expenses per category, largest first.
    pub categories: Vec<CategoryTotal>,
    pub budget_status: Vec<BudgetStatus>,
}

/// A route handler that responds with the summary of a month, the current
/// month by default.
pub async fn get_monthly_report_endpoint(
    State(state): State<MonthlyReportState>,
    Extension(household_id): Extension<HouseholdId>,
    ApiQuery(query): ApiQuery<MonthQuery>,
) -> Result<ApiJson<MonthlyReport>, Error> {
    let month = query.resolve(&state.local_timezone)?;
    let connection = lock_connection(&state.db_connection)?;

    get_monthly_report(household_id, month, &connection).map(ApiJson)
}

/// Summarise the household's transactions and budgets for `month`.
pub fn get_monthly_report(
    household_id: HouseholdId,
    month: BudgetMonth,
    connection: &Connection,
) -> Result<MonthlyReport, Error> {
    let (start, end) = month.date_range();

    let (total_income, total_expenses) = connection
        .prepare(
            "SELECT
                COALESCE(SUM(CASE WHEN type = 'income' THEN amount_total END), 0),
                COALESCE(SUM(CASE WHEN type = 'expense' THEN amount_total END), 0)
            FROM \"transaction\"
            WHERE household_id = :household_id AND date >= :start AND date < :end",
        )?
        .query_row(
            named_params! {":household_id": household_id, ":start": start, ":end": end},
            |row| Ok((row.get::<_, FixedPoint>(0)?, row.get::<_, FixedPoint>(1)?)),
        )?;

    let categories = connection
        .prepare(
            "SELECT t.category_id, category.name, SUM(t.amount_total) AS amount
            FROM \"transaction\" t
            LEFT JOIN category ON category.id = t.category_id
            WHERE t.household_id = :household_id AND t.type = 'expense'
                AND t.date >= :start AND t.date < :end
            GROUP BY t.category_id
            ORDER BY amount DESC, t.category_id ASC",
        )?
        .query_map(
            named_params! {":household_id": household_id, ":start": start, ":end": end},
            |row| {
                Ok(CategoryTotal {
                    category_id: row.get(0)?,
                    category_name: row.get(1)?,
                    amount: row.get(2)?,
                })
            },
        )?
        .map(|maybe_total| maybe_total.map_err(Error::from))
        .collect::<Result<Vec<_>, Error>>()?;

    let budget_status = list_budget_status(household_id, month, connection)?;

    Ok(MonthlyReport {
        month,
        total_income,
        total_expenses,
        net_amount: total_income - total_expenses,
        categories,
        budget_status,
    })
}
