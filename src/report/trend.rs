//! Income and expenses over time, grouped by month or ISO week.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

use axum::{
    Extension,
    extract::{FromRef, State},
};
use rusqlite::{Connection, named_params};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    AppState, Error,
    api_json::{ApiJson, ApiQuery},
    db::lock_connection,
    fixed_point::FixedPoint,
    household::HouseholdId,
    serde_fields::option_date,
    transaction::TransactionType,
};

/// The state needed for the trend report.
#[derive(Debug, Clone)]
pub struct TrendReportState {
    /// The database connection for reading transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for TrendReportState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The length of the periods a trend is grouped into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Grouping {
    /// Calendar months, labelled "YYYY-MM".
    Month,
    /// ISO weeks, labelled "YYYY-Www".
    Week,
}

impl Grouping {
    /// Parse "month" or "week".
    ///
    /// # Errors
    /// Returns [Error::InvalidGrouping] for anything else.
    pub fn parse(text: &str) -> Result<Self, Error> {
        match text {
            "month" => Ok(Self::Month),
            "week" => Ok(Self::Week),
            other => Err(Error::InvalidGrouping(other.to_owned())),
        }
    }

    /// The label of the period containing `date`.
    pub fn period_of(self, date: Date) -> String {
        match self {
            Grouping::Month => format!("{:04}-{:02}", date.year(), date.month() as u8),
            Grouping::Week => {
                let (year, week, _) = date.to_iso_week_date();
                format!("{year:04}-W{week:02}")
            }
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrendQuery {
    #[serde(default, with = "option_date")]
    pub from_date: Option<Date>,
    #[serde(default, with = "option_date")]
    pub to_date: Option<Date>,
    /// "month" (the default) or "week".
    pub group_by: Option<String>,
}

/// The totals of one period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub period: String,
    pub income: FixedPoint,
    pub expenses: FixedPoint,
}

/// Income and expenses per period, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendReport {
    #[serde(with = "option_date")]
    pub from_date: Option<Date>,
    #[serde(with = "option_date")]
    pub to_date: Option<Date>,
    pub group_by: Grouping,
    /// Only periods with at least one transaction are included.
    pub data: Vec<TrendPoint>,
}

/// A route handler that responds with income and expenses per month or week.
pub async fn get_trend_report_endpoint(
    State(state): State<TrendReportState>,
    Extension(household_id): Extension<HouseholdId>,
    ApiQuery(query): ApiQuery<TrendQuery>,
) -> Result<ApiJson<TrendReport>, Error> {
    let grouping = Grouping::parse(query.group_by.as_deref().unwrap_or("month"))?;
    let connection = lock_connection(&state.db_connection)?;

    get_trend_report(
        household_id,
        query.from_date,
        query.to_date,
        grouping,
        &connection,
    )
    .map(ApiJson)
}

/// Total the household's income and expenses between `from_date` and
/// `to_date` (both inclusive) per period. Transfers are left out.
pub fn get_trend_report(
    household_id: HouseholdId,
    from_date: Option<Date>,
    to_date: Option<Date>,
    grouping: Grouping,
    connection: &Connection,
) -> Result<TrendReport, Error> {
    let mut statement = connection.prepare(
        "SELECT date, type, amount_total FROM \"transaction\"
        WHERE household_id = :household_id AND type IN ('income', 'expense')
            AND (:from_date IS NULL OR date >= :from_date)
            AND (:to_date IS NULL OR date <= :to_date)",
    )?;
    let rows = statement.query_map(
        named_params! {
            ":household_id": household_id,
            ":from_date": from_date,
            ":to_date": to_date,
        },
        |row| {
            Ok((
                row.get::<_, Date>(0)?,
                row.get::<_, TransactionType>(1)?,
                row.get::<_, FixedPoint>(2)?,
            ))
        },
    )?;

    // Both label formats sort chronologically as strings.
    let mut periods: BTreeMap<String, TrendPoint> = BTreeMap::new();

    for row in rows {
        let (date, transaction_type, amount) = row?;
        let period = grouping.period_of(date);
        let point = periods.entry(period.clone()).or_insert_with(|| TrendPoint {
            period,
            income: FixedPoint::ZERO,
            expenses: FixedPoint::ZERO,
        });

        match transaction_type {
            TransactionType::Income => point.income = point.income + amount,
            TransactionType::Expense => point.expenses = point.expenses + amount,
            TransactionType::Transfer => {}
        }
    }

    Ok(TrendReport {
        from_date,
        to_date,
        group_by: grouping,
        data: periods.into_values().collect(),
    })
}
