//! How the household's expenses are split between the members who paid them.

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
    database_id::UserId,
    db::lock_connection,
    fixed_point::{FixedPoint, SplitRatio, split_amount},
    household::HouseholdId,
    name::Name,
    serde_fields::option_date,
};

/// The state needed for the split report.
#[derive(Debug, Clone)]
pub struct SplitReportState {
    /// The database connection for reading transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for SplitReportState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// An optional inclusive date range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DateRangeQuery {
    #[serde(default, with = "option_date")]
    pub from_date: Option<Date>,
    #[serde(default, with = "option_date")]
    pub to_date: Option<Date>,
}

/// What one member paid and how it splits.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserSplit {
    pub user_id: UserId,
    pub user_name: Name,
    /// The sum of the expenses this user paid.
    pub total_paid: FixedPoint,
    /// The part of `total_paid` attributed to this user.
    pub payer_share: FixedPoint,
    /// The part of `total_paid` attributed to the other member.
    pub other_share: FixedPoint,
}

/// The split of expenses per paying member.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SplitReport {
    #[serde(flatten)]
    pub range: DateRangeQuery,
    /// One entry per member who paid an expense, ordered by user ID.
    pub users: Vec<UserSplit>,
    pub total_expenses: FixedPoint,
}

/// A route handler that responds with how expenses in a date range split
/// between the members who paid them.
pub async fn get_split_report_endpoint(
    State(state): State<SplitReportState>,
    Extension(household_id): Extension<HouseholdId>,
    ApiQuery(range): ApiQuery<DateRangeQuery>,
) -> Result<ApiJson<SplitReport>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_split_report(household_id, range, &connection).map(ApiJson)
}

/// Sum each payer's expenses in `range` and split them by each expense's ratio.
///
/// Shares are split per expense so that, for every user,
/// `payer_share + other_share == total_paid`.
pub fn get_split_report(
    household_id: HouseholdId,
    range: DateRangeQuery,
    connection: &Connection,
) -> Result<SplitReport, Error> {
    let mut statement = connection.prepare(
        "SELECT t.payer_user_id, user.name, t.amount_total, t.split_ratio_payer
        FROM \"transaction\" t
        INNER JOIN user ON user.id = t.payer_user_id
        WHERE t.household_id = :household_id AND t.type = 'expense'
            AND (:from_date IS NULL OR t.date >= :from_date)
            AND (:to_date IS NULL OR t.date <= :to_date)",
    )?;
    let rows = statement.query_map(
        named_params! {
            ":household_id": household_id,
            ":from_date": range.from_date,
            ":to_date": range.to_date,
        },
        |row| {
            Ok((
                row.get::<_, UserId>(0)?,
                row.get::<_, Name>(1)?,
                row.get::<_, FixedPoint>(2)?,
                row.get::<_, SplitRatio>(3)?,
            ))
        },
    )?;

    let mut users: BTreeMap<UserId, UserSplit> = BTreeMap::new();
    let mut total_expenses = FixedPoint::ZERO;

    for row in rows {
        let (user_id, user_name, amount, ratio) = row?;
        let shares = split_amount(amount, ratio);
        total_expenses = total_expenses + amount;

        let split = users.entry(user_id).or_insert_with(|| UserSplit {
            user_id,
            user_name,
            total_paid: FixedPoint::ZERO,
            payer_share: FixedPoint::ZERO,
            other_share: FixedPoint::ZERO,
        });
        split.total_paid = split.total_paid + amount;
        split.payer_share = split.payer_share + shares.payer_share;
        split.other_share = split.other_share + shares.other_share;
    }

    Ok(SplitReport {
        range,
        users: users.into_values().collect(),
        total_expenses,
    })
}
