//! Endpoints and queries for reading transactions.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Path, State},
};
use rusqlite::{Connection, ToSql, named_params};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    AppState, Error,
    api_json::{ApiJson, ApiQuery},
    database_id::{AccountId, CategoryId, TransactionId, UserId},
    db::lock_connection,
    household::HouseholdId,
    pagination::{Page, PaginationConfig, page_count},
    serde_fields::option_date,
    transaction::{
        core::{TRANSACTION_COLUMNS, get_transaction, map_transaction_row},
        view::{TransactionView, hydrate_transaction},
    },
};

/// The state needed to read transactions.
#[derive(Debug, Clone)]
pub struct TransactionQueryState {
    /// The database connection for reading transactions.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The default and maximum page sizes.
    pub pagination_config: PaginationConfig,
}

impl FromRef<AppState> for TransactionQueryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            pagination_config: state.config.pagination,
        }
    }
}

/// The query parameters for listing transactions.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListTransactionsQuery {
    /// The 1-based page number.
    pub page: Option<u64>,
    /// The number of transactions per page.
    pub size: Option<u64>,
    /// The earliest date to include.
    #[serde(default, with = "option_date")]
    pub from_date: Option<Date>,
    /// The latest date to include.
    #[serde(default, with = "option_date")]
    pub to_date: Option<Date>,
    pub category_id: Option<CategoryId>,
    pub account_id: Option<AccountId>,
    /// Only include transactions paid by this user.
    pub user_id: Option<UserId>,
    /// Only include transactions whose memo contains this text, ignoring case.
    pub q: Option<String>,
}

/// The filters applied when listing transactions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionFilter {
    pub from_date: Option<Date>,
    pub to_date: Option<Date>,
    pub category_id: Option<CategoryId>,
    pub account_id: Option<AccountId>,
    pub user_id: Option<UserId>,
    pub memo_contains: Option<String>,
}

impl From<&ListTransactionsQuery> for TransactionFilter {
    fn from(query: &ListTransactionsQuery) -> Self {
        Self {
            from_date: query.from_date,
            to_date: query.to_date,
            category_id: query.category_id,
            account_id: query.account_id,
            user_id: query.user_id,
            memo_contains: query
                .q
                .as_ref()
                .map(|q| q.trim().to_owned())
                .filter(|q| !q.is_empty()),
        }
    }
}

/// A page of transactions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionPage {
    pub transactions: Vec<TransactionView>,
    /// The number of transactions matching the filters across all pages.
    pub total: u64,
    pub page: u64,
    pub size: u64,
    /// The number of pages needed to show all matching transactions.
    pub pages: u64,
}

/// A route handler that responds with a page of the household's transactions,
/// newest first.
pub async fn list_transactions_endpoint(
    State(state): State<TransactionQueryState>,
    Extension(household_id): Extension<HouseholdId>,
    ApiQuery(query): ApiQuery<ListTransactionsQuery>,
) -> Result<ApiJson<TransactionPage>, Error> {
    let page = state.pagination_config.page(query.page, query.size)?;
    let filter = TransactionFilter::from(&query);

    let connection = lock_connection(&state.db_connection)?;

    list_transactions(household_id, &filter, page, &connection).map(ApiJson)
}

/// A route handler that responds with a single transaction.
pub async fn get_transaction_endpoint(
    State(state): State<TransactionQueryState>,
    Extension(household_id): Extension<HouseholdId>,
    Path(transaction_id): Path<TransactionId>,
) -> Result<ApiJson<TransactionView>, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let transaction = get_transaction(household_id, transaction_id, &connection)?;

    hydrate_transaction(transaction, &connection).map(ApiJson)
}

const FILTER_CLAUSE: &str = "household_id = :household_id
    AND (:from_date IS NULL OR date >= :from_date)
    AND (:to_date IS NULL OR date <= :to_date)
    AND (:category_id IS NULL OR category_id = :category_id)
    AND (:account_id IS NULL OR account_id = :account_id)
    AND (:user_id IS NULL OR payer_user_id = :user_id)
    AND (:q IS NULL OR instr(lower(COALESCE(memo, '')), lower(:q)) > 0)";

/// Get one page of the household's transactions matching `filter`.
///
/// Transactions are sorted by date, newest first, with transactions on the
/// same day sorted by when they were recorded, newest first.
pub fn list_transactions(
    household_id: HouseholdId,
    filter: &TransactionFilter,
    page: Page,
    connection: &Connection,
) -> Result<TransactionPage, Error> {
    let filter_params = named_params! {
        ":household_id": household_id,
        ":from_date": filter.from_date,
        ":to_date": filter.to_date,
        ":category_id": filter.category_id,
        ":account_id": filter.account_id,
        ":user_id": filter.user_id,
        ":q": filter.memo_contains,
    };

    let total: u64 = connection
        .prepare(&format!(
            "SELECT COUNT(*) FROM \"transaction\" WHERE {FILTER_CLAUSE}"
        ))?
        .query_row(filter_params, |row| row.get(0))?;

    let limit = page.size;
    let offset = page.offset();
    let mut page_params: Vec<(&str, &dyn ToSql)> = filter_params.to_vec();
    page_params.push((":limit", &limit));
    page_params.push((":offset", &offset));

    let transactions = connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" WHERE {FILTER_CLAUSE}
            ORDER BY date DESC, created_at DESC, id DESC
            LIMIT :limit OFFSET :offset"
        ))?
        .query_map(page_params.as_slice(), map_transaction_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(Error::from))
        .collect::<Result<Vec<_>, Error>>()?;

    let transactions = transactions
        .into_iter()
        .map(|transaction| hydrate_transaction(transaction, connection))
        .collect::<Result<Vec<_>, Error>>()?;

    Ok(TransactionPage {
        transactions,
        total,
        page: page.number,
        size: page.size,
        pages: page_count(total, page.size),
    })
}

#[cfg(test)]
mod list_transactions_tests {
    use time::{Duration, macros::date};

    use crate::{
        account::deactivate_account,
        pagination::Page,
        test_utils::{create_test_household, get_test_connection, new_expense},
        transaction::create_endpoint::create_transaction,
    };

    use super::{TransactionFilter, list_transactions};

    #[test]
    fn splits_results_into_pages() {
        let connection = get_test_connection();
        let household = create_test_household(&connection);
        let start = date!(2025 - 01 - 01);
        for i in 0..120 {
            create_transaction(
                household.id,
                &new_expense(start + Duration::days(i % 28), 100 + i),
                &connection,
            )
            .unwrap();
        }

        let first = list_transactions(
            household.id,
            &TransactionFilter::default(),
            Page { number: 1, size: 50 },
            &connection,
        )
        .unwrap();
        let last = list_transactions(
            household.id,
            &TransactionFilter::default(),
            Page { number: 3, size: 50 },
            &connection,
        )
        .unwrap();

        assert_eq!(first.total, 120);
        assert_eq!(first.pages, 3);
        assert_eq!(first.transactions.len(), 50);
        assert_eq!(last.page, 3);
        assert_eq!(last.transactions.len(), 20);
    }

    #[test]
    fn sorts_newest_first_with_same_day_ties_by_creation() {
        let connection = get_test_connection();
        let household = create_test_household(&connection);
        let older = create_transaction(household.id, &new_expense(date!(2025 - 01 - 01), 1), &connection)
            .unwrap();
        let first_same_day =
            create_transaction(household.id, &new_expense(date!(2025 - 01 - 05), 2), &connection)
                .unwrap();
        let second_same_day =
            create_transaction(household.id, &new_expense(date!(2025 - 01 - 05), 3), &connection)
                .unwrap();

        let page = list_transactions(
            household.id,
            &TransactionFilter::default(),
            Page { number: 1, size: 50 },
            &connection,
        )
        .unwrap();

        let ids: Vec<i64> = page.transactions.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![second_same_day.id, first_same_day.id, older.id]);
    }

    #[test]
    fn filters_by_inclusive_date_range() {
        let connection = get_test_connection();
        let household = create_test_household(&connection);
        for day in [date!(2025 - 01 - 31), date!(2025 - 02 - 01), date!(2025 - 02 - 28), date!(2025 - 03 - 01)] {
            create_transaction(household.id, &new_expense(day, 10), &connection).unwrap();
        }
        let filter = TransactionFilter {
            from_date: Some(date!(2025 - 02 - 01)),
            to_date: Some(date!(2025 - 02 - 28)),
            ..Default::default()
        };

        let page = list_transactions(household.id, &filter, Page { number: 1, size: 50 }, &connection)
            .unwrap();

        let dates: Vec<_> = page.transactions.iter().map(|t| t.date).collect();
        assert_eq!(dates, vec![date!(2025 - 02 - 28), date!(2025 - 02 - 01)]);
    }

    #[test]
    fn filters_by_category_payer_and_memo() {
        let connection = get_test_connection();
        let household = create_test_household(&connection);
        let mut groceries = new_expense(date!(2025 - 01 - 10), 50);
        groceries.category_id = Some(household.food_category_id);
        groceries.memo = Some("Weekly SUPERMARKET run".to_owned());
        let groceries = create_transaction(household.id, &groceries, &connection).unwrap();
        let mut rent = new_expense(date!(2025 - 01 - 10), 900);
        rent.category_id = Some(household.rent_category_id);
        rent.payer_user_id = Some(household.partner_id);
        let rent = create_transaction(household.id, &rent, &connection).unwrap();

        let by_category = TransactionFilter {
            category_id: Some(household.food_category_id),
            ..Default::default()
        };
        let by_payer = TransactionFilter {
            user_id: Some(household.partner_id),
            ..Default::default()
        };
        let by_memo = TransactionFilter {
            memo_contains: Some("supermarket".to_owned()),
            ..Default::default()
        };
        let page = Page { number: 1, size: 50 };

        let ids = |filter: &TransactionFilter| -> Vec<i64> {
            list_transactions(household.id, filter, page, &connection)
                .unwrap()
                .transactions
                .iter()
                .map(|t| t.id)
                .collect()
        };

        assert_eq!(ids(&by_category), vec![groceries.id]);
        assert_eq!(ids(&by_payer), vec![rent.id]);
        assert_eq!(ids(&by_memo), vec![groceries.id]);
    }

    #[test]
    fn excludes_other_households() {
        let connection = get_test_connection();
        let ours = create_test_household(&connection);
        let theirs = create_test_household(&connection);
        create_transaction(theirs.id, &new_expense(date!(2025 - 01 - 10), 10), &connection).unwrap();

        let page = list_transactions(
            ours.id,
            &TransactionFilter::default(),
            Page { number: 1, size: 50 },
            &connection,
        )
        .unwrap();

        assert_eq!(page.total, 0);
        assert_eq!(page.pages, 0);
        assert!(page.transactions.is_empty());
    }

    #[test]
    fn deleted_account_still_resolves_on_old_transactions() {
        let connection = get_test_connection();
        let household = create_test_household(&connection);
        let mut new_transaction = new_expense(date!(2025 - 01 - 10), 10);
        new_transaction.account_id = Some(household.bank_account_id);
        create_transaction(household.id, &new_transaction, &connection).unwrap();

        deactivate_account(household.id, household.bank_account_id, &connection).unwrap();
        let page = list_transactions(
            household.id,
            &TransactionFilter::default(),
            Page { number: 1, size: 50 },
            &connection,
        )
        .unwrap();

        let account = page.transactions[0].account.as_ref().unwrap();
        assert_eq!(account.id, household.bank_account_id);
        assert_eq!(account.name.as_ref(), "Bank");
    }
}
