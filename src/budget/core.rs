//! Defines the budget model, its table and the spent-versus-limit calculation.

use rusqlite::{Connection, OptionalExtension, Row, named_params};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    budget::month::BudgetMonth,
    database_id::{BudgetId, CategoryId},
    db::{HouseholdTable, ensure_reference},
    fixed_point::FixedPoint,
    household::HouseholdId,
    name::Name,
};

/// A spending limit for one category in one month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Budget {
    pub id: BudgetId,
    pub household_id: HouseholdId,
    pub month: BudgetMonth,
    pub category_id: CategoryId,
    pub amount_limit: FixedPoint,
}

/// The data for creating a budget.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewBudget {
    pub month: BudgetMonth,
    pub category_id: CategoryId,
    /// Must be greater than zero.
    pub amount_limit: FixedPoint,
}

/// A budget with how much of it has been spent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetStatus {
    pub id: BudgetId,
    pub category_id: CategoryId,
    pub category_name: Name,
    pub month: BudgetMonth,
    pub amount_limit: FixedPoint,
    /// The sum of the category's expenses in the month.
    pub amount_spent: FixedPoint,
    /// The limit minus the amount spent, negative when over budget.
    pub amount_remaining: FixedPoint,
    /// The amount spent as a percentage of the limit, to one decimal place.
    pub percentage: Decimal,
}

/// Create the budget table.
pub fn create_budget_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS budget (
            id INTEGER PRIMARY KEY,
            household_id INTEGER NOT NULL REFERENCES household(id),
            month TEXT NOT NULL,
            category_id INTEGER NOT NULL REFERENCES category(id),
            amount_limit INTEGER NOT NULL CHECK (amount_limit >= 0),
            UNIQUE(household_id, month, category_id)
        );

        CREATE INDEX IF NOT EXISTS idx_budget_household_month ON budget(household_id, month);",
    )?;

    Ok(())
}

/// Create a budget for a category and month.
///
/// # Errors
/// Returns an error if:
/// - `amount_limit` is not positive or is greater than [FixedPoint::MAX],
/// - the category is not in the household,
/// - [Error::Conflict] if the category already has a budget for the month.
pub fn create_budget(
    household_id: HouseholdId,
    new_budget: &NewBudget,
    connection: &Connection,
) -> Result<Budget, Error> {
    if !new_budget.amount_limit.is_positive() {
        return Err(Error::NonPositiveAmount("amount_limit"));
    }
    new_budget.amount_limit.ensure_storable("amount_limit")?;

    ensure_reference(
        HouseholdTable::Category,
        "category_id",
        household_id,
        new_budget.category_id,
        connection,
    )?;

    if find_budget(household_id, new_budget.category_id, new_budget.month, connection)?.is_some() {
        return Err(Error::Conflict(format!(
            "a budget for category {} in {} already exists",
            new_budget.category_id, new_budget.month
        )));
    }

    connection
        .prepare(
            "INSERT INTO budget (household_id, month, category_id, amount_limit)
            VALUES (?1, ?2, ?3, ?4)
            RETURNING id, household_id, month, category_id, amount_limit",
        )?
        .query_row(
            (
                household_id,
                new_budget.month,
                new_budget.category_id,
                new_budget.amount_limit,
            ),
            map_row,
        )
        .map_err(Error::from)
}

/// Set the limit of a category's budget for a month, creating the budget if
/// it does not exist.
///
/// # Errors
/// Returns [Error::NegativeAmount] if `amount_limit` is negative,
/// [Error::AmountTooLarge] if it is greater than [FixedPoint::MAX], or an
/// invalid reference error if the category is not in the household.
pub fn upsert_budget(
    household_id: HouseholdId,
    category_id: CategoryId,
    month: BudgetMonth,
    amount_limit: FixedPoint,
    connection: &Connection,
) -> Result<Budget, Error> {
    if amount_limit.is_negative() {
        return Err(Error::NegativeAmount("amount_limit"));
    }
    amount_limit.ensure_storable("amount_limit")?;

    ensure_reference(
        HouseholdTable::Category,
        "category_id",
        household_id,
        category_id,
        connection,
    )?;

    connection
        .prepare(
            "INSERT INTO budget (household_id, month, category_id, amount_limit)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT (household_id, month, category_id)
                DO UPDATE SET amount_limit = excluded.amount_limit
            RETURNING id, household_id, month, category_id, amount_limit",
        )?
        .query_row((household_id, month, category_id, amount_limit), map_row)
        .map_err(Error::from)
}

/// Find the budget for a category and month, if there is one.
pub fn find_budget(
    household_id: HouseholdId,
    category_id: CategoryId,
    month: BudgetMonth,
    connection: &Connection,
) -> Result<Option<Budget>, Error> {
    connection
        .prepare(
            "SELECT id, household_id, month, category_id, amount_limit FROM budget
            WHERE household_id = ?1 AND category_id = ?2 AND month = ?3",
        )?
        .query_row((household_id, category_id, month), map_row)
        .optional()
        .map_err(Error::from)
}

/// Get the household's budgets for `month` with how much has been spent
/// against each, ordered by budget ID.
///
/// Spending is the sum of expenses in the budget's category dated within the
/// month. Income and transfers do not count.
pub fn list_budget_status(
    household_id: HouseholdId,
    month: BudgetMonth,
    connection: &Connection,
) -> Result<Vec<BudgetStatus>, Error> {
    let (start, end) = month.date_range();

    connection
        .prepare(
            "SELECT budget.id, budget.category_id, category.name, budget.month, budget.amount_limit,
                (SELECT COALESCE(SUM(t.amount_total), 0) FROM \"transaction\" t
                WHERE t.household_id = budget.household_id
                    AND t.category_id = budget.category_id
                    AND t.type = 'expense'
                    AND t.date >= :start AND t.date < :end)
            FROM budget
            INNER JOIN category ON category.id = budget.category_id
            WHERE budget.household_id = :household_id AND budget.month = :month
            ORDER BY budget.id ASC",
        )?
        .query_map(
            named_params! {
                ":household_id": household_id,
                ":month": month,
                ":start": start,
                ":end": end,
            },
            |row| {
                let amount_limit: FixedPoint = row.get(4)?;
                let amount_spent: FixedPoint = row.get(5)?;

                Ok(BudgetStatus {
                    id: row.get(0)?,
                    category_id: row.get(1)?,
                    category_name: row.get(2)?,
                    month: row.get(3)?,
                    amount_limit,
                    amount_spent,
                    amount_remaining: amount_limit - amount_spent,
                    percentage: spent_percentage(amount_spent, amount_limit),
                })
            },
        )?
        .map(|maybe_status| maybe_status.map_err(Error::from))
        .collect()
}

/// `spent` as a percentage of `limit` rounded to one decimal place, or zero
/// if `limit` is not positive.
pub fn spent_percentage(spent: FixedPoint, limit: FixedPoint) -> Decimal {
    if !limit.is_positive() {
        return Decimal::ZERO;
    }

    (spent.as_decimal() / limit.as_decimal() * Decimal::ONE_HUNDRED).round_dp(1)
}

fn map_row(row: &Row) -> Result<Budget, rusqlite::Error> {
    Ok(Budget {
        id: row.get(0)?,
        household_id: row.get(1)?,
        month: row.get(2)?,
        category_id: row.get(3)?,
        amount_limit: row.get(4)?,
    })
}


#[cfg(test)]
mod budget_tests {
    use time::macros::date;

    use crate::{
        Error,
        budget::month::BudgetMonth,
        fixed_point::FixedPoint,
        test_utils::{create_test_household, get_test_connection, new_expense},
        transaction::{NewTransaction, TransactionType, create_transaction},
    };

    use super::{NewBudget, create_budget, list_budget_status, upsert_budget};

    fn month(text: &str) -> BudgetMonth {
        BudgetMonth::parse(text).unwrap()
    }

    #[test]
    fn duplicate_budget_is_conflict() {
        let connection = get_test_connection();
        let household = create_test_household(&connection);
        let new_budget = NewBudget {
            month: month("202501"),
            category_id: household.food_category_id,
            amount_limit: FixedPoint::from(60000),
        };

        create_budget(household.id, &new_budget, &connection).unwrap();
        let duplicate = create_budget(household.id, &new_budget, &connection);

        assert!(matches!(duplicate, Err(Error::Conflict(_))));
        let count: i64 = connection
            .query_row("SELECT COUNT(*) FROM budget", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn unique_constraint_backs_up_the_check() {
        let connection = get_test_connection();
        let household = create_test_household(&connection);
        create_budget(
            household.id,
            &NewBudget {
                month: month("202501"),
                category_id: household.food_category_id,
                amount_limit: FixedPoint::from(100),
            },
            &connection,
        )
        .unwrap();

        let result = connection.execute(
            "INSERT INTO budget (household_id, month, category_id, amount_limit) VALUES (?1, ?2, ?3, 100)",
            (household.id, month("202501"), household.food_category_id),
        );

        assert!(matches!(Error::from(result.unwrap_err()), Error::Conflict(_)));
    }

    #[test]
    fn create_rejects_non_positive_limit() {
        let connection = get_test_connection();
        let household = create_test_household(&connection);

        assert_eq!(
            create_budget(
                household.id,
                &NewBudget {
                    month: month("202501"),
                    category_id: household.food_category_id,
                    amount_limit: FixedPoint::ZERO,
                },
                &connection,
            ),
            Err(Error::NonPositiveAmount("amount_limit"))
        );
    }

    #[test]
    fn rejects_limit_too_large_to_store() {
        let connection = get_test_connection();
        let household = create_test_household(&connection);
        let too_large: FixedPoint = serde_json::from_str("1e27").unwrap();

        assert_eq!(
            create_budget(
                household.id,
                &NewBudget {
                    month: month("202501"),
                    category_id: household.food_category_id,
                    amount_limit: too_large,
                },
                &connection,
            ),
            Err(Error::AmountTooLarge("amount_limit"))
        );
        assert_eq!(
            upsert_budget(
                household.id,
                household.food_category_id,
                month("202501"),
                too_large,
                &connection,
            ),
            Err(Error::AmountTooLarge("amount_limit"))
        );
    }

    #[test]
    fn upsert_updates_existing_limit() {
        let connection = get_test_connection();
        let household = create_test_household(&connection);

        let first = upsert_budget(
            household.id,
            household.food_category_id,
            month("202501"),
            FixedPoint::from(100),
            &connection,
        )
        .unwrap();
        let second = upsert_budget(
            household.id,
            household.food_category_id,
            month("202501"),
            FixedPoint::from(250),
            &connection,
        )
        .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.amount_limit, FixedPoint::from(250));
    }

    #[test]
    fn status_counts_only_expenses_in_month_and_category() {
        let connection = get_test_connection();
        let household = create_test_household(&connection);
        upsert_budget(
            household.id,
            household.food_category_id,
            month("202412"),
            FixedPoint::from(60000),
            &connection,
        )
        .unwrap();
        let food_expense = |day, amount| {
            let mut new_transaction = new_expense(day, amount);
            new_transaction.category_id = Some(household.food_category_id);
            new_transaction
        };
        create_transaction(household.id, &food_expense(date!(2024 - 12 - 01), 10000), &connection)
            .unwrap();
        create_transaction(household.id, &food_expense(date!(2024 - 12 - 31), 5000), &connection)
            .unwrap();
        // Outside the month.
        create_transaction(household.id, &food_expense(date!(2025 - 01 - 01), 7000), &connection)
            .unwrap();
        create_transaction(household.id, &food_expense(date!(2024 - 11 - 30), 7000), &connection)
            .unwrap();
        // Other category.
        let mut rent = new_expense(date!(2024 - 12 - 10), 90000);
        rent.category_id = Some(household.rent_category_id);
        create_transaction(household.id, &rent, &connection).unwrap();
        // Income in the same category.
        let income = NewTransaction {
            transaction_type: TransactionType::Income,
            ..food_expense(date!(2024 - 12 - 15), 3000)
        };
        create_transaction(household.id, &income, &connection).unwrap();

        let statuses = list_budget_status(household.id, month("202412"), &connection).unwrap();

        assert_eq!(statuses.len(), 1);
        let status = &statuses[0];
        assert_eq!(status.category_name.as_ref(), "Food");
        assert_eq!(status.amount_spent, FixedPoint::from(15000));
        assert_eq!(status.amount_remaining, FixedPoint::from(45000));
        assert_eq!(status.percentage, rust_decimal::Decimal::new(250, 1));
    }

    #[test]
    fn status_is_scoped_to_household() {
        let connection = get_test_connection();
        let ours = create_test_household(&connection);
        let theirs = create_test_household(&connection);
        upsert_budget(
            theirs.id,
            theirs.food_category_id,
            month("202501"),
            FixedPoint::from(100),
            &connection,
        )
        .unwrap();

        assert_eq!(
            list_budget_status(ours.id, month("202501"), &connection).unwrap(),
            vec![]
        );
    }
}
