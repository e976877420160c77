//! Monthly spending limits per category and how much of them has been spent.

mod core;
mod endpoints;
mod month;

pub use core::{
    Budget, BudgetStatus, NewBudget, create_budget, create_budget_table, list_budget_status,
    spent_percentage, upsert_budget,
};
pub use endpoints::{
    BudgetState, MonthQuery, bulk_update_budgets_endpoint, create_budget_endpoint,
    list_budgets_endpoint,
};
pub use month::BudgetMonth;
