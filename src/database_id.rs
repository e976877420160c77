//! Database ID type definitions.

/// The ID of a user.
pub type UserId = i64;
/// The ID of an account.
pub type AccountId = i64;
/// The ID of a category.
pub type CategoryId = i64;
/// The ID of a transaction.
pub type TransactionId = i64;
/// The ID of a transaction line item.
pub type TransactionItemId = i64;
/// The ID of a tag.
pub type TagId = i64;
/// The ID of a budget.
pub type BudgetId = i64;
