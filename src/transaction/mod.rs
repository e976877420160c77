//! Transactions: expenses, income and transfers with their line items.
//!
//! This module contains:
//! - The `Transaction` model and its tables
//! - Database functions for creating, querying, updating and deleting transactions
//! - The JSON view of a transaction with its related records resolved
//! - The route handlers for the transaction endpoints

mod core;
mod create_endpoint;
mod delete_endpoint;
mod edit_endpoint;
mod query;
mod view;

pub use core::{
    NewTransactionItem, Transaction, TransactionItem, TransactionType, create_receipt_table,
    create_transaction_item_table, create_transaction_table, get_transaction,
};
pub use create_endpoint::{
    NewTransaction, TransactionSaved, create_transaction, create_transaction_endpoint,
};
pub use delete_endpoint::{delete_transaction, delete_transaction_endpoint};
pub use edit_endpoint::{TransactionPatch, edit_transaction_endpoint, update_transaction};
pub use query::{
    TransactionFilter, get_transaction_endpoint, list_transactions, list_transactions_endpoint,
};
pub use view::{EntitySummary, TransactionView};
