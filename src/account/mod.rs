mod core;
mod create_endpoint;
mod delete_endpoint;
mod edit_endpoint;
mod list_endpoint;

pub use core::{
    Account, AccountType, create_account_table, default_cash_account, get_account, list_accounts,
    map_row_to_account,
};
pub use create_endpoint::{NewAccount, create_account, create_account_endpoint};
pub use delete_endpoint::{deactivate_account, delete_account_endpoint};
pub use edit_endpoint::{AccountPatch, edit_account_endpoint, update_account};
pub use list_endpoint::list_accounts_endpoint;
