//! Household members: the people who pay for transactions.

mod core;
mod endpoints;

pub use core::{
    NewUser, User, UserPatch, create_user, create_user_table, default_payer, get_user, list_users,
};
pub use endpoints::{
    create_user_endpoint, delete_user_endpoint, edit_user_endpoint, list_users_endpoint,
};
