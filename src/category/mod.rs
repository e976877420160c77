//! Categories group transactions and budgets by what the money was for.

mod core;
mod endpoints;

pub use core::{
    Category, CategoryPatch, NewCategory, create_category, create_category_table,
    deactivate_category, get_category, list_categories, update_category,
};
pub use endpoints::{
    create_category_endpoint, delete_category_endpoint, edit_category_endpoint,
    list_categories_endpoint,
};
