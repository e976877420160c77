//! Tags for labelling transactions.

mod db;

pub use db::{
    Tag, create_tag_table, create_transaction_tag_table, get_or_create_tag,
    get_transaction_tag_names, set_transaction_tags,
};
