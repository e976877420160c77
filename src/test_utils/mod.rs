#![allow(missing_docs)]

use axum::Router;
use axum_test::TestServer;
use rusqlite::Connection;
use time::{Date, macros::date};

use crate::{
    AppState,
    account::{AccountType, NewAccount, create_account},
    category::{NewCategory, create_category},
    config::Config,
    database_id::{AccountId, CategoryId, TransactionId, UserId},
    db::initialize,
    fixed_point::FixedPoint,
    household::{HouseholdId, create_household},
    name::Name,
    transaction::{NewTransaction, TransactionType, create_transaction},
    user::{NewUser, create_user},
};

/// The PIN that test states are configured with.
pub(crate) const TEST_PIN: &str = "1234";

/// The records every test household starts with.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TestHousehold {
    pub id: HouseholdId,
    /// The first user, and so the default payer.
    pub payer_id: UserId,
    pub partner_id: UserId,
    /// The only cash account, and so the default account.
    pub cash_account_id: AccountId,
    pub bank_account_id: AccountId,
    pub food_category_id: CategoryId,
    pub rent_category_id: CategoryId,
}

/// An in-memory database with all the tables created.
pub(crate) fn get_test_connection() -> Connection {
    let connection = Connection::open_in_memory().expect("Could not open in-memory database.");
    initialize(&connection).expect("Could not initialize database.");

    connection
}

/// Create a new household with two users, a "Cash" and a "Bank" account,
/// and the categories "Food" and "Rent".
pub(crate) fn create_test_household(connection: &Connection) -> TestHousehold {
    let household = create_household("Test Household", connection).unwrap();

    let new_user = |name: &str| {
        let new_user = NewUser {
            name: Name::new(name).unwrap(),
            email: None,
        };
        create_user(household.id, &new_user, connection).unwrap().id
    };
    let new_account = |name: &str, account_type: AccountType| {
        let new_account = NewAccount {
            name: Name::new(name).unwrap(),
            account_type,
        };
        create_account(household.id, &new_account, connection)
            .unwrap()
            .id
    };
    let new_category = |name: &str| {
        let new_category = NewCategory {
            name: Name::new(name).unwrap(),
            parent_id: None,
        };
        create_category(household.id, &new_category, connection)
            .unwrap()
            .id
    };

    TestHousehold {
        id: household.id,
        payer_id: new_user("Alex"),
        partner_id: new_user("Sam"),
        cash_account_id: new_account("Cash", AccountType::Cash),
        bank_account_id: new_account("Bank", AccountType::Bank),
        food_category_id: new_category("Food"),
        rent_category_id: new_category("Rent"),
    }
}

/// An expense on `date` with everything but the amount left to the defaults.
pub(crate) fn new_expense(date: Date, amount: i64) -> NewTransaction {
    NewTransaction {
        date,
        transaction_type: TransactionType::Expense,
        amount_total: FixedPoint::from(amount),
        account_id: None,
        counter_account_id: None,
        category_id: None,
        payer_user_id: None,
        split_ratio_payer: None,
        memo: None,
        items: Vec::new(),
        tags: Vec::new(),
    }
}

/// Save an expense of 1000 in the household's food category.
pub(crate) fn create_test_transaction(
    household: &TestHousehold,
    connection: &Connection,
) -> TransactionId {
    let new_transaction = NewTransaction {
        category_id: Some(household.food_category_id),
        ..new_expense(date!(2025 - 01 - 15), 1000)
    };

    create_transaction(household.id, &new_transaction, connection)
        .unwrap()
        .id
}

/// App state over an in-memory database whose PIN unlocks a fresh test household.
pub(crate) fn get_test_state_with_household() -> (AppState, TestHousehold) {
    let connection = get_test_connection();
    let household = create_test_household(&connection);

    let mut config = Config::new("test secret", TEST_PIN);
    config.household_id = household.id;

    let state = AppState::new(connection, config).unwrap();

    (state, household)
}

pub(crate) fn get_test_server(app: Router) -> TestServer {
    TestServer::new(app).expect("Could not create test server.")
}
