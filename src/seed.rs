//! Fills a database with a demo household for manual testing.

use rusqlite::Connection;
use rust_decimal::Decimal;
use time::{Date, Duration};

use crate::{
    Error,
    account::{AccountType, NewAccount, create_account},
    budget::{BudgetMonth, upsert_budget},
    category::{NewCategory, create_category},
    database_id::{AccountId, CategoryId, UserId},
    fixed_point::{FixedPoint, SplitRatio},
    household::{Household, create_household},
    name::Name,
    transaction::{NewTransaction, NewTransactionItem, TransactionType, create_transaction},
    user::{NewUser, create_user},
};

/// What [seed_demo_household] created.
#[derive(Debug, Clone, PartialEq)]
pub struct SeedSummary {
    /// The demo household.
    pub household: Household,
    /// The number of users created.
    pub users: usize,
    /// The number of accounts created.
    pub accounts: usize,
    /// The number of categories created.
    pub categories: usize,
    /// The number of transactions created.
    pub transactions: usize,
    /// The number of budgets created.
    pub budgets: usize,
}

struct DemoAccounts {
    cash: AccountId,
    salary_bank: AccountId,
    savings_bank: AccountId,
    card: AccountId,
    ic: AccountId,
}

struct DemoCategories {
    food: CategoryId,
    groceries: CategoryId,
    dining_out: CategoryId,
    housing: CategoryId,
    utilities: CategoryId,
    transport: CategoryId,
    entertainment: CategoryId,
    salary: CategoryId,
}

/// Create a household with two members, five accounts, a category tree,
/// a month of transactions ending at `today` and budgets for the month of `today`.
///
/// Everything is written in one SQL transaction.
///
/// # Errors
/// Returns an error if any record could not be created, in which case nothing is saved.
pub fn seed_demo_household(today: Date, connection: &Connection) -> Result<SeedSummary, Error> {
    let transaction = connection.unchecked_transaction()?;

    let household = create_household("Demo Household", &transaction)?;
    let household_id = household.id;

    let mut user_ids = Vec::new();
    for (name, email) in [("Alex", "alex@example.com"), ("Sam", "sam@example.com")] {
        let user = create_user(
            household_id,
            &NewUser {
                name: Name::new(name)?,
                email: Some(email.to_owned()),
            },
            &transaction,
        )?;
        user_ids.push(user.id);
    }
    let (alex, sam) = (user_ids[0], user_ids[1]);

    let new_account = |name: &str, account_type: AccountType| -> Result<AccountId, Error> {
        let new_account = NewAccount {
            name: Name::new(name)?,
            account_type,
        };
        Ok(create_account(household_id, &new_account, &transaction)?.id)
    };
    let accounts = DemoAccounts {
        cash: new_account("Wallet", AccountType::Cash)?,
        salary_bank: new_account("Salary Account", AccountType::Bank)?,
        savings_bank: new_account("Savings", AccountType::Bank)?,
        card: new_account("Credit Card", AccountType::Card)?,
        ic: new_account("Suica", AccountType::Ic)?,
    };

    let new_category = |name: &str, parent_id: Option<CategoryId>| -> Result<CategoryId, Error> {
        let new_category = NewCategory {
            name: Name::new(name)?,
            parent_id,
        };
        Ok(create_category(household_id, &new_category, &transaction)?.id)
    };
    let food = new_category("Food", None)?;
    let housing = new_category("Housing", None)?;
    let categories = DemoCategories {
        food,
        groceries: new_category("Groceries", Some(food))?,
        dining_out: new_category("Dining Out", Some(food))?,
        housing,
        utilities: new_category("Utilities", Some(housing))?,
        transport: new_category("Transport", None)?,
        entertainment: new_category("Entertainment", None)?,
        salary: new_category("Salary", None)?,
    };

    let demo_transactions = demo_transactions(today, alex, sam, &accounts, &categories)?;
    for new_transaction in &demo_transactions {
        create_transaction(household_id, new_transaction, &transaction)?;
    }

    let month = BudgetMonth::containing(today)?;
    let budgets = [
        (categories.food, 60_000),
        (categories.housing, 120_000),
        (categories.transport, 15_000),
        (categories.entertainment, 20_000),
    ];
    for (category_id, limit) in budgets {
        upsert_budget(
            household_id,
            category_id,
            month,
            FixedPoint::from(limit),
            &transaction,
        )?;
    }

    transaction.commit()?;

    tracing::info!(
        "Seeded household {} with {} transactions",
        household.id,
        demo_transactions.len()
    );

    Ok(SeedSummary {
        household,
        users: user_ids.len(),
        accounts: 5,
        categories: 8,
        transactions: demo_transactions.len(),
        budgets: budgets.len(),
    })
}

fn item(
    name: &str,
    quantity: i64,
    unit_price: i64,
    category_id: CategoryId,
) -> Result<NewTransactionItem, Error> {
    Ok(NewTransactionItem {
        name: Name::new(name)?,
        quantity: FixedPoint::from(quantity),
        unit_price: FixedPoint::from(unit_price),
        amount: FixedPoint::from(quantity * unit_price),
        category_id: Some(category_id),
    })
}

fn demo_transactions(
    today: Date,
    alex: UserId,
    sam: UserId,
    accounts: &DemoAccounts,
    categories: &DemoCategories,
) -> Result<Vec<NewTransaction>, Error> {
    let days_ago = |days: i64| today - Duration::days(days);
    let half = SplitRatio::EVEN;
    let base = |date: Date, transaction_type: TransactionType, amount: i64| NewTransaction {
        date,
        transaction_type,
        amount_total: FixedPoint::from(amount),
        account_id: None,
        counter_account_id: None,
        category_id: None,
        payer_user_id: None,
        split_ratio_payer: None,
        memo: None,
        items: Vec::new(),
        tags: Vec::new(),
    };

    Ok(vec![
        NewTransaction {
            account_id: Some(accounts.salary_bank),
            category_id: Some(categories.salary),
            payer_user_id: Some(alex),
            memo: Some("Monthly salary".to_owned()),
            ..base(days_ago(25), TransactionType::Income, 320_000)
        },
        NewTransaction {
            account_id: Some(accounts.salary_bank),
            category_id: Some(categories.housing),
            payer_user_id: Some(alex),
            split_ratio_payer: Some(half),
            memo: Some("Rent".to_owned()),
            ..base(days_ago(24), TransactionType::Expense, 95_000)
        },
        NewTransaction {
            account_id: Some(accounts.card),
            category_id: Some(categories.groceries),
            payer_user_id: Some(sam),
            split_ratio_payer: Some(half),
            memo: Some("Weekly shop".to_owned()),
            items: vec![
                item("Rice 5kg", 1, 2_480, categories.groceries)?,
                item("Eggs", 2, 298, categories.groceries)?,
                item("Vegetables", 1, 1_124, categories.groceries)?,
            ],
            tags: vec![Name::new("supermarket")?],
            ..base(days_ago(20), TransactionType::Expense, 4_200)
        },
        NewTransaction {
            account_id: Some(accounts.cash),
            category_id: Some(categories.dining_out),
            payer_user_id: Some(alex),
            split_ratio_payer: Some(half),
            memo: Some("Ramen".to_owned()),
            ..base(days_ago(15), TransactionType::Expense, 2_400)
        },
        NewTransaction {
            account_id: Some(accounts.ic),
            category_id: Some(categories.transport),
            payer_user_id: Some(sam),
            ..base(days_ago(12), TransactionType::Expense, 3_000)
        },
        NewTransaction {
            account_id: Some(accounts.salary_bank),
            counter_account_id: Some(accounts.savings_bank),
            payer_user_id: Some(alex),
            memo: Some("Move to savings".to_owned()),
            ..base(days_ago(10), TransactionType::Transfer, 50_000)
        },
        NewTransaction {
            account_id: Some(accounts.card),
            category_id: Some(categories.utilities),
            payer_user_id: Some(sam),
            split_ratio_payer: Some(half),
            memo: Some("Electricity".to_owned()),
            tags: vec![Name::new("bills")?],
            ..base(days_ago(7), TransactionType::Expense, 8_600)
        },
        NewTransaction {
            account_id: Some(accounts.card),
            category_id: Some(categories.entertainment),
            payer_user_id: Some(alex),
            split_ratio_payer: Some(SplitRatio::new(Decimal::new(7, 1))?),
            memo: Some("Cinema".to_owned()),
            ..base(days_ago(3), TransactionType::Expense, 3_600)
        },
        NewTransaction {
            category_id: Some(categories.food),
            memo: Some("Snacks".to_owned()),
            ..base(today, TransactionType::Expense, 650)
        },
    ])
}
