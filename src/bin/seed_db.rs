use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rusqlite::Connection;

use household_budget::{DEFAULT_TIMEZONE, initialize_db, local_today, seed_demo_household};

/// A utility for creating a demo database for the household_budget server.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,

    /// The timezone that decides which month the budgets are created for.
    #[arg(long, env = "TIMEZONE", default_value = DEFAULT_TIMEZONE)]
    timezone: String,
}

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let conn = Connection::open(output_path)?;

    initialize_db(&conn)?;

    println!("Creating demo household...");

    let summary = seed_demo_household(local_today(&args.timezone)?, &conn)?;

    println!(
        "Created household {} with {} users, {} accounts, {} categories, {} transactions and {} budgets.",
        summary.household.id,
        summary.users,
        summary.accounts,
        summary.categories,
        summary.transactions,
        summary.budgets
    );
    println!("Success!");

    Ok(())
}
