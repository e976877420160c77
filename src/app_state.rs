//! Implements a struct that holds the state of the REST server.

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::{Error, auth::TokenKeys, config::Config, db::initialize};

/// The state of the REST server.
#[derive(Clone)]
pub struct AppState {
    /// The settings the server was started with.
    pub config: Arc<Config>,

    /// The keys for signing and verifying access tokens.
    pub token_keys: TokenKeys,

    /// The database connection
    pub db_connection: Arc<Mutex<Connection>>,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables for the domain models.
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn new(db_connection: Connection, config: Config) -> Result<Self, Error> {
        initialize(&db_connection)?;

        Ok(Self {
            token_keys: TokenKeys::new(&config.app_secret),
            config: Arc::new(config),
            db_connection: Arc::new(Mutex::new(db_connection)),
        })
    }
}
