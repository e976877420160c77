//! A REST API for a household budget.
//!
//! Members of a household log in with a shared PIN and record income,
//! expenses and transfers between their accounts. Transactions can be broken
//! down into line items and split between the person who paid and the rest of
//! the household. Monthly budgets per category are compared against actual
//! spending and summarised in reports.
//!
//! All data is kept in a single SQLite database and every record belongs to
//! exactly one household.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum_server::Handle;
use tokio::signal;

mod account;
mod api_json;
mod app_state;
mod audit;
mod auth;
mod budget;
mod category;
mod config;
mod database_id;
mod db;
mod endpoints;
mod error;
mod fixed_point;
mod health;
mod household;
mod logging;
mod name;
mod pagination;
mod report;
mod routing;
mod seed;
mod serde_fields;
mod tag;
mod timezone;
mod transaction;
mod user;

#[cfg(test)]
mod test_utils;

pub use app_state::AppState;
pub use config::{
    Config, DEFAULT_CORS_ORIGINS, DEFAULT_TIMEZONE, DEFAULT_TOKEN_LIFETIME, parse_origins,
};
pub use db::initialize as initialize_db;
pub use error::Error;
pub use household::HouseholdId;
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use routing::build_router;
pub use seed::{SeedSummary, seed_demo_household};
pub use timezone::local_today;

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {error}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!("failed to install signal handler: {error}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}
