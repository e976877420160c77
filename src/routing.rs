//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post, put},
};
use tower_http::cors::CorsLayer;

use crate::{
    AppState, Error,
    account::{
        create_account_endpoint, delete_account_endpoint, edit_account_endpoint,
        list_accounts_endpoint,
    },
    auth::{auth_guard, get_me, post_log_in, post_log_out},
    budget::{bulk_update_budgets_endpoint, create_budget_endpoint, list_budgets_endpoint},
    category::{
        create_category_endpoint, delete_category_endpoint, edit_category_endpoint,
        list_categories_endpoint,
    },
    endpoints,
    health::{get_health, get_root},
    report::{
        get_monthly_report_endpoint, get_split_report_endpoint, get_trend_report_endpoint,
    },
    transaction::{
        create_transaction_endpoint, delete_transaction_endpoint, edit_transaction_endpoint,
        get_transaction_endpoint, list_transactions_endpoint,
    },
    user::{create_user_endpoint, delete_user_endpoint, edit_user_endpoint, list_users_endpoint},
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::ROOT, get(get_root))
        .route(endpoints::HEALTH, get(get_health))
        .route(endpoints::LOG_IN, post(post_log_in))
        .route(endpoints::LOG_OUT, post(post_log_out))
        .route(endpoints::ME, get(get_me));

    let protected_routes = Router::new()
        .route(
            endpoints::USERS,
            get(list_users_endpoint).post(create_user_endpoint),
        )
        .route(
            endpoints::USER,
            put(edit_user_endpoint).delete(delete_user_endpoint),
        )
        .route(
            endpoints::ACCOUNTS,
            get(list_accounts_endpoint).post(create_account_endpoint),
        )
        .route(
            endpoints::ACCOUNT,
            put(edit_account_endpoint).delete(delete_account_endpoint),
        )
        .route(
            endpoints::CATEGORIES,
            get(list_categories_endpoint).post(create_category_endpoint),
        )
        .route(
            endpoints::CATEGORY,
            put(edit_category_endpoint).delete(delete_category_endpoint),
        )
        .route(
            endpoints::TRANSACTIONS,
            get(list_transactions_endpoint).post(create_transaction_endpoint),
        )
        .route(
            endpoints::TRANSACTION,
            get(get_transaction_endpoint)
                .put(edit_transaction_endpoint)
                .delete(delete_transaction_endpoint),
        )
        .route(
            endpoints::BUDGETS,
            get(list_budgets_endpoint)
                .post(create_budget_endpoint)
                .put(bulk_update_budgets_endpoint),
        )
        .route(endpoints::MONTHLY_REPORT, get(get_monthly_report_endpoint))
        .route(endpoints::SPLIT_REPORT, get(get_split_report_endpoint))
        .route(endpoints::TREND_REPORT, get(get_trend_report_endpoint))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    let cors = build_cors_layer(&state.config.cors_allowed_origins);

    protected_routes
        .merge(unprotected_routes)
        .fallback(get_404_not_found)
        .layer(cors)
        .with_state(state)
}

async fn get_404_not_found() -> Error {
    Error::NotFound
}

/// Allow credentialed requests from the configured origins.
///
/// Origins that are not valid header values are logged and skipped.
fn build_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(origin) => Some(origin),
            Err(error) => {
                tracing::warn!("Skipping invalid CORS origin {origin:?}: {error}");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}
