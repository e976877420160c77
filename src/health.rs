//! The service description at the root route and the health check.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::Serialize;
use serde_json::json;
use time::OffsetDateTime;

use crate::{AppState, api_json::ApiJson, db::lock_connection, serde_fields::timestamp};

/// The name the API reports at the root route.
pub const API_NAME: &str = "Household Budget API";

/// The version of the running server.
pub const API_VERSION: &str = env!("CARGO_PKG_VERSION");

/// The state needed for the health check.
#[derive(Debug, Clone)]
pub struct HealthState {
    /// The database connection to probe.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for HealthState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The body of a successful health check.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    /// Always "healthy".
    pub status: &'static str,
    /// When the check ran.
    #[serde(serialize_with = "timestamp::serialize")]
    pub timestamp: OffsetDateTime,
    /// The version of the running server.
    pub version: &'static str,
}

/// The name and version of the API.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceInfo {
    /// The name of the API.
    pub name: &'static str,
    /// The version of the running server.
    pub version: &'static str,
}

/// Route handler for the root path.
pub async fn get_root() -> ApiJson<ServiceInfo> {
    ApiJson(ServiceInfo {
        name: API_NAME,
        version: API_VERSION,
    })
}

/// Route handler that checks the database can answer a query.
///
/// Responds with 503 if the database cannot be reached.
pub async fn get_health(State(state): State<HealthState>) -> Response {
    match check_database(&state.db_connection) {
        Ok(()) => ApiJson(HealthStatus {
            status: "healthy",
            timestamp: OffsetDateTime::now_utc(),
            version: API_VERSION,
        })
        .into_response(),
        Err(error) => {
            tracing::error!("Health check failed: {error}");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                ApiJson(json!({"status": "unhealthy"})),
            )
                .into_response()
        }
    }
}

fn check_database(db_connection: &Mutex<Connection>) -> Result<(), crate::Error> {
    let connection = lock_connection(db_connection)?;
    connection.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;

    Ok(())
}

#[cfg(test)]
mod health_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Router, http::StatusCode, routing::get};
    use axum_test::TestServer;
    use rusqlite::Connection;
    use serde_json::{Value, json};

    use crate::endpoints;

    use super::{API_VERSION, HealthState, get_health, get_root};

    fn get_test_server(connection: Connection) -> TestServer {
        let app = Router::new()
            .route(endpoints::ROOT, get(get_root))
            .route(endpoints::HEALTH, get(get_health))
            .with_state(HealthState {
                db_connection: Arc::new(Mutex::new(connection)),
            });

        TestServer::new(app).expect("Could not create test server.")
    }

    #[tokio::test]
    async fn healthy_when_database_answers() {
        let server = get_test_server(Connection::open_in_memory().unwrap());

        let response = server.get(endpoints::HEALTH).await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["version"], API_VERSION);
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn unhealthy_when_database_lock_is_poisoned() {
        let connection = Connection::open_in_memory().unwrap();
        let db_connection = Arc::new(Mutex::new(connection));
        let poisoned = db_connection.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoned.lock().unwrap();
            panic!("poison the lock");
        })
        .join();
        let app = Router::new()
            .route(endpoints::HEALTH, get(get_health))
            .with_state(HealthState { db_connection });
        let server = TestServer::new(app).expect("Could not create test server.");

        let response = server.get(endpoints::HEALTH).await;

        response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
        response.assert_json(&json!({"status": "unhealthy"}));
    }

    #[tokio::test]
    async fn root_reports_name_and_version() {
        let server = get_test_server(Connection::open_in_memory().unwrap());

        let response = server.get(endpoints::ROOT).await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["name"], "Household Budget API");
        assert_eq!(body["version"], API_VERSION);
    }
}
