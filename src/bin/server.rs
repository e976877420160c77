use std::{error::Error, net::SocketAddr, path::PathBuf};

use axum::{
    Router,
    extract::{MatchedPath, Request},
    middleware,
};
use axum_server::{Handle, tls_rustls::RustlsConfig};
use clap::Parser;
use rusqlite::Connection;
use time::Duration;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use household_budget::{
    AppState, Config, DEFAULT_CORS_ORIGINS, DEFAULT_TIMEZONE, HouseholdId, build_router,
    graceful_shutdown, local_today, logging_middleware, parse_origins,
};

/// The REST API server for household_budget.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long, env = "DATABASE_PATH", default_value = "household_budget.db")]
    db_path: String,

    /// The port to serve the API from.
    #[arg(short, long, env = "PORT", default_value_t = 8000)]
    port: u16,

    /// Directory containing an SSL certificate `cert.pem` and key `key.pem`.
    /// Serves plain HTTP if not set.
    #[arg(long, env = "CERT_PATH")]
    cert_path: Option<PathBuf>,

    /// The secret used to sign access tokens.
    #[arg(long, env = "APP_SECRET", hide_env_values = true)]
    app_secret: String,

    /// The PIN members of the household log in with.
    #[arg(long, env = "HOUSEHOLD_PIN", hide_env_values = true)]
    household_pin: String,

    /// The household that the PIN unlocks.
    #[arg(long, env = "HOUSEHOLD_ID", default_value_t = 1)]
    household_id: i64,

    /// How many minutes an access token is valid for.
    #[arg(long, env = "ACCESS_TOKEN_EXPIRE_MINUTES", default_value_t = 10_080)]
    access_token_expire_minutes: i64,

    /// Comma separated origins allowed to make cross-origin requests.
    #[arg(long, env = "CORS_ALLOWED_ORIGINS", default_value = DEFAULT_CORS_ORIGINS)]
    cors_allowed_origins: String,

    /// The household's canonical timezone name, e.g. "Asia/Tokyo".
    #[arg(long, env = "TIMEZONE", default_value = DEFAULT_TIMEZONE)]
    timezone: String,

    /// Only send the auth cookie over HTTPS.
    #[arg(long, env = "SECURE_COOKIES", default_value_t = false)]
    secure_cookies: bool,
}

impl Args {
    fn to_config(&self) -> Config {
        let mut config = Config::new(&self.app_secret, &self.household_pin);
        config.household_id = HouseholdId::new(self.household_id);
        config.token_lifetime = Duration::minutes(self.access_token_expire_minutes);
        config.cors_allowed_origins = parse_origins(&self.cors_allowed_origins);
        config.timezone = self.timezone.clone();
        config.secure_cookies = self.secure_cookies;

        config
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // A missing .env file is fine, the settings may come from the environment.
    let _ = dotenvy::dotenv();

    setup_logging();

    let args = Args::parse();
    let config = args.to_config();

    // Fail at start-up rather than on the first request that needs the date.
    local_today(&config.timezone)?;

    tracing::info!("Starting with {config:?}");

    let connection = Connection::open(&args.db_path)?;
    let state = AppState::new(connection, config)?;

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    let router = add_tracing_layer(
        build_router(state).layer(middleware::from_fn(logging_middleware)),
    );

    let addr = SocketAddr::from(([127, 0, 0, 1], args.port));

    match &args.cert_path {
        Some(cert_path) => {
            let tls_config = RustlsConfig::from_pem_file(
                cert_path.join("cert.pem"),
                cert_path.join("key.pem"),
            )
            .await?;

            tracing::info!("HTTPS server listening on {}", addr);
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(router.into_make_service())
                .await?;
        }
        None => {
            tracing::info!("HTTP server listening on {}", addr);
            axum_server::bind(addr)
                .handle(handle)
                .serve(router.into_make_service())
                .await?;
        }
    }

    Ok(())
}

fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().pretty())
        .init();
}

fn add_tracing_layer(router: Router) -> Router {
    let tracing_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request| {
            let method = req.method();
            let uri = req.uri();

            let matched_path = req
                .extensions()
                .get::<MatchedPath>()
                .map(|matched_path| matched_path.as_str());

            tracing::debug_span!("request", %method, %uri, matched_path)
        })
        // By default, `TraceLayer` will log 5xx responses but we're doing our specific
        // logging of errors so disable that
        .on_failure(());

    router.layer(tracing_layer)
}
