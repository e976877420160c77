//! Defines the endpoint for logging in with the household PIN.

use axum::extract::{FromRef, State};
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use time::Duration;

use crate::{
    AppState, Error,
    api_json::ApiJson,
    auth::{
        cookie::set_token_cookie,
        token::{TokenKeys, issue_token},
    },
    household::HouseholdId,
};

/// The state needed to perform a log-in.
#[derive(Debug, Clone)]
pub struct LogInState {
    /// The PIN shared by the household.
    pub household_pin: String,
    /// The household the PIN unlocks.
    pub household_id: HouseholdId,
    /// How long issued tokens are valid for.
    pub token_lifetime: Duration,
    /// Whether the token cookie is only sent over HTTPS.
    pub secure_cookies: bool,
    /// The keys for signing access tokens.
    pub token_keys: TokenKeys,
}

impl FromRef<AppState> for LogInState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            household_pin: state.config.household_pin.clone(),
            household_id: state.config.household_id,
            token_lifetime: state.config.token_lifetime,
            secure_cookies: state.config.secure_cookies,
            token_keys: state.token_keys.clone(),
        }
    }
}

/// The log-in request body.
#[derive(Clone, Default, Deserialize)]
pub struct LogInData {
    /// The household PIN.
    #[serde(default)]
    pub pin: Option<String>,
}

/// The response to a successful log-in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenResponse {
    /// The signed access token.
    pub access_token: String,
    /// Always "bearer".
    pub token_type: String,
    /// The number of seconds until the token expires.
    pub expires_in: i64,
}

/// Handler for log-in requests.
///
/// On success, responds with the access token and also sets it as an HTTP
/// only cookie.
///
/// # Errors
///
/// - [Error::MissingPin] if no PIN was given.
/// - [Error::InvalidPin] if the PIN is wrong.
/// - [Error::TokenCreation] if the token could not be signed.
pub async fn post_log_in(
    State(state): State<LogInState>,
    jar: CookieJar,
    ApiJson(log_in_data): ApiJson<LogInData>,
) -> Result<(CookieJar, ApiJson<TokenResponse>), Error> {
    let pin = log_in_data
        .pin
        .as_deref()
        .filter(|pin| !pin.is_empty())
        .ok_or(Error::MissingPin)?;

    if !pin_matches(pin, &state.household_pin) {
        tracing::warn!("Failed log-in attempt for household {}", state.household_id);
        return Err(Error::InvalidPin);
    }

    let issued = issue_token(state.household_id, state.token_lifetime, &state.token_keys)?;
    let jar = set_token_cookie(
        jar,
        &issued.token,
        issued.claims.expires_at(),
        state.secure_cookies,
    );

    tracing::info!("Household {} logged in", state.household_id);

    Ok((
        jar,
        ApiJson(TokenResponse {
            access_token: issued.token,
            token_type: "bearer".to_owned(),
            expires_in: state.token_lifetime.whole_seconds(),
        }),
    ))
}

/// Compare digests so that the time taken does not depend on how much of the
/// PIN was right.
fn pin_matches(given: &str, expected: &str) -> bool {
    Sha256::digest(given.as_bytes()) == Sha256::digest(expected.as_bytes())
}
