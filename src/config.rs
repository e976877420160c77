//! The settings the server is started with.

use std::fmt::Debug;

use time::Duration;

use crate::{household::HouseholdId, pagination::PaginationConfig};

/// The default lifetime of an access token: one week.
pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::minutes(10_080);

/// The default origins allowed to make cross-origin requests.
pub const DEFAULT_CORS_ORIGINS: &str = "http://localhost,http://localhost:5173";

/// The default timezone for deciding what the current month is.
pub const DEFAULT_TIMEZONE: &str = "Asia/Tokyo";

/// Settings loaded once at start-up and shared read-only by every request.
#[derive(Clone)]
pub struct Config {
    /// The secret used to sign access tokens.
    pub app_secret: String,
    /// The PIN shared by the members of the household.
    pub household_pin: String,
    /// The household that the PIN unlocks.
    pub household_id: HouseholdId,
    /// How long an access token is valid for.
    pub token_lifetime: Duration,
    /// The origins allowed to make cross-origin requests.
    pub cors_allowed_origins: Vec<String>,
    /// The household's timezone as a canonical timezone name, e.g. "Asia/Tokyo".
    pub timezone: String,
    /// Whether the auth cookie is only sent over HTTPS.
    pub secure_cookies: bool,
    /// The config that controls how to page lists of data.
    pub pagination: PaginationConfig,
}

impl Config {
    /// Create a config with the given secrets and the defaults for everything else.
    pub fn new(app_secret: &str, household_pin: &str) -> Self {
        Self {
            app_secret: app_secret.to_owned(),
            household_pin: household_pin.to_owned(),
            household_id: HouseholdId::new(1),
            token_lifetime: DEFAULT_TOKEN_LIFETIME,
            cors_allowed_origins: parse_origins(DEFAULT_CORS_ORIGINS),
            timezone: DEFAULT_TIMEZONE.to_owned(),
            secure_cookies: false,
            pagination: PaginationConfig::default(),
        }
    }
}

// Keep the secrets out of the logs.
impl Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("app_secret", &"********")
            .field("household_pin", &"********")
            .field("household_id", &self.household_id)
            .field("token_lifetime", &self.token_lifetime)
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .field("timezone", &self.timezone)
            .field("secure_cookies", &self.secure_cookies)
            .field("pagination", &self.pagination)
            .finish()
    }
}

/// Split a comma separated list of origins, dropping blanks.
pub fn parse_origins(origins: &str) -> Vec<String> {
    origins
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{Config, parse_origins};

    #[test]
    fn parses_comma_separated_origins() {
        assert_eq!(
            parse_origins("http://localhost, http://localhost:5173,,"),
            vec!["http://localhost", "http://localhost:5173"]
        );
    }

    #[test]
    fn debug_redacts_secrets() {
        let config = Config::new("supersecret", "9876");

        let debug = format!("{config:?}");

        assert!(!debug.contains("supersecret"));
        assert!(!debug.contains("9876"));
    }
}
