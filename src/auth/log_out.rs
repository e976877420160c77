//! Defines the endpoint for logging out.

use axum::extract::{FromRef, State};
use axum_extra::extract::CookieJar;
use serde::Serialize;

use crate::{AppState, api_json::ApiJson, auth::cookie::clear_token_cookie};

/// The state needed to log out.
#[derive(Debug, Clone)]
pub struct LogOutState {
    /// Whether the token cookie is only sent over HTTPS.
    pub secure_cookies: bool,
}

impl FromRef<AppState> for LogOutState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            secure_cookies: state.config.secure_cookies,
        }
    }
}

/// A plain confirmation message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Clear the token cookie.
///
/// Tokens are not revoked: a copy of the token stays valid until it expires.
pub async fn post_log_out(
    State(state): State<LogOutState>,
    jar: CookieJar,
) -> (CookieJar, ApiJson<MessageResponse>) {
    (
        clear_token_cookie(jar, state.secure_cookies),
        ApiJson(MessageResponse {
            message: "Logged out successfully".to_owned(),
        }),
    )
}

#[cfg(test)]
mod log_out_tests {
    use axum::{Router, routing::post};
    use axum_extra::extract::cookie::Cookie;
    use axum_test::TestServer;
    use serde_json::json;
    use time::Duration;

    use crate::{auth::cookie::COOKIE_TOKEN, endpoints};

    use super::{LogOutState, post_log_out};

    #[tokio::test]
    async fn log_out_clears_cookie() {
        let app = Router::new()
            .route(endpoints::LOG_OUT, post(post_log_out))
            .with_state(LogOutState {
                secure_cookies: false,
            });
        let server = TestServer::new(app).expect("Could not create test server.");

        let response = server
            .post(endpoints::LOG_OUT)
            .add_cookie(Cookie::new(COOKIE_TOKEN, "abc.def.ghi"))
            .await;

        response.assert_status_ok();
        response.assert_json(&json!({"message": "Logged out successfully"}));
        let cookie = response.cookie(COOKIE_TOKEN);
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(Duration::ZERO));
    }
}
