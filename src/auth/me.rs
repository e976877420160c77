//! Defines the endpoint that reports whether the caller is logged in.

use axum::{
    extract::{FromRef, State},
    http::HeaderMap,
};
use serde::Serialize;
use time::OffsetDateTime;

use crate::{
    AppState, Error,
    api_json::ApiJson,
    auth::{
        middleware::{TokenSource, authenticate},
        token::{TOKEN_SUBJECT, TokenKeys},
    },
    serde_fields::timestamp,
};

/// The state needed to check the caller's token.
#[derive(Debug, Clone)]
pub struct MeState {
    /// The keys for verifying access tokens.
    pub token_keys: TokenKeys,
}

impl FromRef<AppState> for MeState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            token_keys: state.token_keys.clone(),
        }
    }
}

/// Who the caller is authenticated as.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthStatus {
    /// Always "household".
    pub user_type: String,
    pub authenticated: bool,
    #[serde(serialize_with = "timestamp::serialize")]
    pub expires_at: OffsetDateTime,
}

/// A route handler that responds with the caller's auth status.
///
/// Unlike the protected routes, the cookie is checked before the
/// `Authorization` header.
pub async fn get_me(
    State(state): State<MeState>,
    headers: HeaderMap,
) -> Result<ApiJson<AuthStatus>, Error> {
    let claims = authenticate(&headers, TokenSource::CookieFirst, &state.token_keys)?;

    Ok(ApiJson(AuthStatus {
        user_type: TOKEN_SUBJECT.to_owned(),
        authenticated: true,
        expires_at: claims.expires_at(),
    }))
}
