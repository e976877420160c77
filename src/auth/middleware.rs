//! Authentication middleware that validates the access token and passes the
//! household ID on to route handlers.

use axum::{
    extract::{FromRef, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::{
    extract::CookieJar,
    headers::{Authorization, HeaderMapExt, authorization::Bearer},
};

use crate::{
    AppState, Error,
    auth::{
        cookie::get_token_from_cookie,
        token::{Claims, TokenKeys, verify_token},
    },
};

/// The state needed for the auth middleware.
#[derive(Debug, Clone)]
pub struct AuthState {
    /// The keys for verifying access tokens.
    pub token_keys: TokenKeys,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            token_keys: state.token_keys.clone(),
        }
    }
}

/// Where to look for the access token first when a request carries both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenSource {
    /// The `Authorization: Bearer` header, then the cookie.
    HeaderFirst,
    /// The cookie, then the `Authorization: Bearer` header.
    CookieFirst,
}

/// Find the access token in the request headers.
pub(crate) fn find_token(headers: &HeaderMap, source: TokenSource) -> Option<String> {
    let from_header = || {
        headers
            .typed_get::<Authorization<Bearer>>()
            .map(|Authorization(bearer)| bearer.token().to_owned())
    };
    let from_cookie = || get_token_from_cookie(&CookieJar::from_headers(headers));

    match source {
        TokenSource::HeaderFirst => from_header().or_else(from_cookie),
        TokenSource::CookieFirst => from_cookie().or_else(from_header),
    }
}

/// Find and verify the access token in the request headers.
///
/// # Errors
/// Returns [Error::MissingToken] if there is no token and [Error::InvalidToken]
/// if the token does not verify.
pub(crate) fn authenticate(
    headers: &HeaderMap,
    source: TokenSource,
    keys: &TokenKeys,
) -> Result<Claims, Error> {
    let token = find_token(headers, source).ok_or(Error::MissingToken)?;

    verify_token(&token, keys)
}

/// Middleware function that checks for a valid access token in the
/// `Authorization: Bearer` header or the `access_token` cookie.
///
/// The household ID from the token is placed into the request and the
/// request executed normally if the token is valid, otherwise a 401 response
/// is returned.
///
/// **Note**: Route handlers can use the function argument
/// `Extension(household_id): Extension<HouseholdId>` to receive the household ID.
pub async fn auth_guard(
    State(state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Response {
    let claims = match authenticate(
        request.headers(),
        TokenSource::HeaderFirst,
        &state.token_keys,
    ) {
        Ok(claims) => claims,
        Err(error) => return error.into_response(),
    };

    request.extensions_mut().insert(claims.hid);

    next.run(request).await
}
