//! Defines functions for storing the access token in a cookie.

use axum_extra::extract::{
    CookieJar,
    cookie::{Cookie, SameSite},
};
use time::{Duration, OffsetDateTime};

/// The name of the cookie holding the access token.
pub(crate) const COOKIE_TOKEN: &str = "access_token";

/// Add the access token cookie to `jar`, expiring at the same time as the token.
///
/// The cookie is HTTP only so that scripts cannot read the token.
pub(crate) fn set_token_cookie(
    jar: CookieJar,
    token: &str,
    expires_at: OffsetDateTime,
    secure: bool,
) -> CookieJar {
    jar.add(
        Cookie::build((COOKIE_TOKEN, token.to_owned()))
            .path("/")
            .expires(expires_at)
            .max_age(expires_at - OffsetDateTime::now_utc())
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(secure),
    )
}

/// Overwrite the access token cookie with an expired, empty one, which should
/// delete the cookie on the client side.
pub(crate) fn clear_token_cookie(jar: CookieJar, secure: bool) -> CookieJar {
    jar.add(
        Cookie::build((COOKIE_TOKEN, ""))
            .path("/")
            .expires(OffsetDateTime::UNIX_EPOCH)
            .max_age(Duration::ZERO)
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(secure),
    )
}

/// The access token in `jar`, if any.
pub(crate) fn get_token_from_cookie(jar: &CookieJar) -> Option<String> {
    jar.get(COOKIE_TOKEN)
        .map(|cookie| cookie.value_trimmed().to_owned())
        .filter(|token| !token.is_empty())
}
