//! Signing and verifying the household access token.

use std::fmt::Debug;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::{Error, household::HouseholdId};

/// The subject of every access token: the whole household, not a single user.
pub const TOKEN_SUBJECT: &str = "household";

/// The type claim of an access token.
pub const ACCESS_TOKEN_TYPE: &str = "access";

/// The keys for signing and verifying access tokens with HS256.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenKeys {
    /// Derive the signing and verification keys from the app secret.
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

impl Debug for TokenKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TokenKeys(********)")
    }
}

/// The claims carried by an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Always [TOKEN_SUBJECT].
    pub sub: String,
    /// The household the token grants access to.
    pub hid: HouseholdId,
    /// Always [ACCESS_TOKEN_TYPE].
    #[serde(rename = "type")]
    pub token_type: String,
    /// When the token was issued, in seconds since the Unix epoch.
    pub iat: i64,
    /// When the token expires, in seconds since the Unix epoch.
    pub exp: i64,
}

impl Claims {
    /// When the token expires.
    pub fn expires_at(&self) -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(self.exp).unwrap_or(OffsetDateTime::UNIX_EPOCH)
    }
}

/// A signed access token and its claims.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// The encoded token.
    pub token: String,
    /// The claims in the token.
    pub claims: Claims,
}

/// Sign a new access token for `household_id` that expires `lifetime` from now.
///
/// # Errors
/// Returns [Error::TokenCreation] if the token cannot be encoded.
pub fn issue_token(
    household_id: HouseholdId,
    lifetime: Duration,
    keys: &TokenKeys,
) -> Result<IssuedToken, Error> {
    issue_token_at(household_id, OffsetDateTime::now_utc(), lifetime, keys)
}

fn issue_token_at(
    household_id: HouseholdId,
    issued_at: OffsetDateTime,
    lifetime: Duration,
    keys: &TokenKeys,
) -> Result<IssuedToken, Error> {
    let claims = Claims {
        sub: TOKEN_SUBJECT.to_owned(),
        hid: household_id,
        token_type: ACCESS_TOKEN_TYPE.to_owned(),
        iat: issued_at.unix_timestamp(),
        exp: (issued_at + lifetime).unix_timestamp(),
    };

    let token = encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding)
        .map_err(|error| Error::TokenCreation(error.to_string()))?;

    Ok(IssuedToken { token, claims })
}

/// Check the signature and expiry of `token` and return its claims.
///
/// # Errors
/// Returns [Error::InvalidToken] if the token is malformed, has a bad
/// signature, has expired or is not a household access token.
pub fn verify_token(token: &str, keys: &TokenKeys) -> Result<Claims, Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.set_required_spec_claims(&["exp", "sub"]);
    validation.sub = Some(TOKEN_SUBJECT.to_owned());

    let claims = decode::<Claims>(token, &keys.decoding, &validation)
        .map_err(|error| {
            tracing::debug!("Rejected access token: {error}");
            Error::InvalidToken
        })?
        .claims;

    if claims.token_type != ACCESS_TOKEN_TYPE {
        return Err(Error::InvalidToken);
    }

    Ok(claims)
}

#[cfg(test)]
mod tests {
    use time::{Duration, OffsetDateTime};

    use crate::{Error, household::HouseholdId};

    use super::{TOKEN_SUBJECT, TokenKeys, issue_token, issue_token_at, verify_token};

    #[test]
    fn verifies_issued_token() {
        let keys = TokenKeys::new("secret");

        let issued = issue_token(HouseholdId::new(3), Duration::minutes(10), &keys).unwrap();
        let claims = verify_token(&issued.token, &keys).unwrap();

        assert_eq!(claims, issued.claims);
        assert_eq!(claims.sub, TOKEN_SUBJECT);
        assert_eq!(claims.hid, HouseholdId::new(3));
        assert_eq!(claims.exp - claims.iat, 600);
    }

    #[test]
    fn rejects_expired_token() {
        let keys = TokenKeys::new("secret");
        let issued = issue_token_at(
            HouseholdId::new(1),
            OffsetDateTime::now_utc() - Duration::hours(2),
            Duration::hours(1),
            &keys,
        )
        .unwrap();

        assert_eq!(verify_token(&issued.token, &keys), Err(Error::InvalidToken));
    }

    #[test]
    fn rejects_token_signed_with_other_secret() {
        let issued = issue_token(
            HouseholdId::new(1),
            Duration::minutes(10),
            &TokenKeys::new("other secret"),
        )
        .unwrap();

        assert_eq!(
            verify_token(&issued.token, &TokenKeys::new("secret")),
            Err(Error::InvalidToken)
        );
    }

    #[test]
    fn rejects_malformed_token() {
        assert_eq!(
            verify_token("not.a.token", &TokenKeys::new("secret")),
            Err(Error::InvalidToken)
        );
    }
}
