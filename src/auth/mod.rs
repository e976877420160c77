//! Authentication with the household PIN and signed access tokens.
//!
//! Logging in with the PIN issues a token that is returned in the body and
//! set as a cookie. Protected routes accept the token from either place.

mod cookie;
mod log_in;
mod log_out;
mod me;
mod middleware;
mod token;

pub use log_in::{LogInState, TokenResponse, post_log_in};
pub use log_out::{LogOutState, MessageResponse, post_log_out};
pub use me::{AuthStatus, get_me};
pub use middleware::{AuthState, auth_guard};
pub use token::{Claims, IssuedToken, TokenKeys, issue_token, verify_token};

#[cfg(test)]
pub(crate) use cookie::COOKIE_TOKEN;
