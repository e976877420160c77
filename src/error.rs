//! Defines the app level error type and its conversion into JSON error responses.

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::{StatusCode, header::WWW_AUTHENTICATE},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::fixed_point::FixedPoint;

/// The message sent to clients for any error they are not meant to see the details of.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The request body was missing, was not JSON, or did not match the
    /// expected shape (e.g., a required field is missing).
    #[error("invalid request body: {0}")]
    InvalidJson(String),

    /// The query string did not match the expected shape.
    #[error("invalid query parameters: {0}")]
    InvalidQuery(String),

    /// A date string could not be parsed as a calendar date.
    #[error("invalid date \"{0}\", use YYYY-MM-DD")]
    InvalidDate(String),

    /// A budget month string was not of the form YYYYMM.
    #[error("invalid month \"{0}\", use YYYYMM")]
    InvalidMonth(String),

    /// A transaction total or budget limit was zero or negative.
    #[error("{0} must be greater than zero")]
    NonPositiveAmount(&'static str),

    /// An item amount, quantity, unit price or budget limit was negative.
    #[error("{0} cannot be negative")]
    NegativeAmount(&'static str),

    /// An amount is larger than the database can store.
    #[error("{0} cannot be greater than 9999999999.99")]
    AmountTooLarge(&'static str),

    /// The payer's split ratio was outside of [0, 1].
    #[error("split_ratio_payer must be between 0 and 1, got {0}")]
    InvalidSplitRatio(String),

    /// The line items of a transaction do not add up to its total.
    #[error("sum of item amounts ({items_total}) must equal amount_total ({amount_total})")]
    ItemTotalMismatch {
        /// The sum of the item amounts.
        items_total: FixedPoint,
        /// The transaction total.
        amount_total: FixedPoint,
    },

    /// The page number or page size is out of range.
    #[error("{0}")]
    InvalidPagination(String),

    /// An ID in the request does not refer to a record in the caller's household.
    #[error("{0} does not refer to a valid record")]
    InvalidReference(&'static str),

    /// A transaction did not specify an account and the household has no
    /// active cash account to fall back on.
    #[error("account_id is required because the household has no active cash account")]
    NoDefaultAccount,

    /// A transaction did not specify a payer and the household has no active
    /// user to fall back on.
    #[error("payer_user_id is required because the household has no active user")]
    NoDefaultUser,

    /// A category parent would create a hierarchy deeper than one level or a cycle.
    #[error("parent_id must refer to a top-level category other than the category itself")]
    InvalidParentCategory,

    /// A report grouping other than month or week was requested.
    #[error("group_by must be \"month\" or \"week\", got \"{0}\"")]
    InvalidGrouping(String),

    /// A name was empty or only whitespace.
    #[error("{0} cannot be empty")]
    EmptyName(&'static str),

    /// The log-in request did not include a PIN.
    #[error("PIN is required")]
    MissingPin,

    /// The PIN did not match the household PIN.
    #[error("Invalid PIN")]
    InvalidPin,

    /// The request did not carry a token in either the auth header or cookie.
    #[error("No token provided")]
    MissingToken,

    /// The token was malformed, expired or signed with a different key.
    #[error("Invalid token")]
    InvalidToken,

    /// An access token could not be signed.
    #[error("could not create token: {0}")]
    TokenCreation(String),

    /// The record being created already exists, e.g. a second budget for the
    /// same category and month.
    #[error("{0}")]
    Conflict(String),

    /// The requested resource was not found.
    ///
    /// Records that belong to another household are reported as not found.
    #[error("Resource not found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// The configured timezone is not a canonical timezone name.
    #[error("invalid timezone {0}")]
    InvalidTimezone(String),

    /// A value could not be serialized as JSON.
    #[error("could not serialize as JSON: {0}")]
    JsonSerialization(String),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                },
                _,
            ) => Error::InvalidReference("a referenced id"),
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
                },
                description,
            ) => Error::Conflict(
                description.unwrap_or_else(|| "the record already exists".to_owned()),
            ),
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::InvalidJson(rejection.body_text())
    }
}

impl From<QueryRejection> for Error {
    fn from(rejection: QueryRejection) -> Self {
        Error::InvalidQuery(rejection.body_text())
    }
}

impl Error {
    /// The HTTP status code the error is reported with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidJson(_)
            | Error::InvalidQuery(_)
            | Error::InvalidDate(_)
            | Error::InvalidMonth(_)
            | Error::NonPositiveAmount(_)
            | Error::NegativeAmount(_)
            | Error::AmountTooLarge(_)
            | Error::InvalidSplitRatio(_)
            | Error::ItemTotalMismatch { .. }
            | Error::InvalidPagination(_)
            | Error::InvalidReference(_)
            | Error::NoDefaultAccount
            | Error::NoDefaultUser
            | Error::InvalidParentCategory
            | Error::InvalidGrouping(_)
            | Error::EmptyName(_)
            | Error::MissingPin => StatusCode::BAD_REQUEST,
            Error::InvalidPin | Error::MissingToken | Error::InvalidToken => {
                StatusCode::UNAUTHORIZED
            }
            Error::NotFound => StatusCode::NOT_FOUND,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::TokenCreation(_)
            | Error::SqlError(_)
            | Error::DatabaseLockError
            | Error::InvalidTimezone(_)
            | Error::JsonSerialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status_code = self.status_code();

        // Server errors are not intended to be shown to the client.
        let detail = if status_code.is_server_error() {
            tracing::error!("An unexpected error occurred: {}", self);
            INTERNAL_ERROR_MESSAGE.to_owned()
        } else {
            self.to_string()
        };

        let body = Json(json!({ "detail": detail }));

        match self {
            Error::MissingToken | Error::InvalidToken => {
                (status_code, [(WWW_AUTHENTICATE, "Bearer")], body).into_response()
            }
            _ => (status_code, body).into_response(),
        }
    }
}
