//! JSON and query string extractors that reject malformed input with the app's error body.

use axum::{
    extract::{FromRequest, FromRequestParts},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::Error;

/// Like [axum::Json], but a body that is missing, is not JSON or does not
/// match `T` is rejected with a 400 `{"detail": ...}` response.
#[derive(Debug, Clone, Copy, Default, FromRequest)]
#[from_request(via(axum::Json), rejection(Error))]
pub struct ApiJson<T>(pub T);

impl<T> IntoResponse for ApiJson<T>
where
    T: Serialize,
{
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

/// Like [axum::extract::Query], but rejects with a 400 `{"detail": ...}` response.
#[derive(Debug, Clone, Copy, Default, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(Error))]
pub struct ApiQuery<T>(pub T);

/// The body sent after deleting a record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeleteResponse {
    /// A human readable confirmation.
    pub message: String,
    /// The ID of the deleted record.
    pub id: i64,
}

impl DeleteResponse {
    /// Create a response confirming that the record `id` was deleted.
    pub fn new(message: &str, id: i64) -> Self {
        Self {
            message: message.to_owned(),
            id,
        }
    }
}
