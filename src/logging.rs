//! Middleware for logging requests and responses.

use axum::{
    body::{Body, Bytes},
    extract::Request,
    http::{StatusCode, header::CONTENT_TYPE, request, response},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::Value;

/// Request and response bodies longer than this many bytes are truncated in
/// the `info` level logs.
pub const LOG_BODY_LENGTH_LIMIT: usize = 64;

/// The JSON fields whose values never reach the logs.
const REDACTED_FIELDS: [&str; 1] = ["pin"];

/// Log the request and response for each request.
///
/// Both the request and response are logged at the `info` level.
/// If the response body is longer than [LOG_BODY_LENGTH_LIMIT] bytes, it is
/// truncated and logged at the `debug` level.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let body_bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(error) => {
            tracing::warn!("Could not read request body: {error}");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    let body_text = String::from_utf8_lossy(&body_bytes);
    if is_json(&parts) {
        log_request(&parts, &redact_json_fields(&body_text));
    } else {
        log_request(&parts, &body_text);
    }

    let request = Request::from_parts(parts, Body::from(body_bytes));
    let response = next.run(request).await;

    let (parts, body) = response.into_parts();
    let body_bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(error) => {
            tracing::error!("Could not read response body: {error}");
            Bytes::new()
        }
    };
    log_response(&parts, &String::from_utf8_lossy(&body_bytes));

    Response::from_parts(parts, Body::from(body_bytes))
}

fn is_json(parts: &request::Parts) -> bool {
    parts
        .headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|content_type| content_type.starts_with("application/json"))
}

/// Replace the value of any sensitive top-level field in a JSON object.
///
/// Text that is not a JSON object is returned unchanged.
fn redact_json_fields(body_text: &str) -> String {
    let mut value = match serde_json::from_str::<Value>(body_text) {
        Ok(value @ Value::Object(_)) => value,
        _ => return body_text.to_owned(),
    };

    if let Value::Object(fields) = &mut value {
        for field in REDACTED_FIELDS {
            if let Some(secret) = fields.get_mut(field) {
                *secret = Value::String("********".to_owned());
            }
        }
    }

    value.to_string()
}

/// Cut `body` down to the log limit without splitting a character.
fn truncate(body: &str) -> &str {
    let mut end = LOG_BODY_LENGTH_LIMIT.min(body.len());
    while !body.is_char_boundary(end) {
        end -= 1;
    }

    &body[..end]
}

fn log_request(parts: &request::Parts, body: &str) {
    if body.len() > LOG_BODY_LENGTH_LIMIT {
        tracing::info!(
            "Received request: {} {}\nbody: {:}...",
            parts.method,
            parts.uri,
            truncate(body)
        );
        tracing::debug!("Full request body: {body:?}");
    } else {
        tracing::info!(
            "Received request: {} {}\nbody: {body:?}",
            parts.method,
            parts.uri
        );
    }
}

fn log_response(parts: &response::Parts, body: &str) {
    if body.len() > LOG_BODY_LENGTH_LIMIT {
        tracing::info!(
            "Sending response: {}\nbody: {:}...",
            parts.status,
            truncate(body)
        );
        tracing::debug!("Full response body: {body:?}");
    } else {
        tracing::info!("Sending response: {}\nbody: {body:?}", parts.status);
    }
}

#[cfg(test)]
mod logging_tests {
    use axum::{Router, middleware, routing::post};
    use axum_test::TestServer;
    use serde_json::json;

    use super::{logging_middleware, redact_json_fields, truncate};

    #[test]
    fn redacts_pin() {
        let redacted = redact_json_fields(r#"{"pin":"1234","name":"Alex"}"#);

        assert!(!redacted.contains("1234"));
        assert!(redacted.contains("********"));
        assert!(redacted.contains("Alex"));
    }

    #[test]
    fn leaves_other_bodies_alone() {
        assert_eq!(redact_json_fields("not json"), "not json");
        assert_eq!(redact_json_fields("[1, 2]"), "[1, 2]");
        assert_eq!(redact_json_fields(r#"{"name":"Alex"}"#), r#"{"name":"Alex"}"#);
    }

    #[test]
    fn truncates_on_char_boundary() {
        let body = "あ".repeat(30);

        let truncated = truncate(&body);

        assert!(truncated.len() <= super::LOG_BODY_LENGTH_LIMIT);
        assert!(body.starts_with(truncated));
    }

    #[tokio::test]
    async fn passes_body_through_unchanged() {
        async fn echo(body: String) -> String {
            body
        }

        let app = Router::new()
            .route("/echo", post(echo))
            .layer(middleware::from_fn(logging_middleware));
        let server = TestServer::new(app).expect("Could not create test server.");

        let response = server.post("/echo").json(&json!({"pin": "1234"})).await;

        response.assert_status_ok();
        response.assert_text(r#"{"pin":"1234"}"#);
    }
}
