//! Request/response logging stage.
//!
//! Buffers the request body (and puts it back so later stages and handlers
//! can still read it), runs the rest of the chain, buffers the response body
//! the same way and then emits a single [`RequestRecord`]. The record is
//! written after the inner chain returns, so it carries the final status
//! code and the full latency.
//!
//! Secret fields in JSON bodies (the API key returned by registration) are
//! replaced before the record leaves this stage.

use std::time::Instant;

use axum::{
    body::{Body, to_bytes},
    extract::{Request, State},
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http_body_util::LengthLimitError;
use serde_json::Value;
use uuid::Uuid;

use crate::{AppState, error::AppError, telemetry::RequestRecord};

/// Correlation id header, accepted from callers and echoed on responses.
pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// JSON object keys whose values never appear in a [`RequestRecord`].
const SECRET_FIELDS: &[&str] = &["api_key"];

const REDACTED: &str = "[REDACTED]";

pub async fn log_requests(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let start = Instant::now();

    let request_id = request
        .headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let method = request.method().to_string();
    let path = request.uri().path().to_owned();
    let query = request.uri().query().unwrap_or_default().to_owned();

    let (parts, body) = request.into_parts();
    let (request_body, response) = match to_bytes(body, state.log_body_limit).await {
        Ok(bytes) => {
            let logged = loggable_body(&bytes);
            let request = Request::from_parts(parts, Body::from(bytes));
            (logged, next.run(request).await)
        }
        Err(error) => {
            let too_large = error.into_inner().is::<LengthLimitError>();
            let rejection = if too_large {
                AppError::PayloadTooLarge
            } else {
                AppError::InvalidRequest("Failed to read request body".to_string())
            };
            (String::new(), rejection.into_response())
        }
    };

    let (mut parts, body) = response.into_parts();
    let (response_body, body) = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => (loggable_body(&bytes), Body::from(bytes)),
        Err(error) => {
            tracing::error!(%error, "failed to read response body for logging");
            parts.status = axum::http::StatusCode::INTERNAL_SERVER_ERROR;
            (String::new(), Body::empty())
        }
    };

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        parts.headers.insert(REQUEST_ID_HEADER, value);
    }

    state.observability.request_log().record(RequestRecord {
        request_id,
        method,
        path,
        query,
        request_body,
        status: parts.status,
        response_body,
        elapsed: start.elapsed(),
    });

    Response::from_parts(parts, body)
}

/// Render a body for the log, masking secret JSON fields.
fn loggable_body(bytes: &[u8]) -> String {
    if let Ok(mut value) = serde_json::from_slice::<Value>(bytes) {
        if redact_secrets(&mut value) {
            return value.to_string();
        }
    }
    String::from_utf8_lossy(bytes).into_owned()
}

/// Returns whether anything was masked.
fn redact_secrets(value: &mut Value) -> bool {
    match value {
        Value::Object(fields) => {
            let mut redacted = false;
            for (key, field) in fields.iter_mut() {
                if SECRET_FIELDS.contains(&key.as_str()) {
                    *field = Value::String(REDACTED.to_owned());
                    redacted = true;
                } else {
                    redacted |= redact_secrets(field);
                }
            }
            redacted
        }
        Value::Array(items) => items
            .iter_mut()
            .fold(false, |redacted, item| redact_secrets(item) | redacted),
        _ => false,
    }
}
