//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies. It is
//! the only place that decides which status code and message a caller sees.

use std::time::Duration;

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::store::StoreError;

/// Application-wide error type.
///
/// # Error Categories
///
/// - **Client Errors**: malformed input, missing fields, invalid ids (4xx)
/// - **Authentication Errors**: missing, unknown or wrong API keys (401)
/// - **Resource Errors**: requested application not found (404)
/// - **Throttling**: client exceeded its request quota (429)
/// - **Store Errors**: database or hashing failures (500, details hidden)
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Credential store failed (connection error, query error, hash error).
    ///
    /// A duplicate name is the one store error that is the caller's fault;
    /// it is reported as 409.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// API key is missing, or the name/key pair did not validate.
    ///
    /// The two causes are deliberately reported identically.
    #[error("Unauthorized: invalid or missing API key")]
    Unauthorized,

    /// Application with the requested id does not exist.
    #[error("App not found")]
    AppNotFound,

    /// Request body or parameters are invalid.
    ///
    /// The String contains details about what was invalid.
    #[error("Invalid request")]
    InvalidRequest(String),

    /// Request body exceeds the buffering limit of the logging stage.
    #[error("Request body too large")]
    PayloadTooLarge,

    /// Client exceeded its rate limit.
    #[error("Rate limit exceeded")]
    RateLimited { retry_after: Duration },

    /// Unexpected fault with no more specific category (e.g. a panic).
    #[error("An internal error occurred")]
    Internal,
}

/// Convert AppError into an HTTP response.
///
/// # Response Format
///
/// All errors return JSON in this format:
/// ```json
/// {
///   "error": {
///     "code": "error_type",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
///
/// # Status Code Mapping
///
/// - `InvalidRequest` → 400 Bad Request
/// - `Unauthorized` → 401 Unauthorized
/// - `AppNotFound` → 404 Not Found
/// - `Store(DuplicateName)` → 409 Conflict
/// - `PayloadTooLarge` → 413 Payload Too Large
/// - `RateLimited` → 429 Too Many Requests (with `Retry-After`)
/// - `Store` / `Internal` → 500 Internal Server Error (hides details from client)
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut retry_after = None;

        let (status, code, message) = match self {
            AppError::InvalidRequest(ref msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", msg.clone())
            }
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", self.to_string()),
            AppError::AppNotFound => (StatusCode::NOT_FOUND, "app_not_found", self.to_string()),
            AppError::Store(StoreError::DuplicateName(ref name)) => (
                StatusCode::CONFLICT,
                "app_exists",
                format!("App '{name}' already exists"),
            ),
            AppError::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "payload_too_large",
                self.to_string(),
            ),
            AppError::RateLimited { retry_after: wait } => {
                retry_after = Some(wait);
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    "rate_limited",
                    self.to_string(),
                )
            }
            AppError::Store(ref err) => {
                // Full cause chain stays in the logs, never in the response.
                tracing::error!(error = ?err, "credential store failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                self.to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        let mut response = (status, body).into_response();
        if let Some(wait) = retry_after {
            // Whole seconds, rounded up so clients never retry too early.
            let secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs.max(1)));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn store_failures_hide_internal_detail() {
        let err = AppError::Store(StoreError::persistence(
            "list apps",
            sqlx::Error::PoolTimedOut,
        ));

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "internal_error");
        assert_eq!(body["error"]["message"], "An internal error occurred");
    }

    #[tokio::test]
    async fn duplicate_name_is_a_conflict() {
        let err = AppError::from(StoreError::DuplicateName("svc-a".into()));

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn rate_limited_sets_retry_after() {
        let response = AppError::RateLimited {
            retry_after: Duration::from_millis(1500),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "2");
    }
}
