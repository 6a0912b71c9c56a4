//! CORS header injection.
//!
//! Allows any origin. Preflight `OPTIONS` requests are answered here and
//! never reach the rate limiter, the authentication gate or a handler.

use axum::http::{
    Method,
    header::{AUTHORIZATION, CONTENT_TYPE},
};
use tower_http::cors::{Any, CorsLayer};

use super::auth::{API_KEY_HEADER, APP_NAME_HEADER};

pub fn layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION, APP_NAME_HEADER, API_KEY_HEADER])
}
