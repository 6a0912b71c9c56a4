//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, query params, auth context)
//! 2. Calls the credential store
//! 3. Returns HTTP response (JSON or text, status code)

/// Application registration, listing and revocation
pub mod apps;
/// Liveness endpoint
pub mod health;
/// Prometheus scrape endpoint
pub mod metrics;
