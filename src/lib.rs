//! Onboarding Service
//!
//! A REST API that registers calling applications, issues each one an API
//! key, and protects its own management routes with those keys.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL or MySQL with sqlx, or an in-memory store
//! - **Authentication**: `X-App-Name` + `X-API-Key`, keys stored as bcrypt hashes
//! - **Middleware**: explicit ordered pipeline (logging, metrics, CORS, rate limiting, auth)
//! - **Observability**: `tracing` logs and Prometheus metrics

use std::sync::Arc;

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod server;
pub mod store;
pub mod telemetry;

#[cfg(test)]
mod test_support;

use middleware::rate_limit::RateLimiter;
use store::CredentialStore;
use telemetry::Observability;

/// Shared state handed to every handler and middleware stage.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CredentialStore>,
    pub observability: Observability,
    pub rate_limiter: Arc<RateLimiter>,
    /// Largest request body the logging stage will buffer.
    pub log_body_limit: usize,
}
