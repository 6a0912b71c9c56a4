//! Onboarding Service - Main Application Entry Point
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Initialize logging and the metrics registry
//! 3. Connect the configured credential store (runs migrations for SQL backends)
//! 4. Build the rate limiter and HTTP router
//! 5. Serve until SIGINT/SIGTERM, then drain within the grace period

use std::sync::Arc;

use axum::http::HeaderName;
use onboarding_service::{
    AppState, app, config::Config, middleware::rate_limit::RateLimiter, server,
    telemetry::{self, Observability},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::from_env()?;

    telemetry::init_tracing(config.log_format);
    tracing::info!(service = %config.service_name, backend = ?config.database_backend, "Configuration loaded");

    let observability = Observability::new(&config.service_name)?;

    // Connect the credential store selected by DATABASE_BACKEND
    let store = config
        .database_backend
        .connect(&config, observability.dependency().clone())
        .await?;
    tracing::info!("Credential store ready");

    let mut rate_limiter = RateLimiter::new(config.rate_limit_requests(), config.rate_limit_window());
    if let Some(header) = &config.rate_limit_client_header {
        let header = HeaderName::try_from(header.as_str())?;
        tracing::info!(%header, "Rate limiting by trusted client header");
        rate_limiter = rate_limiter.trust_client_header(header);
    }
    let rate_limiter = Arc::new(rate_limiter);
    rate_limiter.spawn_sweeper();

    let state = AppState {
        store,
        observability,
        rate_limiter,
        log_body_limit: config.log_body_limit_bytes,
    };
    let app = app::router(state, config.request_timeout());

    // Bind to network address and start server
    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("{} service listening on {}", config.service_name, addr);

    server::serve(listener, app, server::shutdown_signal(), config.shutdown_grace()).await?;

    tracing::info!("Server has been shut down");
    Ok(())
}
