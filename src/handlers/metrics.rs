//! Prometheus scrape endpoint.

use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
};

use crate::{AppState, error::AppError};

/// Content type of the Prometheus text exposition format.
const TEXT_FORMAT: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Render all registered metrics.
///
/// # Endpoint
///
/// `GET /metrics`
pub async fn metrics(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let body = state.observability.render_metrics().map_err(|error| {
        tracing::error!(%error, "failed to encode metrics");
        AppError::Internal
    })?;

    Ok(([(header::CONTENT_TYPE, TEXT_FORMAT)], body))
}
