//! Health check endpoint for service monitoring.

use axum::{Json, extract::State};
use serde::Serialize;

use crate::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Name of the service answering
    pub service: String,

    /// Overall service status
    pub status: String,
}

/// Health check handler.
///
/// Liveness only: it answers as long as the process is serving and does not
/// touch the credential store.
///
/// # Response (200 OK)
///
/// ```json
/// {
///   "service": "onboarding",
///   "status": "Healthy"
/// }
/// ```
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        service: state.observability.service().to_string(),
        status: "Healthy".to_string(),
    })
}
