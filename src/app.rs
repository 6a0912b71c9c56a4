//! Route table and global layers.

use std::time::Duration;

use axum::{
    Router,
    http::StatusCode,
    routing::{delete, get, post},
};
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::{
    AppState, handlers,
    middleware::{Pipeline, recovery},
};

/// Build the HTTP router.
///
/// # Routes
///
/// | Route | Pipeline |
/// |---|---|
/// | `GET /apps/list` | protected |
/// | `DELETE /apps/delete?id=` | protected |
/// | `POST /apps/create` | public |
/// | `GET /health` | none |
/// | `GET /metrics` | none |
///
/// Everything sits behind, from the outside in: the panic recovery boundary,
/// a `tracing` span per request and the request timeout.
pub fn router(state: AppState, request_timeout: Duration) -> Router {
    let protected = Pipeline::protected().apply(
        Router::new()
            .route("/apps/list", get(handlers::apps::list_apps))
            .route("/apps/delete", delete(handlers::apps::revoke_app)),
        &state,
    );

    // Registration is how a caller gets its first key, so it cannot require one
    let public = Pipeline::public().apply(
        Router::new().route("/apps/create", post(handlers::apps::create_app)),
        &state,
    );

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::metrics::metrics))
        .merge(protected)
        .merge(public)
        .layer(
            ServiceBuilder::new()
                .layer(recovery::layer())
                .layer(TraceLayer::new_for_http())
                .layer(timeout_layer(request_timeout)),
        )
        .with_state(state)
}

/// Requests still running after `request_timeout` are dropped with 408.
fn timeout_layer(request_timeout: Duration) -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, request_timeout)
}
