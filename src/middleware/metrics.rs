//! Per-request metrics stage.

use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};

use crate::AppState;

/// Record count, latency and server errors for every request.
///
/// The path label is the matched route template (e.g. `/apps/delete`) so
/// ids in paths cannot blow up label cardinality; unmatched requests fall
/// back to the raw path.
pub async fn record_metrics(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_owned())
        .unwrap_or_else(|| request.uri().path().to_owned());

    let response = next.run(request).await;

    let observability = &state.observability;
    observability.http().record(
        observability.service(),
        &method,
        &path,
        response.status().as_u16(),
        start.elapsed(),
    );

    response
}

#[cfg(test)]
mod tests {
    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode},
        middleware::from_fn_with_state,
        routing::get,
    };
    use tower::ServiceExt;

    use super::*;
    use crate::test_support::TestContext;

    #[tokio::test]
    async fn server_errors_are_counted_per_route() {
        let ctx = TestContext::new();
        let router = Router::new()
            .route("/ok", get(|| async { StatusCode::OK }))
            .route("/broken", get(|| async { StatusCode::BAD_GATEWAY }))
            .layer(from_fn_with_state(ctx.state.clone(), record_metrics))
            .with_state(ctx.state.clone());

        for uri in ["/ok", "/broken", "/broken"] {
            router
                .clone()
                .oneshot(Request::get(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
        }

        let service = ctx.state.observability.service().to_owned();
        let http = ctx.state.observability.http();
        assert_eq!(http.requests(&service, "GET", "/ok", 200), 1);
        assert_eq!(http.requests(&service, "GET", "/broken", 502), 2);
        assert_eq!(http.errors(&service, "GET", "/ok"), 0);
        assert_eq!(http.errors(&service, "GET", "/broken"), 2);
    }
}
