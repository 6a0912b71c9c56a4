//! HTTP middleware components.
//!
//! Middleware are functions that run before route handlers. They can:
//! - Log requests and responses
//! - Record metrics
//! - Inject CORS headers
//! - Throttle clients
//! - Authenticate requests
//! - Short-circuit requests (reject unauthorized or throttled callers)
//!
//! Stages are not nested by hand. A [`Pipeline`] is an explicit ordered list
//! built at startup; [`Pipeline::apply`] layers it onto a router so that the
//! first stage is outermost. On the way in stages run first to last, on the
//! way out last to first.

use axum::{Router, middleware::from_fn_with_state};

use crate::AppState;

/// API key authentication middleware
pub mod auth;
/// CORS header injection
pub mod cors;
/// Request/response logging
pub mod logging;
/// Per-request HTTP metrics
pub mod metrics;
/// Per-client rate limiting
pub mod rate_limit;
/// Panic recovery boundary
pub mod recovery;

/// One link of the request pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Logging,
    Metrics,
    Cors,
    RateLimit,
    Auth,
}

/// Ordered list of stages wrapped around a group of routes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    /// Build a pipeline; `stages[0]` ends up outermost.
    pub fn new(stages: impl Into<Vec<Stage>>) -> Self {
        Self {
            stages: stages.into(),
        }
    }

    /// Stage order for routes that require an API key.
    ///
    /// Logging is outermost so it sees the final status and the full latency.
    pub fn protected() -> Self {
        Self::new([
            Stage::Logging,
            Stage::Metrics,
            Stage::Cors,
            Stage::RateLimit,
            Stage::Auth,
        ])
    }

    /// Same as [`Pipeline::protected`] without authentication.
    pub fn public() -> Self {
        Self::new([Stage::Logging, Stage::Metrics, Stage::Cors, Stage::RateLimit])
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn requires_auth(&self) -> bool {
        self.stages.contains(&Stage::Auth)
    }

    /// Wrap every route of `router` in this pipeline.
    ///
    /// A handler panic is turned into a 500 directly around the handler, so
    /// every stage still sees a response on the way out.
    pub fn apply(&self, router: Router<AppState>, state: &AppState) -> Router<AppState> {
        let router = router.layer(recovery::layer());

        // The last layer added is the outermost one, so add innermost first.
        self.stages
            .iter()
            .rev()
            .fold(router, |router, stage| match stage {
                Stage::Logging => {
                    router.layer(from_fn_with_state(state.clone(), logging::log_requests))
                }
                Stage::Metrics => {
                    router.layer(from_fn_with_state(state.clone(), metrics::record_metrics))
                }
                Stage::Cors => router.layer(cors::layer()),
                Stage::RateLimit => {
                    router.layer(from_fn_with_state(state.clone(), rate_limit::limit_by_client))
                }
                Stage::Auth => router.layer(from_fn_with_state(state.clone(), auth::auth_middleware)),
            })
    }
}
