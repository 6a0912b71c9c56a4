//! Per-client rate limiting.
//!
//! Each client key gets a GCRA bucket from `governor`: up to `limit`
//! requests may arrive back to back, and capacity is refilled at one request
//! per `window / limit`. A client can therefore never exceed `limit` requests
//! in a burst, nor `limit` per `window` sustained.
//!
//! # Client Key
//!
//! By default the key is the peer IP address from the TCP connection. Behind
//! a reverse proxy every request would then share the proxy's address, so a
//! trusted header (e.g. `X-Forwarded-For`) can be configured instead; its
//! first comma-separated value is used. Only configure a header that the
//! proxy overwrites, since clients can set it themselves.

use std::{net::SocketAddr, num::NonZeroU32, sync::Arc, time::Duration};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderName,
    middleware::Next,
    response::Response,
};
use governor::{
    Quota,
    clock::{Clock, DefaultClock},
    middleware::NoOpMiddleware,
    state::keyed::DefaultKeyedStateStore,
};
use tokio::task::JoinHandle;

use crate::{AppState, error::AppError};

/// Key used when neither a trusted header nor a peer address is available.
const UNKNOWN_CLIENT: &str = "unknown";

type KeyedLimiter<C> = governor::RateLimiter<
    String,
    DefaultKeyedStateStore<String>,
    C,
    NoOpMiddleware<<C as Clock>::Instant>,
>;

pub struct RateLimiter<C: Clock = DefaultClock> {
    limiter: KeyedLimiter<C>,
    clock: C,
    window: Duration,
    client_header: Option<HeaderName>,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self::with_clock(limit, window, DefaultClock::default())
    }

    /// Periodically drop buckets that have refilled so idle clients do not
    /// accumulate.
    pub fn spawn_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(limiter.window);
            loop {
                ticker.tick().await;
                limiter.sweep();
            }
        })
    }
}

impl<C: Clock> RateLimiter<C> {
    /// `limit` is clamped to at least one request.
    pub fn with_clock(limit: u32, window: Duration, clock: C) -> Self {
        let burst = NonZeroU32::new(limit).unwrap_or(NonZeroU32::MIN);
        let period = (window / burst.get()).max(Duration::from_nanos(1));
        let quota = Quota::with_period(period)
            .unwrap_or_else(|| Quota::per_second(burst))
            .allow_burst(burst);

        Self {
            limiter: governor::RateLimiter::new(quota, DefaultKeyedStateStore::default(), &clock),
            clock,
            window,
            client_header: None,
        }
    }

    /// Take the client key from `header` instead of the peer address.
    pub fn trust_client_header(mut self, header: HeaderName) -> Self {
        self.client_header = Some(header);
        self
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Admit or reject one request from `key`.
    ///
    /// Returns how long the client has to wait for capacity when rejected.
    pub fn check(&self, key: &str) -> Result<(), Duration> {
        self.limiter
            .check_key(&key.to_owned())
            .map_err(|not_until| not_until.wait_time_from(self.clock.now()))
    }

    /// Forget clients whose bucket is full again.
    pub fn sweep(&self) {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.limiter.len()
    }

    pub fn client_key(&self, request: &Request) -> String {
        let from_header = self.client_header.as_ref().and_then(|header| {
            request
                .headers()
                .get(header)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        });

        if let Some(client) = from_header {
            return client.to_owned();
        }

        request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| UNKNOWN_CLIENT.to_owned())
    }
}

/// Rate limiting middleware keyed by client.
///
/// Rejected requests get 429 with `Retry-After` and never reach later stages.
pub async fn limit_by_client(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let client = state.rate_limiter.client_key(&request);

    if let Err(retry_after) = state.rate_limiter.check(&client) {
        tracing::warn!(%client, "rate limit exceeded");
        return Err(AppError::RateLimited { retry_after });
    }

    Ok(next.run(request).await)
}
