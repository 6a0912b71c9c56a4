//! Logging and metrics plumbing.
//!
//! [`init_tracing`] installs the global `tracing` subscriber once at startup.
//! Everything else lives in an [`Observability`] value that is built
//! explicitly and handed to the components that need it, so tests can swap in
//! a fresh registry or a recording request logger.

use std::sync::Arc;

use prometheus::Registry;
use tracing_subscriber::EnvFilter;

use crate::config::LogFormat;

mod metrics;
mod request_log;

pub use metrics::{DependencyMetrics, HttpMetrics};
pub use request_log::{RequestLogger, RequestRecord, TracingRequestLogger};

/// Initialize logging with a tracing subscriber.
///
/// Reads the `RUST_LOG` environment variable (defaults to "info" level).
pub fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Service-scoped logging and metrics context.
#[derive(Clone)]
pub struct Observability {
    service: Arc<str>,
    registry: Registry,
    http: HttpMetrics,
    dependency: DependencyMetrics,
    request_log: Arc<dyn RequestLogger>,
}

impl Observability {
    /// Build a context with its own metrics registry and the tracing request logger.
    pub fn new(service: &str) -> prometheus::Result<Self> {
        let registry = Registry::new();
        let http = HttpMetrics::register(&registry)?;
        let dependency = DependencyMetrics::register(&registry)?;

        Ok(Self {
            service: Arc::from(service),
            registry,
            http,
            dependency,
            request_log: Arc::new(TracingRequestLogger),
        })
    }

    /// Replace the request log sink.
    pub fn with_request_logger(mut self, request_log: Arc<dyn RequestLogger>) -> Self {
        self.request_log = request_log;
        self
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn http(&self) -> &HttpMetrics {
        &self.http
    }

    pub fn dependency(&self) -> &DependencyMetrics {
        &self.dependency
    }

    pub fn request_log(&self) -> &dyn RequestLogger {
        self.request_log.as_ref()
    }

    /// Current metrics in the Prometheus text exposition format.
    pub fn render_metrics(&self) -> prometheus::Result<String> {
        metrics::render(&self.registry)
    }
}
