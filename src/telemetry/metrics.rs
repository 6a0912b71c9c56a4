//! Prometheus metric families.
//!
//! All families are registered on a registry owned by the service rather
//! than the process-wide default registry, so tests can build as many
//! independent instances as they like.

use std::time::Duration;

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

/// Latency buckets in seconds, tuned for HTTP handlers.
const LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
];

/// RED metrics for inbound HTTP requests.
#[derive(Clone)]
pub struct HttpMetrics {
    requests_total: IntCounterVec,
    request_duration: HistogramVec,
    errors_total: IntCounterVec,
}

impl HttpMetrics {
    pub fn register(registry: &Registry) -> prometheus::Result<Self> {
        let requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "Total number of HTTP requests."),
            &["service", "method", "path", "status_code"],
        )?;
        let request_duration = HistogramVec::new(
            HistogramOpts::new(
                "http_requests_duration_seconds",
                "Duration of HTTP requests in seconds.",
            )
            .buckets(LATENCY_BUCKETS.to_vec()),
            &["service", "method", "path", "status_code"],
        )?;
        let errors_total = IntCounterVec::new(
            Opts::new(
                "http_requests_errors_total",
                "Total number of HTTP requests that resulted in a server error.",
            ),
            &["service", "method", "path"],
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(request_duration.clone()))?;
        registry.register(Box::new(errors_total.clone()))?;

        Ok(Self {
            requests_total,
            request_duration,
            errors_total,
        })
    }

    /// Record one finished request. 5xx statuses also bump the error counter.
    pub fn record(&self, service: &str, method: &str, path: &str, status: u16, elapsed: Duration) {
        let status_code = status.to_string();
        let labels = [service, method, path, status_code.as_str()];

        self.requests_total.with_label_values(&labels).inc();
        self.request_duration
            .with_label_values(&labels)
            .observe(elapsed.as_secs_f64());

        if (500..600).contains(&status) {
            self.errors_total
                .with_label_values(&[service, method, path])
                .inc();
        }
    }

    pub fn requests(&self, service: &str, method: &str, path: &str, status: u16) -> u64 {
        self.requests_total
            .with_label_values(&[service, method, path, status.to_string().as_str()])
            .get()
    }

    pub fn errors(&self, service: &str, method: &str, path: &str) -> u64 {
        self.errors_total
            .with_label_values(&[service, method, path])
            .get()
    }
}

/// Calls made to external dependencies such as the database.
#[derive(Clone)]
pub struct DependencyMetrics {
    requests_total: IntCounterVec,
    request_duration: HistogramVec,
}

impl DependencyMetrics {
    pub fn register(registry: &Registry) -> prometheus::Result<Self> {
        let requests_total = IntCounterVec::new(
            Opts::new(
                "dependency_requests_total",
                "Total number of calls to external dependencies.",
            ),
            &["dependency", "operation", "status"],
        )?;
        let request_duration = HistogramVec::new(
            HistogramOpts::new(
                "dependency_request_duration_seconds",
                "Duration of calls to external dependencies in seconds.",
            )
            .buckets(LATENCY_BUCKETS.to_vec()),
            &["dependency", "operation", "status"],
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(request_duration.clone()))?;

        Ok(Self {
            requests_total,
            request_duration,
        })
    }

    pub fn record(&self, dependency: &str, operation: &str, status: &str, elapsed: Duration) {
        let labels = [dependency, operation, status];

        self.requests_total.with_label_values(&labels).inc();
        self.request_duration
            .with_label_values(&labels)
            .observe(elapsed.as_secs_f64());
    }

    pub fn calls(&self, dependency: &str, operation: &str, status: &str) -> u64 {
        self.requests_total
            .with_label_values(&[dependency, operation, status])
            .get()
    }
}

/// Render every family in `registry` in the Prometheus text exposition format.
pub fn render(registry: &Registry) -> prometheus::Result<String> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&registry.gather(), &mut buffer)?;

    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}
