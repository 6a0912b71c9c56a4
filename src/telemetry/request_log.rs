//! Structured request/response records emitted by the logging stage.

use std::time::Duration;

use axum::http::StatusCode;

/// One completed request as seen by the outermost logging stage.
#[derive(Debug, Clone)]
pub struct RequestRecord {
    pub request_id: String,
    pub method: String,
    pub path: String,
    pub query: String,
    pub request_body: String,
    pub status: StatusCode,
    pub response_body: String,
    pub elapsed: Duration,
}

/// Destination for [`RequestRecord`]s.
pub trait RequestLogger: Send + Sync {
    fn record(&self, record: RequestRecord);
}

/// Writes each record as a single `tracing` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingRequestLogger;

impl RequestLogger for TracingRequestLogger {
    fn record(&self, record: RequestRecord) {
        tracing::info!(
            request_id = %record.request_id,
            method = %record.method,
            path = %record.path,
            query = %record.query,
            request_body = %record.request_body,
            status_code = record.status.as_u16(),
            response_body = %record.response_body,
            duration_ms = record.elapsed.as_millis() as u64,
            "HTTP request processed"
        );
    }
}
