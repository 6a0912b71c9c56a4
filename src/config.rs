//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to automatically deserialize environment variables into a type-safe struct.

use std::time::Duration;

use serde::Deserialize;

use crate::{db::DbBackend, store::BCRYPT_COSTS};

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `SERVICE_NAME` (optional): Name used in logs, metrics and `/health`, defaults to "onboarding"
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 8080
/// - `DATABASE_BACKEND` (optional): `postgres`, `mysql` or `memory`, defaults to `postgres`
/// - `DATABASE_URL` (required for SQL backends): connection string
/// - `DATABASE_MAX_CONNECTIONS` (optional): pool size, defaults to 5
/// - `RATE_LIMIT_REQUESTS` / `RATE_LIMIT_WINDOW_SECS` (optional): 100 requests per 60 seconds
/// - `RATE_LIMIT_CLIENT_HEADER` (optional): trusted proxy header carrying the client address
/// - `REQUEST_TIMEOUT_SECS` (optional): per-request deadline, defaults to 30
/// - `SHUTDOWN_GRACE_SECS` (optional): time allowed for in-flight requests on shutdown, defaults to 10
/// - `BCRYPT_COST` (optional): API key hashing cost, defaults to `bcrypt::DEFAULT_COST`
/// - `LOG_BODY_LIMIT_BYTES` (optional): largest request body the logging stage buffers, defaults to 1 MiB
/// - `LOG_FORMAT` (optional): `pretty` or `json`, defaults to `pretty`
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_service_name")]
    pub service_name: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default)]
    pub database_backend: DbBackend,

    pub database_url: Option<String>,

    #[serde(default = "default_max_connections")]
    pub database_max_connections: u32,

    #[serde(default = "default_rate_limit_requests")]
    pub rate_limit_requests: u32,

    #[serde(default = "default_rate_limit_window_secs")]
    pub rate_limit_window_secs: u64,

    pub rate_limit_client_header: Option<String>,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,

    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,

    #[serde(default = "default_log_body_limit")]
    pub log_body_limit_bytes: usize,

    #[serde(default)]
    pub log_format: LogFormat,
}

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

fn default_service_name() -> String {
    "onboarding".to_string()
}

/// Default port if SERVER_PORT environment variable is not set.
fn default_port() -> u16 {
    8080
}

fn default_max_connections() -> u32 {
    5
}

fn default_rate_limit_requests() -> u32 {
    100
}

fn default_rate_limit_window_secs() -> u64 {
    60
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_shutdown_grace_secs() -> u64 {
    10
}

fn default_bcrypt_cost() -> u32 {
    bcrypt::DEFAULT_COST
}

fn default_log_body_limit() -> usize {
    1024 * 1024
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if environment variable values cannot be parsed into
    /// expected types, or if `BCRYPT_COST` is outside what bcrypt accepts.
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();

        // Field names are automatically converted: database_url -> DATABASE_URL
        envy::from_env::<Config>()?.validated()
    }

    /// Reject values that parse but would fail on every request.
    fn validated(self) -> Result<Self, envy::Error> {
        if !BCRYPT_COSTS.contains(&self.bcrypt_cost) {
            return Err(envy::Error::Custom(format!(
                "BCRYPT_COST must be between {} and {}, got {}",
                BCRYPT_COSTS.start(),
                BCRYPT_COSTS.end(),
                self.bcrypt_cost
            )));
        }
        Ok(self)
    }

    /// Requests allowed per window. Zero means "not configured".
    pub fn rate_limit_requests(&self) -> u32 {
        if self.rate_limit_requests == 0 {
            default_rate_limit_requests()
        } else {
            self.rate_limit_requests
        }
    }

    pub fn rate_limit_window(&self) -> Duration {
        let secs = if self.rate_limit_window_secs == 0 {
            default_rate_limit_window_secs()
        } else {
            self.rate_limit_window_secs
        };
        Duration::from_secs(secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_pairs(pairs: &[(&str, &str)]) -> Config {
        let vars = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()));
        envy::from_iter(vars).expect("config should parse")
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = from_pairs(&[]);

        assert_eq!(config.service_name, "onboarding");
        assert_eq!(config.server_port, 8080);
        assert_eq!(config.database_backend, DbBackend::Postgres);
        assert!(config.database_url.is_none());
        assert_eq!(config.rate_limit_requests(), 100);
        assert_eq!(config.rate_limit_window(), Duration::from_secs(60));
        assert_eq!(config.shutdown_grace(), Duration::from_secs(10));
        assert_eq!(config.bcrypt_cost, bcrypt::DEFAULT_COST);
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn reads_overrides() {
        let config = from_pairs(&[
            ("DATABASE_BACKEND", "mysql"),
            ("DATABASE_URL", "mysql://root@localhost/apps"),
            ("RATE_LIMIT_REQUESTS", "5"),
            ("RATE_LIMIT_WINDOW_SECS", "2"),
            ("RATE_LIMIT_CLIENT_HEADER", "x-forwarded-for"),
            ("LOG_FORMAT", "json"),
        ]);

        assert_eq!(config.database_backend, DbBackend::MySql);
        assert_eq!(config.rate_limit_requests(), 5);
        assert_eq!(config.rate_limit_window(), Duration::from_secs(2));
        assert_eq!(
            config.rate_limit_client_header.as_deref(),
            Some("x-forwarded-for")
        );
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn zero_rate_limit_falls_back_to_defaults() {
        let config = from_pairs(&[
            ("RATE_LIMIT_REQUESTS", "0"),
            ("RATE_LIMIT_WINDOW_SECS", "0"),
        ]);

        assert_eq!(config.rate_limit_requests(), 100);
        assert_eq!(config.rate_limit_window(), Duration::from_secs(60));
    }

    #[test]
    fn bcrypt_cost_outside_supported_range_is_rejected() {
        for cost in ["3", "32"] {
            let error = from_pairs(&[("BCRYPT_COST", cost)]).validated().unwrap_err();
            assert!(error.to_string().contains("BCRYPT_COST"));
        }

        for cost in ["4", "31"] {
            assert!(from_pairs(&[("BCRYPT_COST", cost)]).validated().is_ok());
        }
    }
}
