//! Shared fixtures for unit tests.

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use axum::http::request::Builder;

use crate::{
    AppState,
    middleware::rate_limit::RateLimiter,
    models::app::{AppSummary, CreatedApp},
    store::{CredentialStore, KeyHasher, MemoryCredentialStore, StoreError},
    telemetry::{Observability, RequestLogger, RequestRecord},
};

/// Lowest cost bcrypt accepts; keeps tests fast.
pub const TEST_BCRYPT_COST: u32 = 4;

pub struct TestContext {
    pub state: AppState,
    pub logger: Arc<RecordingLogger>,
}

impl TestContext {
    pub fn new() -> Self {
        Self::build(
            Arc::new(MemoryCredentialStore::new(KeyHasher::new(TEST_BCRYPT_COST))),
            1_000,
        )
    }

    pub fn with_rate_limit(limit: u32) -> Self {
        Self::build(
            Arc::new(MemoryCredentialStore::new(KeyHasher::new(TEST_BCRYPT_COST))),
            limit,
        )
    }

    pub fn with_store(store: Arc<dyn CredentialStore>) -> Self {
        Self::build(store, 1_000)
    }

    fn build(store: Arc<dyn CredentialStore>, limit: u32) -> Self {
        let logger = Arc::new(RecordingLogger::default());
        let observability = Observability::new("test-service")
            .expect("fresh registry")
            .with_request_logger(logger.clone());

        let state = AppState {
            store,
            observability,
            rate_limiter: Arc::new(RateLimiter::new(limit, Duration::from_secs(60))),
            log_body_limit: 1024 * 1024,
        };

        Self { state, logger }
    }
}

/// Add the auth headers for `caller` to a request.
pub fn authed(builder: Builder, caller: &CreatedApp) -> Builder {
    builder
        .header("x-app-name", caller.name.as_str())
        .header("x-api-key", caller.api_key.as_str())
}

/// Request logger that keeps every record in memory.
#[derive(Default)]
pub struct RecordingLogger {
    records: Mutex<Vec<RequestRecord>>,
}

impl RecordingLogger {
    pub fn records(&self) -> Vec<RequestRecord> {
        self.records.lock().unwrap().clone()
    }
}

impl RequestLogger for RecordingLogger {
    fn record(&self, record: RequestRecord) {
        self.records.lock().unwrap().push(record);
    }
}

/// Store whose every call fails like an unreachable database.
#[derive(Default)]
pub struct FailingStore {
    calls: AtomicUsize,
}

impl FailingStore {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail<T>(&self, operation: &'static str) -> Result<T, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::persistence(operation, sqlx::Error::PoolTimedOut))
    }
}

#[async_trait]
impl CredentialStore for FailingStore {
    async fn create(&self, _name: &str) -> Result<CreatedApp, StoreError> {
        self.fail("insert app")
    }

    async fn list_all(&self) -> Result<Vec<AppSummary>, StoreError> {
        self.fail("list apps")
    }

    async fn delete(&self, _id: i64) -> Result<u64, StoreError> {
        self.fail("delete app")
    }

    async fn validate(&self, _name: &str, _api_key: &str) -> Result<Option<String>, StoreError> {
        self.fail("look up api key")
    }
}
