//! Metrics decorator for credential stores.

use std::time::Instant;

use async_trait::async_trait;

use super::{CredentialStore, StoreError};
use crate::{
    models::app::{AppSummary, CreatedApp},
    telemetry::DependencyMetrics,
};

/// Wraps a store and records count and latency of every call, labelled by
/// backend name, operation and outcome.
pub struct InstrumentedStore<S> {
    inner: S,
    dependency: &'static str,
    metrics: DependencyMetrics,
}

impl<S> InstrumentedStore<S> {
    pub fn new(inner: S, dependency: &'static str, metrics: DependencyMetrics) -> Self {
        Self {
            inner,
            dependency,
            metrics,
        }
    }

    async fn observe<T, F>(&self, operation: &'static str, call: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        let start = Instant::now();
        let result = call.await;
        let status = if result.is_ok() { "ok" } else { "error" };

        self.metrics
            .record(self.dependency, operation, status, start.elapsed());
        result
    }
}

#[async_trait]
impl<S: CredentialStore> CredentialStore for InstrumentedStore<S> {
    async fn create(&self, name: &str) -> Result<CreatedApp, StoreError> {
        self.observe("create", self.inner.create(name)).await
    }

    async fn list_all(&self) -> Result<Vec<AppSummary>, StoreError> {
        self.observe("list_all", self.inner.list_all()).await
    }

    async fn delete(&self, id: i64) -> Result<u64, StoreError> {
        self.observe("delete", self.inner.delete(id)).await
    }

    async fn validate(&self, name: &str, api_key: &str) -> Result<Option<String>, StoreError> {
        self.observe("validate", self.inner.validate(name, api_key))
            .await
    }
}
