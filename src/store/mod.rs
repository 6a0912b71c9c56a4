//! Credential store: persistence of application identities and API key hashes.
//!
//! Every backend implements [`CredentialStore`]. Handlers and the
//! authentication middleware only ever see `Arc<dyn CredentialStore>`; the
//! concrete backend is picked once at startup (see [`crate::db::DbBackend`]).
//!
//! # Key Handling
//!
//! - Keys are 32 random bytes rendered as 64 lowercase hex characters
//! - Only a bcrypt hash is persisted (per-record salt, configurable cost)
//! - Hashing and verification run on the blocking thread pool
//! - "Unknown name" and "wrong key" are indistinguishable to callers

use std::ops::RangeInclusive;

use async_trait::async_trait;

use crate::models::app::{AppSummary, CreatedApp};

mod instrumented;
mod memory;
mod mysql;
mod postgres;

pub use instrumented::InstrumentedStore;
pub use memory::MemoryCredentialStore;
pub use mysql::MySqlCredentialStore;
pub use postgres::PgCredentialStore;

/// Number of random bytes in a generated API key.
pub const API_KEY_BYTES: usize = 32;

/// Length of a rendered API key (hex encoding doubles the byte count).
pub const API_KEY_LEN: usize = API_KEY_BYTES * 2;

/// Work factors bcrypt accepts.
pub const BCRYPT_COSTS: RangeInclusive<u32> = 4..=31;

/// Errors raised by credential store backends.
///
/// A failed key comparison is not an error; see [`CredentialStore::validate`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The database rejected or failed a query.
    #[error("{operation} failed")]
    Persistence {
        operation: &'static str,
        #[source]
        source: sqlx::Error,
    },

    /// bcrypt could not hash the generated key.
    #[error("failed to hash API key")]
    Hash(#[from] bcrypt::BcryptError),

    /// The blocking hash worker panicked or was cancelled.
    #[error("hash worker failed")]
    Worker(#[from] tokio::task::JoinError),

    /// An application with this name is already registered.
    #[error("application '{0}' already exists")]
    DuplicateName(String),
}

impl StoreError {
    pub(crate) fn persistence(operation: &'static str, source: sqlx::Error) -> Self {
        StoreError::Persistence { operation, source }
    }

    /// Map an insert failure, turning unique violations on `name` into
    /// [`StoreError::DuplicateName`].
    pub(crate) fn insert_failed(name: &str, source: sqlx::Error) -> Self {
        let duplicate = matches!(
            &source,
            sqlx::Error::Database(db) if db.is_unique_violation()
        );

        if duplicate {
            StoreError::DuplicateName(name.to_owned())
        } else {
            StoreError::persistence("insert app", source)
        }
    }
}

/// Storage contract for application identities.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Register an application and issue its API key.
    ///
    /// The returned [`CreatedApp`] carries the only copy of the plaintext key.
    async fn create(&self, name: &str) -> Result<CreatedApp, StoreError>;

    /// List every registered application, without key material, by ascending id.
    async fn list_all(&self) -> Result<Vec<AppSummary>, StoreError>;

    /// Remove an application. Returns the number of rows removed; `0` means
    /// the id did not exist and is not an error.
    async fn delete(&self, id: i64) -> Result<u64, StoreError>;

    /// Check `api_key` against the hash stored for `name`.
    ///
    /// Returns `Ok(Some(name))` on a match and `Ok(None)` when the name is
    /// unknown or the key does not match. Only storage faults are errors.
    async fn validate(&self, name: &str, api_key: &str) -> Result<Option<String>, StoreError>;
}

/// Generates API keys and hashes/verifies them with bcrypt.
#[derive(Debug, Clone, Copy)]
pub struct KeyHasher {
    cost: u32,
}

impl KeyHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    /// Generate a fresh API key (32 bytes of randomness, 64 hex chars).
    pub fn generate_key() -> String {
        let bytes: [u8; API_KEY_BYTES] = rand::random();
        hex::encode(bytes)
    }

    pub async fn hash(&self, api_key: &str) -> Result<String, StoreError> {
        let api_key = api_key.to_owned();
        let cost = self.cost;

        let hash = tokio::task::spawn_blocking(move || bcrypt::hash(api_key, cost)).await??;
        Ok(hash)
    }

    /// Compare a presented key with a stored hash.
    ///
    /// A hash bcrypt cannot parse counts as a mismatch.
    pub async fn verify(&self, api_key: &str, stored_hash: String) -> Result<bool, StoreError> {
        let api_key = api_key.to_owned();

        let outcome =
            tokio::task::spawn_blocking(move || bcrypt::verify(api_key, &stored_hash)).await?;

        match outcome {
            Ok(matched) => Ok(matched),
            Err(error) => {
                tracing::warn!(%error, "stored API key hash could not be verified");
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_are_fixed_length_hex() {
        let key = KeyHasher::generate_key();

        assert_eq!(key.len(), API_KEY_LEN);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn generated_keys_differ() {
        assert_ne!(KeyHasher::generate_key(), KeyHasher::generate_key());
    }

    #[tokio::test]
    async fn hash_verifies_only_the_original_key() {
        let hasher = KeyHasher::new(4);
        let key = KeyHasher::generate_key();

        let hash = hasher.hash(&key).await.unwrap();

        assert_ne!(hash, key);
        assert!(hasher.verify(&key, hash.clone()).await.unwrap());
        assert!(!hasher.verify(&format!("{key}x"), hash).await.unwrap());
    }

    #[tokio::test]
    async fn hashes_are_salted() {
        let hasher = KeyHasher::new(4);

        let first = hasher.hash("same-key").await.unwrap();
        let second = hasher.hash("same-key").await.unwrap();

        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn malformed_hash_is_a_mismatch() {
        let hasher = KeyHasher::new(4);

        assert!(!hasher.verify("anything", "not-a-bcrypt-hash".into()).await.unwrap());
    }
}
