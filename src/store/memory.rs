//! In-process credential store.
//!
//! Used by the `memory` backend and by tests. Ids are assigned
//! monotonically and never reused, matching the SQL backends.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{CredentialStore, KeyHasher, StoreError};
use crate::models::app::{App, AppSummary, CreatedApp};

pub struct MemoryCredentialStore {
    hasher: KeyHasher,
    state: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    last_id: i64,
    apps: BTreeMap<i64, App>,
}

impl MemoryCredentialStore {
    pub fn new(hasher: KeyHasher) -> Self {
        Self {
            hasher,
            state: Mutex::new(MemoryState::default()),
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn create(&self, name: &str) -> Result<CreatedApp, StoreError> {
        let api_key = KeyHasher::generate_key();
        // Hash before taking the lock; bcrypt is slow on purpose.
        let api_key_hash = self.hasher.hash(&api_key).await?;

        let mut state = self.state.lock().await;
        if state.apps.values().any(|app| app.name == name) {
            return Err(StoreError::DuplicateName(name.to_owned()));
        }

        state.last_id += 1;
        let id = state.last_id;
        state.apps.insert(
            id,
            App {
                id,
                name: name.to_owned(),
                api_key_hash,
            },
        );

        Ok(CreatedApp {
            id,
            name: name.to_owned(),
            api_key,
        })
    }

    async fn list_all(&self) -> Result<Vec<AppSummary>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.apps.values().cloned().map(AppSummary::from).collect())
    }

    async fn delete(&self, id: i64) -> Result<u64, StoreError> {
        let mut state = self.state.lock().await;
        Ok(u64::from(state.apps.remove(&id).is_some()))
    }

    async fn validate(&self, name: &str, api_key: &str) -> Result<Option<String>, StoreError> {
        let stored_hash = {
            let state = self.state.lock().await;
            state
                .apps
                .values()
                .find(|app| app.name == name)
                .map(|app| app.api_key_hash.clone())
        };

        let Some(stored_hash) = stored_hash else {
            return Ok(None);
        };

        let matched = self.hasher.verify(api_key, stored_hash).await?;
        Ok(matched.then(|| name.to_owned()))
    }
}
