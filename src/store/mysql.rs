//! MySQL credential store.
//!
//! Same contract as the PostgreSQL store; MySQL has no `RETURNING`, so the
//! new id comes from `LAST_INSERT_ID()`.

use async_trait::async_trait;

use super::{CredentialStore, KeyHasher, StoreError};
use crate::{
    db::MySqlPool,
    models::app::{AppSummary, CreatedApp},
};

pub struct MySqlCredentialStore {
    pool: MySqlPool,
    hasher: KeyHasher,
}

impl MySqlCredentialStore {
    pub fn new(pool: MySqlPool, hasher: KeyHasher) -> Self {
        Self { pool, hasher }
    }
}

#[async_trait]
impl CredentialStore for MySqlCredentialStore {
    async fn create(&self, name: &str) -> Result<CreatedApp, StoreError> {
        let api_key = KeyHasher::generate_key();
        let api_key_hash = self.hasher.hash(&api_key).await?;

        let result = sqlx::query("INSERT INTO apps (name, api_key_hash) VALUES (?, ?)")
            .bind(name)
            .bind(&api_key_hash)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::insert_failed(name, e))?;

        Ok(CreatedApp {
            id: result.last_insert_id() as i64,
            name: name.to_owned(),
            api_key,
        })
    }

    async fn list_all(&self) -> Result<Vec<AppSummary>, StoreError> {
        sqlx::query_as::<_, AppSummary>("SELECT id, name FROM apps ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::persistence("list apps", e))
    }

    async fn delete(&self, id: i64) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM apps WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::persistence("delete app", e))?;

        Ok(result.rows_affected())
    }

    async fn validate(&self, name: &str, api_key: &str) -> Result<Option<String>, StoreError> {
        let stored_hash: Option<String> =
            sqlx::query_scalar("SELECT api_key_hash FROM apps WHERE name = ?")
                .bind(name)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| StoreError::persistence("look up api key", e))?;

        let Some(stored_hash) = stored_hash else {
            return Ok(None);
        };

        let matched = self.hasher.verify(api_key, stored_hash).await?;
        Ok(matched.then(|| name.to_owned()))
    }
}
