//! PostgreSQL credential store.

use async_trait::async_trait;

use super::{CredentialStore, KeyHasher, StoreError};
use crate::{
    db::PgPool,
    models::app::{AppSummary, CreatedApp},
};

pub struct PgCredentialStore {
    pool: PgPool,
    hasher: KeyHasher,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool, hasher: KeyHasher) -> Self {
        Self { pool, hasher }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn create(&self, name: &str) -> Result<CreatedApp, StoreError> {
        let api_key = KeyHasher::generate_key();
        let api_key_hash = self.hasher.hash(&api_key).await?;

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO apps (name, api_key_hash) VALUES ($1, $2) RETURNING id",
        )
        .bind(name)
        .bind(&api_key_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::insert_failed(name, e))?;

        Ok(CreatedApp {
            id,
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
        let result = sqlx::query("DELETE FROM apps WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::persistence("delete app", e))?;

        Ok(result.rows_affected())
    }

    async fn validate(&self, name: &str, api_key: &str) -> Result<Option<String>, StoreError> {
        let stored_hash: Option<String> =
            sqlx::query_scalar("SELECT api_key_hash FROM apps WHERE name = $1")
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
