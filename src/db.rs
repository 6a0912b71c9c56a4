//! Database connection pool and migration management.
//!
//! The storage backend is chosen once at startup from configuration. Each
//! variant knows how to open its pool, run its own migrations and hand back a
//! ready [`CredentialStore`].

use std::sync::Arc;

use serde::Deserialize;
use sqlx::{MySql, Pool, Postgres};
use url::Url;

use crate::{
    config::Config,
    store::{
        CredentialStore, InstrumentedStore, KeyHasher, MemoryCredentialStore,
        MySqlCredentialStore, PgCredentialStore,
    },
    telemetry::DependencyMetrics,
};

/// Type alias for PostgreSQL connection pool.
pub type PgPool = Pool<Postgres>;

/// Type alias for MySQL connection pool.
pub type MySqlPool = Pool<MySql>;

/// Storage backend selected by `DATABASE_BACKEND`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DbBackend {
    #[default]
    Postgres,
    MySql,
    /// In-process store; contents are lost on restart.
    Memory,
}

#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("DATABASE_URL is required for the {0:?} backend")]
    MissingUrl(DbBackend),

    #[error("failed to connect to database")]
    Connect(#[from] sqlx::Error),

    #[error("failed to run database migrations")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

impl DbBackend {
    /// Connect to the configured backend and build the credential store.
    ///
    /// The returned store is wrapped so every call is recorded in the
    /// dependency metrics.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A SQL backend is selected without `DATABASE_URL`
    /// - The database cannot be reached or authentication fails
    /// - Migrations fail to apply
    pub async fn connect(
        self,
        config: &Config,
        metrics: DependencyMetrics,
    ) -> Result<Arc<dyn CredentialStore>, ConnectError> {
        let hasher = KeyHasher::new(config.bcrypt_cost);

        let store: Arc<dyn CredentialStore> = match self {
            DbBackend::Postgres => {
                let url = config
                    .database_url
                    .as_deref()
                    .ok_or(ConnectError::MissingUrl(self))?;
                tracing::info!(url = %redact(url), "connecting to PostgreSQL");

                let pool = sqlx::postgres::PgPoolOptions::new()
                    .max_connections(config.database_max_connections)
                    .connect(url)
                    .await?;
                sqlx::migrate!("./migrations/postgres").run(&pool).await?;

                Arc::new(InstrumentedStore::new(
                    PgCredentialStore::new(pool, hasher),
                    "postgres",
                    metrics,
                ))
            }
            DbBackend::MySql => {
                let url = config
                    .database_url
                    .as_deref()
                    .ok_or(ConnectError::MissingUrl(self))?;
                tracing::info!(url = %redact(url), "connecting to MySQL");

                let pool = sqlx::mysql::MySqlPoolOptions::new()
                    .max_connections(config.database_max_connections)
                    .connect(url)
                    .await?;
                sqlx::migrate!("./migrations/mysql").run(&pool).await?;

                Arc::new(InstrumentedStore::new(
                    MySqlCredentialStore::new(pool, hasher),
                    "mysql",
                    metrics,
                ))
            }
            DbBackend::Memory => {
                tracing::warn!("using in-memory credential store; registrations will not survive a restart");
                Arc::new(InstrumentedStore::new(
                    MemoryCredentialStore::new(hasher),
                    "memory",
                    metrics,
                ))
            }
        };

        Ok(store)
    }
}

/// Strip the password from a connection string so it can be logged.
fn redact(database_url: &str) -> String {
    match Url::parse(database_url) {
        Ok(mut url) => {
            if url.password().is_some() {
                let _ = url.set_password(Some("****"));
            }
            url.to_string()
        }
        Err(_) => "<unparseable url>".to_string(),
    }
}
