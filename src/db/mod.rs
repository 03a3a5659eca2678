//! Store bootstrap
//!
//! Picks the document store named by `STORE_BACKEND`. The PostgreSQL backend
//! gets a pool sized from the config and an up-to-date `documents` schema
//! before any request is served.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{Config, StoreBackend};
use crate::store::{DocumentStore, MemoryStore, PgDocumentStore};

/// Store bootstrap errors
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Failed to connect to database: {0}")]
    ConnectionError(String),

    #[error("Failed to apply document schema: {0}")]
    MigrationError(String),
}

/// Open the configured store, namespaced by `DB_NAME`
pub async fn open_store(config: &Config) -> Result<Arc<dyn DocumentStore>, DbError> {
    match config.store_backend {
        StoreBackend::Postgres => {
            let pool = create_pool(config).await?;
            run_migrations(&pool).await?;
            Ok(Arc::new(PgDocumentStore::new(pool, config.db_name.clone())))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store, data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

/// Connection pool for the document table
pub async fn create_pool(config: &Config) -> Result<PgPool, DbError> {
    tracing::info!(
        url = %config.database_url_masked(),
        max_connections = config.db_max_connections,
        "Connecting to database"
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(600))
        .connect(&config.database_url)
        .await
        .map_err(|e| DbError::ConnectionError(e.to_string()))?;

    Ok(pool)
}

/// Create the `documents` table and its unique indexes
pub async fn run_migrations(pool: &PgPool) -> Result<(), DbError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| DbError::MigrationError(e.to_string()))?;

    tracing::info!("Document schema is up to date");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_backend_needs_no_database() {
        let config = Config {
            store_backend: StoreBackend::Memory,
            database_url: "postgresql://nowhere.invalid/none".to_string(),
            ..Config::default()
        };

        let store = open_store(&config).await.unwrap();
        assert!(store.ping().await.is_ok());
    }
}
