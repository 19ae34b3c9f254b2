//! Database repositories for the data access layer
//
// Repository trait and PostgreSQL implementation
pub mod storage_record;
//
// Process-local implementation
pub mod memory;

pub use memory::InMemoryStorageRecordRepository;
pub use storage_record::{PgStorageRecordRepository, StorageRecordRepository};

use filestore_core::{Config, FileStorageError};
use sqlx::postgres::{PgPool, PgPoolOptions};

/// Connect a pool using `DATABASE_URL` and `DB_MAX_CONNECTIONS` from the configuration.
pub async fn create_pool(config: &Config) -> Result<PgPool, FileStorageError> {
    let url = config
        .database_url()
        .ok_or_else(|| FileStorageError::Persistence("DATABASE_URL not configured".to_string()))?;

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(url)
        .await?;

    tracing::info!(
        max_connections = config.db_max_connections,
        "Database pool connected"
    );

    Ok(pool)
}

/// Apply the bundled migrations (creates `file_storage`).
pub async fn run_migrations(pool: &PgPool) -> Result<(), FileStorageError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| FileStorageError::Persistence(format!("Migration failed: {}", e)))?;

    tracing::info!("Database migrations applied");
    Ok(())
}
