//! Storage record repository: CRUD for the file_storage table.

use chrono::{DateTime, Utc};
use filestore_core::{FileStorageError, StorageRecord};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

/// Persistence operations the lifecycle services rely on.
#[async_trait::async_trait]
pub trait StorageRecordRepository: Send + Sync {
    /// Insert a new record and return its id.
    async fn create(&self, record: &StorageRecord) -> Result<Uuid, FileStorageError>;

    /// Overwrite an existing record. Returns false when no row has that id.
    async fn update(&self, record: &StorageRecord) -> Result<bool, FileStorageError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<StorageRecord>, FileStorageError>;

    /// Remove a record. Returns false when no row has that id.
    async fn delete_by_id(&self, id: Uuid) -> Result<bool, FileStorageError>;

    /// All records attached to one owner, oldest first.
    async fn find_by_owner(
        &self,
        owner_type: &str,
        owner_key: &str,
    ) -> Result<Vec<StorageRecord>, FileStorageError>;
}

/// Row type for file_storage table (for FromRow).
#[derive(Debug, sqlx::FromRow)]
pub struct StorageRecordRow {
    pub id: Uuid,
    pub owner_type: String,
    pub owner_key: String,
    pub adapter: String,
    pub adapter_config: String,
    pub path: String,
    pub filename: String,
    pub extension: String,
    pub mime_type: String,
    pub filesize: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StorageRecordRow {
    pub fn to_storage_record(self) -> StorageRecord {
        StorageRecord {
            id: self.id,
            owner_type: self.owner_type,
            owner_key: self.owner_key,
            adapter: self.adapter,
            adapter_config: self.adapter_config,
            path: self.path,
            filename: self.filename,
            extension: self.extension,
            mime_type: self.mime_type,
            filesize: self.filesize,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

const SELECT_COLUMNS: &str = "SELECT id, owner_type, owner_key, adapter, adapter_config, path, \
     filename, extension, mime_type, filesize, created_at, updated_at FROM file_storage";

/// PostgreSQL repository for the file_storage table.
///
/// The legacy `model` column mirrors `owner_type` on every write so older readers
/// keep working; it is never read back.
#[derive(Clone)]
pub struct PgStorageRecordRepository {
    pool: PgPool,
}

impl PgStorageRecordRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl StorageRecordRepository for PgStorageRecordRepository {
    #[tracing::instrument(skip(self, record), fields(db.table = "file_storage", db.record_id = %record.id))]
    async fn create(&self, record: &StorageRecord) -> Result<Uuid, FileStorageError> {
        let id: Uuid = sqlx::query_scalar::<Postgres, Uuid>(
            r#"
            INSERT INTO file_storage (
                id, owner_type, owner_key, model, adapter, adapter_config, path,
                filename, extension, mime_type, filesize, created_at, updated_at
            )
            VALUES ($1, $2, $3, $2, $4, $5, $6, $7, $8, $9, $10, $11, $11)
            RETURNING id
            "#,
        )
        .bind(record.id)
        .bind(&record.owner_type)
        .bind(&record.owner_key)
        .bind(&record.adapter)
        .bind(&record.adapter_config)
        .bind(&record.path)
        .bind(&record.filename)
        .bind(&record.extension)
        .bind(&record.mime_type)
        .bind(record.filesize)
        .bind(record.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    #[tracing::instrument(skip(self, record), fields(db.table = "file_storage", db.record_id = %record.id))]
    async fn update(&self, record: &StorageRecord) -> Result<bool, FileStorageError> {
        let result = sqlx::query(
            r#"
            UPDATE file_storage
            SET owner_type = $2, owner_key = $3, model = $2, adapter = $4,
                adapter_config = $5, path = $6, filename = $7, extension = $8,
                mime_type = $9, filesize = $10, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(record.id)
        .bind(&record.owner_type)
        .bind(&record.owner_key)
        .bind(&record.adapter)
        .bind(&record.adapter_config)
        .bind(&record.path)
        .bind(&record.filename)
        .bind(&record.extension)
        .bind(&record.mime_type)
        .bind(record.filesize)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self), fields(db.table = "file_storage", db.record_id = %id))]
    async fn find_by_id(&self, id: Uuid) -> Result<Option<StorageRecord>, FileStorageError> {
        let row: Option<StorageRecordRow> = sqlx::query_as::<Postgres, StorageRecordRow>(
            &format!("{} WHERE id = $1", SELECT_COLUMNS),
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.to_storage_record()))
    }

    #[tracing::instrument(skip(self), fields(db.table = "file_storage", db.record_id = %id))]
    async fn delete_by_id(&self, id: Uuid) -> Result<bool, FileStorageError> {
        let result = sqlx::query("DELETE FROM file_storage WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self), fields(db.table = "file_storage"))]
    async fn find_by_owner(
        &self,
        owner_type: &str,
        owner_key: &str,
    ) -> Result<Vec<StorageRecord>, FileStorageError> {
        let rows: Vec<StorageRecordRow> = sqlx::query_as::<Postgres, StorageRecordRow>(
            &format!(
                "{} WHERE owner_type = $1 AND owner_key = $2 ORDER BY created_at",
                SELECT_COLUMNS
            ),
        )
        .bind(owner_type)
        .bind(owner_key)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.to_storage_record()).collect())
    }
}
