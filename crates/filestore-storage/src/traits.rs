//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage adapters must implement.

use crate::StorageBackend;
use async_trait::async_trait;
use std::path::Path;
use std::pin::Pin;
use thiserror::Error;
use tokio::io::AsyncRead;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage path: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for filestore_core::FileStorageError {
    fn from(err: StorageError) -> Self {
        filestore_core::FileStorageError::Storage(err.to_string())
    }
}

/// Storage adapter trait
///
/// All storage backends (S3, local filesystem) implement this trait so the
/// lifecycle controller can work with any of them without knowing which.
///
/// Paths are adapter-relative; see the crate root documentation.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Write `data` at `path`, replacing anything already there.
    async fn put(&self, path: &str, data: Vec<u8>) -> StorageResult<()>;

    /// Write the content of a reader at `path` (for large files).
    ///
    /// The reader is consumed until EOF. Returns the number of bytes written.
    async fn put_stream(
        &self,
        path: &str,
        reader: Pin<Box<dyn AsyncRead + Send + Unpin>>,
    ) -> StorageResult<u64>;

    /// Read the file stored at `path`.
    async fn get(&self, path: &str) -> StorageResult<Vec<u8>>;

    /// Delete the file stored at `path`. Deleting a missing file succeeds.
    async fn delete(&self, path: &str) -> StorageResult<()>;

    /// Check if a file exists
    async fn exists(&self, path: &str) -> StorageResult<bool>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;

    /// Copy a local file (typically an upload's temp file) to `path`.
    async fn put_file(&self, path: &str, source: &Path) -> StorageResult<u64> {
        let file = tokio::fs::File::open(source).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to open {}: {}", source.display(), e))
        })?;
        self.put_stream(path, Box::pin(file)).await
    }
}
