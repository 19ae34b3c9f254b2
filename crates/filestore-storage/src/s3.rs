//! S3 adapter over `object_store`.
//!
//! Keys are the adapter-relative record paths unchanged; the bucket comes from
//! the adapter settings. Credentials are read from the usual AWS environment.

use crate::traits::{Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path as ObjectPath;
use object_store::Error as ObjectStoreError;
use object_store::{ObjectStoreExt, PutPayload};
use std::pin::Pin;
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncReadExt};

#[derive(Clone, Debug)]
pub struct S3Storage {
    store: AmazonS3,
    bucket: String,
}

impl S3Storage {
    /// Build the client for one bucket. `endpoint` selects an S3-compatible
    /// provider such as MinIO; plain `http://` endpoints are allowed.
    ///
    /// No request is made here, so an unreachable endpoint only fails on first use.
    pub async fn new(
        bucket: String,
        region: String,
        endpoint: Option<String>,
    ) -> StorageResult<Self> {
        let mut builder = AmazonS3Builder::from_env()
            .with_region(region)
            .with_bucket_name(bucket.clone());

        if let Some(endpoint) = endpoint {
            builder = builder
                .with_allow_http(endpoint.starts_with("http://"))
                .with_endpoint(endpoint);
        }

        let store = builder.build().map_err(|e| {
            StorageError::ConfigError(format!("Invalid S3 settings for bucket {}: {}", bucket, e))
        })?;

        Ok(S3Storage { store, bucket })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

/// Object location for a record path, rejecting keys the crate never produces.
fn object_location(storage_path: &str) -> StorageResult<ObjectPath> {
    if storage_path.is_empty() || storage_path.starts_with('/') || storage_path.contains("..") {
        return Err(StorageError::InvalidKey(format!(
            "Invalid storage path: {:?}",
            storage_path
        )));
    }

    ObjectPath::parse(storage_path)
        .map_err(|e| StorageError::InvalidKey(format!("{}: {}", storage_path, e)))
}

/// Translate an `object_store` failure into this crate's error kinds.
///
/// `wrap` picks the kind for anything that is not a missing object.
fn map_object_error(
    storage_path: &str,
    err: ObjectStoreError,
    wrap: fn(String) -> StorageError,
) -> StorageError {
    match err {
        ObjectStoreError::NotFound { .. } => StorageError::NotFound(storage_path.to_string()),
        other => wrap(other.to_string()),
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn put(&self, storage_path: &str, data: Vec<u8>) -> StorageResult<()> {
        let location = object_location(storage_path)?;
        let size = data.len();
        let start = Instant::now();

        self.store
            .put(&location, PutPayload::from(Bytes::from(data)))
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %storage_path,
                    "S3 put failed"
                );
                map_object_error(storage_path, e, StorageError::UploadFailed)
            })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %storage_path,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 put successful"
        );

        Ok(())
    }

    async fn put_stream(
        &self,
        storage_path: &str,
        mut reader: Pin<Box<dyn AsyncRead + Send + Unpin>>,
    ) -> StorageResult<u64> {
        // Validate before draining the reader.
        object_location(storage_path)?;

        let mut buffer = Vec::new();
        let size = reader.read_to_end(&mut buffer).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to read upload for {}: {}", storage_path, e))
        })?;

        self.put(storage_path, buffer).await?;
        Ok(size as u64)
    }

    async fn get(&self, storage_path: &str) -> StorageResult<Vec<u8>> {
        let location = object_location(storage_path)?;

        let object = self
            .store
            .get(&location)
            .await
            .map_err(|e| map_object_error(storage_path, e, StorageError::DownloadFailed))?;

        let bytes = object
            .bytes()
            .await
            .map_err(|e| map_object_error(storage_path, e, StorageError::DownloadFailed))?;

        Ok(bytes.to_vec())
    }

    async fn delete(&self, storage_path: &str) -> StorageResult<()> {
        let location = object_location(storage_path)?;
        let start = Instant::now();

        match self.store.delete(&location).await {
            Ok(()) => {}
            // Deleting a missing object succeeds, as for every adapter.
            Err(ObjectStoreError::NotFound { .. }) => return Ok(()),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %storage_path,
                    "S3 delete failed"
                );
                return Err(StorageError::DeleteFailed(e.to_string()));
            }
        }

        tracing::info!(
            bucket = %self.bucket,
            key = %storage_path,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 delete successful"
        );

        Ok(())
    }

    async fn exists(&self, storage_path: &str) -> StorageResult<bool> {
        let location = object_location(storage_path)?;

        match self.store.head(&location).await {
            Ok(_) => Ok(true),
            Err(e) => match map_object_error(storage_path, e, StorageError::BackendError) {
                StorageError::NotFound(_) => Ok(false),
                other => Err(other),
            },
        }
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}
