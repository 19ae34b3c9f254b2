#[cfg(feature = "storage-local")]
use crate::LocalStorage;
#[cfg(feature = "storage-s3")]
use crate::S3Storage;
use crate::{Storage, StorageError, StorageResult};
use filestore_core::AdapterSettings;
use std::sync::Arc;

/// Create a storage backend from one adapter's settings
pub async fn create_storage(settings: &AdapterSettings) -> StorageResult<Arc<dyn Storage>> {
    match settings {
        #[cfg(feature = "storage-s3")]
        AdapterSettings::S3 {
            bucket,
            region,
            endpoint,
        } => {
            if bucket.is_empty() {
                return Err(StorageError::ConfigError(
                    "S3 bucket not configured".to_string(),
                ));
            }
            let storage = S3Storage::new(bucket.clone(), region.clone(), endpoint.clone()).await?;
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-s3"))]
        AdapterSettings::S3 { .. } => Err(StorageError::ConfigError(
            "S3 storage backend not available (storage-s3 feature not enabled)".to_string(),
        )),

        #[cfg(feature = "storage-local")]
        AdapterSettings::Local { base_path } => {
            let storage = LocalStorage::new(base_path.clone()).await?;
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-local"))]
        AdapterSettings::Local { .. } => Err(StorageError::ConfigError(
            "Local storage backend not available (storage-local feature not enabled)".to_string(),
        )),
    }
}
