use crate::traits::{Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use tokio::fs;
use tokio::io::{AsyncRead, AsyncWriteExt};

/// Local filesystem storage implementation
#[derive(Clone, Debug)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage instance rooted at `base_path`
    /// (e.g., "/var/lib/filestore"). The directory is created if missing.
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Map a storage path onto the filesystem, refusing anything that would
    /// land outside the base directory.
    ///
    /// The deepest entry of the target path that already exists is resolved
    /// (symlinks included) and must stay below the canonical base, so a write
    /// through a symlinked directory cannot escape it either.
    fn key_to_path(&self, storage_path: &str) -> StorageResult<PathBuf> {
        if storage_path.is_empty() {
            return Err(StorageError::InvalidKey("Storage path is empty".to_string()));
        }

        if storage_path.contains("..") || storage_path.starts_with('/') {
            return Err(StorageError::InvalidKey(
                "Storage path contains invalid characters".to_string(),
            ));
        }

        let path = self.base_path.join(storage_path);

        let base_canonical = self.base_path.canonicalize().map_err(|e| {
            StorageError::ConfigError(format!("Failed to canonicalize base path: {}", e))
        })?;

        // symlink_metadata so a dangling link counts as existing and fails to resolve.
        let deepest_existing = path
            .ancestors()
            .find(|ancestor| std::fs::symlink_metadata(ancestor).is_ok())
            .unwrap_or(self.base_path.as_path());

        let resolved = deepest_existing.canonicalize().map_err(|_| {
            StorageError::InvalidKey(format!("Storage path cannot be resolved: {}", storage_path))
        })?;

        if !resolved.starts_with(&base_canonical) {
            return Err(StorageError::InvalidKey(
                "Storage path resolves outside storage directory".to_string(),
            ));
        }

        Ok(path)
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn put(&self, storage_path: &str, data: Vec<u8>) -> StorageResult<()> {
        let path = self.key_to_path(storage_path)?;
        let size = data.len();

        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();

        let mut file = fs::File::create(&path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        file.write_all(&data).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to write file {}: {}", path.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            key = %storage_path,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage put successful"
        );

        Ok(())
    }

    async fn put_stream(
        &self,
        storage_path: &str,
        mut reader: Pin<Box<dyn AsyncRead + Send + Unpin>>,
    ) -> StorageResult<u64> {
        let path = self.key_to_path(storage_path)?;
        let start = std::time::Instant::now();

        self.ensure_parent_dir(&path).await?;

        let mut file = fs::File::create(&path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        let bytes_copied = tokio::io::copy(&mut reader, &mut file).await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to write stream to file {}: {}",
                path.display(),
                e
            ))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            key = %storage_path,
            size_bytes = bytes_copied,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage stream put successful"
        );

        Ok(bytes_copied)
    }

    async fn get(&self, storage_path: &str) -> StorageResult<Vec<u8>> {
        let path = self.key_to_path(storage_path)?;

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(storage_path.to_string()));
        }

        fs::read(&path).await.map_err(|e| {
            StorageError::DownloadFailed(format!("Failed to read file {}: {}", path.display(), e))
        })
    }

    async fn delete(&self, storage_path: &str) -> StorageResult<()> {
        let path = self.key_to_path(storage_path)?;
        let start = std::time::Instant::now();

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(());
        }

        fs::remove_file(&path).await.map_err(|e| {
            StorageError::DeleteFailed(format!("Failed to delete file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            key = %storage_path,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage delete successful"
        );

        Ok(())
    }

    async fn exists(&self, storage_path: &str) -> StorageResult<bool> {
        let path = self.key_to_path(storage_path)?;
        Ok(fs::try_exists(&path).await.unwrap_or(false))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

#[cfg(all(test, feature = "storage-local"))]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_local_storage_put_get() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        let data = b"test data".to_vec();
        storage
            .put("images/14/7e/b9/token/test.txt", data.clone())
            .await
            .unwrap();

        let read_back = storage.get("images/14/7e/b9/token/test.txt").await.unwrap();
        assert_eq!(data, read_back);
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        let result = storage.get("../../../etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage.delete("../etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage.exists("/etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_write_through_symlinked_dir_rejected() {
        let dir = tempdir().unwrap();
        let outside = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path().join("store")).await.unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("store/link")).unwrap();

        let result = storage.put("link/escaped.txt", b"x".to_vec()).await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
        assert!(!outside.path().join("escaped.txt").exists());

        let result = storage.put("link/nested/escaped.txt", b"x".to_vec()).await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
        assert!(!outside.path().join("nested").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_dangling_symlink_target_rejected() {
        let dir = tempdir().unwrap();
        let outside = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path().join("store")).await.unwrap();
        let target = outside.path().join("created-later.txt");
        std::os::unix::fs::symlink(&target, dir.path().join("store/file.txt")).unwrap();

        let result = storage.put("file.txt", b"x".to_vec()).await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn test_local_storage_delete_nonexistent() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        let result = storage.delete("nonexistent/file.txt").await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_local_storage_delete_removes_file() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        storage.put("docs/a.txt", b"a".to_vec()).await.unwrap();
        assert!(storage.exists("docs/a.txt").await.unwrap());

        storage.delete("docs/a.txt").await.unwrap();
        assert!(!storage.exists("docs/a.txt").await.unwrap());
        assert!(!dir.path().join("docs/a.txt").exists());
    }

    #[tokio::test]
    async fn test_local_storage_put_file_streams_source() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path().join("store")).await.unwrap();

        let source = dir.path().join("upload.tmp");
        std::fs::write(&source, b"stream test data").unwrap();

        let written = storage.put_file("uploads/stream.txt", &source).await.unwrap();
        assert_eq!(written, 16);

        let read_back = storage.get("uploads/stream.txt").await.unwrap();
        assert_eq!(read_back, b"stream test data");
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        let result = storage.get("missing.bin").await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }
}
