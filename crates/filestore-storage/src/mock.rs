//! In-memory storage backend for tests.
//!
//! Records every delete it is asked to perform and can be told to fail
//! deletes, so lifecycle tests can observe and break the physical side.

use crate::traits::{Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tokio::io::{AsyncRead, AsyncReadExt};

#[derive(Debug, Default)]
pub struct MockStorage {
    files: Mutex<HashMap<String, Vec<u8>>>,
    deleted: Mutex<Vec<String>>,
    fail_deletes: AtomicBool,
}

impl MockStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent delete call fail.
    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Paths passed to `delete`, in call order (including failed calls).
    pub fn deleted_paths(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.lock().unwrap().contains_key(path)
    }
}

#[async_trait]
impl Storage for MockStorage {
    async fn put(&self, path: &str, data: Vec<u8>) -> StorageResult<()> {
        self.files.lock().unwrap().insert(path.to_string(), data);
        Ok(())
    }

    async fn put_stream(
        &self,
        path: &str,
        mut reader: Pin<Box<dyn AsyncRead + Send + Unpin>>,
    ) -> StorageResult<u64> {
        let mut buffer = Vec::new();
        reader.read_to_end(&mut buffer).await?;
        let size = buffer.len() as u64;
        self.put(path, buffer).await?;
        Ok(size)
    }

    async fn get(&self, path: &str) -> StorageResult<Vec<u8>> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    async fn delete(&self, path: &str) -> StorageResult<()> {
        self.deleted.lock().unwrap().push(path.to_string());

        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(StorageError::DeleteFailed(format!(
                "simulated failure deleting {}",
                path
            )));
        }

        self.files.lock().unwrap().remove(path);
        Ok(())
    }

    async fn exists(&self, path: &str) -> StorageResult<bool> {
        Ok(self.contains(path))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}
