//! Process-local storage record repository.
//!
//! Useful for embedding without a database and for tests; it also counts writes
//! so callers can assert that a vetoed save never reached persistence.

use filestore_core::{FileStorageError, StorageRecord};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use super::storage_record::StorageRecordRepository;

#[derive(Clone, Default)]
pub struct InMemoryStorageRecordRepository {
    records: Arc<Mutex<HashMap<Uuid, StorageRecord>>>,
    creates: Arc<AtomicUsize>,
    updates: Arc<AtomicUsize>,
}

impl InMemoryStorageRecordRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `create` calls so far, successful or not.
    pub fn create_calls(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    /// Number of `update` calls so far, successful or not.
    pub fn update_calls(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.lock().map(|records| records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<Uuid, StorageRecord>>, FileStorageError> {
        self.records
            .lock()
            .map_err(|_| FileStorageError::Persistence("record map lock poisoned".to_string()))
    }
}

#[async_trait::async_trait]
impl StorageRecordRepository for InMemoryStorageRecordRepository {
    async fn create(&self, record: &StorageRecord) -> Result<Uuid, FileStorageError> {
        self.creates.fetch_add(1, Ordering::SeqCst);

        let mut records = self.lock()?;
        if records.contains_key(&record.id) {
            return Err(FileStorageError::Persistence(format!(
                "duplicate record id {}",
                record.id
            )));
        }
        records.insert(record.id, record.clone());

        Ok(record.id)
    }

    async fn update(&self, record: &StorageRecord) -> Result<bool, FileStorageError> {
        self.updates.fetch_add(1, Ordering::SeqCst);

        let mut records = self.lock()?;
        match records.get_mut(&record.id) {
            Some(existing) => {
                let created_at = existing.created_at;
                *existing = record.clone();
                existing.created_at = created_at;
                existing.updated_at = chrono::Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<StorageRecord>, FileStorageError> {
        Ok(self.lock()?.get(&id).cloned())
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<bool, FileStorageError> {
        Ok(self.lock()?.remove(&id).is_some())
    }

    async fn find_by_owner(
        &self,
        owner_type: &str,
        owner_key: &str,
    ) -> Result<Vec<StorageRecord>, FileStorageError> {
        let mut found: Vec<StorageRecord> = self
            .lock()?
            .values()
            .filter(|r| r.owner_type == owner_type && r.owner_key == owner_key)
            .cloned()
            .collect();
        found.sort_by_key(|r| r.created_at);
        Ok(found)
    }
}
