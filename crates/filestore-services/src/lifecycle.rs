//! Record lifecycle: derivation, validation and notification around every save
//! and delete of a [`StorageRecord`].
//!
//! A save runs `prepare_save` (derive fields, validate, publish `beforeSave`),
//! hands the record to the repository and then runs `finalize_save` (publish
//! `afterSave`, clean up a replaced record). A delete snapshots the record with
//! `prepare_delete`, removes the metadata row and then runs `finalize_delete`
//! (delete the bytes, publish `afterDelete`).
//!
//! The metadata row is removed before the bytes. When the adapter then fails to
//! delete, the error carries the adapter name and path of the orphaned file;
//! [`FileStorageService::delete_orphan`] retries that removal.

use filestore_core::constants::DEFAULT_ADAPTER;
use filestore_core::{
    Config, ErrorMetadata, FileStorageError, FileStorageResult, LogLevel, StorageRecord,
    UploadFacts,
};
use filestore_db::StorageRecordRepository;
use filestore_storage::{AdapterHandle, AdapterRegistry};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::events::{EventBus, LifecycleEvent};
use crate::upload::{file_extension, inspect_upload};

/// Result of [`FileStorageService::prepare_save`].
#[derive(Debug, Clone)]
pub enum SavePreparation {
    /// The record passed validation and no subscriber vetoed it.
    Ready {
        record: StorageRecord,
        adapter: AdapterHandle,
    },
    /// A `beforeSave` subscriber cancelled the save.
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct SaveReport {
    pub record: StorageRecord,
    pub created: bool,
    /// Whether a superseded record was deleted after this save.
    pub replaced: bool,
}

#[derive(Debug, Clone)]
pub enum SaveOutcome {
    Saved(SaveReport),
    Cancelled,
}

impl SaveOutcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SaveOutcome::Cancelled)
    }

    pub fn report(&self) -> Option<&SaveReport> {
        match self {
            SaveOutcome::Saved(report) => Some(report),
            SaveOutcome::Cancelled => None,
        }
    }
}

/// Lifecycle controller for storage records.
///
/// Clones share the repository, adapter cache and subscribers.
#[derive(Clone)]
pub struct FileStorageService {
    repository: Arc<dyn StorageRecordRepository>,
    adapters: AdapterRegistry,
    events: EventBus,
    table_name: String,
    tmp_dir: PathBuf,
}

impl FileStorageService {
    pub fn new(
        repository: Arc<dyn StorageRecordRepository>,
        adapters: AdapterRegistry,
        events: EventBus,
    ) -> Self {
        let defaults = Config::default();
        Self {
            repository,
            adapters,
            events,
            table_name: defaults.table_name,
            tmp_dir: defaults.tmp_dir,
        }
    }

    /// Build a service with the adapters, collection name and temp root of `config`.
    pub fn from_config(config: &Config, repository: Arc<dyn StorageRecordRepository>) -> Self {
        Self {
            repository,
            adapters: AdapterRegistry::from_config(config),
            events: EventBus::new(),
            table_name: config.table_name.clone(),
            tmp_dir: config.tmp_dir.clone(),
        }
    }

    pub fn with_table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = table_name.into();
        self
    }

    pub fn with_tmp_dir(mut self, tmp_dir: impl Into<PathBuf>) -> Self {
        self.tmp_dir = tmp_dir.into();
        self
    }

    pub fn adapters(&self) -> &AdapterRegistry {
        &self.adapters
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Owner type given to records saved without one.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn tmp_dir(&self) -> &Path {
        &self.tmp_dir
    }

    /// Derive the upload facts and defaults of a record about to be written,
    /// validate it and let `beforeSave` subscribers veto it.
    pub async fn prepare_save(
        &self,
        mut candidate: StorageRecord,
        upload: &UploadFacts,
    ) -> FileStorageResult<SavePreparation> {
        if let Some(temp_path) = upload
            .temp_path
            .as_deref()
            .filter(|path| !path.as_os_str().is_empty())
        {
            let inspection = inspect_upload(temp_path, upload.original_name.as_deref()).await?;
            candidate.filesize = inspection.filesize;
            candidate.mime_type = inspection.mime_type;
        }

        if let Some(name) = upload.original_name.as_deref().filter(|n| !n.is_empty()) {
            candidate.extension = file_extension(name);
            candidate.filename = name.to_string();
        }

        if candidate.owner_type.trim().is_empty() {
            candidate.owner_type = self.table_name.clone();
        }

        if candidate.adapter.trim().is_empty() {
            candidate.adapter = DEFAULT_ADAPTER.to_string();
            candidate.adapter_config = DEFAULT_ADAPTER.to_string();
        } else if candidate.adapter_config.trim().is_empty() {
            candidate.adapter_config = candidate.adapter.clone();
        }

        candidate.validate()?;

        let adapter = self.adapters.resolve(&candidate.adapter, false).await?;

        let event = LifecycleEvent::BeforeSave {
            record: candidate.clone(),
            adapter: adapter.clone(),
        };
        if self.events.publish(&event).await {
            tracing::info!(
                record_id = %candidate.id,
                owner_type = %candidate.owner_type,
                adapter = %adapter.name(),
                "Save cancelled by beforeSave subscriber"
            );
            return Ok(SavePreparation::Cancelled);
        }

        Ok(SavePreparation::Ready {
            record: candidate,
            adapter,
        })
    }

    /// Announce a persisted record and remove the record it replaces, if any.
    ///
    /// Runs only after the repository confirmed the write; nothing here rolls
    /// the save back.
    pub async fn finalize_save(
        &self,
        persisted_id: Uuid,
        created: bool,
        mut record: StorageRecord,
        adapter: AdapterHandle,
        replaces_id: Option<Uuid>,
    ) -> SaveReport {
        if created {
            record.id = persisted_id;
        }

        let event = LifecycleEvent::AfterSave {
            created,
            record: record.clone(),
            adapter,
        };
        if self.events.publish(&event).await {
            tracing::debug!(
                record_id = %record.id,
                "afterSave cancellation ignored, record is already persisted"
            );
        }

        let replaced = self.cleanup_if_replacing(&record, replaces_id).await;

        SaveReport {
            record,
            created,
            replaced,
        }
    }

    /// Save a new record.
    ///
    /// `replaces_id` names a record this one supersedes; it is deleted once the
    /// new record is written.
    #[tracing::instrument(skip(self, record, upload), fields(record_id = %record.id))]
    pub async fn create(
        &self,
        record: StorageRecord,
        upload: &UploadFacts,
        replaces_id: Option<Uuid>,
    ) -> FileStorageResult<SaveOutcome> {
        let start = Instant::now();

        let (record, adapter) = match self.prepare_save(record, upload).await? {
            SavePreparation::Ready { record, adapter } => (record, adapter),
            SavePreparation::Cancelled => return Ok(SaveOutcome::Cancelled),
        };

        let id = self.repository.create(&record).await?;
        let report = self
            .finalize_save(id, true, record, adapter, replaces_id)
            .await;

        tracing::info!(
            record_id = %report.record.id,
            adapter = %report.record.adapter,
            path = %report.record.path,
            filesize = report.record.filesize,
            replaced = report.replaced,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "File storage record created"
        );

        Ok(SaveOutcome::Saved(report))
    }

    /// Save changes to an existing record. Fails with `RecordNotFound` when the
    /// repository has no row with the record's id.
    #[tracing::instrument(skip(self, record, upload), fields(record_id = %record.id))]
    pub async fn update(
        &self,
        record: StorageRecord,
        upload: &UploadFacts,
        replaces_id: Option<Uuid>,
    ) -> FileStorageResult<SaveOutcome> {
        let start = Instant::now();

        let (record, adapter) = match self.prepare_save(record, upload).await? {
            SavePreparation::Ready { record, adapter } => (record, adapter),
            SavePreparation::Cancelled => return Ok(SaveOutcome::Cancelled),
        };

        if !self.repository.update(&record).await? {
            return Err(FileStorageError::RecordNotFound(record.id));
        }

        let id = record.id;
        let report = self
            .finalize_save(id, false, record, adapter, replaces_id)
            .await;

        tracing::info!(
            record_id = %id,
            replaced = report.replaced,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "File storage record updated"
        );

        Ok(SaveOutcome::Saved(report))
    }

    /// Snapshot a record before its metadata is removed.
    pub async fn prepare_delete(&self, id: Uuid) -> FileStorageResult<StorageRecord> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or(FileStorageError::RecordNotFound(id))
    }

    /// Delete the bytes of a record whose metadata is already gone, then
    /// publish `afterDelete`.
    ///
    /// No event is published when the bytes could not be deleted.
    pub async fn finalize_delete(&self, snapshot: &StorageRecord) -> FileStorageResult<()> {
        let adapter = match self.adapters.resolve(&snapshot.adapter, false).await {
            Ok(adapter) => adapter,
            Err(e) => {
                tracing::error!(
                    record_id = %snapshot.id,
                    adapter = %snapshot.adapter,
                    path = %snapshot.path,
                    error = %e,
                    "Cannot resolve adapter of deleted record, file left in place"
                );
                return Err(e);
            }
        };

        self.delete_bytes(&adapter, &snapshot.path).await.map_err(|e| {
            tracing::error!(
                record_id = %snapshot.id,
                adapter = %snapshot.adapter,
                path = %snapshot.path,
                error = %e,
                "Failed to delete file of deleted record, metadata already removed"
            );
            e
        })?;

        self.events
            .publish(&LifecycleEvent::AfterDelete {
                record: snapshot.clone(),
                adapter,
            })
            .await;

        Ok(())
    }

    /// Delete a record: metadata first, then the bytes it points at.
    #[tracing::instrument(skip(self), fields(record_id = %id))]
    pub async fn delete(&self, id: Uuid) -> FileStorageResult<()> {
        let start = Instant::now();

        let snapshot = self.prepare_delete(id).await?;

        if !self.repository.delete_by_id(id).await? {
            // Removed by someone else between the snapshot and now.
            return Err(FileStorageError::RecordNotFound(id));
        }

        self.finalize_delete(&snapshot).await?;

        tracing::info!(
            record_id = %id,
            adapter = %snapshot.adapter,
            path = %snapshot.path,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "File storage record deleted"
        );

        Ok(())
    }

    /// Remove bytes left behind by a delete that failed with `PhysicalDelete`.
    #[tracing::instrument(skip(self))]
    pub async fn delete_orphan(&self, adapter: &str, path: &str) -> FileStorageResult<()> {
        let handle = self.adapters.resolve(adapter, false).await?;
        self.delete_bytes(&handle, path).await?;

        tracing::info!(adapter = %adapter, path = %path, "Orphaned file removed");
        Ok(())
    }

    async fn delete_bytes(&self, adapter: &AdapterHandle, path: &str) -> FileStorageResult<()> {
        adapter
            .delete(path)
            .await
            .map_err(|e| FileStorageError::PhysicalDelete {
                adapter: adapter.name().to_string(),
                path: path.to_string(),
                source: anyhow::Error::new(e),
            })
    }
}

/// Log an error at the level its kind asks for.
pub(crate) fn log_error(operation: &str, err: &FileStorageError) {
    match err.log_level() {
        LogLevel::Debug => tracing::debug!(
            operation,
            error_code = err.error_code(),
            error = %err,
            "File storage operation failed"
        ),
        LogLevel::Warn => tracing::warn!(
            operation,
            error_code = err.error_code(),
            error = %err,
            "File storage operation failed"
        ),
        LogLevel::Error => tracing::error!(
            operation,
            error_code = err.error_code(),
            error = %err.detailed_message(),
            "File storage operation failed"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventOutcome, EventSubscriber, BEFORE_SAVE};
    use async_trait::async_trait;
    use filestore_db::InMemoryStorageRecordRepository;
    use filestore_storage::{MockStorage, Storage};

    struct Veto;

    #[async_trait]
    impl EventSubscriber for Veto {
        async fn handle(&self, _event: &LifecycleEvent) -> EventOutcome {
            EventOutcome::Cancel
        }
    }

    async fn service() -> (FileStorageService, InMemoryStorageRecordRepository) {
        let repository = InMemoryStorageRecordRepository::new();
        let adapters = AdapterRegistry::new();
        adapters
            .insert(DEFAULT_ADAPTER, Arc::new(MockStorage::new()) as Arc<dyn Storage>)
            .await;
        adapters
            .insert("Archive", Arc::new(MockStorage::new()) as Arc<dyn Storage>)
            .await;
        let service = FileStorageService::new(Arc::new(repository.clone()), adapters, EventBus::new())
            .with_table_name("documents");
        (service, repository)
    }

    fn candidate() -> StorageRecord {
        StorageRecord::new("", "7").with_path("documents/aa/bb/cc/token/file.txt")
    }

    #[tokio::test]
    async fn test_prepare_save_applies_defaults() {
        let (service, _) = service().await;

        let prepared = service
            .prepare_save(candidate(), &UploadFacts::none())
            .await
            .unwrap();
        let SavePreparation::Ready { record, adapter } = prepared else {
            panic!("save was cancelled");
        };

        assert_eq!(record.adapter, "Local");
        assert_eq!(record.adapter_config, "Local");
        assert_eq!(record.owner_type, "documents");
        assert_eq!(adapter.name(), "Local");
    }

    #[tokio::test]
    async fn test_prepare_save_copies_adapter_into_empty_config() {
        let (service, _) = service().await;

        let prepared = service
            .prepare_save(candidate().with_adapter("Archive"), &UploadFacts::none())
            .await
            .unwrap();
        let SavePreparation::Ready { record, .. } = prepared else {
            panic!("save was cancelled");
        };
        assert_eq!(record.adapter_config, "Archive");
    }

    #[tokio::test]
    async fn test_prepare_save_sets_filename_and_extension() {
        let (service, _) = service().await;
        let upload = UploadFacts {
            temp_path: None,
            original_name: Some("photo.PNG".to_string()),
        };

        let SavePreparation::Ready { record, .. } =
            service.prepare_save(candidate(), &upload).await.unwrap()
        else {
            panic!("save was cancelled");
        };
        assert_eq!(record.filename, "photo.PNG");
        assert_eq!(record.extension, "PNG");
    }

    #[tokio::test]
    async fn test_validation_runs_before_events() {
        let (service, _) = service().await;
        service.events().subscribe(BEFORE_SAVE, Arc::new(Veto)).await;

        let result = service
            .prepare_save(StorageRecord::new("users", "7"), &UploadFacts::none())
            .await;
        assert!(matches!(result, Err(FileStorageError::Validation(msg)) if msg.contains("path")));
    }

    #[tokio::test]
    async fn test_unknown_adapter_fails_save() {
        let (service, repository) = service().await;

        let result = service
            .create(candidate().with_adapter("Ftp"), &UploadFacts::none(), None)
            .await;
        assert!(matches!(result, Err(FileStorageError::AdapterNotConfigured(_))));
        assert_eq!(repository.create_calls(), 0);
    }

    #[tokio::test]
    async fn test_update_missing_record_is_not_found() {
        let (service, _) = service().await;
        let record = candidate();
        let id = record.id;

        let result = service.update(record, &UploadFacts::none(), None).await;
        assert!(matches!(result, Err(FileStorageError::RecordNotFound(missing)) if missing == id));
    }

    #[tokio::test]
    async fn test_update_reports_not_created() {
        let (service, _) = service().await;
        let outcome = service
            .create(candidate(), &UploadFacts::none(), None)
            .await
            .unwrap();
        let mut record = outcome.report().unwrap().record.clone();
        record.filename = "renamed.txt".to_string();

        let outcome = service
            .update(record, &UploadFacts::none(), None)
            .await
            .unwrap();
        let report = outcome.report().unwrap();
        assert!(!report.created);
        assert!(!report.replaced);
        assert_eq!(report.record.filename, "renamed.txt");
    }

    #[tokio::test]
    async fn test_delete_orphan_retries_removal() {
        let (service, _) = service().await;
        let storage = Arc::new(MockStorage::new());
        storage.put("orphan/file.bin", vec![1, 2, 3]).await.unwrap();
        service
            .adapters()
            .insert("Orphans", storage.clone() as Arc<dyn Storage>)
            .await;

        service
            .delete_orphan("Orphans", "orphan/file.bin")
            .await
            .unwrap();
        assert!(!storage.contains("orphan/file.bin"));

        storage.fail_deletes(true);
        let err = service
            .delete_orphan("Orphans", "orphan/other.bin")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FileStorageError::PhysicalDelete { ref adapter, ref path, .. }
                if adapter == "Orphans" && path == "orphan/other.bin"
        ));
    }
}
