//! Test helpers: a lifecycle service wired to in-memory collaborators.
//!
//! Run from workspace root: `cargo test -p filestore-services`.

#![allow(dead_code)]

use async_trait::async_trait;
use filestore_core::StorageRecord;
use filestore_db::InMemoryStorageRecordRepository;
use filestore_services::{
    EventBus, EventOutcome, EventSubscriber, FileStorageService, LifecycleEvent,
};
use filestore_storage::{derive_path, AdapterRegistry, MockStorage, Storage};
use std::sync::{Arc, Mutex};

pub const OWNER_TYPE: &str = "users";

/// Service plus handles on every collaborator it was built with.
pub struct TestHarness {
    pub service: FileStorageService,
    pub repository: InMemoryStorageRecordRepository,
    pub storage: Arc<MockStorage>,
    pub recorder: Arc<RecordingSubscriber>,
}

pub async fn setup() -> TestHarness {
    let repository = InMemoryStorageRecordRepository::new();
    let storage = Arc::new(MockStorage::new());

    let adapters = AdapterRegistry::new();
    adapters
        .insert("Local", storage.clone() as Arc<dyn Storage>)
        .await;

    let events = EventBus::new();
    let recorder = Arc::new(RecordingSubscriber::default());
    events.subscribe_all(recorder.clone()).await;

    let service = FileStorageService::new(Arc::new(repository.clone()), adapters, events)
        .with_table_name(OWNER_TYPE);

    TestHarness {
        service,
        repository,
        storage,
        recorder,
    }
}

/// A record for owner `owner_key` with a derived path and no adapter set.
pub fn new_record(owner_key: &str, filename: &str) -> StorageRecord {
    let mut record = StorageRecord::new(OWNER_TYPE, owner_key);
    let folder = derive_path(OWNER_TYPE, &record.id.to_string(), true).unwrap();
    record.path = format!("{}{}", folder, filename);
    record
}

/// Remembers the name and record id of every event it sees.
#[derive(Default)]
pub struct RecordingSubscriber {
    seen: Mutex<Vec<(String, uuid::Uuid)>>,
}

impl RecordingSubscriber {
    pub fn names(&self) -> Vec<String> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn seen(&self) -> Vec<(String, uuid::Uuid)> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventSubscriber for RecordingSubscriber {
    async fn handle(&self, event: &LifecycleEvent) -> EventOutcome {
        self.seen
            .lock()
            .unwrap()
            .push((event.name().to_string(), event.record().id));
        EventOutcome::Continue
    }
}

/// Cancels every event it receives.
pub struct CancellingSubscriber;

#[async_trait]
impl EventSubscriber for CancellingSubscriber {
    async fn handle(&self, _event: &LifecycleEvent) -> EventOutcome {
        EventOutcome::Cancel
    }
}
