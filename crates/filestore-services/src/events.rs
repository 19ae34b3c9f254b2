//! Lifecycle events and the bus that delivers them.
//!
//! Publishing is sequential: subscribers of an event name run one after the
//! other, in subscription order, and `publish` returns once they are done. A
//! subscriber that answers [`EventOutcome::Cancel`] stops delivery to the
//! remaining subscribers and makes `publish` report the event as cancelled.
//! Side effects of subscribers that already ran are not undone.

use async_trait::async_trait;
use filestore_core::StorageRecord;
use filestore_storage::AdapterHandle;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Published before a record is written. Cancellable.
pub const BEFORE_SAVE: &str = "FileStorage.beforeSave";
/// Published after a record was written.
pub const AFTER_SAVE: &str = "FileStorage.afterSave";
/// Published after a record and its bytes were deleted.
pub const AFTER_DELETE: &str = "FileStorage.afterDelete";

#[derive(Debug, Clone)]
pub enum LifecycleEvent {
    BeforeSave {
        record: StorageRecord,
        adapter: AdapterHandle,
    },
    AfterSave {
        created: bool,
        record: StorageRecord,
        adapter: AdapterHandle,
    },
    AfterDelete {
        record: StorageRecord,
        adapter: AdapterHandle,
    },
}

impl LifecycleEvent {
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleEvent::BeforeSave { .. } => BEFORE_SAVE,
            LifecycleEvent::AfterSave { .. } => AFTER_SAVE,
            LifecycleEvent::AfterDelete { .. } => AFTER_DELETE,
        }
    }

    pub fn record(&self) -> &StorageRecord {
        match self {
            LifecycleEvent::BeforeSave { record, .. }
            | LifecycleEvent::AfterSave { record, .. }
            | LifecycleEvent::AfterDelete { record, .. } => record,
        }
    }

    pub fn adapter(&self) -> &AdapterHandle {
        match self {
            LifecycleEvent::BeforeSave { adapter, .. }
            | LifecycleEvent::AfterSave { adapter, .. }
            | LifecycleEvent::AfterDelete { adapter, .. } => adapter,
        }
    }

    /// Only a cancelled `beforeSave` changes what the service does.
    pub fn is_cancellable(&self) -> bool {
        matches!(self, LifecycleEvent::BeforeSave { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    Continue,
    Cancel,
}

#[async_trait]
pub trait EventSubscriber: Send + Sync {
    async fn handle(&self, event: &LifecycleEvent) -> EventOutcome;
}

/// Delivers lifecycle events to subscribers registered by event name.
///
/// Clones share the same subscriber lists.
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Arc<RwLock<HashMap<&'static str, Vec<Arc<dyn EventSubscriber>>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to one event name (`BEFORE_SAVE`, `AFTER_SAVE` or `AFTER_DELETE`).
    pub async fn subscribe(&self, name: &'static str, subscriber: Arc<dyn EventSubscriber>) {
        self.subscribers
            .write()
            .await
            .entry(name)
            .or_default()
            .push(subscriber);
    }

    /// Subscribe to every lifecycle event.
    pub async fn subscribe_all(&self, subscriber: Arc<dyn EventSubscriber>) {
        for name in [BEFORE_SAVE, AFTER_SAVE, AFTER_DELETE] {
            self.subscribe(name, subscriber.clone()).await;
        }
    }

    pub async fn subscriber_count(&self, name: &str) -> usize {
        self.subscribers
            .read()
            .await
            .get(name)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Deliver an event. Returns true when a subscriber cancelled it.
    pub async fn publish(&self, event: &LifecycleEvent) -> bool {
        // Snapshot so subscribers may subscribe others while handling.
        let subscribers = self
            .subscribers
            .read()
            .await
            .get(event.name())
            .cloned()
            .unwrap_or_default();

        for (position, subscriber) in subscribers.iter().enumerate() {
            if subscriber.handle(event).await == EventOutcome::Cancel {
                tracing::debug!(
                    event = event.name(),
                    record_id = %event.record().id,
                    position,
                    skipped = subscribers.len() - position - 1,
                    "Lifecycle event cancelled by subscriber"
                );
                return true;
            }
        }

        false
    }
}

/// Logs every event it receives. Never cancels.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingSubscriber;

#[async_trait]
impl EventSubscriber for LoggingSubscriber {
    async fn handle(&self, event: &LifecycleEvent) -> EventOutcome {
        let record = event.record();
        match event {
            LifecycleEvent::AfterSave { created, .. } => tracing::info!(
                event = event.name(),
                record_id = %record.id,
                owner_type = %record.owner_type,
                owner_key = %record.owner_key,
                adapter = %event.adapter().name(),
                path = %record.path,
                created,
                "File storage event"
            ),
            _ => tracing::info!(
                event = event.name(),
                record_id = %record.id,
                owner_type = %record.owner_type,
                owner_key = %record.owner_key,
                adapter = %event.adapter().name(),
                path = %record.path,
                "File storage event"
            ),
        }
        EventOutcome::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filestore_storage::MockStorage;
    use std::sync::Mutex;

    struct Recorder {
        label: &'static str,
        log: Arc<Mutex<Vec<String>>>,
        outcome: EventOutcome,
    }

    #[async_trait]
    impl EventSubscriber for Recorder {
        async fn handle(&self, event: &LifecycleEvent) -> EventOutcome {
            self.log
                .lock()
                .unwrap()
                .push(format!("{}:{}", self.label, event.name()));
            self.outcome
        }
    }

    fn before_save() -> LifecycleEvent {
        LifecycleEvent::BeforeSave {
            record: StorageRecord::new("users", "1"),
            adapter: AdapterHandle::new("Memory", Arc::new(MockStorage::new())),
        }
    }

    fn recorder(
        label: &'static str,
        log: &Arc<Mutex<Vec<String>>>,
        outcome: EventOutcome,
    ) -> Arc<dyn EventSubscriber> {
        Arc::new(Recorder {
            label,
            log: log.clone(),
            outcome,
        })
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_not_cancelled() {
        let bus = EventBus::new();
        assert!(!bus.publish(&before_save()).await);
    }

    #[tokio::test]
    async fn test_subscribers_run_in_subscription_order() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        bus.subscribe(BEFORE_SAVE, recorder("first", &log, EventOutcome::Continue))
            .await;
        bus.subscribe(BEFORE_SAVE, recorder("second", &log, EventOutcome::Continue))
            .await;

        assert!(!bus.publish(&before_save()).await);
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "first:FileStorage.beforeSave".to_string(),
                "second:FileStorage.beforeSave".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_cancel_stops_remaining_subscribers() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        bus.subscribe(BEFORE_SAVE, recorder("first", &log, EventOutcome::Continue))
            .await;
        bus.subscribe(BEFORE_SAVE, recorder("veto", &log, EventOutcome::Cancel))
            .await;
        bus.subscribe(BEFORE_SAVE, recorder("late", &log, EventOutcome::Continue))
            .await;

        assert!(bus.publish(&before_save()).await);
        let log = log.lock().unwrap();
        assert_eq!(log.len(), 2);
        assert!(log[1].starts_with("veto"));
    }

    #[tokio::test]
    async fn test_subscribers_only_see_their_event_name() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        bus.subscribe(AFTER_DELETE, recorder("deletes", &log, EventOutcome::Cancel))
            .await;

        assert!(!bus.publish(&before_save()).await);
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_subscribe_all_registers_each_event() {
        let bus = EventBus::new();
        bus.subscribe_all(Arc::new(LoggingSubscriber)).await;

        for name in [BEFORE_SAVE, AFTER_SAVE, AFTER_DELETE] {
            assert_eq!(bus.subscriber_count(name).await, 1);
        }
        assert!(!bus.publish(&before_save()).await);
    }

    #[test]
    fn test_only_before_save_is_cancellable() {
        let event = before_save();
        assert!(event.is_cancellable());

        let after = LifecycleEvent::AfterDelete {
            record: event.record().clone(),
            adapter: event.adapter().clone(),
        };
        assert!(!after.is_cancellable());
        assert_eq!(after.name(), AFTER_DELETE);
    }
}
