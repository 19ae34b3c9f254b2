//! Filestore Services Library
//!
//! The record lifecycle: [`FileStorageService`] derives and validates record
//! fields on save, publishes lifecycle events through the [`EventBus`], removes
//! superseded records after a replacement and deletes adapter-held bytes after
//! the metadata is gone.
//!
//! Cross-cutting behaviour (virus scanning, thumbnails, audit trails) plugs in by
//! subscribing to the events in [`events`] rather than by changing the service.

pub mod events;
pub mod lifecycle;
pub mod replacement;
pub mod tmp;
pub mod upload;

// Re-export commonly used types
pub use events::{
    EventBus, EventOutcome, EventSubscriber, LifecycleEvent, LoggingSubscriber, AFTER_DELETE,
    AFTER_SAVE, BEFORE_SAVE,
};
pub use lifecycle::{FileStorageService, SaveOutcome, SavePreparation, SaveReport};
pub use tmp::tmp_file;
pub use upload::{file_extension, inspect_upload, UploadInspection};
