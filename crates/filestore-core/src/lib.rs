//! Filestore Core Library
//!
//! This crate provides the domain model, error types and configuration shared by
//! every Filestore component: the `StorageRecord` metadata entity, the upload
//! facts a save is derived from, and the adapter settings used to build storage
//! backends.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::Config;
pub use error::{ErrorMetadata, FileStorageError, FileStorageResult, LogLevel};
pub use models::{StorageRecord, UploadFacts};
pub use storage_types::{AdapterSettings, StorageBackend};
