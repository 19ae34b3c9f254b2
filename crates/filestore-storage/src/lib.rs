//! Filestore Storage Library
//!
//! This crate provides the storage adapter abstraction and its implementations
//! for Filestore, plus the registry that resolves adapter names to live
//! backends.
//!
//! # Storage path format
//!
//! Paths are adapter-relative and always use `/` as separator. Record paths are
//! derived by [`keys::derive_path`]:
//!
//! - `{bucket}/{s1}/{s2}/{s3}/{token}/` with the id folder
//! - `{bucket}/{s1}/{s2}/{s3}/` without it
//!
//! Paths must not contain `..` or a leading `/`.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(any(test, feature = "test-helpers"))]
pub mod mock;
pub mod registry;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use filestore_core::StorageBackend;
pub use keys::{derive_path, strip_id};
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(any(test, feature = "test-helpers"))]
pub use mock::MockStorage;
pub use registry::{AdapterHandle, AdapterRegistry};
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{Storage, StorageError, StorageResult};
