//! Error types module
//!
//! Every lifecycle operation reports failures through `FileStorageError`.
//! Cancellation of a save by an event subscriber is not an error and never
//! appears here; it is a regular outcome of the save call.
//!
//! The `Database` variant and `From<sqlx::Error>` are gated behind the `sqlx` feature.

use std::io;
use std::path::PathBuf;

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;
use uuid::Uuid;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Describes how an error should be reported by callers.
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "RECORD_NOT_FOUND")
    fn error_code(&self) -> &'static str;

    /// Whether retrying the operation may succeed
    fn is_recoverable(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum FileStorageError {
    /// A required record field is missing. Raised before any event fires.
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Failed to inspect upload {}: {source}", path.display())]
    UploadInspection {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Adapter not configured: {0}")]
    AdapterNotConfigured(String),

    #[error("Record not found: {0}")]
    RecordNotFound(Uuid),

    /// The adapter refused to delete the bytes. The metadata row is already gone
    /// when this is returned, so `adapter` and `path` identify the orphaned file.
    #[error("Failed to delete '{path}' from adapter '{adapter}': {source}")]
    PhysicalDelete {
        adapter: String,
        path: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Storage error: {0}")]
    Storage(String),

    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for lifecycle operations
pub type FileStorageResult<T> = Result<T, FileStorageError>;

#[cfg(feature = "sqlx")]
impl From<SqlxError> for FileStorageError {
    fn from(err: SqlxError) -> Self {
        FileStorageError::Database(err)
    }
}

impl From<anyhow::Error> for FileStorageError {
    fn from(err: anyhow::Error) -> Self {
        FileStorageError::Internal(format!("{:#}", err))
    }
}

impl FileStorageError {
    pub fn validation(message: impl Into<String>) -> Self {
        FileStorageError::Validation(message.into())
    }

    /// Get the error type name
    pub fn error_type(&self) -> &'static str {
        match self {
            FileStorageError::Validation(_) => "Validation",
            FileStorageError::UploadInspection { .. } => "UploadInspection",
            FileStorageError::AdapterNotConfigured(_) => "AdapterNotConfigured",
            FileStorageError::RecordNotFound(_) => "RecordNotFound",
            FileStorageError::PhysicalDelete { .. } => "PhysicalDelete",
            FileStorageError::Storage(_) => "Storage",
            #[cfg(feature = "sqlx")]
            FileStorageError::Database(_) => "Database",
            FileStorageError::Persistence(_) => "Persistence",
            FileStorageError::Internal(_) => "Internal",
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

/// Static metadata for each variant: (error_code, recoverable, log_level).
fn static_metadata(err: &FileStorageError) -> (&'static str, bool, LogLevel) {
    match err {
        FileStorageError::Validation(_) => ("VALIDATION_ERROR", false, LogLevel::Debug),
        FileStorageError::UploadInspection { .. } => {
            ("UPLOAD_INSPECTION_ERROR", false, LogLevel::Warn)
        }
        FileStorageError::AdapterNotConfigured(_) => {
            ("ADAPTER_NOT_CONFIGURED", false, LogLevel::Error)
        }
        FileStorageError::RecordNotFound(_) => ("RECORD_NOT_FOUND", false, LogLevel::Debug),
        FileStorageError::PhysicalDelete { .. } => ("PHYSICAL_DELETE_ERROR", true, LogLevel::Error),
        FileStorageError::Storage(_) => ("STORAGE_ERROR", true, LogLevel::Error),
        #[cfg(feature = "sqlx")]
        FileStorageError::Database(_) => ("DATABASE_ERROR", true, LogLevel::Error),
        FileStorageError::Persistence(_) => ("PERSISTENCE_ERROR", true, LogLevel::Error),
        FileStorageError::Internal(_) => ("INTERNAL_ERROR", true, LogLevel::Error),
    }
}

impl ErrorMetadata for FileStorageError {
    fn error_code(&self) -> &'static str {
        static_metadata(self).0
    }

    fn is_recoverable(&self) -> bool {
        static_metadata(self).1
    }

    fn log_level(&self) -> LogLevel {
        static_metadata(self).2
    }
}
