//! Storage record model: metadata for one stored file and the owner it belongs to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{FileStorageError, FileStorageResult};

/// Metadata for a file held by a storage adapter.
///
/// A record belongs to exactly one owner, identified by value through
/// `owner_type` and `owner_key`. The bytes live under `path` in the adapter
/// named by `adapter`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageRecord {
    pub id: Uuid,
    pub owner_type: String,
    pub owner_key: String,
    /// Name the adapter registry resolves the backend by.
    pub adapter: String,
    pub adapter_config: String,
    /// Adapter-relative location of the bytes.
    pub path: String,
    pub filename: String,
    pub extension: String,
    pub mime_type: String,
    pub filesize: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StorageRecord {
    /// Start a new record for an owner. The id is assigned here and never changes.
    pub fn new(owner_type: impl Into<String>, owner_key: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_type: owner_type.into(),
            owner_key: owner_key.into(),
            adapter: String::new(),
            adapter_config: String::new(),
            path: String::new(),
            filename: String::new(),
            extension: String::new(),
            mime_type: String::new(),
            filesize: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_adapter(mut self, adapter: impl Into<String>) -> Self {
        self.adapter = adapter.into();
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Check the fields every persisted record must carry.
    pub fn validate(&self) -> FileStorageResult<()> {
        let required = [
            ("adapter", &self.adapter),
            ("path", &self.path),
            ("owner_key", &self.owner_key),
            ("owner_type", &self.owner_type),
        ];

        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(field, _)| *field)
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(FileStorageError::validation(format!(
                "required fields are empty: {}",
                missing.join(", ")
            )))
        }
    }
}
