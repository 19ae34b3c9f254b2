//! Removal of a record superseded by a newer save.

use filestore_core::StorageRecord;
use uuid::Uuid;

use crate::lifecycle::{log_error, FileStorageService};

impl FileStorageService {
    /// Delete the record `replaces_id` points at, after `record` was saved.
    ///
    /// Runs the full delete flow for the old record. Returns whether it was
    /// deleted; failures are logged and reported as `false` so they never undo
    /// the save that triggered them. Ignored when `record` has no owner type or
    /// names itself.
    pub async fn cleanup_if_replacing(
        &self,
        record: &StorageRecord,
        replaces_id: Option<Uuid>,
    ) -> bool {
        let Some(old_id) = replaces_id.filter(|id| !id.is_nil()) else {
            return false;
        };

        if record.owner_type.trim().is_empty() {
            tracing::debug!(
                record_id = %record.id,
                replaces_id = %old_id,
                "Record has no owner type, replaced record kept"
            );
            return false;
        }

        if old_id == record.id {
            tracing::debug!(record_id = %record.id, "Record names itself as replaced, ignoring");
            return false;
        }

        match self.delete(old_id).await {
            Ok(()) => {
                tracing::info!(
                    record_id = %record.id,
                    replaced_id = %old_id,
                    "Replaced record deleted"
                );
                true
            }
            Err(e) => {
                log_error("replacement cleanup", &e);
                false
            }
        }
    }
}
