//! Workspace-wide constants.

/// Adapter name assigned to records saved without one.
///
/// Older callers never set an adapter and expect their files on the local disk.
pub const DEFAULT_ADAPTER: &str = "Local";

/// Owning collection name used when a record arrives without an owner type.
pub const DEFAULT_TABLE_NAME: &str = "file_storage";

/// Mime type reported when the upload content cannot be identified.
pub const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

/// Number of two-character shard levels between the bucket and the id folder.
pub const SHARD_LEVELS: usize = 3;
