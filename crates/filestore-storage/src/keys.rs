//! Shared path generation for storage adapters.
//!
//! Path format: `{bucket}/{s1}/{s2}/{s3}/[{token}/]` where `token` is the record id
//! with hyphens removed and `s1..s3` are the first three character pairs of the
//! SHA-256 hex digest of the token. Each shard level holds at most 256 entries, so
//! directory sizes stay bounded however many records a bucket accumulates.

use filestore_core::constants::SHARD_LEVELS;
use filestore_core::{FileStorageError, FileStorageResult};
use sha2::{Digest, Sha256};

/// Remove the hyphens from an id, e.g. a hyphenated UUID.
pub fn strip_id(raw_id: &str) -> String {
    raw_id.replace('-', "")
}

/// Derive the sharded storage path for a record.
///
/// With `include_id_folder` the stripped id becomes the last segment, giving each
/// record its own directory. Without it the caller must pick a filename that is
/// unique inside the shard.
pub fn derive_path(
    bucket: &str,
    raw_id: &str,
    include_id_folder: bool,
) -> FileStorageResult<String> {
    let bucket = bucket.trim_end_matches('/');
    if bucket.is_empty() {
        return Err(FileStorageError::validation(
            "cannot derive a storage path without a bucket",
        ));
    }

    let token = strip_id(raw_id);
    if token.is_empty() {
        return Err(FileStorageError::validation(
            "cannot derive a storage path from an empty id",
        ));
    }

    let mut path = String::with_capacity(bucket.len() + SHARD_LEVELS * 3 + token.len() + 2);
    path.push_str(bucket);
    path.push('/');
    path.push_str(&shard_path(&token));

    if include_id_folder {
        path.push_str(&token);
        path.push('/');
    }

    Ok(path)
}

/// `s1/s2/s3/` for a token.
fn shard_path(token: &str) -> String {
    let digest = hex::encode(Sha256::digest(token.as_bytes()));
    (0..SHARD_LEVELS)
        .map(|level| format!("{}/", &digest[level * 2..level * 2 + 2]))
        .collect()
}
