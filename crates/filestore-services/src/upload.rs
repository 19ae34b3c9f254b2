//! Facts derived from an upload before its record is saved.

use filestore_core::constants::FALLBACK_MIME_TYPE;
use filestore_core::{FileStorageError, FileStorageResult};
use std::path::Path;
use tokio::io::AsyncReadExt;

/// Bytes read from the start of a file for content sniffing.
const SNIFF_LEN: u64 = 8192;

/// Extension of a filename or path, without the dot.
///
/// It is whatever follows the last `.` (empty when there is none). When a
/// filesystem entry exists at `name` only its final component is considered,
/// so dots in parent directories are ignored. Case is preserved, and a
/// dotfile such as `.env` has the extension `env`.
pub fn file_extension(name: &str) -> String {
    let path = Path::new(name);
    if path.exists() {
        return path
            .file_name()
            .map(|file_name| after_last_dot(&file_name.to_string_lossy()))
            .unwrap_or_default();
    }

    after_last_dot(name)
}

fn after_last_dot(name: &str) -> String {
    name.rsplit_once('.')
        .map(|(_, ext)| ext.to_string())
        .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadInspection {
    pub filesize: i64,
    pub mime_type: String,
}

/// Read size and mime type of a received upload.
///
/// The mime type is sniffed from the file header; when the content is not
/// recognised it is guessed from `original_name`, and finally falls back to
/// `application/octet-stream`.
pub async fn inspect_upload(
    temp_path: &Path,
    original_name: Option<&str>,
) -> FileStorageResult<UploadInspection> {
    let inspection_error = |source: std::io::Error| FileStorageError::UploadInspection {
        path: temp_path.to_path_buf(),
        source,
    };

    let metadata = tokio::fs::metadata(temp_path)
        .await
        .map_err(inspection_error)?;
    if !metadata.is_file() {
        return Err(inspection_error(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "upload is not a regular file",
        )));
    }

    let file = tokio::fs::File::open(temp_path)
        .await
        .map_err(inspection_error)?;
    let mut header = Vec::with_capacity(SNIFF_LEN as usize);
    file.take(SNIFF_LEN)
        .read_to_end(&mut header)
        .await
        .map_err(inspection_error)?;

    let mime_type = infer::get(&header)
        .map(|kind| kind.mime_type().to_string())
        .or_else(|| {
            original_name
                .and_then(|name| mime_guess::from_path(name).first())
                .map(|mime| mime.essence_str().to_string())
        })
        .unwrap_or_else(|| FALLBACK_MIME_TYPE.to_string());

    let filesize = i64::try_from(metadata.len()).map_err(|_| {
        inspection_error(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "upload size exceeds i64",
        ))
    })?;

    tracing::debug!(
        path = %temp_path.display(),
        filesize,
        mime_type = %mime_type,
        "Inspected upload"
    );

    Ok(UploadInspection {
        filesize,
        mime_type,
    })
}
