//! Temporary file locations for processing copies of stored files.

use std::io;
use std::path::{Component, Path, PathBuf};
use uuid::Uuid;

use crate::lifecycle::FileStorageService;

/// A fresh temporary file path: `<tmp_root>/<uuid>` or `<tmp_root>/<folder>/<uuid>`.
///
/// Only the path is generated, the file itself is not created. With
/// `create_path` the parent directory is created when missing. `folder` must be
/// relative and stay below `tmp_root`.
pub async fn tmp_file(tmp_root: &Path, folder: Option<&str>, create_path: bool) -> io::Result<PathBuf> {
    let mut dir = tmp_root.to_path_buf();

    if let Some(folder) = folder.filter(|f| !f.is_empty()) {
        let escapes = Path::new(folder)
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("tmp folder must be a relative path below the tmp root: {}", folder),
            ));
        }
        dir.push(folder);
    }

    if create_path && !tokio::fs::try_exists(&dir).await? {
        tokio::fs::create_dir_all(&dir).await?;
        tracing::debug!(path = %dir.display(), "Created tmp directory");
    }

    Ok(dir.join(Uuid::new_v4().to_string()))
}

impl FileStorageService {
    /// [`tmp_file`] under the service's temp root.
    pub async fn tmp_file(&self, folder: Option<&str>, create_path: bool) -> io::Result<PathBuf> {
        tmp_file(self.tmp_dir(), folder, create_path).await
    }
}
