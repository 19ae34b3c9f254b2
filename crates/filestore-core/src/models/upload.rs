use std::path::PathBuf;

/// Facts about a freshly received upload.
///
/// Neither field is persisted. `temp_path` points at the bytes as received by
/// the hosting application; `original_name` is the filename the client sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadFacts {
    pub temp_path: Option<PathBuf>,
    pub original_name: Option<String>,
}

impl UploadFacts {
    pub fn new(temp_path: impl Into<PathBuf>, original_name: impl Into<String>) -> Self {
        Self {
            temp_path: Some(temp_path.into()),
            original_name: Some(original_name.into()),
        }
    }

    /// Upload facts for a save that only touches metadata.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.temp_path.is_none() && self.original_name.is_none()
    }
}
