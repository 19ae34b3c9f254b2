use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::PathBuf;
use std::str::FromStr;

/// Storage backend types
///
/// Defined in core because adapter settings and configuration refer to it,
/// while the backends themselves live in `filestore-storage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    S3,
    Local,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "s3" => Ok(StorageBackend::S3),
            "local" => Ok(StorageBackend::Local),
            _ => Err(anyhow::anyhow!("Invalid storage backend: {}", s)),
        }
    }
}

impl Display for StorageBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            StorageBackend::S3 => write!(f, "s3"),
            StorageBackend::Local => write!(f, "local"),
        }
    }
}

/// Everything needed to construct one named storage adapter.
///
/// The adapter registry keeps one of these per adapter name and builds the
/// backend lazily on first resolution.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum AdapterSettings {
    Local {
        base_path: PathBuf,
    },
    S3 {
        bucket: String,
        region: String,
        /// Custom endpoint for S3-compatible providers (MinIO, DigitalOcean Spaces, etc.)
        endpoint: Option<String>,
    },
}

impl AdapterSettings {
    pub fn local(base_path: impl Into<PathBuf>) -> Self {
        AdapterSettings::Local {
            base_path: base_path.into(),
        }
    }

    pub fn backend(&self) -> StorageBackend {
        match self {
            AdapterSettings::Local { .. } => StorageBackend::Local,
            AdapterSettings::S3 { .. } => StorageBackend::S3,
        }
    }
}
