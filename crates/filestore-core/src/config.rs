//! Configuration module
//!
//! Loads the owning collection name, temp directory, database settings and the
//! named storage adapters from the environment (optionally via a `.env` file).

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use crate::constants::DEFAULT_TABLE_NAME;
use crate::storage_types::AdapterSettings;

const DB_MAX_CONNECTIONS: u32 = 10;

/// Adapter name registered from `LOCAL_STORAGE_PATH`.
pub const LOCAL_ADAPTER_NAME: &str = "Local";
/// Adapter name registered from the `S3_*` variables.
pub const S3_ADAPTER_NAME: &str = "S3";

#[derive(Clone, Debug)]
pub struct Config {
    /// Owner type given to records saved without one.
    pub table_name: String,
    /// Root for temporary upload copies.
    pub tmp_dir: PathBuf,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    /// Adapter settings keyed by adapter name.
    pub adapters: HashMap<String, AdapterSettings>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            table_name: DEFAULT_TABLE_NAME.to_string(),
            tmp_dir: env::temp_dir(),
            database_url: None,
            db_max_connections: DB_MAX_CONNECTIONS,
            adapters: HashMap::new(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any variable source, `from_env` reads the
    /// process environment through this.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let table_name =
            lookup("FILE_STORAGE_TABLE").unwrap_or_else(|| DEFAULT_TABLE_NAME.to_string());

        let tmp_dir = lookup("FILE_STORAGE_TMP_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(env::temp_dir);

        let database_url = lookup("DATABASE_URL");

        let db_max_connections = match lookup("DB_MAX_CONNECTIONS") {
            Some(value) => value.parse::<u32>().map_err(|e| {
                anyhow::anyhow!("DB_MAX_CONNECTIONS must be a positive integer: {}", e)
            })?,
            None => DB_MAX_CONNECTIONS,
        };

        let mut adapters = HashMap::new();

        if let Some(base_path) = lookup("LOCAL_STORAGE_PATH") {
            adapters.insert(
                LOCAL_ADAPTER_NAME.to_string(),
                AdapterSettings::local(base_path),
            );
        }

        if let Some(bucket) = lookup("S3_BUCKET") {
            let region = lookup("S3_REGION")
                .or_else(|| lookup("AWS_REGION"))
                .ok_or_else(|| {
                    anyhow::anyhow!("S3_BUCKET is set but neither S3_REGION nor AWS_REGION is")
                })?;
            adapters.insert(
                S3_ADAPTER_NAME.to_string(),
                AdapterSettings::S3 {
                    bucket,
                    region,
                    endpoint: lookup("S3_ENDPOINT"),
                },
            );
        }

        let config = Config {
            table_name,
            tmp_dir,
            database_url,
            db_max_connections,
            adapters,
        };
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.table_name.trim().is_empty() {
            anyhow::bail!("FILE_STORAGE_TABLE must not be empty");
        }

        if self.db_max_connections == 0 {
            anyhow::bail!("DB_MAX_CONNECTIONS must be greater than zero");
        }

        for (name, settings) in &self.adapters {
            match settings {
                AdapterSettings::Local { base_path } if base_path.as_os_str().is_empty() => {
                    anyhow::bail!("Adapter '{}' has an empty base path", name);
                }
                AdapterSettings::S3 { bucket, region, .. }
                    if bucket.is_empty() || region.is_empty() =>
                {
                    anyhow::bail!("Adapter '{}' needs both a bucket and a region", name);
                }
                _ => {}
            }
        }

        Ok(())
    }

    pub fn with_adapter(mut self, name: impl Into<String>, settings: AdapterSettings) -> Self {
        self.adapters.insert(name.into(), settings);
        self
    }

    pub fn database_url(&self) -> Option<&str> {
        self.database_url.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.table_name, "file_storage");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_incomplete_s3_adapter() {
        let config = Config::default().with_adapter(
            "S3",
            AdapterSettings::S3 {
                bucket: "uploads".to_string(),
                region: String::new(),
                endpoint: None,
            },
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_table_name() {
        let config = Config {
            table_name: "  ".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_lookup_defaults_without_variables() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.table_name, "file_storage");
        assert_eq!(config.tmp_dir, env::temp_dir());
        assert_eq!(config.db_max_connections, 10);
        assert!(config.database_url().is_none());
        assert!(config.adapters.is_empty());
    }

    #[test]
    fn test_lookup_reads_table_and_database() {
        let config = Config::from_lookup(lookup_from(&[
            ("FILE_STORAGE_TABLE", "attachments"),
            ("FILE_STORAGE_TMP_DIR", "/var/tmp/filestore"),
            ("DATABASE_URL", "postgres://localhost/files"),
            ("DB_MAX_CONNECTIONS", "4"),
        ]))
        .unwrap();
        assert_eq!(config.table_name, "attachments");
        assert_eq!(config.tmp_dir, PathBuf::from("/var/tmp/filestore"));
        assert_eq!(config.database_url(), Some("postgres://localhost/files"));
        assert_eq!(config.db_max_connections, 4);
    }

    #[test]
    fn test_local_storage_path_registers_local_adapter() {
        let config =
            Config::from_lookup(lookup_from(&[("LOCAL_STORAGE_PATH", "/srv/files")])).unwrap();
        assert_eq!(
            config.adapters.get(LOCAL_ADAPTER_NAME),
            Some(&AdapterSettings::local("/srv/files"))
        );
    }

    #[test]
    fn test_s3_bucket_requires_region() {
        let result = Config::from_lookup(lookup_from(&[("S3_BUCKET", "uploads")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_s3_region_falls_back_to_aws_region() {
        let config = Config::from_lookup(lookup_from(&[
            ("S3_BUCKET", "uploads"),
            ("AWS_REGION", "eu-west-1"),
            ("S3_ENDPOINT", "http://localhost:9000"),
        ]))
        .unwrap();
        assert_eq!(
            config.adapters.get(S3_ADAPTER_NAME),
            Some(&AdapterSettings::S3 {
                bucket: "uploads".to_string(),
                region: "eu-west-1".to_string(),
                endpoint: Some("http://localhost:9000".to_string()),
            })
        );

        let config = Config::from_lookup(lookup_from(&[
            ("S3_BUCKET", "uploads"),
            ("S3_REGION", "us-east-2"),
            ("AWS_REGION", "eu-west-1"),
        ]))
        .unwrap();
        assert!(matches!(
            config.adapters.get(S3_ADAPTER_NAME),
            Some(AdapterSettings::S3 { region, endpoint: None, .. }) if region == "us-east-2"
        ));
    }

    #[test]
    fn test_bad_db_max_connections_rejected() {
        assert!(Config::from_lookup(lookup_from(&[("DB_MAX_CONNECTIONS", "many")])).is_err());
        assert!(Config::from_lookup(lookup_from(&[("DB_MAX_CONNECTIONS", "0")])).is_err());
    }
}
