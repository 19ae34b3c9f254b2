use std::str::FromStr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "filestore=debug";

/// Output format of the fmt layer, read from `LOG_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(anyhow::anyhow!("Invalid log format: {}", s)),
        }
    }
}

impl LogFormat {
    /// `LOG_FORMAT` from the environment, `Pretty` when unset.
    pub fn from_env() -> Result<Self, anyhow::Error> {
        Self::from_setting(std::env::var("LOG_FORMAT").ok().as_deref())
    }

    /// Format for an optional setting value, `Pretty` when absent or blank.
    pub fn from_setting(value: Option<&str>) -> Result<Self, anyhow::Error> {
        match value.map(str::trim) {
            Some(value) if !value.is_empty() => value.parse(),
            _ => Ok(LogFormat::default()),
        }
    }
}

/// Initialize tracing with an `EnvFilter` (`RUST_LOG`, default `filestore=debug`)
/// and a fmt layer in the given format.
///
/// Fails when a global subscriber is already installed.
pub fn init_telemetry(format: LogFormat) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());

    match format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()?,
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()?,
    }

    tracing::info!(format = ?format, "Tracing initialized");
    Ok(())
}
