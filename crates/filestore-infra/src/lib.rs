//! Filestore Infrastructure Library
//!
//! Process-level plumbing for applications hosting the file storage services.

#[cfg(feature = "observability-basic")]
pub mod telemetry;

#[cfg(feature = "observability-basic")]
pub use telemetry::{init_telemetry, LogFormat};
