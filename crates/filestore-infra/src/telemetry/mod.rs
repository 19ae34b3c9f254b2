//! Tracing initialization
//!
//! Installs the global `tracing` subscriber used by every Filestore crate.

mod init_basic;

pub use init_basic::{init_telemetry, LogFormat};
