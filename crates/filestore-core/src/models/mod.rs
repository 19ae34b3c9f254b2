//! Data models
//!
//! `StorageRecord` is the persisted metadata entity; `UploadFacts` carries the
//! transient facts about an incoming upload that a save derives fields from.

mod storage_record;
mod upload;

pub use storage_record::*;
pub use upload::*;
