//! Filestore persistence layer
//!
//! Repositories for `StorageRecord` metadata. The lifecycle services only see the
//! [`StorageRecordRepository`] trait; `PgStorageRecordRepository` backs it with
//! PostgreSQL and `InMemoryStorageRecordRepository` with a process-local map.

pub mod db;

pub use db::{
    create_pool, run_migrations, InMemoryStorageRecordRepository, PgStorageRecordRepository,
    StorageRecordRepository,
};
