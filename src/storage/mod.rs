//! Persistence backends: object storage for raw payloads and a relational
//! table for ingested records.

pub mod csv_table;
pub mod memory;
pub mod postgres;
pub mod s3;
pub mod table;

use crate::config::{DatabaseBackend, DatabaseConfig, StorageBackend, StorageConfig};
use crate::error::StorageError;
use async_trait::async_trait;
use std::sync::Arc;

pub use csv_table::parse_csv;
pub use memory::{MemoryObjectStore, MemoryRecordTable};
pub use postgres::PostgresRecordTable;
pub use s3::S3ObjectStore;
pub use table::{Cell, Column, ColumnType, Table};

/// Bucket-backed blob storage
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    fn backend(&self) -> &'static str;

    fn bucket(&self) -> &str;

    /// Create the bucket if it does not exist yet
    async fn ensure_bucket(&self) -> Result<(), StorageError>;

    async fn put(&self, key: &str, body: &[u8], content_type: &str) -> Result<(), StorageError>;
}

/// Relational table receiving ingested records
#[async_trait]
pub trait RecordTable: Send + Sync + 'static {
    fn backend(&self) -> &'static str;

    async fn ping(&self) -> Result<(), StorageError>;

    /// Drop the table and recreate it holding exactly `data`
    async fn replace(&self, name: &str, data: &Table) -> Result<(), StorageError>;

    /// Append rows, creating the table from their columns if needed
    async fn append(&self, name: &str, data: &Table) -> Result<(), StorageError>;
}

/// Build the configured object store
pub fn object_store(config: &StorageConfig) -> Result<Arc<dyn ObjectStore>, StorageError> {
    Ok(match config.backend {
        StorageBackend::S3 => Arc::new(S3ObjectStore::new(config)?),
        StorageBackend::Memory => Arc::new(MemoryObjectStore::new(&config.bucket)),
    })
}

/// Build the configured record table
pub fn record_table(config: &DatabaseConfig) -> Arc<dyn RecordTable> {
    match config.backend {
        DatabaseBackend::Postgres => Arc::new(PostgresRecordTable::new(config)),
        DatabaseBackend::Memory => Arc::new(MemoryRecordTable::new()),
    }
}
