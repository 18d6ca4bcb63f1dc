//! Storage layer error types.

use thiserror::Error;

/// Errors that can occur in the source store
#[derive(Error, Debug)]
pub enum StorageError {
    /// RocksDB operation failed
    #[error("RocksDB error: {0}")]
    RocksDb(#[from] rocksdb::Error),

    /// Column family not found
    #[error("Column family not found: {0}")]
    ColumnFamilyNotFound(String),

    /// Key encoding/decoding error
    #[error("Key error: {0}")]
    Key(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Document cannot be stored (not an object, no usable timestamp)
    #[error("Invalid document: {0}")]
    Document(String),

    /// The store connection was already released
    #[error("Source store is closed")]
    Closed,

    /// The cursor was already released
    #[error("Cursor for {0} is closed")]
    CursorClosed(String),

    /// Read failure reported by a store backend
    #[error("Read failed: {0}")]
    Read(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}
