//! Source store for the reindex pipeline.
//!
//! Provides:
//! - The [`SourceStore`] / [`SourceCursor`] seam the extractor reads through
//! - RocksDB-backed [`Storage`] with time-prefixed keys for window scans
//! - [`MemoryStore`] for tests, with fault injection and release tracking

pub mod column_families;
pub mod db;
pub mod error;
pub mod keys;
pub mod memory;
pub mod source;

pub use db::Storage;
pub use error::StorageError;
pub use keys::DocumentKey;
pub use memory::MemoryStore;
pub use source::{SourceCursor, SourceStore};
