//! # reindex-types
//!
//! Shared domain types for the search reindex pipeline.
//!
//! This crate defines the values passed between the pipeline stages:
//! - Documents: opaque JSON documents and the batches they travel in
//! - Sync windows: the time range a run extracts
//! - Endpoint and retry settings for the index service
//! - Settings: layered configuration loaded once at startup
//!
//! ## Usage
//!
//! ```rust
//! use reindex_types::{RetryPolicy, SyncWindow};
//! ```

pub mod config;
pub mod document;
pub mod endpoint;
pub mod error;
pub mod window;

pub use config::{RequestSettings, Settings};
pub use document::{mark_indexed, Document, DocumentBatch, INDEXED_MARKER};
pub use endpoint::{IndexEndpointConfig, RetryPolicy};
pub use error::ConfigError;
pub use window::{parse_timestamp, SyncWindow};
