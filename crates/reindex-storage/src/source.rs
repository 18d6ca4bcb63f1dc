//! Source store abstraction consumed by the batch extractor.

use async_trait::async_trait;

use reindex_types::{DocumentBatch, SyncWindow};

use crate::error::StorageError;

/// An authoritative document store the pipeline extracts from.
#[async_trait]
pub trait SourceStore: Send + Sync {
    /// Open a forward-only cursor over `collection` documents whose
    /// timestamp lies in `window` (inclusive both ends), advancing in
    /// batches of at most `batch_size`.
    async fn open_cursor(
        &self,
        collection: &str,
        window: &SyncWindow,
        batch_size: usize,
    ) -> Result<Box<dyn SourceCursor>, StorageError>;

    /// Release the store connection. Later cursor opens fail.
    async fn close(&self) -> Result<(), StorageError>;

    /// Whether `close` has been called.
    fn is_closed(&self) -> bool;
}

/// Stateful, exhaustible handle over matching documents.
#[async_trait]
pub trait SourceCursor: Send {
    /// Next batch in source order, or `None` once exhausted.
    async fn advance(&mut self) -> Result<Option<DocumentBatch>, StorageError>;

    /// Release the cursor. Idempotent; `advance` fails afterwards.
    async fn close(&mut self) -> Result<(), StorageError>;
}
