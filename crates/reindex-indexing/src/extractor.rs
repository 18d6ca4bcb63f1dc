//! Batch extraction from the source store into a sink.

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use reindex_client::RequestError;
use reindex_storage::{SourceCursor, SourceStore};
use reindex_types::{mark_indexed, DocumentBatch, SyncWindow};

use crate::error::ExtractionError;

/// Default documents per delivered batch.
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Counts for one collection's extraction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExtractionStats {
    /// Documents delivered to the sink.
    pub documents: usize,
    /// Sink calls made.
    pub batches: usize,
}

/// Streams window-filtered documents out of a [`SourceStore`].
///
/// Every document is stamped with the indexed marker before it joins a
/// batch. Batches reach the sink in cursor order, and the next batch is
/// not assembled until the sink resolves.
pub struct BatchExtractor {
    store: Arc<dyn SourceStore>,
}

impl BatchExtractor {
    pub fn new(store: Arc<dyn SourceStore>) -> Self {
        Self { store }
    }

    /// Extract `collection` documents in `window`, delivering groups of up
    /// to `batch_size` to `sink`.
    ///
    /// The cursor is closed on every path, including sink failures.
    pub async fn extract<F, Fut>(
        &self,
        collection: &str,
        window: &SyncWindow,
        batch_size: usize,
        mut sink: F,
    ) -> Result<ExtractionStats, ExtractionError>
    where
        F: FnMut(DocumentBatch) -> Fut,
        Fut: Future<Output = Result<(), RequestError>>,
    {
        let batch_size = batch_size.max(1);
        let mut cursor = self
            .store
            .open_cursor(collection, window, batch_size)
            .await
            .map_err(|source| ExtractionError::Source {
                collection: collection.to_string(),
                source,
            })?;

        let result = drain(cursor.as_mut(), collection, batch_size, &mut sink).await;

        if let Err(e) = cursor.close().await {
            warn!(collection, error = %e, "Failed to close source cursor");
        }

        if let Ok(stats) = &result {
            info!(
                collection,
                documents = stats.documents,
                batches = stats.batches,
                "Extraction complete"
            );
        }
        result
    }
}

async fn drain<F, Fut>(
    cursor: &mut dyn SourceCursor,
    collection: &str,
    batch_size: usize,
    sink: &mut F,
) -> Result<ExtractionStats, ExtractionError>
where
    F: FnMut(DocumentBatch) -> Fut,
    Fut: Future<Output = Result<(), RequestError>>,
{
    let mut stats = ExtractionStats::default();
    let mut pending: DocumentBatch = Vec::with_capacity(batch_size);

    while let Some(docs) = cursor
        .advance()
        .await
        .map_err(|source| ExtractionError::Source {
            collection: collection.to_string(),
            source,
        })?
    {
        for doc in docs {
            pending.push(mark_indexed(doc));
            if pending.len() == batch_size {
                let full = std::mem::replace(&mut pending, Vec::with_capacity(batch_size));
                deliver(collection, full, sink, &mut stats).await?;
            }
        }
    }

    if !pending.is_empty() {
        deliver(collection, pending, sink, &mut stats).await?;
    }
    Ok(stats)
}

async fn deliver<F, Fut>(
    collection: &str,
    batch: DocumentBatch,
    sink: &mut F,
    stats: &mut ExtractionStats,
) -> Result<(), ExtractionError>
where
    F: FnMut(DocumentBatch) -> Fut,
    Fut: Future<Output = Result<(), RequestError>>,
{
    let number = stats.batches + 1;
    let size = batch.len();

    sink(batch)
        .await
        .map_err(|source| ExtractionError::Delivery {
            collection: collection.to_string(),
            batch: number,
            source,
        })?;

    stats.batches = number;
    stats.documents += size;
    debug!(collection, batch = number, size, "Delivered batch");
    Ok(())
}
