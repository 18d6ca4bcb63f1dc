//! In-memory source store for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use reindex_types::{Document, DocumentBatch, SyncWindow};

use crate::error::StorageError;
use crate::keys::{document_timestamp_ms, validate_collection};
use crate::source::{SourceCursor, SourceStore};

/// Counters shared between a store and the cursors it hands out.
#[derive(Debug, Default)]
struct Tracking {
    opened: AtomicUsize,
    closed: AtomicUsize,
}

/// Source store holding documents in memory.
///
/// Supports fault injection (fail the n-th advance of a collection's
/// cursor) and records cursor and store releases, so pipeline tests can
/// check cleanup without a database.
pub struct MemoryStore {
    timestamp_field: String,
    collections: Mutex<HashMap<String, Vec<(i64, Document)>>>,
    failures: Mutex<HashMap<String, usize>>,
    tracking: Arc<Tracking>,
    closed: AtomicBool,
}

impl MemoryStore {
    pub fn new(timestamp_field: impl Into<String>) -> Self {
        Self {
            timestamp_field: timestamp_field.into(),
            collections: Mutex::new(HashMap::new()),
            failures: Mutex::new(HashMap::new()),
            tracking: Arc::new(Tracking::default()),
            closed: AtomicBool::new(false),
        }
    }

    /// Add documents to a collection. Each needs the timestamp field.
    pub fn insert(&self, collection: &str, docs: Vec<Document>) -> Result<(), StorageError> {
        validate_collection(collection)?;
        let mut stamped = Vec::with_capacity(docs.len());
        for doc in docs {
            let ts = document_timestamp_ms(&doc, &self.timestamp_field)?;
            stamped.push((ts, doc));
        }

        let mut collections = self
            .collections
            .lock()
            .map_err(|e| StorageError::Read(e.to_string()))?;
        let entries = collections.entry(collection.to_string()).or_default();
        entries.extend(stamped);
        // Stable sort keeps insertion order for equal timestamps
        entries.sort_by_key(|(ts, _)| *ts);
        Ok(())
    }

    /// Make the `nth` advance (1-indexed) of `collection` cursors fail.
    pub fn fail_on_advance(&self, collection: &str, nth: usize) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.insert(collection.to_string(), nth);
        }
    }

    pub fn cursors_opened(&self) -> usize {
        self.tracking.opened.load(Ordering::SeqCst)
    }

    pub fn cursors_closed(&self) -> usize {
        self.tracking.closed.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceStore for MemoryStore {
    async fn open_cursor(
        &self,
        collection: &str,
        window: &SyncWindow,
        batch_size: usize,
    ) -> Result<Box<dyn SourceCursor>, StorageError> {
        if self.is_closed() {
            return Err(StorageError::Closed);
        }
        validate_collection(collection)?;

        let (start_ms, end_ms) = (window.start_ms(), window.end_ms());
        let matching: Vec<Document> = self
            .collections
            .lock()
            .map_err(|e| StorageError::Read(e.to_string()))?
            .get(collection)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|(ts, _)| start_ms <= *ts && *ts <= end_ms)
                    .map(|(_, doc)| doc.clone())
                    .collect()
            })
            .unwrap_or_default();

        let fail_at = self
            .failures
            .lock()
            .ok()
            .and_then(|failures| failures.get(collection).copied());

        self.tracking.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryCursor {
            collection: collection.to_string(),
            docs: matching.into_iter(),
            batch_size: batch_size.max(1),
            advances: 0,
            fail_at,
            closed: false,
            tracking: Arc::clone(&self.tracking),
        }))
    }

    async fn close(&self) -> Result<(), StorageError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

struct MemoryCursor {
    collection: String,
    docs: std::vec::IntoIter<Document>,
    batch_size: usize,
    advances: usize,
    fail_at: Option<usize>,
    closed: bool,
    tracking: Arc<Tracking>,
}

#[async_trait]
impl SourceCursor for MemoryCursor {
    async fn advance(&mut self) -> Result<Option<DocumentBatch>, StorageError> {
        if self.closed {
            return Err(StorageError::CursorClosed(self.collection.clone()));
        }
        self.advances += 1;
        if self.fail_at == Some(self.advances) {
            return Err(StorageError::Read(format!(
                "injected failure on advance {} of {}",
                self.advances, self.collection
            )));
        }

        let batch: DocumentBatch = self.docs.by_ref().take(self.batch_size).collect();
        if batch.is_empty() {
            Ok(None)
        } else {
            Ok(Some(batch))
        }
    }

    async fn close(&mut self) -> Result<(), StorageError> {
        if !self.closed {
            self.closed = true;
            self.tracking.closed.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}
