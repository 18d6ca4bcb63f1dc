//! RocksDB-backed source store.
//!
//! Provides:
//! - Database open/close with column family setup
//! - Idempotent document writes keyed by collection, timestamp and id
//! - Time-window range reads and batch-advancing cursors

use async_trait::async_trait;
use rocksdb::{Direction, IteratorMode, Options, WriteBatch, DB};
use serde_json::Value;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use reindex_types::{Document, DocumentBatch, SyncWindow};

use crate::column_families::{build_cf_descriptors, ALL_CF_NAMES, CF_DOCUMENTS};
use crate::error::StorageError;
use crate::keys::{document_id, document_timestamp_ms, validate_collection, DocumentKey};
use crate::source::{SourceCursor, SourceStore};

/// Main storage interface for source documents
pub struct Storage {
    db: Arc<DB>,
    /// Document field holding the source timestamp
    timestamp_field: String,
    closed: AtomicBool,
}

impl Storage {
    /// Open storage at the given path, creating if necessary
    pub fn open(path: &Path, timestamp_field: impl Into<String>) -> Result<Self, StorageError> {
        info!("Opening source store at {:?}", path);

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);
        db_opts.set_max_background_jobs(4);

        let db = DB::open_cf_descriptors(&db_opts, path, build_cf_descriptors())?;

        Ok(Self {
            db: Arc::new(db),
            timestamp_field: timestamp_field.into(),
            closed: AtomicBool::new(false),
        })
    }

    fn ensure_open(&self) -> Result<(), StorageError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(StorageError::Closed);
        }
        Ok(())
    }

    /// Build the key for a document, assigning a ULID `id` when it has none.
    fn prepare(
        &self,
        collection: &str,
        mut doc: Document,
    ) -> Result<(DocumentKey, Document), StorageError> {
        let Some(fields) = doc.as_object_mut() else {
            return Err(StorageError::Document("document must be a JSON object".to_string()));
        };
        if !fields.contains_key("id") {
            fields.insert("id".to_string(), Value::String(ulid::Ulid::new().to_string()));
        }

        let timestamp_ms = document_timestamp_ms(&doc, &self.timestamp_field)?;
        let doc_id = document_id(&doc).ok_or_else(|| {
            StorageError::Document("document id is not a string or number".to_string())
        })?;
        let key = DocumentKey::new(collection, timestamp_ms, doc_id)?;
        Ok((key, doc))
    }

    /// Store one document. Writing the same id and timestamp again overwrites.
    pub fn put_document(
        &self,
        collection: &str,
        doc: Document,
    ) -> Result<DocumentKey, StorageError> {
        self.ensure_open()?;
        let cf = self
            .db
            .cf_handle(CF_DOCUMENTS)
            .ok_or_else(|| StorageError::ColumnFamilyNotFound(CF_DOCUMENTS.to_string()))?;

        let (key, doc) = self.prepare(collection, doc)?;
        self.db.put_cf(&cf, key.to_bytes(), serde_json::to_vec(&doc)?)?;
        debug!(collection, doc_id = %key.doc_id, "Stored document");
        Ok(key)
    }

    /// Store documents atomically. Any invalid document rejects the batch.
    pub fn put_documents(
        &self,
        collection: &str,
        docs: Vec<Document>,
    ) -> Result<usize, StorageError> {
        self.ensure_open()?;
        let cf = self
            .db
            .cf_handle(CF_DOCUMENTS)
            .ok_or_else(|| StorageError::ColumnFamilyNotFound(CF_DOCUMENTS.to_string()))?;

        let mut batch = WriteBatch::default();
        let count = docs.len();
        for doc in docs {
            let (key, doc) = self.prepare(collection, doc)?;
            batch.put_cf(&cf, key.to_bytes(), serde_json::to_vec(&doc)?);
        }
        self.db.write(batch)?;
        debug!(collection, count, "Stored document batch");
        Ok(count)
    }

    /// Number of documents stored for a collection
    pub fn document_count(&self, collection: &str) -> Result<usize, StorageError> {
        self.ensure_open()?;
        validate_collection(collection)?;
        let cf = self
            .db
            .cf_handle(CF_DOCUMENTS)
            .ok_or_else(|| StorageError::ColumnFamilyNotFound(CF_DOCUMENTS.to_string()))?;

        let prefix = DocumentKey::collection_prefix(collection);
        let iter = self
            .db
            .iterator_cf(&cf, IteratorMode::From(&prefix, Direction::Forward));

        let mut count = 0;
        for item in iter {
            let (key, _) = item?;
            if !key.starts_with(&prefix) {
                break;
            }
            count += 1;
        }
        Ok(count)
    }

    /// Flush all column families to disk
    pub fn flush(&self) -> Result<(), StorageError> {
        for cf_name in ALL_CF_NAMES {
            if let Some(cf) = self.db.cf_handle(cf_name) {
                self.db.flush_cf(&cf)?;
            }
        }
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Read up to `limit` documents with keys in `[from, end)`.
fn scan_documents(
    db: &DB,
    from: &[u8],
    end: &[u8],
    limit: usize,
) -> Result<Vec<(Box<[u8]>, Document)>, StorageError> {
    let cf = db
        .cf_handle(CF_DOCUMENTS)
        .ok_or_else(|| StorageError::ColumnFamilyNotFound(CF_DOCUMENTS.to_string()))?;

    let mut results = Vec::new();
    let iter = db.iterator_cf(&cf, IteratorMode::From(from, Direction::Forward));
    for item in iter {
        if results.len() >= limit {
            break;
        }
        let (key, value) = item?;
        // Stop once past the end of the window
        if key.as_ref() >= end {
            break;
        }
        let doc: Document = serde_json::from_slice(&value)?;
        results.push((key, doc));
    }
    Ok(results)
}

#[async_trait]
impl SourceStore for Storage {
    async fn open_cursor(
        &self,
        collection: &str,
        window: &SyncWindow,
        batch_size: usize,
    ) -> Result<Box<dyn SourceCursor>, StorageError> {
        self.ensure_open()?;
        validate_collection(collection)?;

        debug!(collection, window = %window, batch_size, "Opening document cursor");
        Ok(Box::new(RocksCursor {
            db: Arc::clone(&self.db),
            collection: collection.to_string(),
            next_key: DocumentKey::range_start(collection, window.start_ms()),
            end_key: DocumentKey::range_end_inclusive(collection, window.end_ms()),
            batch_size: batch_size.max(1),
            exhausted: false,
            closed: false,
        }))
    }

    async fn close(&self) -> Result<(), StorageError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.flush()?;
        info!("Source store closed");
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Cursor over one collection's window, resuming after the last key read.
struct RocksCursor {
    db: Arc<DB>,
    collection: String,
    next_key: Vec<u8>,
    end_key: Vec<u8>,
    batch_size: usize,
    exhausted: bool,
    closed: bool,
}

#[async_trait]
impl SourceCursor for RocksCursor {
    async fn advance(&mut self) -> Result<Option<DocumentBatch>, StorageError> {
        if self.closed {
            return Err(StorageError::CursorClosed(self.collection.clone()));
        }
        if self.exhausted {
            return Ok(None);
        }

        let rows = scan_documents(&self.db, &self.next_key, &self.end_key, self.batch_size)?;
        if rows.len() < self.batch_size {
            self.exhausted = true;
        }
        let Some((last_key, _)) = rows.last() else {
            return Ok(None);
        };

        // Smallest key strictly greater than the last one returned
        let mut next_key = last_key.to_vec();
        next_key.push(0);
        self.next_key = next_key;

        Ok(Some(rows.into_iter().map(|(_, doc)| doc).collect()))
    }

    async fn close(&mut self) -> Result<(), StorageError> {
        if !self.closed {
            self.closed = true;
            debug!(collection = %self.collection, "Document cursor closed");
        }
        Ok(())
    }
}
