//! Key encoding and decoding for the document store.
//!
//! Key format: `doc:{collection}:{timestamp_ms}:{doc_id}`
//! - collection: source collection name (no `:` allowed)
//! - timestamp_ms: milliseconds since Unix epoch, zero-padded to 13 digits
//! - doc_id: the document's `id` field (a ULID is assigned when missing)
//!
//! This format turns a time window into one contiguous forward range scan.

use chrono::DateTime;
use serde_json::Value;

use crate::error::StorageError;

/// Key for document storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentKey {
    pub collection: String,
    /// Source timestamp in milliseconds
    pub timestamp_ms: i64,
    pub doc_id: String,
}

impl DocumentKey {
    pub fn new(
        collection: impl Into<String>,
        timestamp_ms: i64,
        doc_id: impl Into<String>,
    ) -> Result<Self, StorageError> {
        let collection = collection.into();
        validate_collection(&collection)?;
        if timestamp_ms < 0 {
            return Err(StorageError::Key(format!(
                "Timestamp before epoch: {}",
                timestamp_ms
            )));
        }
        Ok(Self {
            collection,
            timestamp_ms,
            doc_id: doc_id.into(),
        })
    }

    /// Encode key to bytes for storage
    pub fn to_bytes(&self) -> Vec<u8> {
        // Zero-pad timestamp to 13 digits for lexicographic sorting
        format!(
            "doc:{}:{:013}:{}",
            self.collection, self.timestamp_ms, self.doc_id
        )
        .into_bytes()
    }

    /// Prefix shared by every key of a collection
    pub fn collection_prefix(collection: &str) -> Vec<u8> {
        format!("doc:{}:", collection).into_bytes()
    }

    /// First key at or after `start_ms`
    pub fn range_start(collection: &str, start_ms: i64) -> Vec<u8> {
        format!("doc:{}:{:013}:", collection, start_ms.max(0)).into_bytes()
    }

    /// Exclusive upper bound covering every key at `end_ms` (inclusive end)
    pub fn range_end_inclusive(collection: &str, end_ms: i64) -> Vec<u8> {
        format!("doc:{}:{:013}:", collection, end_ms.saturating_add(1).max(0)).into_bytes()
    }
}

/// Collection names become key segments, so `:` and empty names are rejected.
pub fn validate_collection(collection: &str) -> Result<(), StorageError> {
    if collection.is_empty() || collection.contains(':') {
        return Err(StorageError::Key(format!(
            "Invalid collection name: {:?}",
            collection
        )));
    }
    Ok(())
}

/// Read a document's timestamp field as milliseconds since epoch.
///
/// Accepts RFC 3339 strings, integer milliseconds, and extended-JSON
/// `{"$date": ...}` wrappers around either.
pub fn document_timestamp_ms(doc: &Value, field: &str) -> Result<i64, StorageError> {
    let raw = doc
        .get(field)
        .ok_or_else(|| StorageError::Document(format!("missing timestamp field '{}'", field)))?;
    timestamp_value_ms(raw)
        .ok_or_else(|| StorageError::Document(format!("unusable timestamp in '{}': {}", field, raw)))
}

fn timestamp_value_ms(raw: &Value) -> Option<i64> {
    match raw {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|ts| ts.timestamp_millis()),
        Value::Number(n) => n.as_i64(),
        Value::Object(fields) => fields.get("$date").and_then(timestamp_value_ms),
        _ => None,
    }
}

/// Render a document's `id` field as a key segment.
pub fn document_id(doc: &Value) -> Option<String> {
    match doc.get("id")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_document_key_format_with_colon_in_id() {
        let key = DocumentKey::new("messages", 1706540400000, "msg:42").unwrap();
        assert_eq!(key.to_bytes(), b"doc:messages:1706540400000:msg:42".to_vec());
    }

    #[test]
    fn test_document_key_lexicographic_order() {
        let key1 = DocumentKey::new("messages", 999, "b").unwrap();
        let key2 = DocumentKey::new("messages", 1000, "a").unwrap();
        assert!(key1.to_bytes() < key2.to_bytes());
    }

    #[test]
    fn test_range_end_is_inclusive() {
        let key = DocumentKey::new("messages", 5000, "zzz").unwrap();
        assert!(key.to_bytes() < DocumentKey::range_end_inclusive("messages", 5000));
        assert!(key.to_bytes() >= DocumentKey::range_start("messages", 5000));
    }

    #[test]
    fn test_invalid_collection_and_timestamp() {
        assert!(DocumentKey::new("a:b", 1, "x").is_err());
        assert!(DocumentKey::new("", 1, "x").is_err());
        assert!(DocumentKey::new("messages", -1, "x").is_err());
    }

    #[test]
    fn test_document_timestamp_formats() {
        let doc = json!({"createdAt": "2024-01-29T15:00:00Z"});
        assert_eq!(document_timestamp_ms(&doc, "createdAt").unwrap(), 1706540400000);

        let doc = json!({"createdAt": 1706540400000i64});
        assert_eq!(document_timestamp_ms(&doc, "createdAt").unwrap(), 1706540400000);

        let doc = json!({"createdAt": {"$date": "2024-01-29T15:00:00.000Z"}});
        assert_eq!(document_timestamp_ms(&doc, "createdAt").unwrap(), 1706540400000);

        assert!(document_timestamp_ms(&json!({}), "createdAt").is_err());
        assert!(document_timestamp_ms(&json!({"createdAt": true}), "createdAt").is_err());
    }
}
