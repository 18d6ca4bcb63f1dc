//! Opaque JSON documents moved between the source store and the index.
//!
//! The pipeline never interprets document contents beyond the timestamp
//! field used for range filtering and the indexing marker stamped during
//! extraction.

use serde_json::{Map, Value};

/// A single source document.
pub type Document = Value;

/// An ordered batch of documents, in source cursor order.
pub type DocumentBatch = Vec<Document>;

/// Field stamped on every extracted document.
pub const INDEXED_MARKER: &str = "indexed";

/// Stamp `indexed = true` on a document.
///
/// Objects gain (or overwrite) the marker field. Any other JSON shape is
/// wrapped as `{"value": <doc>, "indexed": true}` so every delivered
/// document carries the marker.
pub fn mark_indexed(doc: Document) -> Document {
    match doc {
        Value::Object(mut fields) => {
            fields.insert(INDEXED_MARKER.to_string(), Value::Bool(true));
            Value::Object(fields)
        }
        other => {
            let mut fields = Map::with_capacity(2);
            fields.insert("value".to_string(), other);
            fields.insert(INDEXED_MARKER.to_string(), Value::Bool(true));
            Value::Object(fields)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mark_object() {
        let doc = mark_indexed(json!({"id": "a1", "text": "hello"}));
        assert_eq!(doc["indexed"], json!(true));
        assert_eq!(doc["text"], json!("hello"));
    }

    #[test]
    fn test_mark_overwrites_existing_marker() {
        let doc = mark_indexed(json!({"id": "a1", "indexed": false}));
        assert_eq!(doc["indexed"], json!(true));
    }

    #[test]
    fn test_mark_wraps_non_objects() {
        for raw in [json!("text"), json!(42), json!(null), json!([1, 2])] {
            let doc = mark_indexed(raw.clone());
            assert_eq!(doc["indexed"], json!(true));
            assert_eq!(doc["value"], raw);
        }
    }
}
