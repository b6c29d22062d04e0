//! Helpers for constructing and hashing Qdrant payloads.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use uuid::Uuid;

/// Build the payload object stored alongside each indexed chunk.
pub(crate) fn build_payload(
    text: &str,
    source: &str,
    page: Option<u32>,
    chunk_hash: &str,
    timestamp_rfc3339: &str,
) -> Value {
    let mut payload = Map::new();
    payload.insert("text".into(), Value::String(text.to_string()));
    payload.insert("source".into(), Value::String(source.to_string()));
    if let Some(page) = page {
        payload.insert("page".into(), Value::from(page));
    }
    payload.insert("chunk_hash".into(), Value::String(chunk_hash.to_string()));
    payload.insert(
        "timestamp".into(),
        Value::String(timestamp_rfc3339.to_string()),
    );
    Value::Object(payload)
}

/// Compute a deterministic SHA-256 hash for the chunk text.
pub fn compute_chunk_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    hex::encode(digest)
}

/// Current timestamp formatted for payload storage.
pub(crate) fn current_timestamp_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

/// Construct an identifier suitable for Qdrant points.
pub(crate) fn generate_point_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_hash_is_stable() {
        let text = "Hello world";
        let h1 = compute_chunk_hash(text);
        let h2 = compute_chunk_hash(text);
        assert_eq!(h1, h2);
        assert!(!h1.is_empty());
    }

    #[test]
    fn timestamp_is_rfc3339_like() {
        let ts = current_timestamp_rfc3339();
        assert!(ts.contains('T') && ts.ends_with('Z'));
    }

    #[test]
    fn payload_includes_text_and_source_metadata() {
        let payload = build_payload(
            "sample",
            "https://example.org/a.pdf",
            Some(3),
            "abc123",
            "2025-01-01T00:00:00Z",
        );
        assert_eq!(payload["text"], "sample");
        assert_eq!(payload["source"], "https://example.org/a.pdf");
        assert_eq!(payload["page"], 3);
        assert_eq!(payload["chunk_hash"], "abc123");
        assert_eq!(payload["timestamp"], "2025-01-01T00:00:00Z");
    }

    #[test]
    fn payload_omits_page_when_unknown() {
        let payload = build_payload("sample", "src", None, "hash", "2025-01-01T00:00:00Z");
        assert!(payload.get("page").is_none());
    }
}
