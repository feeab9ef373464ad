//! Helpers for constructing and hashing Qdrant payloads.

use crate::qdrant::types::{PayloadContext, PointInsert};
use serde_json::{Map, Value, json};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use uuid::Uuid;

/// Build the payload object stored alongside each indexed chunk.
pub(crate) fn build_payload(
    point: &PointInsert,
    context: &PayloadContext,
    timestamp_rfc3339: &str,
) -> Value {
    let mut payload = Map::new();
    payload.insert("content".into(), Value::String(point.text.clone()));
    payload.insert("chunk_index".into(), json!(point.chunk_index));
    payload.insert("chunk_hash".into(), Value::String(point.chunk_hash.clone()));
    payload.insert("book_name".into(), Value::String(context.book_name.clone()));
    payload.insert(
        "indexed_at".into(),
        Value::String(timestamp_rfc3339.to_string()),
    );

    if let Some(chapter) = context.chapter_number {
        payload.insert("chapter_number".into(), json!(chapter));
    }
    if let Some(source_uri) = context
        .source_uri
        .as_ref()
        .filter(|value| !value.is_empty())
    {
        payload.insert("source_uri".into(), Value::String(source_uri.clone()));
    }
    if !point.metadata.is_empty() {
        payload.insert("metadata".into(), Value::Object(point.metadata.clone()));
    }

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

/// Stable point id: re-ingesting the same chunk at the same position overwrites it.
pub fn point_id(collection: &str, chunk_index: usize, chunk_hash: &str) -> String {
    let name = format!("{collection}:{chunk_index}:{chunk_hash}");
    Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()).to_string()
}

/// Collection name for a book, optionally scoped to one chapter.
pub fn collection_name(book_name: &str, chapter: Option<u32>) -> String {
    let slug = book_slug(book_name);
    match chapter {
        Some(chapter) => format!("book_{slug}_chapter_{chapter}"),
        None => format!("book_{slug}"),
    }
}

/// Lowercased book name with spaces replaced by underscores.
pub fn book_slug(book_name: &str) -> String {
    book_name.trim().to_lowercase().replace(' ', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point() -> PointInsert {
        let mut metadata = Map::new();
        metadata.insert("content_type".into(), Value::String("example".into()));
        PointInsert {
            chunk_index: 4,
            text: "sample".into(),
            chunk_hash: compute_chunk_hash("sample"),
            vector: vec![0.1, 0.2],
            metadata,
        }
    }

    #[test]
    fn chunk_hash_is_stable() {
        let h1 = compute_chunk_hash("Hello world");
        let h2 = compute_chunk_hash("Hello world");
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);
    }

    #[test]
    fn timestamp_is_rfc3339_like() {
        let ts = current_timestamp_rfc3339();
        assert!(ts.contains('T') && ts.ends_with('Z'));
    }

    #[test]
    fn payload_carries_context_and_metadata() {
        let context = PayloadContext {
            book_name: "Physics".into(),
            chapter_number: Some(2),
            source_uri: Some("gs://bucket/physics.pdf".into()),
        };
        let now = "2025-01-01T00:00:00Z";
        let payload = build_payload(&point(), &context, now);
        assert_eq!(payload["content"], "sample");
        assert_eq!(payload["chunk_index"], 4);
        assert_eq!(payload["chapter_number"], 2);
        assert_eq!(payload["book_name"], "Physics");
        assert_eq!(payload["indexed_at"], now);
        assert_eq!(payload["metadata"]["content_type"], "example");
    }

    #[test]
    fn point_ids_are_deterministic_uuids() {
        let a = point_id("book_physics", 0, "abc");
        assert_eq!(a, point_id("book_physics", 0, "abc"));
        assert_ne!(a, point_id("book_physics", 1, "abc"));
        assert!(Uuid::parse_str(&a).is_ok());
    }

    #[test]
    fn collection_names_follow_book_slug() {
        assert_eq!(collection_name("Computer Applications", None), "book_computer_applications");
        assert_eq!(
            collection_name(" Physics Part 1 ", Some(3)),
            "book_physics_part_1_chapter_3"
        );
    }
}
