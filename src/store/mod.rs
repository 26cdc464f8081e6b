//! Vector store capability trait and payload types.
//!
//! The vector store is an external collaborator: this module defines the
//! interface the retrieval core needs from one (upsert, nearest-neighbor
//! search, payload indexes) plus the serde payload carried alongside every
//! vector. [`memory::InMemoryVectorStore`] is the bundled brute-force
//! implementation, suitable for small corpora and the test suite.

mod memory;

pub use memory::InMemoryVectorStore;

use crate::error::SearchError;
use crate::search::types::ChunkId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Distance metric a vector store collection was created with.
///
/// Stores report raw metric values from [`VectorStore::search`]; the dense
/// retriever converts them to a uniform higher-is-better similarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// Cosine distance in [0, 2]; 0 = identical direction
    Cosine,
    /// Raw dot product; already higher-is-better
    Dot,
    /// Euclidean (L2) distance; 0 = identical
    Euclidean,
}

/// Payload stored next to each vector.
///
/// Round-trips through serde so stores that persist payloads as JSON
/// (Qdrant-style) reproduce it exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkPayload {
    /// Originating file or document identifier
    pub source: String,
    /// Zero-based position of the chunk within its source
    pub chunk_index: usize,
    /// The chunk text itself
    pub text: String,
    /// Caller-supplied metadata, arbitrary JSON values
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

/// Payload fields that can carry an index for filtered search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadField {
    /// The `source` field
    Source,
    /// The `chunk_index` field
    ChunkIndex,
}

impl PayloadField {
    /// Field name as it appears in the payload.
    pub fn name(&self) -> &'static str {
        match self {
            PayloadField::Source => "source",
            PayloadField::ChunkIndex => "chunk_index",
        }
    }
}

/// Filter applied during vector search.
///
/// Filtering on a field requires a payload index on that field; stores
/// reject filtered searches with [`SearchError::MissingPayloadIndex`]
/// otherwise.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PayloadFilter {
    /// Restrict results to this source, if set
    pub source: Option<String>,
    /// Restrict results to this position within a source, if set
    pub chunk_index: Option<usize>,
}

impl PayloadFilter {
    /// True when the filter constrains nothing.
    pub fn is_empty(&self) -> bool {
        self.source.is_none() && self.chunk_index.is_none()
    }
}

/// A search hit from the vector store: id, raw metric value, payload.
#[derive(Debug, Clone)]
pub struct ScoredPoint {
    /// Chunk identifier
    pub id: ChunkId,
    /// Raw metric value in the store's native [`DistanceMetric`]
    pub score: f64,
    /// Payload stored with the vector
    pub payload: ChunkPayload,
}

/// Trait for vector store backends.
///
/// Implementations must be `Send + Sync`; the ingestion pipeline upserts
/// from concurrent worker tasks.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Dimension the store's collection was created with.
    fn dimension(&self) -> usize;

    /// Native distance metric of the collection.
    fn metric(&self) -> DistanceMetric;

    /// Inserts or replaces vectors by id.
    ///
    /// Every vector must match [`Self::dimension`]; a mismatch fails the
    /// whole batch with [`SearchError::DimensionMismatch`] before anything
    /// is written.
    async fn upsert(
        &self,
        points: Vec<(ChunkId, Vec<f32>, ChunkPayload)>,
    ) -> Result<(), SearchError>;

    /// Nearest-neighbor search, raw metric values, best first.
    async fn search(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: Option<&PayloadFilter>,
    ) -> Result<Vec<ScoredPoint>, SearchError>;

    /// Creates a payload index enabling filtered search on `field`.
    /// Idempotent.
    async fn create_payload_index(&self, field: PayloadField) -> Result<(), SearchError>;

    /// Removes vectors by id; unknown ids are ignored.
    async fn delete(&self, ids: &[ChunkId]) -> Result<(), SearchError>;

    /// Number of stored vectors.
    async fn count(&self) -> Result<usize, SearchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_serde_round_trip() {
        let mut metadata = HashMap::new();
        metadata.insert("lang".to_string(), Value::String("en".to_string()));
        let payload = ChunkPayload {
            source: "notes.md".to_string(),
            chunk_index: 3,
            text: "some chunk text".to_string(),
            metadata,
        };
        let json = serde_json::to_string(&payload).unwrap();
        let back: ChunkPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(back, payload);
    }

    #[test]
    fn test_payload_metadata_defaults_to_empty() {
        let json = r#"{"source":"a.txt","chunk_index":0,"text":"t"}"#;
        let payload: ChunkPayload = serde_json::from_str(json).unwrap();
        assert!(payload.metadata.is_empty());
    }

    #[test]
    fn test_payload_field_names() {
        assert_eq!(PayloadField::Source.name(), "source");
        assert_eq!(PayloadField::ChunkIndex.name(), "chunk_index");
    }

    #[test]
    fn test_empty_filter() {
        assert!(PayloadFilter::default().is_empty());
        let filter = PayloadFilter {
            source: Some("a.txt".to_string()),
            ..Default::default()
        };
        assert!(!filter.is_empty());
        let filter = PayloadFilter {
            chunk_index: Some(2),
            ..Default::default()
        };
        assert!(!filter.is_empty());
    }
}
