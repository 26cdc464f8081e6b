//! Core types shared across the search paths.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Unique chunk identifier.
///
/// IDs are generated atomically so concurrent ingestion tasks never collide.
/// Insertion order is preserved in the numeric value, which makes ascending
/// id the documented deterministic tie-break everywhere scores are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkId(u64);

/// Global counter for generating unique chunk IDs.
static CHUNK_ID_COUNTER: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(0);

impl ChunkId {
    /// Generates a new unique chunk ID.
    ///
    /// Note: `Default` is intentionally not implemented — calling a default
    /// constructor twice would yield different values, violating the
    /// expectation that `default()` is stable.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        use std::sync::atomic::Ordering;
        Self(CHUNK_ID_COUNTER.fetch_add(1, Ordering::SeqCst))
    }

    /// Creates a ChunkId from a raw u64 value.
    ///
    /// Useful for deserialization or tests. Take care not to collide with
    /// generated IDs.
    pub fn from_u64(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw u64 value of this ID.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// An ordered sequence of `(id, score)` pairs, highest score first.
///
/// Produced independently by the sparse and dense paths and consumed by the
/// fusion engine. Always sorted by [`sort_ranking`] before leaving a search
/// path so fusion is reproducible.
pub type Ranking = Vec<(ChunkId, f64)>;

/// Sorts a ranking by descending score, ties broken by ascending id.
///
/// The id tie-break is the documented deterministic order that makes fused
/// rankings reproducible across runs.
pub fn sort_ranking(ranking: &mut Ranking) {
    ranking.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
}

/// Stored chunk record, hydrated into search results.
///
/// The query engine keeps these in an in-memory catalog; the same fields are
/// persisted as the vector store payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Unique chunk identifier
    pub id: ChunkId,
    /// Chunk text content
    pub text: String,
    /// Source identifier (path or URL)
    pub source: String,
    /// 0-based position of this chunk within its source
    pub chunk_index: usize,
    /// Caller-supplied metadata
    pub metadata: HashMap<String, serde_json::Value>,
}

/// A single query result with its relevance scores.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// Chunk identifier
    pub chunk_id: ChunkId,
    /// Final relevance score (BM25, similarity, fused, or reranked,
    /// depending on the query mode)
    pub score: f64,
    /// Sparse (BM25) score, when the sparse path contributed
    pub sparse_score: Option<f64>,
    /// Dense similarity score, when the dense path contributed
    pub dense_score: Option<f64>,
    /// Chunk text content
    pub text: String,
    /// Source identifier
    pub source: String,
    /// Position of the chunk within its source
    pub chunk_index: usize,
    /// Caller-supplied metadata
    pub metadata: HashMap<String, serde_json::Value>,
}
