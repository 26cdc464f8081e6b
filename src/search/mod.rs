//! Hybrid retrieval: sparse BM25, dense vector similarity, rank fusion,
//! quality metrics, and the query engine that ties them together.
//!
//! The two first-stage paths produce [`types::Ranking`]s independently;
//! [`fusion::reciprocal_rank_fusion`] merges them by rank rather than by
//! score, so the incomparable BM25 and similarity scales never need
//! normalizing against each other.

pub mod dense;
pub mod engine;
pub mod fusion;
pub mod quality;
pub mod sparse;
pub mod types;

pub use dense::DenseRetriever;
pub use engine::{QueryEngine, QueryOptions, QueryResponse, RetrievalMode};
pub use fusion::{reciprocal_rank_fusion, FusedResult, RRF_K};
pub use quality::{QualityLabel, QualityReport};
pub use sparse::SparseIndex;
pub use types::{ChunkId, ChunkRecord, Ranking, SearchResult};
