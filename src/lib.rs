//! Hybrid retrieval core for RAG applications.
//!
//! `radiate` turns documents into searchable chunks and answers queries by
//! combining two retrieval paths:
//!
//! - **Sparse**: a BM25 inverted index over chunk text ([`search::SparseIndex`])
//! - **Dense**: vector similarity through pluggable embedding providers and
//!   vector stores ([`search::DenseRetriever`])
//!
//! Hybrid queries fuse the two with Reciprocal Rank Fusion and attach a
//! quality assessment so callers can gate downstream behavior on retrieval
//! confidence.
//!
//! # Architecture
//!
//! ```text
//! files ──> ingest::IngestPipeline ──> chunking ──> embedding ──> store
//!                                          │
//!                                          └──> search::QueryEngine
//!                                                 (sparse + dense + fusion)
//! ```
//!
//! The embedding provider, vector store, and reranker are capability traits
//! ([`embedding::EmbeddingProvider`], [`store::VectorStore`],
//! [`embedding::Reranker`]); [`store::InMemoryVectorStore`] is the bundled
//! store for small corpora and tests.
//!
//! # Example
//!
//! ```ignore
//! use radiate::ingest::{IngestOptions, IngestPipeline};
//! use radiate::search::{DenseRetriever, QueryEngine, QueryOptions};
//! use std::sync::Arc;
//!
//! let dense = DenseRetriever::new(provider.clone(), store.clone())?;
//! let engine = Arc::new(QueryEngine::new(dense));
//! let pipeline = IngestPipeline::new(engine.clone(), provider, store);
//!
//! pipeline.ingest_directory("./docs", &IngestOptions::default()).await?;
//! let response = engine.query("how does chunk overlap work?", &QueryOptions::default()).await?;
//! ```

pub mod chunking;
pub mod config;
pub mod embedding;
pub mod error;
pub mod ingest;
pub mod search;
pub mod store;

pub use chunking::{chunk, Chunk, ChunkConfig, ChunkMode, Document, FileType};
pub use error::{
    ChunkConfigError, FusionError, IngestError, ProviderError, ReadError, SearchError,
};
pub use ingest::{IngestOptions, IngestPipeline, IngestReport};
pub use search::{
    ChunkId, QueryEngine, QueryOptions, QueryResponse, QualityReport, RetrievalMode,
    SearchResult,
};
pub use store::{DistanceMetric, InMemoryVectorStore, VectorStore};
