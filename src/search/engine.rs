//! Query engine orchestrating the retrieval paths.
//!
//! Owns the sparse index and the in-memory chunk catalog, borrows the dense
//! path through [`DenseRetriever`], and combines the two with Reciprocal
//! Rank Fusion for hybrid queries. Optionally re-scores candidates through
//! a [`Reranker`] and attaches a [`QualityReport`] to every response.

use super::dense::DenseRetriever;
use super::fusion::{reciprocal_rank_fusion, RRF_K};
use super::quality::QualityReport;
use super::sparse::SparseIndex;
use super::types::{ChunkId, ChunkRecord, Ranking, SearchResult};
use crate::config::{CANDIDATE_MULTIPLIER, DEFAULT_TOP_K};
use crate::embedding::Reranker;
use crate::error::SearchError;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

/// Which retrieval paths a query exercises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetrievalMode {
    /// Vector similarity only
    Dense,
    /// BM25 keyword matching only
    Sparse,
    /// Both paths, combined with Reciprocal Rank Fusion
    #[default]
    Hybrid,
}

/// Per-query knobs.
#[derive(Debug, Clone)]
pub struct QueryOptions {
    /// Number of results to return
    pub top_k: usize,
    /// Retrieval paths to exercise
    pub mode: RetrievalMode,
    /// Re-score candidates through the configured reranker
    pub rerank: bool,
    /// Attach a [`QualityReport`] to the response
    pub metrics: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            mode: RetrievalMode::Hybrid,
            rerank: false,
            metrics: true,
        }
    }
}

/// Response to a query: hydrated results plus optional quality assessment.
#[derive(Debug, Clone)]
pub struct QueryResponse {
    /// Top results, best first
    pub results: Vec<SearchResult>,
    /// Quality assessment over the pre-truncation ranking, when requested
    pub quality: Option<QualityReport>,
}

/// Hybrid retrieval engine.
///
/// Indexing (from ingestion) and querying may run concurrently; the sparse
/// index and catalog sit behind a single `RwLock` each so queries see a
/// consistent snapshot of whatever has been committed so far.
pub struct QueryEngine {
    sparse: RwLock<SparseIndex>,
    catalog: RwLock<HashMap<ChunkId, ChunkRecord>>,
    dense: DenseRetriever,
    reranker: Option<Arc<dyn Reranker>>,
}

impl QueryEngine {
    /// Creates an engine with an empty index over the given dense path.
    pub fn new(dense: DenseRetriever) -> Self {
        Self {
            sparse: RwLock::new(SparseIndex::new()),
            catalog: RwLock::new(HashMap::new()),
            dense,
            reranker: None,
        }
    }

    /// Attaches a reranker, enabling `QueryOptions::rerank`.
    pub fn with_reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    /// Commits chunk records to the sparse index and the catalog.
    ///
    /// This is the single write path for query-side state; the ingestion
    /// pipeline calls it from its aggregation point after vectors have been
    /// upserted to the store.
    pub async fn index_chunks(&self, records: Vec<ChunkRecord>) {
        let mut sparse = self.sparse.write().await;
        let mut catalog = self.catalog.write().await;
        for record in records {
            sparse.add_chunk(record.id, &record.text);
            catalog.insert(record.id, record);
        }
        debug!(indexed = catalog.len(), "catalog updated");
    }

    /// Removes every chunk belonging to `source` from the sparse index and
    /// catalog, returning the removed ids so the caller can delete the
    /// matching vectors from the store.
    pub async fn remove_source(&self, source: &str) -> Vec<ChunkId> {
        let mut sparse = self.sparse.write().await;
        let mut catalog = self.catalog.write().await;
        let ids: Vec<ChunkId> = catalog
            .values()
            .filter(|r| r.source == source)
            .map(|r| r.id)
            .collect();
        for id in &ids {
            sparse.remove_chunk(*id);
            catalog.remove(id);
        }
        info!(source, removed = ids.len(), "source removed from index");
        ids
    }

    /// Number of indexed chunks.
    pub async fn chunk_count(&self) -> usize {
        self.catalog.read().await.len()
    }

    /// Runs a query.
    ///
    /// Both paths fetch `CANDIDATE_MULTIPLIER * top_k` candidates so fusion
    /// and reranking see a wider field than the final cut. Quality metrics
    /// are computed over the full candidate ranking actually returned from
    /// (before truncation to `top_k`), so they reflect the distribution the
    /// ranking was drawn from.
    ///
    /// # Errors
    ///
    /// - [`SearchError::InvalidQuery`] for an empty/whitespace query or
    ///   `top_k == 0`
    /// - [`SearchError::Rerank`] when `rerank` is requested without a
    ///   configured reranker
    /// - Provider and store failures propagate unchanged
    #[instrument(skip(self, question, options), fields(mode = ?options.mode, top_k = options.top_k))]
    pub async fn query(
        &self,
        question: &str,
        options: &QueryOptions,
    ) -> Result<QueryResponse, SearchError> {
        if question.trim().is_empty() {
            return Err(SearchError::InvalidQuery(
                "query text must not be empty".to_string(),
            ));
        }
        if options.top_k == 0 {
            return Err(SearchError::InvalidQuery(
                "top_k must be greater than zero".to_string(),
            ));
        }
        if options.rerank && self.reranker.is_none() {
            return Err(SearchError::Rerank(
                "rerank requested but no reranker is configured".to_string(),
            ));
        }

        let fetch = options.top_k * CANDIDATE_MULTIPLIER;

        let (mut ranking, sparse_ranking, dense_ranking): (
            Ranking,
            Option<Ranking>,
            Option<Ranking>,
        ) = match options.mode {
            RetrievalMode::Sparse => {
                let sparse = self.sparse.read().await.search(question, fetch);
                (sparse.clone(), Some(sparse), None)
            }
            RetrievalMode::Dense => {
                let dense = self.dense.search(question, fetch, None).await?;
                (dense.clone(), None, Some(dense))
            }
            RetrievalMode::Hybrid => {
                let sparse = self.sparse.read().await.search(question, fetch);
                let dense = self.dense.search(question, fetch, None).await?;
                let fused = reciprocal_rank_fusion(&[dense.clone(), sparse.clone()], RRF_K)
                    .map_err(|e| SearchError::InvalidQuery(e.to_string()))?;
                let ranking = fused.into_iter().map(|f| (f.id, f.score)).collect();
                (ranking, Some(sparse), Some(dense))
            }
        };

        if options.rerank {
            if let Some(reranker) = &self.reranker {
                ranking = self.rerank(reranker.as_ref(), question, ranking).await?;
            }
        }

        let quality = options
            .metrics
            .then(|| {
                let scores: Vec<f64> = ranking.iter().map(|(_, s)| *s).collect();
                QualityReport::from_scores(&scores)
            });

        ranking.truncate(options.top_k);
        let results = self
            .hydrate(&ranking, sparse_ranking.as_deref(), dense_ranking.as_deref())
            .await;
        debug!(results = results.len(), "query complete");

        Ok(QueryResponse { results, quality })
    }

    /// Re-scores the candidate ranking through the reranker.
    async fn rerank(
        &self,
        reranker: &dyn Reranker,
        question: &str,
        ranking: Ranking,
    ) -> Result<Ranking, SearchError> {
        if ranking.is_empty() {
            return Ok(ranking);
        }
        let catalog = self.catalog.read().await;
        let documents: Vec<String> = ranking
            .iter()
            .map(|(id, _)| {
                catalog
                    .get(id)
                    .map(|r| r.text.clone())
                    .unwrap_or_default()
            })
            .collect();
        drop(catalog);

        let scored = reranker
            .rerank(question, &documents)
            .await
            .map_err(|e| SearchError::Rerank(e.to_string()))?;

        let mut reranked: Ranking = Vec::with_capacity(scored.len());
        for (index, score) in scored {
            match ranking.get(index) {
                Some((id, _)) => reranked.push((*id, score)),
                None => {
                    return Err(SearchError::Rerank(format!(
                        "reranker returned index {index} for {} candidates",
                        ranking.len()
                    )))
                }
            }
        }
        super::types::sort_ranking(&mut reranked);
        Ok(reranked)
    }

    /// Looks up catalog records for the final ranking and carries the
    /// per-path scores along for transparency.
    async fn hydrate(
        &self,
        ranking: &[(ChunkId, f64)],
        sparse: Option<&[(ChunkId, f64)]>,
        dense: Option<&[(ChunkId, f64)]>,
    ) -> Vec<SearchResult> {
        let sparse_scores: HashMap<ChunkId, f64> =
            sparse.map(|r| r.iter().copied().collect()).unwrap_or_default();
        let dense_scores: HashMap<ChunkId, f64> =
            dense.map(|r| r.iter().copied().collect()).unwrap_or_default();

        let catalog = self.catalog.read().await;
        let mut results = Vec::with_capacity(ranking.len());
        for (id, score) in ranking {
            match catalog.get(id) {
                Some(record) => results.push(SearchResult {
                    chunk_id: *id,
                    score: *score,
                    sparse_score: sparse_scores.get(id).copied(),
                    dense_score: dense_scores.get(id).copied(),
                    text: record.text.clone(),
                    source: record.source.clone(),
                    chunk_index: record.chunk_index,
                    metadata: record.metadata.clone(),
                }),
                None => {
                    // Store and catalog disagree; drop the hit rather than
                    // fabricate an empty result
                    warn!(id = id.as_u64(), "ranked chunk missing from catalog");
                }
            }
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::EmbeddingProvider;
    use crate::error::ProviderError;
    use crate::store::{ChunkPayload, DistanceMetric, InMemoryVectorStore, VectorStore};
    use async_trait::async_trait;

    /// One-hot embeddings for a tiny fixed vocabulary.
    struct ToyProvider;

    const TOPICS: [&str; 3] = ["rust", "python", "cooking"];

    #[async_trait]
    impl EmbeddingProvider for ToyProvider {
        fn dimension(&self) -> usize {
            TOPICS.len()
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
            let lower = text.to_lowercase();
            let mut v = vec![0.0; TOPICS.len()];
            for (i, topic) in TOPICS.iter().enumerate() {
                if lower.contains(topic) {
                    v[i] = 1.0;
                }
            }
            if v.iter().all(|x| *x == 0.0) {
                v[TOPICS.len() - 1] = 0.1;
            }
            Ok(v)
        }
    }

    struct ReverseReranker;

    #[async_trait]
    impl Reranker for ReverseReranker {
        async fn rerank(
            &self,
            _query: &str,
            documents: &[String],
        ) -> Result<Vec<(usize, f64)>, ProviderError> {
            Ok((0..documents.len())
                .rev()
                .enumerate()
                .map(|(rank, index)| (index, (documents.len() - rank) as f64))
                .collect())
        }
    }

    async fn engine_with_corpus() -> QueryEngine {
        let provider = Arc::new(ToyProvider);
        let store = Arc::new(InMemoryVectorStore::new(3, DistanceMetric::Cosine));
        let corpus = [
            "rust has a strict borrow checker",
            "python is great for scripting",
            "cooking pasta requires salted water",
        ];
        let mut records = Vec::new();
        let mut points = Vec::new();
        for (i, text) in corpus.iter().enumerate() {
            let id = ChunkId::new();
            let vector = provider.embed(text).await.unwrap();
            records.push(ChunkRecord {
                id,
                text: text.to_string(),
                source: format!("doc{i}.txt"),
                chunk_index: 0,
                metadata: HashMap::new(),
            });
            points.push((
                id,
                vector,
                ChunkPayload {
                    source: format!("doc{i}.txt"),
                    chunk_index: 0,
                    text: text.to_string(),
                    metadata: HashMap::new(),
                },
            ));
        }
        store.upsert(points).await.unwrap();
        let dense = DenseRetriever::new(provider, store).unwrap();
        let engine = QueryEngine::new(dense);
        engine.index_chunks(records).await;
        engine
    }

    #[tokio::test]
    async fn test_sparse_mode_matches_keywords() {
        let engine = engine_with_corpus().await;
        let options = QueryOptions {
            mode: RetrievalMode::Sparse,
            ..Default::default()
        };
        let response = engine.query("borrow checker", &options).await.unwrap();
        assert!(!response.results.is_empty());
        assert!(response.results[0].text.contains("borrow checker"));
        assert!(response.results[0].sparse_score.is_some());
        assert!(response.results[0].dense_score.is_none());
    }

    #[tokio::test]
    async fn test_dense_mode_matches_topic() {
        let engine = engine_with_corpus().await;
        let options = QueryOptions {
            mode: RetrievalMode::Dense,
            ..Default::default()
        };
        let response = engine.query("tell me about python", &options).await.unwrap();
        assert!(response.results[0].text.contains("python"));
        assert!(response.results[0].dense_score.is_some());
        assert!(response.results[0].sparse_score.is_none());
    }

    #[tokio::test]
    async fn test_hybrid_agrees_when_both_paths_agree() {
        let engine = engine_with_corpus().await;
        let options = QueryOptions::default();
        // "rust" is both a keyword match and the dense topic
        let response = engine.query("rust borrow checker", &options).await.unwrap();
        assert!(response.results[0].text.contains("rust"));
        // The winner was seen by both paths
        assert!(response.results[0].sparse_score.is_some());
        assert!(response.results[0].dense_score.is_some());
    }

    #[tokio::test]
    async fn test_empty_query_is_invalid() {
        let engine = engine_with_corpus().await;
        let err = engine
            .query("   ", &QueryOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::InvalidQuery(_)));
    }

    #[tokio::test]
    async fn test_zero_top_k_is_invalid() {
        let engine = engine_with_corpus().await;
        let options = QueryOptions {
            top_k: 0,
            ..Default::default()
        };
        let err = engine.query("rust", &options).await.unwrap_err();
        assert!(matches!(err, SearchError::InvalidQuery(_)));
    }

    #[tokio::test]
    async fn test_rerank_without_reranker_is_an_error() {
        let engine = engine_with_corpus().await;
        let options = QueryOptions {
            rerank: true,
            ..Default::default()
        };
        let err = engine.query("rust", &options).await.unwrap_err();
        assert!(matches!(err, SearchError::Rerank(_)));
    }

    #[tokio::test]
    async fn test_rerank_reorders_results() {
        let engine = engine_with_corpus().await.with_reranker(Arc::new(ReverseReranker));
        let baseline = engine
            .query("rust borrow checker", &QueryOptions::default())
            .await
            .unwrap();
        let options = QueryOptions {
            rerank: true,
            ..Default::default()
        };
        let reranked = engine.query("rust borrow checker", &options).await.unwrap();
        assert_eq!(baseline.results.len(), reranked.results.len());
        // The reverse reranker flips the candidate order
        assert_eq!(
            baseline.results.first().map(|r| r.chunk_id),
            reranked.results.last().map(|r| r.chunk_id)
        );
    }

    #[tokio::test]
    async fn test_metrics_flag_controls_quality_block() {
        let engine = engine_with_corpus().await;
        let with_metrics = engine
            .query("rust", &QueryOptions::default())
            .await
            .unwrap();
        assert!(with_metrics.quality.is_some());

        let options = QueryOptions {
            metrics: false,
            ..Default::default()
        };
        let without = engine.query("rust", &options).await.unwrap();
        assert!(without.quality.is_none());
    }

    #[tokio::test]
    async fn test_truncation_respects_top_k() {
        let engine = engine_with_corpus().await;
        let options = QueryOptions {
            top_k: 1,
            ..Default::default()
        };
        let response = engine.query("rust python cooking", &options).await.unwrap();
        assert_eq!(response.results.len(), 1);
    }

    #[tokio::test]
    async fn test_remove_source_drops_chunks() {
        let engine = engine_with_corpus().await;
        assert_eq!(engine.chunk_count().await, 3);
        let removed = engine.remove_source("doc0.txt").await;
        assert_eq!(removed.len(), 1);
        assert_eq!(engine.chunk_count().await, 2);

        let options = QueryOptions {
            mode: RetrievalMode::Sparse,
            ..Default::default()
        };
        let response = engine.query("borrow checker", &options).await.unwrap();
        assert!(response
            .results
            .iter()
            .all(|r| r.source != "doc0.txt"));
    }

    #[tokio::test]
    async fn test_query_on_empty_engine_returns_poor_quality() {
        let provider = Arc::new(ToyProvider);
        let store = Arc::new(InMemoryVectorStore::new(3, DistanceMetric::Cosine));
        let dense = DenseRetriever::new(provider, store).unwrap();
        let engine = QueryEngine::new(dense);

        let response = engine
            .query("anything", &QueryOptions::default())
            .await
            .unwrap();
        assert!(response.results.is_empty());
        let quality = response.quality.unwrap();
        assert_eq!(quality.confidence, 0.0);
    }
}
