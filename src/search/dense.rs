//! Dense retrieval over an embedding provider and a vector store.
//!
//! Adapts two external collaborators into a ranked retrieval path: embed
//! the query, nearest-neighbor search the store, and normalize the store's
//! native metric into a uniform higher-is-better similarity so dense
//! rankings are comparable across store configurations.

use super::types::Ranking;
use crate::embedding::EmbeddingProvider;
use crate::error::SearchError;
use crate::store::{DistanceMetric, PayloadFilter, VectorStore};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Converts a raw metric value from the store into a similarity where
/// higher = more relevant.
fn to_similarity(metric: DistanceMetric, raw: f64) -> f64 {
    match metric {
        DistanceMetric::Cosine => 1.0 - raw,
        DistanceMetric::Dot => raw,
        DistanceMetric::Euclidean => 1.0 / (1.0 + raw),
    }
}

/// Dense retrieval path: query text in, similarity-ranked chunk ids out.
pub struct DenseRetriever {
    provider: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
}

// Manual impl: the trait objects are not Debug
impl fmt::Debug for DenseRetriever {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DenseRetriever")
            .field("dimension", &self.store.dimension())
            .field("metric", &self.store.metric())
            .finish_non_exhaustive()
    }
}

impl DenseRetriever {
    /// Pairs a provider with a store.
    ///
    /// The provider's embedding dimension must match the store's collection
    /// dimension; a mismatch is a structural incompatibility that every
    /// later search would hit, so it is rejected here once with
    /// [`SearchError::DimensionMismatch`] rather than surfacing per query.
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
    ) -> Result<Self, SearchError> {
        let expected = store.dimension();
        let actual = provider.dimension();
        if expected != actual {
            return Err(SearchError::DimensionMismatch { expected, actual });
        }
        Ok(Self { provider, store })
    }

    /// Embeds `query` and returns the `top_k` most similar chunks.
    ///
    /// Scores are similarities (higher = better) regardless of the store's
    /// native metric. An empty query embeds like any other string; stores
    /// decide what it is near.
    #[instrument(skip(self, query), fields(query_len = query.len()))]
    pub async fn search(
        &self,
        query: &str,
        top_k: usize,
        filter: Option<&PayloadFilter>,
    ) -> Result<Ranking, SearchError> {
        if top_k == 0 {
            return Ok(Vec::new());
        }
        let vector = self.provider.embed(query).await?;
        let metric = self.store.metric();
        let hits = self.store.search(&vector, top_k, filter).await?;
        debug!(hits = hits.len(), "dense search complete");

        let mut ranking: Ranking = hits
            .into_iter()
            .map(|hit| (hit.id, to_similarity(metric, hit.score)))
            .collect();
        // Stores return best-first in their native metric; after conversion
        // the order is the same, but re-sort so ties stay id-deterministic
        super::types::sort_ranking(&mut ranking);
        Ok(ranking)
    }

    /// Embedding dimension shared by the provider and the store.
    pub fn dimension(&self) -> usize {
        self.store.dimension()
    }
}

/// Convenience for tests and callers that already hold raw store output.
pub fn similarity_from_metric(metric: DistanceMetric, raw: f64) -> f64 {
    to_similarity(metric, raw)
}
