//! Embedding and reranking capability traits.
//!
//! This module defines the abstractions for text embedding backends and
//! cross-encoder rerankers. These traits allow different providers (hosted
//! APIs, local models) to be swapped without changing dependent code, and
//! [`CachedEmbedder`] adds transparent content-addressed caching around any
//! provider.

use crate::error::ProviderError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Trait for text embedding backends.
///
/// Implementations must be `Send + Sync`: the ingestion pipeline calls
/// embedding methods from concurrent worker tasks.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the embedding dimension (vector size).
    ///
    /// All embeddings from this provider have this length; the dense
    /// retriever validates it against the vector store before any search.
    fn dimension(&self) -> usize;

    /// Generates an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError>;

    /// Generates embeddings for a batch of texts, one vector per input,
    /// in input order.
    ///
    /// The default implementation embeds sequentially; providers with a
    /// native batch endpoint should override it.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }
}

/// Trait for cross-encoder rerankers.
///
/// A reranker re-scores candidate documents against the query with a more
/// expensive model than the first-stage retrievers. It is an optional
/// capability; retrieval works without one.
#[async_trait]
pub trait Reranker: Send + Sync {
    /// Re-scores `documents` against `query`.
    ///
    /// Returns `(input_index, relevance_score)` pairs sorted by descending
    /// relevance. Implementations may return fewer pairs than inputs but
    /// must never invent indices outside `0..documents.len()`.
    async fn rerank(
        &self,
        query: &str,
        documents: &[String],
    ) -> Result<Vec<(usize, f64)>, ProviderError>;
}

/// Cache hit/miss counters for a [`CachedEmbedder`] instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EmbeddingStats {
    /// Embeddings served from the cache
    pub hits: u64,
    /// Embeddings computed by the underlying provider
    pub misses: u64,
}

impl EmbeddingStats {
    /// Fraction of requests served from cache, 0.0 when nothing was requested.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Content-addressed caching wrapper around any [`EmbeddingProvider`].
///
/// Identical input text always maps to the same vector, so re-ingesting
/// unchanged files costs nothing at the provider. The cache is unbounded
/// and keyed by the text itself; entries live as long as the wrapper.
/// Stats are per instance, readable at any time via [`Self::stats`].
pub struct CachedEmbedder {
    inner: Arc<dyn EmbeddingProvider>,
    cache: RwLock<HashMap<String, Vec<f32>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CachedEmbedder {
    /// Wraps `provider` with an empty cache.
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            inner: provider,
            cache: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Snapshot of the hit/miss counters.
    pub fn stats(&self) -> EmbeddingStats {
        EmbeddingStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Number of cached embeddings.
    pub async fn cached_entries(&self) -> usize {
        self.cache.read().await.len()
    }
}

#[async_trait]
impl EmbeddingProvider for CachedEmbedder {
    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        if let Some(vector) = self.cache.read().await.get(text) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(vector.clone());
        }
        let vector = self.inner.embed(text).await?;
        self.misses.fetch_add(1, Ordering::Relaxed);
        self.cache
            .write()
            .await
            .insert(text.to_string(), vector.clone());
        Ok(vector)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        // Serve what we can from cache, batch the rest through the provider
        let mut results: Vec<Option<Vec<f32>>> = vec![None; texts.len()];
        let mut missing: Vec<usize> = Vec::new();
        {
            let cache = self.cache.read().await;
            for (i, text) in texts.iter().enumerate() {
                match cache.get(text) {
                    Some(vector) => results[i] = Some(vector.clone()),
                    None => missing.push(i),
                }
            }
        }
        let hits = (texts.len() - missing.len()) as u64;
        self.hits.fetch_add(hits, Ordering::Relaxed);

        if !missing.is_empty() {
            debug!(
                total = texts.len(),
                misses = missing.len(),
                "embedding cache misses"
            );
            let to_embed: Vec<String> = missing.iter().map(|&i| texts[i].clone()).collect();
            let vectors = self.inner.embed_batch(&to_embed).await?;
            if vectors.len() != to_embed.len() {
                return Err(ProviderError::InvalidInput(format!(
                    "provider returned {} vectors for {} inputs",
                    vectors.len(),
                    to_embed.len()
                )));
            }
            self.misses.fetch_add(missing.len() as u64, Ordering::Relaxed);
            let mut cache = self.cache.write().await;
            for (&i, vector) in missing.iter().zip(vectors) {
                cache.insert(texts[i].clone(), vector.clone());
                results[i] = Some(vector);
            }
        }

        // Every slot is filled: cache hits above, provider results here
        Ok(results.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    /// Deterministic provider that counts calls; vector = [len, 0, 0, ...]
    struct CountingProvider {
        dim: usize,
        calls: AtomicUsize,
    }

    impl CountingProvider {
        fn new(dim: usize) -> Self {
            Self {
                dim,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl EmbeddingProvider for CountingProvider {
        fn dimension(&self) -> usize {
            self.dim
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut v = vec![0.0; self.dim];
            v[0] = text.len() as f32;
            Ok(v)
        }
    }

    #[tokio::test]
    async fn test_repeat_embed_hits_cache() {
        let provider = Arc::new(CountingProvider::new(4));
        let cached = CachedEmbedder::new(provider.clone());

        let first = cached.embed("hello world").await.unwrap();
        let second = cached.embed("hello world").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

        let stats = cached.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate() - 0.5).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_batch_mixes_cached_and_fresh() {
        let provider = Arc::new(CountingProvider::new(4));
        let cached = CachedEmbedder::new(provider.clone());

        cached.embed("alpha").await.unwrap();
        let texts = vec!["alpha".to_string(), "beta".to_string(), "gamma".to_string()];
        let vectors = cached.embed_batch(&texts).await.unwrap();
        assert_eq!(vectors.len(), 3);
        assert_eq!(vectors[0][0], 5.0);
        assert_eq!(vectors[1][0], 4.0);

        // "alpha" was cached; "beta" and "gamma" went through embed()
        let stats = cached.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 3);
        assert_eq!(cached.cached_entries().await, 3);
    }

    #[tokio::test]
    async fn test_stats_are_per_instance() {
        let provider = Arc::new(CountingProvider::new(2));
        let a = CachedEmbedder::new(provider.clone());
        let b = CachedEmbedder::new(provider);

        a.embed("x").await.unwrap();
        assert_eq!(a.stats().misses, 1);
        assert_eq!(b.stats(), EmbeddingStats::default());
    }

    #[tokio::test]
    async fn test_dimension_passes_through() {
        let cached = CachedEmbedder::new(Arc::new(CountingProvider::new(7)));
        assert_eq!(cached.dimension(), 7);
    }
}
