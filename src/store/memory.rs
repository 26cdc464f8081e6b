//! Brute-force in-memory vector store.
//!
//! Exact (non-approximate) nearest-neighbor search over a `HashMap` of
//! vectors. Linear scan per query, so it stays practical up to tens of
//! thousands of chunks; beyond that a real ANN-backed store should sit
//! behind the same trait.

use super::{
    ChunkPayload, DistanceMetric, PayloadField, PayloadFilter, ScoredPoint, VectorStore,
};
use crate::error::SearchError;
use crate::search::types::ChunkId;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::debug;

struct Point {
    vector: Vec<f32>,
    payload: ChunkPayload,
}

struct Inner {
    points: HashMap<ChunkId, Point>,
    indexed_fields: HashSet<PayloadField>,
}

/// In-memory [`VectorStore`] with exact brute-force search.
pub struct InMemoryVectorStore {
    dimension: usize,
    metric: DistanceMetric,
    inner: RwLock<Inner>,
}

impl InMemoryVectorStore {
    /// Creates an empty store for vectors of `dimension` under `metric`.
    pub fn new(dimension: usize, metric: DistanceMetric) -> Self {
        Self {
            dimension,
            metric,
            inner: RwLock::new(Inner {
                points: HashMap::new(),
                indexed_fields: HashSet::new(),
            }),
        }
    }

    /// Raw metric value between two vectors of equal length.
    fn raw_score(&self, a: &[f32], b: &[f32]) -> f64 {
        match self.metric {
            DistanceMetric::Cosine => {
                let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
                let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
                let mag_b: f32 = b.iter().map(|y| y * y).sum::<f32>().sqrt();
                if mag_a == 0.0 || mag_b == 0.0 {
                    // Zero vectors have no direction: maximum distance
                    return 2.0;
                }
                (1.0 - dot / (mag_a * mag_b)) as f64
            }
            DistanceMetric::Dot => a.iter().zip(b).map(|(x, y)| (x * y) as f64).sum(),
            DistanceMetric::Euclidean => a
                .iter()
                .zip(b)
                .map(|(x, y)| {
                    let d = (x - y) as f64;
                    d * d
                })
                .sum::<f64>()
                .sqrt(),
        }
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<(), SearchError> {
        if vector.len() != self.dimension {
            return Err(SearchError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn metric(&self) -> DistanceMetric {
        self.metric
    }

    async fn upsert(
        &self,
        points: Vec<(ChunkId, Vec<f32>, ChunkPayload)>,
    ) -> Result<(), SearchError> {
        // Validate the whole batch before writing any of it
        for (_, vector, _) in &points {
            self.check_dimension(vector)?;
        }
        let mut inner = self.inner.write().await;
        for (id, vector, payload) in points {
            inner.points.insert(id, Point { vector, payload });
        }
        Ok(())
    }

    async fn search(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: Option<&PayloadFilter>,
    ) -> Result<Vec<ScoredPoint>, SearchError> {
        self.check_dimension(vector)?;
        let inner = self.inner.read().await;

        let constrained = filter.filter(|f| !f.is_empty());
        if let Some(f) = constrained {
            for (set, field) in [
                (f.source.is_some(), PayloadField::Source),
                (f.chunk_index.is_some(), PayloadField::ChunkIndex),
            ] {
                if set && !inner.indexed_fields.contains(&field) {
                    return Err(SearchError::MissingPayloadIndex(field.name().to_string()));
                }
            }
        }

        let mut hits: Vec<ScoredPoint> = inner
            .points
            .iter()
            .filter(|(_, point)| match constrained {
                Some(f) => {
                    f.source
                        .as_deref()
                        .map_or(true, |source| point.payload.source == source)
                        && f.chunk_index
                            .map_or(true, |index| point.payload.chunk_index == index)
                }
                None => true,
            })
            .map(|(id, point)| ScoredPoint {
                id: *id,
                score: self.raw_score(vector, &point.vector),
                payload: point.payload.clone(),
            })
            .collect();

        // Dot product: higher is better; distances: lower is better
        match self.metric {
            DistanceMetric::Dot => hits.sort_by(|a, b| {
                b.score
                    .partial_cmp(&a.score)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.id.cmp(&b.id))
            }),
            DistanceMetric::Cosine | DistanceMetric::Euclidean => hits.sort_by(|a, b| {
                a.score
                    .partial_cmp(&b.score)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.id.cmp(&b.id))
            }),
        }

        hits.truncate(top_k);
        debug!(hits = hits.len(), top_k, "vector search complete");
        Ok(hits)
    }

    async fn create_payload_index(&self, field: PayloadField) -> Result<(), SearchError> {
        self.inner.write().await.indexed_fields.insert(field);
        Ok(())
    }

    async fn delete(&self, ids: &[ChunkId]) -> Result<(), SearchError> {
        let mut inner = self.inner.write().await;
        for id in ids {
            inner.points.remove(id);
        }
        Ok(())
    }

    async fn count(&self) -> Result<usize, SearchError> {
        Ok(self.inner.read().await.points.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(source: &str, index: usize) -> ChunkPayload {
        ChunkPayload {
            source: source.to_string(),
            chunk_index: index,
            text: format!("{source} chunk {index}"),
            metadata: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn test_cosine_orders_by_angle() {
        let store = InMemoryVectorStore::new(3, DistanceMetric::Cosine);
        store
            .upsert(vec![
                (ChunkId::from_u64(1), vec![1.0, 0.0, 0.0], payload("a", 0)),
                (ChunkId::from_u64(2), vec![0.7, 0.7, 0.0], payload("a", 1)),
                (ChunkId::from_u64(3), vec![0.0, 1.0, 0.0], payload("a", 2)),
            ])
            .await
            .unwrap();

        let hits = store.search(&[1.0, 0.0, 0.0], 3, None).await.unwrap();
        let ids: Vec<u64> = hits.iter().map(|h| h.id.as_u64()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(hits[0].score < 1e-6); // identical direction -> distance ~0
    }

    #[tokio::test]
    async fn test_dot_orders_descending() {
        let store = InMemoryVectorStore::new(2, DistanceMetric::Dot);
        store
            .upsert(vec![
                (ChunkId::from_u64(1), vec![0.1, 0.1], payload("a", 0)),
                (ChunkId::from_u64(2), vec![2.0, 2.0], payload("a", 1)),
            ])
            .await
            .unwrap();
        let hits = store.search(&[1.0, 1.0], 2, None).await.unwrap();
        assert_eq!(hits[0].id.as_u64(), 2);
        assert!((hits[0].score - 4.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_upsert_rejects_wrong_dimension_before_writing() {
        let store = InMemoryVectorStore::new(3, DistanceMetric::Cosine);
        let err = store
            .upsert(vec![
                (ChunkId::from_u64(1), vec![1.0, 0.0, 0.0], payload("a", 0)),
                (ChunkId::from_u64(2), vec![1.0, 0.0], payload("a", 1)),
            ])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SearchError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        ));
        // Whole batch rejected, including the valid first point
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_filtered_search_requires_payload_index() {
        let store = InMemoryVectorStore::new(2, DistanceMetric::Cosine);
        store
            .upsert(vec![(ChunkId::from_u64(1), vec![1.0, 0.0], payload("a", 0))])
            .await
            .unwrap();

        let filter = PayloadFilter {
            source: Some("a".to_string()),
            ..Default::default()
        };
        let err = store
            .search(&[1.0, 0.0], 1, Some(&filter))
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::MissingPayloadIndex(field) if field == "source"));

        store
            .create_payload_index(PayloadField::Source)
            .await
            .unwrap();
        let hits = store.search(&[1.0, 0.0], 1, Some(&filter)).await.unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn test_filter_restricts_to_source() {
        let store = InMemoryVectorStore::new(2, DistanceMetric::Cosine);
        store
            .create_payload_index(PayloadField::Source)
            .await
            .unwrap();
        store
            .upsert(vec![
                (ChunkId::from_u64(1), vec![1.0, 0.0], payload("a", 0)),
                (ChunkId::from_u64(2), vec![1.0, 0.0], payload("b", 0)),
            ])
            .await
            .unwrap();

        let filter = PayloadFilter {
            source: Some("b".to_string()),
            ..Default::default()
        };
        let hits = store.search(&[1.0, 0.0], 10, Some(&filter)).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].payload.source, "b");
    }

    #[tokio::test]
    async fn test_chunk_index_filter_requires_its_own_index() {
        let store = InMemoryVectorStore::new(2, DistanceMetric::Cosine);
        store
            .upsert(vec![
                (ChunkId::from_u64(1), vec![1.0, 0.0], payload("a", 0)),
                (ChunkId::from_u64(2), vec![1.0, 0.0], payload("a", 1)),
            ])
            .await
            .unwrap();

        let filter = PayloadFilter {
            chunk_index: Some(1),
            ..Default::default()
        };
        let err = store
            .search(&[1.0, 0.0], 10, Some(&filter))
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::MissingPayloadIndex(field) if field == "chunk_index"));

        store
            .create_payload_index(PayloadField::ChunkIndex)
            .await
            .unwrap();
        let hits = store.search(&[1.0, 0.0], 10, Some(&filter)).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].payload.chunk_index, 1);
    }

    #[tokio::test]
    async fn test_combined_filter_applies_both_fields() {
        let store = InMemoryVectorStore::new(2, DistanceMetric::Cosine);
        store
            .create_payload_index(PayloadField::Source)
            .await
            .unwrap();
        store
            .create_payload_index(PayloadField::ChunkIndex)
            .await
            .unwrap();
        store
            .upsert(vec![
                (ChunkId::from_u64(1), vec![1.0, 0.0], payload("a", 0)),
                (ChunkId::from_u64(2), vec![1.0, 0.0], payload("a", 1)),
                (ChunkId::from_u64(3), vec![1.0, 0.0], payload("b", 1)),
            ])
            .await
            .unwrap();

        let filter = PayloadFilter {
            source: Some("a".to_string()),
            chunk_index: Some(1),
        };
        let hits = store.search(&[1.0, 0.0], 10, Some(&filter)).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id.as_u64(), 2);
    }

    #[tokio::test]
    async fn test_upsert_replaces_existing_id() {
        let store = InMemoryVectorStore::new(2, DistanceMetric::Cosine);
        let id = ChunkId::from_u64(9);
        store
            .upsert(vec![(id, vec![1.0, 0.0], payload("a", 0))])
            .await
            .unwrap();
        store
            .upsert(vec![(id, vec![0.0, 1.0], payload("a", 1))])
            .await
            .unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
        let hits = store.search(&[0.0, 1.0], 1, None).await.unwrap();
        assert!(hits[0].score < 1e-6);
        assert_eq!(hits[0].payload.chunk_index, 1);
    }

    #[tokio::test]
    async fn test_delete_ignores_unknown_ids() {
        let store = InMemoryVectorStore::new(2, DistanceMetric::Cosine);
        store
            .upsert(vec![(ChunkId::from_u64(1), vec![1.0, 0.0], payload("a", 0))])
            .await
            .unwrap();
        store
            .delete(&[ChunkId::from_u64(1), ChunkId::from_u64(42)])
            .await
            .unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_zero_vector_is_maximally_distant_under_cosine() {
        let store = InMemoryVectorStore::new(2, DistanceMetric::Cosine);
        store
            .upsert(vec![
                (ChunkId::from_u64(1), vec![0.0, 0.0], payload("a", 0)),
                (ChunkId::from_u64(2), vec![1.0, 0.0], payload("a", 1)),
            ])
            .await
            .unwrap();
        let hits = store.search(&[1.0, 0.0], 2, None).await.unwrap();
        assert_eq!(hits[0].id.as_u64(), 2);
        assert_eq!(hits[1].score, 2.0);
    }
}
