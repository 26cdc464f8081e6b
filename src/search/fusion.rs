//! Reciprocal Rank Fusion (RRF).
//!
//! Combines N independently produced rankings into one by summing
//! reciprocal-rank contributions:
//!
//! ```text
//! fused_score(id) = Σ_{r : id ∈ r} 1 / (k + rank_r(id))
//! ```
//!
//! with `rank_r(id)` the 1-indexed position of `id` in ranking `r`. RRF is
//! rank-based, not score-based, so rankings with incomparable score scales
//! (BM25 vs cosine similarity) fuse without normalization.

use super::types::{ChunkId, Ranking};
use crate::error::FusionError;
use std::collections::HashMap;

/// Standard RRF k parameter from the literature.
///
/// 60 is the recommended value from the original RRF paper: "Reciprocal
/// Rank Fusion outperforms Condorcet and individual Rank Learning Methods"
/// by Cormack, Clarke, and Buettcher (SIGIR 2009). Smaller k emphasizes
/// top results; larger k weights ranks more uniformly.
pub const RRF_K: usize = 60;

/// A fused result with its contributing rank evidence.
#[derive(Debug, Clone, PartialEq)]
pub struct FusedResult {
    /// Chunk identifier
    pub id: ChunkId,
    /// Fused RRF score (higher = more relevant)
    pub score: f64,
    /// Best (lowest) 1-indexed rank achieved in any single input ranking,
    /// kept for tie-breaking and debugging
    pub best_rank: usize,
}

/// Fuses multiple rankings into one using Reciprocal Rank Fusion.
///
/// Ids absent from a given ranking simply contribute nothing for that
/// ranking; absence is not penalized beyond the missing contribution. The
/// output is sorted by descending fused score; ties are broken by the best
/// rank achieved in any single input ranking, then by ascending id, so the
/// result is fully deterministic.
///
/// An id at rank 1 in every input achieves the maximum possible score
/// `rankings.len() as f64 / (k + 1) as f64`.
///
/// # Errors
///
/// Returns [`FusionError::NoRankings`] when `rankings` is empty. Rankings
/// that are themselves empty are valid input — an empty corpus produces
/// empty rankings, and fusing those yields an empty result.
pub fn reciprocal_rank_fusion(
    rankings: &[Ranking],
    k: usize,
) -> Result<Vec<FusedResult>, FusionError> {
    if rankings.is_empty() {
        return Err(FusionError::NoRankings);
    }

    let mut scores: HashMap<ChunkId, (f64, usize)> = HashMap::new();

    for ranking in rankings {
        for (rank0, (id, _score)) in ranking.iter().enumerate() {
            let rank = rank0 + 1; // 1-indexed
            let contribution = 1.0 / (k as f64 + rank as f64);
            let entry = scores.entry(*id).or_insert((0.0, usize::MAX));
            entry.0 += contribution;
            entry.1 = entry.1.min(rank);
        }
    }

    let mut fused: Vec<FusedResult> = scores
        .into_iter()
        .map(|(id, (score, best_rank))| FusedResult {
            id,
            score,
            best_rank,
        })
        .collect();

    fused.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.best_rank.cmp(&b.best_rank))
            .then_with(|| a.id.cmp(&b.id))
    });

    Ok(fused)
}
