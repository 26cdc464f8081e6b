//! BM25 sparse lexical index.
//!
//! An in-memory inverted index scoring chunks with the BM25 ranking
//! function:
//!
//! ```text
//! score(d) = Σ_t idf(t) · f(t,d)·(k1+1) / (f(t,d) + k1·(1 - b + b·|d|/avgdl))
//! idf(t)   = ln((N - n(t) + 0.5) / (n(t) + 0.5) + 1)
//! ```
//!
//! The smoothed IDF variant is always non-negative, so common terms degrade
//! gracefully instead of flipping the score's sign.
//!
//! # Tokenization
//!
//! Index terms are lowercased whitespace tokens, and `|d|` uses the same
//! whitespace token definition as the chunker ([`crate::chunking::token_count`]),
//! so chunk size budgets and length normalization agree exactly.

use super::types::{sort_ranking, ChunkId, Ranking};
use crate::config::{BM25_B, BM25_K1};
use std::collections::HashMap;
use tracing::instrument;

/// Lowercased whitespace tokenization for index terms.
fn terms(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split_whitespace().map(|t| t.to_lowercase())
}

/// BM25-based sparse index.
///
/// # Thread Safety
///
/// This type is not internally synchronized. For concurrent access, wrap it
/// in a lock; the ingestion pipeline funnels all insertions through a single
/// aggregation point so no locking is needed there.
#[derive(Debug)]
pub struct SparseIndex {
    /// Term frequency saturation parameter
    k1: f64,
    /// Length normalization parameter
    b: f64,
    /// term -> (chunk id -> term frequency)
    postings: HashMap<String, HashMap<ChunkId, u32>>,
    /// chunk id -> token length
    lengths: HashMap<ChunkId, usize>,
    /// Sum of all chunk lengths, for avgdl
    total_length: usize,
}

impl SparseIndex {
    /// Creates an empty index with the default parameters
    /// (`k1 = 1.5`, `b = 0.75`).
    pub fn new() -> Self {
        Self::with_params(BM25_K1, BM25_B)
    }

    /// Creates an empty index with explicit BM25 parameters.
    pub fn with_params(k1: f64, b: f64) -> Self {
        Self {
            k1,
            b,
            postings: HashMap::new(),
            lengths: HashMap::new(),
            total_length: 0,
        }
    }

    /// Adds a chunk to the corpus.
    ///
    /// Re-adding an existing id replaces its previous postings (upsert
    /// semantics).
    #[instrument(skip_all, fields(chunk_id = chunk_id.as_u64(), text_len = text.len()))]
    pub fn add_chunk(&mut self, chunk_id: ChunkId, text: &str) {
        if self.lengths.contains_key(&chunk_id) {
            self.remove_chunk(chunk_id);
        }

        let mut length = 0usize;
        for term in terms(text) {
            length += 1;
            *self
                .postings
                .entry(term)
                .or_default()
                .entry(chunk_id)
                .or_insert(0) += 1;
        }

        self.lengths.insert(chunk_id, length);
        self.total_length += length;
    }

    /// Removes a chunk from the corpus.
    pub fn remove_chunk(&mut self, chunk_id: ChunkId) {
        let Some(length) = self.lengths.remove(&chunk_id) else {
            return;
        };
        self.total_length -= length;
        self.postings.retain(|_, chunks| {
            chunks.remove(&chunk_id);
            !chunks.is_empty()
        });
    }

    /// Searches the corpus for chunks matching the query terms.
    ///
    /// Returns up to `top_k` results sorted by BM25 score descending, ties
    /// broken by ascending chunk id. An empty index or an empty query yields
    /// an empty ranking, never an error.
    pub fn search(&self, query: &str, top_k: usize) -> Ranking {
        let n = self.lengths.len();
        if n == 0 || top_k == 0 {
            return vec![];
        }
        let avgdl = self.total_length as f64 / n as f64;

        let mut scores: HashMap<ChunkId, f64> = HashMap::new();

        for term in terms(query) {
            let Some(chunks) = self.postings.get(&term) else {
                continue;
            };
            let df = chunks.len() as f64;
            // Smoothed IDF, non-negative by construction
            let idf = ((n as f64 - df + 0.5) / (df + 0.5) + 1.0).ln();

            for (&chunk_id, &tf) in chunks {
                let tf = tf as f64;
                let len = self.lengths[&chunk_id] as f64;
                let denom = tf + self.k1 * (1.0 - self.b + self.b * len / avgdl);
                *scores.entry(chunk_id).or_insert(0.0) += idf * tf * (self.k1 + 1.0) / denom;
            }
        }

        let mut ranking: Ranking = scores.into_iter().collect();
        sort_ranking(&mut ranking);
        ranking.truncate(top_k);
        ranking
    }

    /// Returns the number of indexed chunks.
    pub fn len(&self) -> usize {
        self.lengths.len()
    }

    /// Returns `true` if no chunks have been indexed.
    pub fn is_empty(&self) -> bool {
        self.lengths.is_empty()
    }
}

impl Default for SparseIndex {
    fn default() -> Self {
        Self::new()
    }
}
