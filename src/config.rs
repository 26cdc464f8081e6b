//! Production configuration constants.
//!
//! This module contains the defaults used throughout the library and in
//! tests to ensure consistency. Every tunable has a single authoritative
//! definition here.

// =============================================================================
// Chunking Configuration
// =============================================================================

/// Default maximum tokens per chunk.
///
/// Chunks are sized to fit within this token budget while preserving
/// structural boundaries (paragraphs, code fences, pages). The actual token
/// count may be lower due to boundary alignment.
pub const DEFAULT_CHUNK_SIZE: usize = 512;

/// Default overlap in tokens carried from the tail of one chunk into the
/// head of the next.
///
/// Overlap preserves context across a split boundary so a sentence cut in
/// half is still retrievable from either side. Must stay strictly below
/// [`DEFAULT_CHUNK_SIZE`].
pub const DEFAULT_OVERLAP: usize = 50;

// =============================================================================
// BM25 Configuration
// =============================================================================

/// BM25 term-frequency saturation parameter (k1).
///
/// Controls how quickly repeated query terms stop adding score. The
/// 1.2-2.0 range is standard; 1.5 is a balanced default.
pub const BM25_K1: f64 = 1.5;

/// BM25 length-normalization parameter (b).
///
/// 0.0 disables length normalization entirely, 1.0 fully normalizes by
/// document length. 0.75 is the textbook default.
pub const BM25_B: f64 = 0.75;

// =============================================================================
// Query Configuration
// =============================================================================

/// Default number of results returned by a query.
pub const DEFAULT_TOP_K: usize = 5;

/// Candidate multiplier for hybrid search and reranking.
///
/// Each retrieval path fetches `top_k * CANDIDATE_MULTIPLIER` results before
/// fusion/reranking so the final truncation has enough candidates to choose
/// from.
pub const CANDIDATE_MULTIPLIER: usize = 2;

// =============================================================================
// Ingestion Configuration
// =============================================================================

/// Default number of chunks embedded per provider batch call.
pub const DEFAULT_BATCH_SIZE: usize = 32;

/// Default bound on concurrently processed files.
///
/// This caps peak outstanding embedding-API and vector-store requests during
/// directory ingestion.
pub const DEFAULT_MAX_CONCURRENT_FILES: usize = 3;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlap_below_chunk_size() {
        assert!(DEFAULT_OVERLAP < DEFAULT_CHUNK_SIZE);
    }

    #[test]
    fn test_bm25_params_in_conventional_ranges() {
        assert!(BM25_K1 >= 1.2 && BM25_K1 <= 2.0);
        assert!(BM25_B >= 0.0 && BM25_B <= 1.0);
    }

    #[test]
    fn test_candidate_multiplier_at_least_one() {
        let multiplier = CANDIDATE_MULTIPLIER;
        assert!(multiplier >= 1);
    }
}
