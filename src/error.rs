//! Error types for radiate.
//!
//! This module defines error types that are used across the library,
//! including document reading, chunking, embedding, search, fusion, and
//! ingestion errors.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading source documents.
#[derive(Debug, Clone, Error)]
pub enum ReadError {
    /// Source path does not exist
    #[error("File not found: {0}")]
    NotFound(PathBuf),
    /// File extension is not a supported document type
    #[error("Unsupported file type '{extension}' for {path} (supported: .txt, .md, .markdown)")]
    UnsupportedType {
        /// Path of the rejected file
        path: PathBuf,
        /// The unsupported extension (without leading dot)
        extension: String,
    },
    /// I/O failure while reading the file
    #[error("Failed to read {path}: {message}")]
    Io {
        /// Path of the file that failed to read
        path: PathBuf,
        /// Underlying I/O error message
        message: String,
    },
    /// File content is not valid text
    #[error("File is not valid UTF-8 text: {0}")]
    NotText(PathBuf),
}

/// Invalid chunking configuration.
///
/// Raised before any chunking work starts so a bad configuration can never
/// produce a partially chunked document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChunkConfigError {
    /// `overlap` must be strictly smaller than `chunk_size` or the sliding
    /// window cannot make forward progress
    #[error("overlap ({overlap}) must be smaller than chunk_size ({chunk_size})")]
    OverlapTooLarge {
        /// Configured chunk size in tokens
        chunk_size: usize,
        /// Configured overlap in tokens
        overlap: usize,
    },
    /// A zero-token chunk budget can never hold any content
    #[error("chunk_size must be greater than zero")]
    ZeroChunkSize,
}

/// Errors reported by embedding providers.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// Provider request failed (network, API, model failure)
    #[error("Embedding provider request failed: {0}")]
    Request(String),
    /// Provider did not respond in time
    #[error("Embedding provider timed out: {0}")]
    Timeout(String),
    /// Provider rejected the input (empty text, too long, ...)
    #[error("Invalid embedding input: {0}")]
    InvalidInput(String),
}

/// Errors that can occur during search operations.
#[derive(Debug, Clone, Error)]
pub enum SearchError {
    /// Embedding dimension disagrees with the store's configured dimension.
    ///
    /// This indicates a structurally incompatible collection and is never
    /// retried or swallowed.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension the vector store was configured with
        expected: usize,
        /// Dimension actually produced by the embedding provider
        actual: usize,
    },
    /// Vector store backend error
    #[error("Vector store error: {0}")]
    Store(String),
    /// A filtered query requires a payload index that was never created
    #[error("Missing payload index on field '{0}'")]
    MissingPayloadIndex(String),
    /// Embedding the query failed
    #[error("Embedding error: {0}")]
    Embedding(#[from] ProviderError),
    /// Reranking hook failed
    #[error("Rerank error: {0}")]
    Rerank(String),
    /// Invalid query parameters
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

/// Errors from the rank fusion engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FusionError {
    /// No rankings were supplied at all.
    ///
    /// Rankings that are merely empty are valid input; emptiness only
    /// becomes an error when there is nothing to fuse.
    #[error("fusion requires at least one ranking")]
    NoRankings,
}

/// Per-file ingestion failure.
///
/// Carries enough context to report which file failed and why without
/// aborting sibling files when `skip_errors` is set.
#[derive(Debug, Clone, Error)]
#[error("Failed to ingest {path}: {message}")]
pub struct FileIngestError {
    /// Source file that failed
    pub path: PathBuf,
    /// Human-readable failure description
    pub message: String,
}

/// Errors that can occur during an ingestion run.
#[derive(Debug, Clone, Error)]
pub enum IngestError {
    /// Reading the source failed
    #[error(transparent)]
    Read(#[from] ReadError),
    /// Chunking configuration was invalid
    #[error(transparent)]
    ChunkConfig(#[from] ChunkConfigError),
    /// Embedding the chunk batch failed
    #[error(transparent)]
    Provider(#[from] ProviderError),
    /// Upserting vectors or validating dimensions failed
    #[error(transparent)]
    Search(#[from] SearchError),
    /// Directory contained no ingestible files
    #[error("No ingestible files found in {0}")]
    EmptyDirectory(PathBuf),
    /// The run was cancelled before this file was processed
    #[error("Ingestion cancelled")]
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_config_error_display() {
        let err = ChunkConfigError::OverlapTooLarge {
            chunk_size: 10,
            overlap: 10,
        };
        assert!(err.to_string().contains("overlap (10)"));
        assert!(err.to_string().contains("chunk_size (10)"));
    }

    #[test]
    fn test_dimension_mismatch_carries_both_dimensions() {
        let err = SearchError::DimensionMismatch {
            expected: 1536,
            actual: 384,
        };
        let msg = err.to_string();
        assert!(msg.contains("1536"));
        assert!(msg.contains("384"));
    }

    #[test]
    fn test_ingest_error_wraps_read_error() {
        let read = ReadError::NotFound(PathBuf::from("/missing.txt"));
        let err: IngestError = read.into();
        assert!(err.to_string().contains("/missing.txt"));
    }
}
