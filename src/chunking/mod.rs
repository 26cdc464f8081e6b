//! Boundary-aware text chunking.
//!
//! This module splits documents into retrieval-sized chunks before embedding
//! and indexing. Two strategies are available:
//!
//! - **Token mode**: a fixed window slid over the token stream. Deterministic
//!   and format-agnostic; use it when structural awareness is unnecessary.
//! - **Smart mode**: the document is first segmented into structural blocks
//!   (paragraphs, markdown code fences, header sections, list groups, PDF
//!   pages) which are then greedily packed into chunks. A block is only ever
//!   split when it alone exceeds the chunk budget, in which case it degrades
//!   to token-window splitting for that block only.
//!
//! # Token counting
//!
//! A token is a maximal run of non-whitespace characters
//! ([`str::split_whitespace`]). This single definition is shared by chunk
//! packing, window splitting, and BM25 length normalization, which keeps
//! size budgets and scoring in exact agreement and makes results
//! deterministic. See [`token_count`].

mod smart;
mod token;

use crate::error::ChunkConfigError;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Source document type, used to select block segmentation rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    /// Plain text; paragraphs are separated by blank lines
    Text,
    /// Markdown; code fences, header sections, and list groups are kept
    /// intact as single blocks
    Markdown,
    /// Pre-extracted PDF text; pages are separated by form feeds (`\x0c`),
    /// paragraphs by blank lines within a page
    Pdf,
}

/// Chunking strategy selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChunkMode {
    /// Fixed token window with overlap step
    Token,
    /// Structural block segmentation with greedy packing
    #[default]
    Smart,
}

/// A document to be chunked.
///
/// Immutable once constructed; the chunker only reads it.
#[derive(Debug, Clone)]
pub struct Document {
    /// Full text content
    pub text: String,
    /// File type governing block segmentation
    pub file_type: FileType,
    /// Source identifier (path or URL), copied onto every chunk
    pub source: String,
}

impl Document {
    /// Creates a document from its parts.
    pub fn new(text: impl Into<String>, file_type: FileType, source: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            file_type,
            source: source.into(),
        }
    }
}

/// Size and overlap configuration for chunking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfig {
    /// Maximum tokens per chunk
    pub chunk_size: usize,
    /// Tokens carried from the tail of one chunk into the head of the next
    pub overlap: usize,
}

impl ChunkConfig {
    /// Creates a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ChunkConfigError`] if `chunk_size` is zero or `overlap`
    /// is not strictly smaller than `chunk_size`. Validation happens here,
    /// before any chunking work, so a bad configuration can never make
    /// negative progress mid-document.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, ChunkConfigError> {
        if chunk_size == 0 {
            return Err(ChunkConfigError::ZeroChunkSize);
        }
        if overlap >= chunk_size {
            return Err(ChunkConfigError::OverlapTooLarge {
                chunk_size,
                overlap,
            });
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: crate::config::DEFAULT_CHUNK_SIZE,
            overlap: crate::config::DEFAULT_OVERLAP,
        }
    }
}

/// A retrieval unit produced by chunking.
///
/// Immutable after creation. `chunk_index` values for a given source form a
/// contiguous `0..n-1` sequence in document order; they are assigned here,
/// before any ingestion concurrency, so out-of-order embedding or upserts
/// can never corrupt chunk ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// Chunk text content
    pub text: String,
    /// Token count of `text` under the crate's token definition
    pub token_count: usize,
    /// Source identifier of the originating document
    pub source: String,
    /// 0-based position of this chunk within its source
    pub chunk_index: usize,
    /// Arbitrary caller-supplied metadata, persisted with the chunk payload
    pub metadata: HashMap<String, Value>,
}

/// Counts tokens in `text`.
///
/// A token is a maximal whitespace-delimited run. This is the single token
/// definition used for chunk budgets, window splitting, and BM25 length
/// normalization.
pub fn token_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// A structural unit produced during smart-mode segmentation.
///
/// Blocks are intermediate: they exist between the raw document and the
/// packed chunks. A protected block must not be split unless it alone
/// exceeds the chunk budget.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Block {
    /// Block text content
    pub text: String,
    /// Whether this block must be kept intact when possible
    pub protected: bool,
    /// Ordinal position within the document
    pub ordinal: usize,
}

/// Splits a document into chunks.
///
/// This is the single entry point for both chunking strategies. The output
/// is ordered by position in the source document, with `chunk_index`
/// assigned contiguously from zero.
///
/// # Errors
///
/// Returns [`ChunkConfigError`] if the configuration is invalid
/// (`overlap >= chunk_size` or `chunk_size == 0`).
///
/// # Edge cases
///
/// Empty or whitespace-only text yields an empty vector, not an error.
pub fn chunk(
    document: &Document,
    mode: ChunkMode,
    config: &ChunkConfig,
) -> Result<Vec<Chunk>, ChunkConfigError> {
    // Re-validate so directly constructed configs fail fast too
    let config = ChunkConfig::new(config.chunk_size, config.overlap)?;

    let text = document.text.trim();
    if text.is_empty() {
        return Ok(vec![]);
    }

    let pieces = match mode {
        ChunkMode::Token => token::split_token_windows(text, &config),
        ChunkMode::Smart => smart::split_smart(text, document.file_type, &config),
    };

    debug!(
        source = %document.source,
        mode = ?mode,
        chunks = pieces.len(),
        "chunked document"
    );

    Ok(pieces
        .into_iter()
        .enumerate()
        .map(|(chunk_index, text)| {
            let token_count = token_count(&text);
            Chunk {
                text,
                token_count,
                source: document.source.clone(),
                chunk_index,
                metadata: HashMap::new(),
            }
        })
        .collect())
}

/// Detects the file type from a path's extension.
///
/// - `.md`, `.markdown` → [`FileType::Markdown`]
/// - `.pdf` → [`FileType::Pdf`]
/// - everything else → [`FileType::Text`]
pub fn detect_file_type<P: AsRef<Path>>(path: P) -> FileType {
    match path
        .as_ref()
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .as_deref()
    {
        Some("md") | Some("markdown") => FileType::Markdown,
        Some("pdf") => FileType::Pdf,
        _ => FileType::Text,
    }
}
