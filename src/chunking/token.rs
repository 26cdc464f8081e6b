//! Fixed token-window chunking.
//!
//! Slides a window of `chunk_size` tokens over the token stream with step
//! `chunk_size - overlap`. The last window may be shorter. Windows are
//! rejoined with single spaces, so token counts are exact under the crate's
//! whitespace token definition.

use super::ChunkConfig;

/// Splits `text` into token windows.
///
/// The step is `chunk_size - overlap`, which the validated config guarantees
/// to be positive, so every iteration makes forward progress. The first
/// `overlap` tokens of each window after the first duplicate the tail of
/// the previous window; the union of non-overlap regions reconstructs the
/// original token stream in order.
pub(crate) fn split_token_windows(text: &str, config: &ChunkConfig) -> Vec<String> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    windows_over(&tokens, config)
}

/// Window splitting over an already-tokenized slice.
///
/// Shared with smart mode, which degrades oversized blocks to token
/// windows.
pub(crate) fn windows_over(tokens: &[&str], config: &ChunkConfig) -> Vec<String> {
    if tokens.is_empty() {
        return vec![];
    }

    let step = config.chunk_size - config.overlap;
    let mut chunks = Vec::new();
    let mut start = 0;

    loop {
        let end = (start + config.chunk_size).min(tokens.len());
        chunks.push(tokens[start..end].join(" "));
        if end == tokens.len() {
            break;
        }
        start += step;
    }

    chunks
}
