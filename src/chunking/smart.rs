//! Structure-aware chunking: block segmentation plus greedy packing.
//!
//! The document is first segmented into [`Block`]s according to its file
//! type, then consecutive blocks are packed into chunks while the running
//! token total stays within the chunk budget. When a chunk closes because
//! the next block would overflow it, the new chunk is seeded with the
//! trailing `overlap` tokens of the closed chunk's text. A block that alone
//! exceeds the budget degrades to token-window splitting for that block
//! only; packing then resumes.

use super::token::windows_over;
use super::{token_count, Block, ChunkConfig, FileType};

/// Splits text into chunks using structural segmentation.
pub(crate) fn split_smart(text: &str, file_type: FileType, config: &ChunkConfig) -> Vec<String> {
    let blocks = segment(text, file_type);
    pack(blocks, config)
}

/// Segments text into structural blocks according to the file type.
pub(crate) fn segment(text: &str, file_type: FileType) -> Vec<Block> {
    let mut blocks = match file_type {
        FileType::Text => paragraphs(text, false),
        FileType::Markdown => segment_markdown(text),
        FileType::Pdf => text
            .split('\u{0c}')
            .flat_map(|page| paragraphs(page, false))
            .collect(),
    };
    for (ordinal, block) in blocks.iter_mut().enumerate() {
        block.ordinal = ordinal;
    }
    blocks
}

/// Splits on blank-line paragraph boundaries.
fn paragraphs(text: &str, protected: bool) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            flush_paragraph(&mut blocks, &mut current, protected);
        } else {
            current.push(line);
        }
    }
    flush_paragraph(&mut blocks, &mut current, protected);
    blocks
}

fn flush_paragraph(blocks: &mut Vec<Block>, lines: &mut Vec<&str>, protected: bool) {
    if !lines.is_empty() {
        blocks.push(Block {
            text: lines.join("\n"),
            protected,
            ordinal: 0,
        });
        lines.clear();
    }
}

/// Returns the fence marker if the line opens a code fence.
fn fence_marker(line: &str) -> Option<&'static str> {
    let trimmed = line.trim_start();
    if trimmed.starts_with("```") {
        Some("```")
    } else if trimmed.starts_with("~~~") {
        Some("~~~")
    } else {
        None
    }
}

fn is_header(line: &str) -> bool {
    line.trim_start().starts_with('#')
}

fn is_list_item(line: &str) -> bool {
    let trimmed = line.trim_start();
    if trimmed.starts_with("- ") || trimmed.starts_with("* ") || trimmed.starts_with("+ ") {
        return true;
    }
    // Ordered list: digits followed by '.' or ')'
    let digits: String = trimmed.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return false;
    }
    let rest = &trimmed[digits.len()..];
    rest.starts_with(". ") || rest.starts_with(") ")
}

/// Segments markdown into blocks, keeping code fences, header sections, and
/// list groups intact as single protected blocks.
fn segment_markdown(text: &str) -> Vec<Block> {
    let lines: Vec<&str> = text.lines().collect();
    let mut blocks = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];

        if line.trim().is_empty() {
            i += 1;
            continue;
        }

        if let Some(marker) = fence_marker(line) {
            // Code fence: everything through the closing marker is one block
            let start = i;
            i += 1;
            while i < lines.len() && fence_marker(lines[i]) != Some(marker) {
                i += 1;
            }
            let end = (i + 1).min(lines.len()); // include closing fence if present
            blocks.push(Block {
                text: lines[start..end].join("\n"),
                protected: true,
                ordinal: 0,
            });
            i = end;
        } else if is_header(line) {
            // Header plus its immediately following content, up to the next
            // structural boundary
            let start = i;
            i += 1;
            while i < lines.len()
                && !lines[i].trim().is_empty()
                && !is_header(lines[i])
                && fence_marker(lines[i]).is_none()
            {
                i += 1;
            }
            blocks.push(Block {
                text: lines[start..i].join("\n"),
                protected: true,
                ordinal: 0,
            });
        } else if is_list_item(line) {
            // Consecutive list items (and indented continuations) form one group
            let start = i;
            i += 1;
            while i < lines.len()
                && (is_list_item(lines[i])
                    || (lines[i].starts_with("  ") && !lines[i].trim().is_empty()))
            {
                i += 1;
            }
            blocks.push(Block {
                text: lines[start..i].join("\n"),
                protected: true,
                ordinal: 0,
            });
        } else {
            // Plain paragraph
            let start = i;
            i += 1;
            while i < lines.len()
                && !lines[i].trim().is_empty()
                && !is_header(lines[i])
                && fence_marker(lines[i]).is_none()
                && !is_list_item(lines[i])
            {
                i += 1;
            }
            blocks.push(Block {
                text: lines[start..i].join("\n"),
                protected: false,
                ordinal: 0,
            });
        }
    }

    blocks
}

/// Greedily packs blocks into chunks within the token budget.
///
/// Invariants maintained:
/// - every chunk's token count stays within `chunk_size`;
/// - the overlap seed is taken from the end of the previously closed chunk
///   and shrinks when the incoming block nearly fills the budget;
/// - a trailing seed with no following content is never emitted, so a block
///   that exactly fills the budget yields exactly one chunk.
fn pack(blocks: Vec<Block>, config: &ChunkConfig) -> Vec<String> {
    let mut chunks: Vec<String> = Vec::new();
    // Blocks accumulated into the chunk under construction
    let mut current: Vec<String> = Vec::new();
    let mut current_tokens = 0usize;
    // Overlap tokens carried from the previously closed chunk
    let mut seed: Vec<String> = Vec::new();

    for block in blocks {
        let block_tokens = token_count(&block.text);

        if block_tokens > config.chunk_size {
            // Oversized block (protected or not): flush what we have, then
            // degrade to token windows for this block alone
            if !current.is_empty() {
                let closed = compose(&seed, &current);
                seed = tail_tokens(&closed, config.overlap);
                chunks.push(closed);
                current.clear();
                current_tokens = 0;
            }
            let tokens: Vec<&str> = block.text.split_whitespace().collect();
            let windows = windows_over(&tokens, config);
            if let Some(last) = windows.last() {
                seed = tail_tokens(last, config.overlap);
            }
            chunks.extend(windows);
            continue;
        }

        if seed.len() + current_tokens + block_tokens > config.chunk_size {
            if current.is_empty() {
                // Only the seed is in the way; shrink it so the block fits
                trim_seed(&mut seed, config.chunk_size - block_tokens);
            } else {
                let closed = compose(&seed, &current);
                seed = tail_tokens(&closed, config.overlap);
                chunks.push(closed);
                current.clear();
                current_tokens = 0;
                trim_seed(&mut seed, config.chunk_size - block_tokens);
            }
        }

        current_tokens += block_tokens;
        current.push(block.text);
    }

    if !current.is_empty() {
        chunks.push(compose(&seed, &current));
    }

    chunks
}

/// Joins the overlap seed and the accumulated blocks into chunk text.
///
/// Seed tokens are space-joined, blocks keep their paragraph separation;
/// both joins preserve additive token counts under the whitespace token
/// definition.
fn compose(seed: &[String], blocks: &[String]) -> String {
    let body = blocks.join("\n\n");
    if seed.is_empty() {
        body
    } else {
        format!("{}\n\n{}", seed.join(" "), body)
    }
}

/// Returns the last `n` tokens of `text` as owned strings.
fn tail_tokens(text: &str, n: usize) -> Vec<String> {
    if n == 0 {
        return vec![];
    }
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let start = tokens.len().saturating_sub(n);
    tokens[start..].iter().map(|t| t.to_string()).collect()
}

/// Shrinks the seed to at most `allowed` tokens, keeping the most recent.
fn trim_seed(seed: &mut Vec<String>, allowed: usize) {
    if seed.len() > allowed {
        let drop = seed.len() - allowed;
        seed.drain(..drop);
    }
}
