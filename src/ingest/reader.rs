//! Source file reading.
//!
//! Reads plain text and markdown from disk. PDF text extraction is an
//! external collaborator; pre-extracted PDF text (with form-feed page
//! breaks) enters the pipeline through `ingest_document` instead.

use crate::chunking::FileType;
use crate::error::ReadError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Maps a file extension to its [`FileType`], if supported for direct reads.
fn supported_file_type(path: &Path) -> Option<FileType> {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("txt") => Some(FileType::Text),
        Some(ext)
            if ext.eq_ignore_ascii_case("md") || ext.eq_ignore_ascii_case("markdown") =>
        {
            Some(FileType::Markdown)
        }
        _ => None,
    }
}

/// Reads a source file, returning its content and detected type.
///
/// Supports `.txt`, `.md`, and `.markdown`. Content must be valid UTF-8;
/// binary files are rejected with [`ReadError::NotText`] rather than
/// lossily decoded.
pub async fn read_file<P: AsRef<Path>>(path: P) -> Result<(String, FileType), ReadError> {
    let path = path.as_ref();
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        return Err(ReadError::NotFound(path.to_path_buf()));
    }
    let file_type = supported_file_type(path).ok_or_else(|| ReadError::UnsupportedType {
        path: path.to_path_buf(),
        extension: path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_string(),
    })?;

    let bytes = tokio::fs::read(path).await.map_err(|e| ReadError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let text =
        String::from_utf8(bytes).map_err(|_| ReadError::NotText(path.to_path_buf()))?;
    debug!(path = %path.display(), bytes = text.len(), ?file_type, "read source file");
    Ok((text, file_type))
}

/// Recursively lists ingestible files under `dir`, sorted for a
/// deterministic processing order.
pub async fn list_ingestible_files<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>, ReadError> {
    let root = dir.as_ref().to_path_buf();
    let mut pending = vec![root.clone()];
    let mut files = Vec::new();

    while let Some(current) = pending.pop() {
        let mut entries = tokio::fs::read_dir(&current).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ReadError::NotFound(current.clone())
            } else {
                ReadError::Io {
                    path: current.clone(),
                    message: e.to_string(),
                }
            }
        })?;
        while let Some(entry) = entries.next_entry().await.map_err(|e| ReadError::Io {
            path: current.clone(),
            message: e.to_string(),
        })? {
            let path = entry.path();
            if path.is_dir() {
                pending.push(path);
            } else if supported_file_type(&path).is_some() {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}
