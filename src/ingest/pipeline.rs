//! Bounded-concurrency ingestion pipeline.
//!
//! Files are processed by a worker pool capped at
//! [`IngestOptions::max_concurrent_files`] permits. Workers only talk to
//! external collaborators (disk, embedding provider, vector store);
//! query-side state — the sparse index, the chunk catalog, the stats
//! accumulator — is updated at a single aggregation point as worker
//! results are collected, so no file is ever half-committed and queries
//! running during ingestion see whole files only.

use crate::chunking::{chunk, Chunk, ChunkConfig, ChunkMode, Document, FileType};
use crate::config::{DEFAULT_BATCH_SIZE, DEFAULT_CHUNK_SIZE, DEFAULT_MAX_CONCURRENT_FILES, DEFAULT_OVERLAP};
use crate::embedding::EmbeddingProvider;
use crate::error::{FileIngestError, IngestError};
use crate::search::types::{ChunkId, ChunkRecord};
use crate::search::QueryEngine;
use crate::store::{ChunkPayload, PayloadField, VectorStore};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::reader::{list_ingestible_files, read_file};

/// Knobs for an ingestion run.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Chunking strategy
    pub chunk_mode: ChunkMode,
    /// Chunk budget in tokens
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in tokens
    pub overlap: usize,
    /// Number of chunk texts per embedding request
    pub batch_size: usize,
    /// Worker pool size for directory ingestion
    pub max_concurrent_files: usize,
    /// Record per-file failures and keep going instead of aborting the run
    pub skip_errors: bool,
    /// Metadata attached to every chunk of this run
    pub metadata: HashMap<String, Value>,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            chunk_mode: ChunkMode::Smart,
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_OVERLAP,
            batch_size: DEFAULT_BATCH_SIZE,
            max_concurrent_files: DEFAULT_MAX_CONCURRENT_FILES,
            skip_errors: true,
            metadata: HashMap::new(),
        }
    }
}

/// Outcome of a directory ingestion run.
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    /// Files successfully committed
    pub total_files: usize,
    /// Chunks committed across all files
    pub total_chunks: usize,
    /// Per-file failures (only populated with `skip_errors`)
    pub errors: Vec<FileIngestError>,
}

/// Cumulative counters over the lifetime of a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IngestStats {
    /// Files committed
    pub files_ingested: u64,
    /// Chunks committed
    pub chunks_ingested: u64,
    /// Files that failed
    pub failed_files: u64,
}

#[derive(Default)]
struct StatsInner {
    files: AtomicU64,
    chunks: AtomicU64,
    failures: AtomicU64,
}

/// Ingestion front door: files and documents in, committed chunks out.
///
/// Cheap to clone; clones share the engine, collaborators, and stats.
#[derive(Clone)]
pub struct IngestPipeline {
    engine: Arc<QueryEngine>,
    provider: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    stats: Arc<StatsInner>,
}

impl IngestPipeline {
    /// Wires a pipeline to its query engine and external collaborators.
    ///
    /// The provider and store are the same pair the engine's dense path
    /// uses, so vectors land where queries will look for them.
    pub fn new(
        engine: Arc<QueryEngine>,
        provider: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
    ) -> Self {
        Self {
            engine,
            provider,
            store,
            stats: Arc::new(StatsInner::default()),
        }
    }

    /// Creates the payload indexes filtered search depends on.
    ///
    /// `source` and `chunk_index` must be indexed fields in the store;
    /// runs before any upsert so a filtered search works as soon as the
    /// first chunk lands. Idempotent per the trait contract.
    async fn ensure_payload_indexes(&self) -> Result<(), IngestError> {
        self.store.create_payload_index(PayloadField::Source).await?;
        self.store
            .create_payload_index(PayloadField::ChunkIndex)
            .await?;
        Ok(())
    }

    /// Snapshot of the cumulative ingestion counters.
    pub fn stats(&self) -> IngestStats {
        IngestStats {
            files_ingested: self.stats.files.load(Ordering::Relaxed),
            chunks_ingested: self.stats.chunks.load(Ordering::Relaxed),
            failed_files: self.stats.failures.load(Ordering::Relaxed),
        }
    }

    /// Ingests pre-extracted text under a caller-chosen source name.
    ///
    /// This is the entry point for content that does not live on disk as a
    /// supported file, such as PDF text from an external extractor (pass
    /// [`FileType::Pdf`] and keep the form-feed page breaks). Returns the
    /// number of chunks committed.
    #[instrument(skip(self, text, options), fields(len = text.len()))]
    pub async fn ingest_document(
        &self,
        text: &str,
        file_type: FileType,
        source: &str,
        options: &IngestOptions,
    ) -> Result<usize, IngestError> {
        let config = ChunkConfig::new(options.chunk_size, options.overlap)?;
        self.ensure_payload_indexes().await?;
        let records = self
            .process_document(text, file_type, source, options, config)
            .await?;
        Ok(self.commit(records).await)
    }

    /// Reads and ingests a single file. Returns the number of chunks
    /// committed.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub async fn ingest_file<P: AsRef<Path>>(
        &self,
        path: P,
        options: &IngestOptions,
    ) -> Result<usize, IngestError> {
        let path = path.as_ref();
        let config = ChunkConfig::new(options.chunk_size, options.overlap)?;
        self.ensure_payload_indexes().await?;
        let (text, file_type) = read_file(path).await?;
        let source = path.display().to_string();
        let records = self
            .process_document(&text, file_type, &source, options, config)
            .await?;
        Ok(self.commit(records).await)
    }

    /// Ingests every supported file under `dir` (recursively) with a
    /// bounded worker pool.
    ///
    /// With `skip_errors` set, failing files are recorded in the report and
    /// the rest of the run proceeds; otherwise the first failure cancels
    /// all pending work and is returned, with already-committed files left
    /// in place.
    pub async fn ingest_directory<P: AsRef<Path>>(
        &self,
        dir: P,
        options: &IngestOptions,
    ) -> Result<IngestReport, IngestError> {
        self.ingest_directory_with_cancel(dir, options, CancellationToken::new())
            .await
    }

    /// [`Self::ingest_directory`] with an external cancellation handle.
    ///
    /// Cancelling the token stops pending and in-flight files; files whose
    /// results were already collected stay committed, and the run returns
    /// [`IngestError::Cancelled`].
    #[instrument(skip_all, fields(dir = %dir.as_ref().display()))]
    pub async fn ingest_directory_with_cancel<P: AsRef<Path>>(
        &self,
        dir: P,
        options: &IngestOptions,
        cancel: CancellationToken,
    ) -> Result<IngestReport, IngestError> {
        let dir = dir.as_ref();
        // Validate the chunk configuration before any work is spawned
        let config = ChunkConfig::new(options.chunk_size, options.overlap)?;
        self.ensure_payload_indexes().await?;
        let files = list_ingestible_files(dir).await?;
        if files.is_empty() {
            return Err(IngestError::EmptyDirectory(dir.to_path_buf()));
        }
        info!(files = files.len(), workers = options.max_concurrent_files, "starting ingestion run");

        let semaphore = Arc::new(Semaphore::new(options.max_concurrent_files.max(1)));
        let options = Arc::new(options.clone());
        let mut set: JoinSet<(PathBuf, Result<Vec<ChunkRecord>, IngestError>)> = JoinSet::new();

        for path in files {
            let pipeline = self.clone();
            let semaphore = Arc::clone(&semaphore);
            let options = Arc::clone(&options);
            let cancel = cancel.clone();
            set.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return (path, Err(IngestError::Cancelled)),
                };
                if cancel.is_cancelled() {
                    return (path, Err(IngestError::Cancelled));
                }
                let result = tokio::select! {
                    _ = cancel.cancelled() => Err(IngestError::Cancelled),
                    result = pipeline.process_file(&path, &options, config) => result,
                };
                (path, result)
            });
        }

        // Single aggregation point: only this loop touches the engine's
        // index/catalog and the stats accumulator
        let mut report = IngestReport::default();
        let mut first_error: Option<IngestError> = None;
        while let Some(joined) = set.join_next().await {
            let (path, result) = match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(error = %e, "ingest worker task failed to join");
                    continue;
                }
            };
            match result {
                Ok(records) => {
                    let committed = self.commit(records).await;
                    report.total_files += 1;
                    report.total_chunks += committed;
                    debug!(path = %path.display(), chunks = committed, "file committed");
                }
                Err(IngestError::Cancelled) => {
                    debug!(path = %path.display(), "file skipped by cancellation");
                }
                Err(e) => {
                    self.stats.failures.fetch_add(1, Ordering::Relaxed);
                    if options.skip_errors {
                        warn!(path = %path.display(), error = %e, "file failed, continuing");
                        report.errors.push(FileIngestError {
                            path,
                            message: e.to_string(),
                        });
                    } else if first_error.is_none() {
                        warn!(path = %path.display(), error = %e, "file failed, cancelling run");
                        cancel.cancel();
                        first_error = Some(e);
                    }
                }
            }
        }

        if let Some(e) = first_error {
            return Err(e);
        }
        if cancel.is_cancelled() {
            return Err(IngestError::Cancelled);
        }
        info!(
            files = report.total_files,
            chunks = report.total_chunks,
            failed = report.errors.len(),
            "ingestion run complete"
        );
        Ok(report)
    }

    async fn process_file(
        &self,
        path: &Path,
        options: &IngestOptions,
        config: ChunkConfig,
    ) -> Result<Vec<ChunkRecord>, IngestError> {
        let (text, file_type) = read_file(path).await?;
        let source = path.display().to_string();
        self.process_document(&text, file_type, &source, options, config)
            .await
    }

    /// Chunks, embeds, and upserts one document. Returns the records to
    /// commit; query-side state is untouched until [`Self::commit`].
    async fn process_document(
        &self,
        text: &str,
        file_type: FileType,
        source: &str,
        options: &IngestOptions,
        config: ChunkConfig,
    ) -> Result<Vec<ChunkRecord>, IngestError> {
        let document = Document::new(text, file_type, source);
        let chunks = chunk(&document, options.chunk_mode, &config)?;
        if chunks.is_empty() {
            debug!(source, "document produced no chunks");
            return Ok(Vec::new());
        }

        let mut records = Vec::with_capacity(chunks.len());
        let mut points = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(options.batch_size.max(1)) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = self.provider.embed_batch(&texts).await?;
            for (chunk, vector) in batch.iter().zip(vectors) {
                let (record, payload) = Self::record_for(chunk, &options.metadata);
                points.push((record.id, vector, payload));
                records.push(record);
            }
        }
        self.store.upsert(points).await?;
        Ok(records)
    }

    fn record_for(
        chunk: &Chunk,
        run_metadata: &HashMap<String, Value>,
    ) -> (ChunkRecord, ChunkPayload) {
        let mut metadata = run_metadata.clone();
        metadata.extend(chunk.metadata.clone());
        let record = ChunkRecord {
            id: ChunkId::new(),
            text: chunk.text.clone(),
            source: chunk.source.clone(),
            chunk_index: chunk.chunk_index,
            metadata: metadata.clone(),
        };
        let payload = ChunkPayload {
            source: chunk.source.clone(),
            chunk_index: chunk.chunk_index,
            text: chunk.text.clone(),
            metadata,
        };
        (record, payload)
    }

    /// Commits records to the query engine and bumps the counters.
    async fn commit(&self, records: Vec<ChunkRecord>) -> usize {
        let committed = records.len();
        if committed > 0 {
            self.engine.index_chunks(records).await;
            self.stats.files.fetch_add(1, Ordering::Relaxed);
            self.stats
                .chunks
                .fetch_add(committed as u64, Ordering::Relaxed);
        }
        committed
    }
}
