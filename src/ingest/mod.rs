//! Document ingestion: reading source files and committing their chunks
//! to the query engine through a bounded-concurrency pipeline.

mod pipeline;
mod reader;

pub use pipeline::{IngestOptions, IngestPipeline, IngestReport, IngestStats};
pub use reader::{list_ingestible_files, read_file};
