// BRENDA Ingestion Module
//
// Builds the relational mirror of a BRENDA release from its two dumps:
// - JSON release: one nested record per EC number (~660MB)
// - Flat-file release: legacy field-coded text export
//
// Architecture:
// - Read: streaming readers on blocking threads feeding bounded channels
// - Normalize: one record in, table rows out, skips reported as values
// - Store: batched transactional inserts into SQLite
// - Pipeline: orchestration, counters and the final report

pub mod json_reader;
pub mod normalizer;
pub mod pipeline;
pub mod report;
pub mod source;
pub mod storage;
pub mod text_normalizer;
pub mod text_reader;
pub mod value_parser;

// Re-export main types
pub use json_reader::{JsonEnzymeReader, JsonEnzymeRecord, JsonReadStats};
pub use normalizer::{EntrySkip, EnzymeNormalizer, NormalizedEnzyme, RecordSkip};
pub use pipeline::IngestionPipeline;
pub use report::{IngestionReport, ReportSummary};
pub use source::{SourceKind, SourceStream};
pub use storage::{MirrorWriter, TableCounts, WriteStats};
pub use text_normalizer::{tokenize, TextFactNormalizer, TokenizedText};
pub use text_reader::{FileEntryReader, RawTextEntry, TextEntryReader, TextReadStats};
pub use value_parser::{parse_value, ParsedValue};

use brenda_common::MirrorTable;
use std::path::PathBuf;

// Batch size constants
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Upper bound keeping a multi-row insert under SQLite's bind parameter limit
/// (32766) for the widest table (11 columns).
pub const MAX_BATCH_SIZE: usize = 2500;

/// Records buffered between a reader thread and the pipeline
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Log a progress line every N records
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 1000;

/// Result type for BRENDA ingestion
pub type Result<T> = std::result::Result<T, IngestError>;

/// Error types for BRENDA ingestion
///
/// Every variant is fatal for the run. Problems confined to one record are
/// reported through [`RecordSkip`] / [`EntrySkip`] instead.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("{kind} not found: {}", .path.display())]
    SourceNotFound { kind: SourceKind, path: PathBuf },

    #[error("Malformed {kind} {}: {message}", .path.display())]
    SourceFormat {
        kind: SourceKind,
        path: PathBuf,
        message: String,
    },

    #[error("Failed to write batch to table {table}: {source}")]
    Write {
        table: MirrorTable,
        #[source]
        source: sqlx::Error,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Reader task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl IngestError {
    pub(crate) fn write(table: MirrorTable) -> impl FnOnce(sqlx::Error) -> IngestError {
        move |source| IngestError::Write { table, source }
    }
}
