//! BRENDA Ingest Library
//!
//! Builds a relational SQLite mirror of a BRENDA release from its JSON dump
//! and its legacy flat-file export.
//!
//! # Pipeline
//!
//! - **Read**: streaming readers for both dumps, run on blocking threads
//! - **Normalize**: JSON records into enzyme, protein and fact rows; flat-file
//!   entries into text-fact rows
//! - **Store**: batched inserts into four tables, indexes built last
//!
//! # Example
//!
//! ```no_run
//! use brenda_ingest::config::IngestConfig;
//! use brenda_ingest::brenda::IngestionPipeline;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = IngestConfig::new(
//!         "data/raw/brenda_2025_1.json",
//!         "data/raw/brenda_2025_1.txt",
//!         "data/processed/brenda.db",
//!     );
//!     let report = IngestionPipeline::new(config).run().await?;
//!     println!("{} enzymes", report.table_counts.enzymes);
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod brenda;
pub mod config;
pub mod progress;

pub use brenda::{IngestError, IngestionPipeline, IngestionReport};
pub use config::IngestConfig;
