// BRENDA Mirror Pipeline Orchestration
//
// One rebuild, start to finish:
// 1. Pre-flight both source files
// 2. Delete the previous mirror and recreate the schema
// 3. JSON pass: enzymes, proteins, enzyme facts
// 4. Flat-file pass: text facts
// 5. Indexes, row counts, report

use chrono::Utc;
use std::collections::{BTreeMap, HashSet};
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, info, warn};

use super::json_reader::JsonEnzymeReader;
use super::normalizer::EnzymeNormalizer;
use super::report::IngestionReport;
use super::storage::MirrorWriter;
use super::text_normalizer::TextFactNormalizer;
use super::text_reader::FileEntryReader;
use super::Result;
use crate::config::IngestConfig;
use crate::progress::{create_spinner, format_bytes};

/// Counters accumulated across both passes
#[derive(Debug, Default)]
struct PassCounters {
    skipped_records: u64,
    skipped_entries: u64,
    duplicate_records: u64,
    skipped_text_entries: u64,
    category_counts: BTreeMap<String, u64>,
    field_code_counts: BTreeMap<String, u64>,
    unknown_field_codes: Vec<String>,
}

/// BRENDA mirror rebuild
pub struct IngestionPipeline {
    config: IngestConfig,
}

impl IngestionPipeline {
    pub fn new(config: IngestConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Rebuild the mirror from scratch.
    ///
    /// The target is only touched once both sources are known to exist. A
    /// failed run leaves a partial database behind; the next run replaces it.
    pub async fn run(&self) -> Result<IngestionReport> {
        let started_at = Utc::now();
        let config = &self.config;
        config.validate()?;

        // 1. Pre-flight
        let json_reader = JsonEnzymeReader::open(&config.json_path)?;
        let text_reader = FileEntryReader::open(&config.text_path)?;
        log_source_size("JSON release", &config.json_path);
        log_source_size("flat-file release", &config.text_path);

        // 2. Fresh target
        prepare_target(&config.target_path).await?;
        let mut writer = MirrorWriter::open(&config.target_path, config.batch_size).await?;
        writer.reset_schema().await?;

        let mut counters = PassCounters::default();

        // 3. JSON pass
        info!("Step 1/3: Loading enzymes from JSON release...");
        self.json_pass(json_reader, &mut writer, &mut counters).await?;

        // 4. Flat-file pass
        info!("Step 2/3: Loading text facts from flat-file release...");
        self.text_pass(text_reader, &mut writer, &mut counters).await?;

        // 5. Indexes and verification
        info!("Step 3/3: Building indexes...");
        writer.flush_all().await?;
        writer.create_indexes().await?;
        let table_counts = writer.table_counts().await?;
        let rows_written = writer.close().await?;

        let report = IngestionReport {
            json_path: config.json_path.clone(),
            text_path: config.text_path.clone(),
            target_path: config.target_path.clone(),
            rows_written,
            table_counts,
            skipped_records: counters.skipped_records,
            skipped_entries: counters.skipped_entries,
            duplicate_records: counters.duplicate_records,
            skipped_text_entries: counters.skipped_text_entries,
            category_counts: counters.category_counts,
            field_code_counts: counters.field_code_counts,
            unknown_field_codes: counters.unknown_field_codes,
            started_at,
            finished_at: Utc::now(),
        };

        info!(
            enzymes = table_counts.enzymes,
            proteins = table_counts.proteins,
            enzyme_facts = table_counts.enzyme_facts,
            text_facts = table_counts.text_facts,
            duration_secs = report.duration_secs(),
            "BRENDA mirror rebuilt"
        );

        Ok(report)
    }

    async fn json_pass(
        &self,
        reader: JsonEnzymeReader,
        writer: &mut MirrorWriter,
        counters: &mut PassCounters,
    ) -> Result<()> {
        let normalizer = EnzymeNormalizer::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut stream = reader.spawn(self.config.channel_capacity);
        let pb = create_spinner("JSON records", self.config.show_progress);
        let mut processed: u64 = 0;

        while let Some(record) = stream.next().await {
            processed += 1;
            pb.inc(1);

            match normalizer.normalize(&record) {
                Err(skip) => {
                    warn!(key = %skip.key, reason = %skip.reason, "Skipping enzyme record");
                    counters.skipped_records += 1;
                },
                Ok(normalized) => {
                    if !seen.insert(normalized.ec_number().to_string()) {
                        warn!(ec_number = %normalized.ec_number(), "Skipping duplicate EC number");
                        counters.duplicate_records += 1;
                        continue;
                    }

                    for skip in &normalized.skipped {
                        warn!(
                            ec_number = %skip.ec_number,
                            category = %skip.category,
                            index = skip.index,
                            reason = %skip.reason,
                            "Skipping nested entry"
                        );
                    }
                    counters.skipped_entries += normalized.skipped.len() as u64;

                    for fact in &normalized.facts {
                        *counters
                            .category_counts
                            .entry(fact.category.clone())
                            .or_default() += 1;
                    }

                    writer.push_enzyme(normalized.enzyme).await?;
                    writer.push_proteins(normalized.proteins).await?;
                    writer.push_facts(normalized.facts).await?;
                },
            }

            log_progress("JSON", processed, self.config.progress_interval);
        }

        let stats = stream.finish().await?;
        pb.finish_and_clear();
        counters.skipped_records += stats.skipped_records;

        info!(
            records = stats.records,
            enzymes = seen.len(),
            skipped = counters.skipped_records,
            duplicates = counters.duplicate_records,
            "JSON pass complete"
        );
        Ok(())
    }

    async fn text_pass(
        &self,
        reader: FileEntryReader,
        writer: &mut MirrorWriter,
        counters: &mut PassCounters,
    ) -> Result<()> {
        let mut normalizer = TextFactNormalizer::new();
        let mut stream = reader.spawn(self.config.channel_capacity);
        let pb = create_spinner("text entries", self.config.show_progress);
        let mut processed: u64 = 0;

        while let Some(entry) = stream.next().await {
            processed += 1;
            pb.inc(1);

            *counters
                .field_code_counts
                .entry(entry.field_code.clone())
                .or_default() += 1;
            writer.push_text_fact(normalizer.normalize(entry)).await?;

            log_progress("flat-file", processed, self.config.progress_interval);
        }

        let stats = stream.finish().await?;
        pb.finish_and_clear();
        counters.skipped_text_entries = stats.empty_entries;
        counters.unknown_field_codes = normalizer.unknown_codes().map(str::to_string).collect();

        info!(
            entries = stats.entries,
            blocks = stats.blocks,
            unknown_codes = counters.unknown_field_codes.len(),
            "Flat-file pass complete"
        );
        Ok(())
    }
}

fn log_progress(pass: &str, processed: u64, interval: u64) {
    if interval > 0 && processed % interval == 0 {
        info!(pass, processed, "Ingestion progress");
    }
}

fn log_source_size(label: &str, path: &Path) {
    match std::fs::metadata(path) {
        Ok(meta) => info!(path = %path.display(), size = %format_bytes(meta.len()), "Found {label}"),
        Err(err) => debug!(path = %path.display(), error = %err, "Could not stat {label}"),
    }
}

/// Delete the previous database with its WAL sidecars and create the parent
/// directory.
async fn prepare_target(target: &Path) -> Result<()> {
    for suffix in ["", "-wal", "-shm"] {
        let mut name = target.as_os_str().to_os_string();
        name.push(suffix);
        match tokio::fs::remove_file(&name).await {
            Ok(()) => debug!(path = ?name, "Removed previous mirror file"),
            Err(err) if err.kind() == ErrorKind::NotFound => {},
            Err(err) => return Err(err.into()),
        }
    }

    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    Ok(())
}
