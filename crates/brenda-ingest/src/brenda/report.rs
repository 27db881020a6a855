//! Outcome of one mirror rebuild

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

use super::storage::{TableCounts, WriteStats};

/// Everything a run produced, serializable as the CLI's JSON output
#[derive(Debug, Clone, Serialize)]
pub struct IngestionReport {
    pub json_path: PathBuf,
    pub text_path: PathBuf,
    pub target_path: PathBuf,

    /// Rows written by this run
    pub rows_written: WriteStats,

    /// Rows read back from the finished database
    pub table_counts: TableCounts,

    /// JSON records that produced no rows
    pub skipped_records: u64,

    /// Nested JSON entries dropped from otherwise valid records
    pub skipped_entries: u64,

    /// EC numbers seen more than once in the JSON release
    pub duplicate_records: u64,

    /// Flat-file entries dropped because their value was empty
    pub skipped_text_entries: u64,

    pub category_counts: BTreeMap<String, u64>,
    pub field_code_counts: BTreeMap<String, u64>,

    /// Flat-file codes missing from the code table
    pub unknown_field_codes: Vec<String>,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl IngestionReport {
    pub fn duration_secs(&self) -> f64 {
        (self.finished_at - self.started_at).num_milliseconds() as f64 / 1000.0
    }

    /// `n` most frequent fact categories, ties broken by name
    pub fn top_categories(&self, n: usize) -> Vec<(String, u64)> {
        top_n(&self.category_counts, n)
    }

    /// `n` most frequent flat-file field codes, ties broken by code
    pub fn top_field_codes(&self, n: usize) -> Vec<(String, u64)> {
        top_n(&self.field_code_counts, n)
    }

    /// Short form printed by the CLI
    pub fn summary(&self, top: usize) -> ReportSummary {
        ReportSummary {
            target_path: self.target_path.clone(),
            table_counts: self.table_counts,
            skipped_records: self.skipped_records,
            skipped_entries: self.skipped_entries,
            duplicate_records: self.duplicate_records,
            skipped_text_entries: self.skipped_text_entries,
            top_categories: self.top_categories(top),
            top_field_codes: self.top_field_codes(top),
            unknown_field_codes: self.unknown_field_codes.clone(),
            duration_secs: self.duration_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    pub target_path: PathBuf,
    pub table_counts: TableCounts,
    pub skipped_records: u64,
    pub skipped_entries: u64,
    pub duplicate_records: u64,
    pub skipped_text_entries: u64,
    pub top_categories: Vec<(String, u64)>,
    pub top_field_codes: Vec<(String, u64)>,
    pub unknown_field_codes: Vec<String>,
    pub duration_secs: f64,
}

fn top_n(counts: &BTreeMap<String, u64>, n: usize) -> Vec<(String, u64)> {
    let mut entries: Vec<(String, u64)> = counts
        .iter()
        .map(|(key, count)| (key.clone(), *count))
        .collect();
    // stable sort keeps the BTreeMap's name order among equal counts
    entries.sort_by(|a, b| b.1.cmp(&a.1));
    entries.truncate(n);
    entries
}
