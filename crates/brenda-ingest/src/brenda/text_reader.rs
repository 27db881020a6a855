//! Line reader for the BRENDA flat-file release
//!
//! Layout of one EC block:
//!
//! ```text
//! ID	1.1.1.1
//! ********************************************************************
//! PROTEIN
//! PR	#1# Homo sapiens   <1,2>
//!
//! KM_VALUE
//! KM	#1# 0.5 {ethanol}  <3>
//! 	continuation of the previous entry
//! ///
//! ```
//!
//! A code line may also carry the EC number inline
//! (`KM\t1.1.1.1\t0.5\t{pH 7.0}`), in which case it does not need an
//! enclosing `ID` block.

use brenda_common::types::is_ec_number;
use serde::Serialize;
use std::io::{BufRead, BufReader, Read};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::source::{buffered, ensure_exists, open_source, spawn_producer, SourceKind, SourceStream};
use super::{IngestError, Result};

const BLOCK_START: &str = "ID\t";
const BLOCK_END: &str = "///";
const MAX_CODE_LEN: usize = 8;

/// One field-coded entry with its continuation lines folded in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTextEntry {
    pub ec_number: String,
    pub field_code: String,
    pub value: String,
    /// Line of the code line, 1-based
    pub line_number: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TextReadStats {
    pub lines: usize,
    pub entries: u64,
    /// EC blocks opened by an `ID` line
    pub blocks: u64,
    /// Entries dropped because their value was empty
    pub empty_entries: u64,
}

/// Iterator over the entries of a flat-file release
pub struct TextEntryReader<R> {
    lines: R,
    path: PathBuf,
    buf: Vec<u8>,
    current_ec: Option<String>,
    pending: Option<Pending>,
    stats: TextReadStats,
    finished: bool,
}

struct Pending {
    ec_number: String,
    field_code: String,
    parts: Vec<String>,
    line_number: usize,
}

/// Reader over an opened release file
pub type FileEntryReader = TextEntryReader<BufReader<Box<dyn Read + Send>>>;

impl FileEntryReader {
    /// Open a release file (plain or `.gz`).
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        ensure_exists(SourceKind::Text, path)?;
        let reader = open_source(SourceKind::Text, path)?;
        info!(path = %path.display(), "Reading flat-file release");
        Ok(Self::from_reader(buffered(reader), path))
    }

    /// Read on a blocking thread and expose the entries as a bounded stream.
    pub fn spawn(self, capacity: usize) -> SourceStream<RawTextEntry, TextReadStats> {
        spawn_producer(capacity, move |tx| {
            self.drain(|entry| match tx.blocking_send(entry) {
                Ok(()) => ControlFlow::Continue(()),
                Err(_) => ControlFlow::Break(()),
            })
        })
    }
}

impl<R: BufRead> TextEntryReader<R> {
    /// `path` is only used in error messages.
    pub fn from_reader(lines: R, path: impl Into<PathBuf>) -> Self {
        Self {
            lines,
            path: path.into(),
            buf: Vec::with_capacity(256),
            current_ec: None,
            pending: None,
            stats: TextReadStats::default(),
            finished: false,
        }
    }

    pub fn stats(&self) -> &TextReadStats {
        &self.stats
    }

    /// Feed every entry to `sink` and return the final counters.
    pub fn drain<F>(mut self, mut sink: F) -> Result<TextReadStats>
    where
        F: FnMut(RawTextEntry) -> ControlFlow<()>,
    {
        while let Some(entry) = self.next() {
            if sink(entry?).is_break() {
                debug!(entries = self.stats.entries, "Text reader stopped by consumer");
                break;
            }
        }
        Ok(self.stats)
    }

    fn read_line(&mut self) -> Result<Option<String>> {
        self.buf.clear();
        if self.lines.read_until(b'\n', &mut self.buf)? == 0 {
            return Ok(None);
        }
        self.stats.lines += 1;

        let mut line = String::from_utf8_lossy(&self.buf).into_owned();
        if self.stats.lines == 1 {
            if let Some(stripped) = line.strip_prefix('\u{feff}') {
                line = stripped.to_string();
            }
        }
        let trimmed_len = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed_len);
        Ok(Some(line))
    }

    /// Process one line; returns an entry when the line completes one.
    fn process_line(&mut self, line: &str) -> Option<RawTextEntry> {
        if line.trim().is_empty() || line.starts_with('*') {
            return None;
        }

        if line.starts_with(BLOCK_END) {
            self.current_ec = None;
            return self.flush();
        }

        if let Some(rest) = line.strip_prefix(BLOCK_START) {
            let completed = self.flush();
            self.current_ec = rest.split_whitespace().next().map(str::to_string);
            self.stats.blocks += 1;
            return completed;
        }

        if line.starts_with(['\t', ' ']) {
            if let Some(pending) = self.pending.as_mut() {
                pending.parts.push(line.trim().to_string());
            }
            return None;
        }

        let Some((code, rest)) = line.split_once('\t') else {
            // section heading such as PROTEIN or KM_VALUE
            return self.flush();
        };

        let code = code.trim();
        if !is_field_code(code) {
            // not an entry line; what follows must not extend the previous entry
            return self.flush();
        }

        let mut fields = rest.split('\t').map(str::trim);
        let (ec_number, value_fields): (Option<String>, Vec<&str>) = match fields.next() {
            Some(first) if is_ec_number(first) => (Some(first.to_string()), fields.collect()),
            Some(first) => (
                self.current_ec.clone(),
                std::iter::once(first).chain(fields).collect(),
            ),
            None => (self.current_ec.clone(), Vec::new()),
        };

        let completed = self.flush();
        if let Some(ec_number) = ec_number {
            let value = value_fields
                .into_iter()
                .filter(|f| !f.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            self.pending = Some(Pending {
                ec_number,
                field_code: code.to_string(),
                parts: vec![value],
                line_number: self.stats.lines,
            });
        }
        completed
    }

    fn flush(&mut self) -> Option<RawTextEntry> {
        let pending = self.pending.take()?;
        let value = pending
            .parts
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        if value.is_empty() {
            self.stats.empty_entries += 1;
            return None;
        }

        self.stats.entries += 1;
        Some(RawTextEntry {
            ec_number: pending.ec_number,
            field_code: pending.field_code,
            value,
            line_number: pending.line_number,
        })
    }

    fn format_error(&self, message: &str) -> IngestError {
        IngestError::SourceFormat {
            kind: SourceKind::Text,
            path: self.path.clone(),
            message: message.to_string(),
        }
    }
}

impl<R: BufRead> Iterator for TextEntryReader<R> {
    type Item = Result<RawTextEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            let line = match self.read_line() {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(err) => {
                    self.finished = true;
                    return Some(Err(err));
                },
            };

            if let Some(entry) = self.process_line(&line) {
                return Some(Ok(entry));
            }
        }

        self.finished = true;
        if let Some(entry) = self.flush() {
            return Some(Ok(entry));
        }

        match (self.stats.lines, self.stats.entries) {
            (0, _) => Some(Err(self.format_error("file is empty"))),
            (_, 0) => Some(Err(self.format_error("no field-coded entries found"))),
            _ => None,
        }
    }
}

/// Field codes are short upper-case tokens (`KM`, `IN`, `TN`, `CF`, ...).
fn is_field_code(code: &str) -> bool {
    !code.is_empty()
        && code.len() <= MAX_CODE_LEN
        && code
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'_')
}
