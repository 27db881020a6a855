//! Streaming reader for the BRENDA JSON release
//!
//! The release is one large object:
//!
//! ```text
//! {
//!   "release": "2025.1",
//!   "version": "...",
//!   "data": {
//!     "1.1.1.1": { "id": "1.1.1.1", "protein": {...}, "km_value": [...], ... },
//!     ...
//!   }
//! }
//! ```
//!
//! The document is walked with a serde visitor: each enzyme value is
//! materialized on its own and handed to a sink before the next one is
//! parsed, so memory use is bounded by the largest single enzyme record.
//! A bare `{ "<EC>": {...} }` mapping is accepted as well.

use brenda_common::types::is_ec_number;
use serde::de::{self, DeserializeSeed, IgnoredAny, MapAccess, Visitor};
use serde::{Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::io::Read;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::source::{buffered, open_source, spawn_producer, SourceKind, SourceStream};
use super::{IngestError, Result};

/// Key holding the EC-number mapping in the release layout
const DATA_KEY: &str = "data";

const CONSUMER_STOPPED: &str = "record consumer stopped";

/// One top-level enzyme entry, not yet normalized
#[derive(Debug, Clone, PartialEq)]
pub struct JsonEnzymeRecord {
    /// Mapping key, normally the EC number
    pub key: String,
    pub body: Value,
}

/// Reader counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JsonReadStats {
    /// Records handed to the sink
    pub records: u64,
    /// Entries skipped because their value was not an object
    pub skipped_records: u64,
    /// Top-level keys that were neither `data` nor an EC number
    pub ignored_keys: u64,
}

/// Reader for the JSON release file
#[derive(Debug, Clone)]
pub struct JsonEnzymeReader {
    path: PathBuf,
}

impl JsonEnzymeReader {
    /// Prepare a reader; fails with `SourceNotFound` if the file is missing.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        super::source::ensure_exists(SourceKind::Json, &path)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse the whole file, calling `sink` once per enzyme record.
    ///
    /// Returning `ControlFlow::Break` from the sink stops the parse early;
    /// that is not an error.
    pub fn read_with<F>(&self, sink: F) -> Result<JsonReadStats>
    where
        F: FnMut(JsonEnzymeRecord) -> ControlFlow<()>,
    {
        let reader = open_source(SourceKind::Json, &self.path)?;
        info!(path = %self.path.display(), "Streaming JSON release");
        read_records(buffered(reader), &self.path, sink)
    }

    /// Parse on a blocking thread and expose the records as a bounded stream.
    pub fn spawn(self, capacity: usize) -> SourceStream<JsonEnzymeRecord, JsonReadStats> {
        spawn_producer(capacity, move |tx| {
            self.read_with(|record| match tx.blocking_send(record) {
                Ok(()) => ControlFlow::Continue(()),
                Err(_) => ControlFlow::Break(()),
            })
        })
    }
}

/// Parse a JSON release from any reader.
///
/// `path` is only used in error messages.
pub fn read_records<R, F>(reader: R, path: &Path, sink: F) -> Result<JsonReadStats>
where
    R: Read,
    F: FnMut(JsonEnzymeRecord) -> ControlFlow<()>,
{
    let mut state = ReadState {
        sink,
        stats: JsonReadStats::default(),
        stopped: false,
    };

    let mut deserializer = serde_json::Deserializer::from_reader(reader);
    let outcome = (&mut deserializer)
        .deserialize_map(DocumentVisitor(&mut state))
        .and_then(|()| deserializer.end());

    match outcome {
        Ok(()) => {},
        Err(_) if state.stopped => {
            debug!(records = state.stats.records, "JSON reader stopped by consumer");
        },
        Err(err) if err.is_io() => return Err(IngestError::Io(err.into())),
        Err(err) => {
            return Err(IngestError::SourceFormat {
                kind: SourceKind::Json,
                path: path.to_path_buf(),
                message: err.to_string(),
            })
        },
    }

    Ok(state.stats)
}

struct ReadState<F> {
    sink: F,
    stats: JsonReadStats,
    stopped: bool,
}

impl<F> ReadState<F>
where
    F: FnMut(JsonEnzymeRecord) -> ControlFlow<()>,
{
    fn emit<E: de::Error>(&mut self, key: String, body: Value) -> std::result::Result<(), E> {
        if !body.is_object() {
            warn!(
                key = %key,
                found = value_kind(&body),
                "Skipping enzyme entry that is not an object"
            );
            self.stats.skipped_records += 1;
            return Ok(());
        }

        self.stats.records += 1;
        match (self.sink)(JsonEnzymeRecord { key, body }) {
            ControlFlow::Continue(()) => Ok(()),
            ControlFlow::Break(()) => {
                self.stopped = true;
                Err(E::custom(CONSUMER_STOPPED))
            },
        }
    }
}

/// Top-level object: `data`, EC-number keys, or metadata to skip
struct DocumentVisitor<'s, F>(&'s mut ReadState<F>);

impl<'de, F> Visitor<'de> for DocumentVisitor<'_, F>
where
    F: FnMut(JsonEnzymeRecord) -> ControlFlow<()>,
{
    type Value = ();

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a JSON object of enzyme records")
    }

    fn visit_map<A>(self, mut map: A) -> std::result::Result<(), A::Error>
    where
        A: MapAccess<'de>,
    {
        while let Some(key) = map.next_key::<String>()? {
            if key == DATA_KEY {
                map.next_value_seed(EntriesSeed(&mut *self.0))?;
            } else if is_ec_number(&key) {
                let body = map.next_value::<Value>()?;
                self.0.emit(key, body)?;
            } else {
                debug!(key = %key, "Ignoring top-level key");
                self.0.stats.ignored_keys += 1;
                map.next_value::<IgnoredAny>()?;
            }
        }
        Ok(())
    }
}

/// The `data` object: every entry is an enzyme record
struct EntriesSeed<'s, F>(&'s mut ReadState<F>);

impl<'de, F> DeserializeSeed<'de> for EntriesSeed<'_, F>
where
    F: FnMut(JsonEnzymeRecord) -> ControlFlow<()>,
{
    type Value = ();

    fn deserialize<D>(self, deserializer: D) -> std::result::Result<(), D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(self)
    }
}

impl<'de, F> Visitor<'de> for EntriesSeed<'_, F>
where
    F: FnMut(JsonEnzymeRecord) -> ControlFlow<()>,
{
    type Value = ();

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an object mapping EC numbers to enzyme records")
    }

    fn visit_map<A>(self, mut map: A) -> std::result::Result<(), A::Error>
    where
        A: MapAccess<'de>,
    {
        while let Some((key, body)) = map.next_entry::<String, Value>()? {
            self.0.emit(key, body)?;
        }
        Ok(())
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn collect(json: &str) -> Result<(Vec<JsonEnzymeRecord>, JsonReadStats)> {
        let mut records = Vec::new();
        let stats = read_records(json.as_bytes(), Path::new("test.json"), |record| {
            records.push(record);
            ControlFlow::Continue(())
        })?;
        Ok((records, stats))
    }

    #[test]
    fn test_release_layout() {
        let json = r#"{
            "release": "2025.1",
            "data": {
                "1.1.1.1": {"id": "1.1.1.1", "recommended_name": "alcohol dehydrogenase"},
                "1.1.1.2": {"id": "1.1.1.2"}
            },
            "version": "1"
        }"#;

        let (records, stats) = collect(json).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].key, "1.1.1.1");
        assert_eq!(records[0].body["recommended_name"], "alcohol dehydrogenase");
        assert_eq!(stats.records, 2);
        assert_eq!(stats.ignored_keys, 2);
    }

    #[test]
    fn test_bare_mapping_layout() {
        let json = r#"{"1.1.1.1": {"id": "1.1.1.1"}, "comment": "x", "2.7.1.1": {}}"#;
        let (records, stats) = collect(json).unwrap();
        let keys: Vec<_> = records.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, ["1.1.1.1", "2.7.1.1"]);
        assert_eq!(stats.ignored_keys, 1);
    }

    #[test]
    fn test_non_object_entries_are_skipped() {
        let json = r#"{"data": {"1.1.1.1": [1, 2], "1.1.1.2": {"id": "1.1.1.2"}, "1.1.1.3": null}}"#;
        let (records, stats) = collect(json).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].key, "1.1.1.2");
        assert_eq!(stats.skipped_records, 2);
    }

    #[test]
    fn test_top_level_array_is_a_format_error() {
        let err = collect(r#"[{"id": "1.1.1.1"}]"#).unwrap_err();
        assert!(matches!(
            err,
            IngestError::SourceFormat {
                kind: SourceKind::Json,
                ..
            }
        ));
    }

    #[test]
    fn test_truncated_document_is_a_format_error() {
        let err = collect(r#"{"data": {"1.1.1.1": {"id": "1.1.1.1"}"#).unwrap_err();
        assert!(matches!(err, IngestError::SourceFormat { .. }));
    }

    #[test]
    fn test_trailing_garbage_is_a_format_error() {
        let err = collect(r#"{"data": {}} {"#).unwrap_err();
        assert!(matches!(err, IngestError::SourceFormat { .. }));
    }

    #[test]
    fn test_sink_can_stop_the_parse() {
        let json = r#"{"data": {"1.1.1.1": {}, "1.1.1.2": {}, "1.1.1.3": {}}}"#;
        let mut seen = 0;
        let stats = read_records(json.as_bytes(), Path::new("test.json"), |_| {
            seen += 1;
            if seen == 2 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })
        .unwrap();

        assert_eq!(seen, 2);
        assert_eq!(stats.records, 2);
    }
}
