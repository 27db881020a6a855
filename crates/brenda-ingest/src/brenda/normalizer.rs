//! JSON enzyme record -> mirror rows
//!
//! One record yields one `EnzymeRow`, zero or more `ProteinRow`s and one
//! `EnzymeFactRow` per attribute occurrence. Category keys are kept
//! verbatim, so new categories in a release flow through without changes
//! here.

use brenda_common::types::{
    join_list, EnzymeCounts, EnzymeFactRow, EnzymeRow, ProteinRow, REACTION_CATEGORY,
};
use serde_json::{json, Value};

use super::json_reader::JsonEnzymeRecord;
use super::value_parser::{ordered_bounds, parse_value};

/// Top-level keys stored on the enzyme row rather than as facts
const BASE_FIELDS: [&str; 3] = ["id", "recommended_name", "systematic_name"];

/// Keys holding protein entries
const PROTEIN_KEY: &str = "protein";
const PROTEINS_KEY: &str = "proteins";

/// Fallback context keys, in order of preference
const CONTEXT_KEYS: [&str; 4] = ["organism", "substrate", "ligand", "tissue"];

/// A record that produced no rows at all
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("record {key:?} skipped: {reason}")]
pub struct RecordSkip {
    pub key: String,
    pub reason: String,
}

/// A nested entry dropped from an otherwise valid record
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{ec_number} {category}[{index}] skipped: {reason}")]
pub struct EntrySkip {
    pub ec_number: String,
    pub category: String,
    pub index: usize,
    pub reason: String,
}

/// Rows derived from one enzyme record
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedEnzyme {
    pub enzyme: EnzymeRow,
    pub proteins: Vec<ProteinRow>,
    pub facts: Vec<EnzymeFactRow>,
    pub skipped: Vec<EntrySkip>,
}

impl NormalizedEnzyme {
    pub fn ec_number(&self) -> &str {
        &self.enzyme.ec_number
    }
}

/// Stateless converter from JSON records to table rows
#[derive(Debug, Clone, Copy, Default)]
pub struct EnzymeNormalizer;

impl EnzymeNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Normalize one record.
    ///
    /// Only a record without any usable EC number is rejected; problems in
    /// nested entries end up in [`NormalizedEnzyme::skipped`].
    pub fn normalize(&self, record: &JsonEnzymeRecord) -> Result<NormalizedEnzyme, RecordSkip> {
        let Some(body) = record.body.as_object() else {
            return Err(RecordSkip {
                key: record.key.clone(),
                reason: "record is not an object".to_string(),
            });
        };

        let enzyme_id = body.get("id").and_then(scalar_text);
        let ec_number = Some(record.key.trim())
            .filter(|key| !key.is_empty())
            .map(str::to_string)
            .or_else(|| enzyme_id.clone())
            .ok_or_else(|| RecordSkip {
                key: record.key.clone(),
                reason: "no EC number in key or id field".to_string(),
            })?;

        let mut builder = RowBuilder {
            ec_number: &ec_number,
            counts: EnzymeCounts::default(),
            proteins: Vec::new(),
            facts: Vec::new(),
            skipped: Vec::new(),
        };

        for (key, value) in body {
            if BASE_FIELDS.contains(&key.as_str()) {
                continue;
            }
            if key == PROTEIN_KEY || key == PROTEINS_KEY {
                builder.push_proteins(key, value);
            } else if !is_empty(value) {
                builder.push_category(key, value);
            }
        }

        let reaction_summary = builder
            .facts
            .iter()
            .find(|fact| fact.category == REACTION_CATEGORY)
            .and_then(|fact| fact.value.clone());

        let enzyme = EnzymeRow {
            ec_number: ec_number.clone(),
            enzyme_id,
            recommended_name: body.get("recommended_name").and_then(scalar_text),
            systematic_name: body.get("systematic_name").and_then(scalar_text),
            reaction_summary,
            counts: builder.counts,
        };

        Ok(NormalizedEnzyme {
            enzyme,
            proteins: builder.proteins,
            facts: builder.facts,
            skipped: builder.skipped,
        })
    }
}

struct RowBuilder<'a> {
    ec_number: &'a str,
    counts: EnzymeCounts,
    proteins: Vec<ProteinRow>,
    facts: Vec<EnzymeFactRow>,
    skipped: Vec<EntrySkip>,
}

impl RowBuilder<'_> {
    fn skip(&mut self, category: &str, index: usize, reason: &str) {
        self.skipped.push(EntrySkip {
            ec_number: self.ec_number.to_string(),
            category: category.to_string(),
            index,
            reason: reason.to_string(),
        });
    }

    /// `protein` is keyed by protein id; `proteins` is a list of entries
    /// carrying their own `id`.
    fn push_proteins(&mut self, category: &str, value: &Value) {
        match value {
            Value::Null => {},
            Value::Object(entries) => {
                for (index, (protein_id, detail)) in entries.iter().enumerate() {
                    self.push_protein(category, index, Some(protein_id.clone()), detail);
                }
            },
            Value::Array(entries) => {
                for (index, detail) in entries.iter().enumerate() {
                    let protein_id = detail.get("id").and_then(scalar_text);
                    self.push_protein(category, index, protein_id, detail);
                }
            },
            _ => self.skip(category, 0, "protein section is neither an object nor a list"),
        }
    }

    fn push_protein(
        &mut self,
        category: &str,
        index: usize,
        protein_id: Option<String>,
        detail: &Value,
    ) {
        if !detail.is_object() {
            self.skip(category, index, "protein entry is not an object");
            return;
        }

        self.counts.record_protein();
        self.proteins.push(ProteinRow {
            ec_number: self.ec_number.to_string(),
            protein_id,
            organism: detail.get("organism").and_then(scalar_text),
            comment: detail.get("comment").and_then(scalar_text),
            reference_ids: detail.get("references").and_then(list_text),
            raw_json: detail.to_string(),
        });
    }

    fn push_category(&mut self, category: &str, value: &Value) {
        match value {
            Value::Array(items) => {
                for (index, item) in items.iter().enumerate() {
                    match item {
                        Value::Null => self.skip(category, index, "entry is null"),
                        Value::Object(_) => self.push_fact(category, item),
                        Value::Array(_) => {
                            self.push_fact(category, &json!({ "value": item.to_string() }))
                        },
                        _ => {
                            let text = scalar_text(item).unwrap_or_default();
                            self.push_fact(category, &json!({ "value": text }))
                        },
                    }
                }
            },
            Value::Object(_) => self.push_fact(category, value),
            _ => {
                let text = scalar_text(value).unwrap_or_default();
                self.push_fact(category, &json!({ "value": text }))
            },
        }
    }

    fn push_fact(&mut self, category: &str, payload: &Value) {
        let value = payload.get("value").and_then(scalar_text);
        let parsed = value.as_deref().map(parse_value).unwrap_or_default();

        // Explicit fields only stand in for a missing value text
        let (low, high) = match value {
            Some(_) => (parsed.low, parsed.high),
            None => explicit_bounds(payload),
        };

        let context = parsed.context.or_else(|| {
            CONTEXT_KEYS
                .iter()
                .find_map(|key| payload.get(*key).and_then(scalar_text))
        });

        self.counts.record_fact(category);
        self.facts.push(EnzymeFactRow {
            ec_number: self.ec_number.to_string(),
            category: category.to_string(),
            value,
            value_numeric_low: low,
            value_numeric_high: high,
            unit: parsed.unit,
            context,
            comment: payload.get("comment").and_then(scalar_text),
            proteins: payload.get("proteins").and_then(list_text),
            reference_ids: payload.get("references").and_then(list_text),
            raw_json: payload.to_string(),
        });
    }
}

/// Bounds from `min_value`/`max_value`, else `num_value`.
fn explicit_bounds(payload: &Value) -> (Option<f64>, Option<f64>) {
    let min = payload.get("min_value").and_then(number);
    let max = payload.get("max_value").and_then(number);

    match (min, max) {
        (Some(a), Some(b)) => {
            let (low, high) = ordered_bounds(a, b);
            (Some(low), high)
        },
        (Some(a), None) | (None, Some(a)) => (Some(a), None),
        (None, None) => (payload.get("num_value").and_then(number), None),
    }
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
}

/// Render a scalar as text; blank strings and non-scalars give `None`.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Lists become `;`-joined text; a bare scalar is kept as is.
fn list_text(value: &Value) -> Option<String> {
    match value {
        Value::Array(items) => join_list(items.iter().filter_map(scalar_text)),
        other => scalar_text(other),
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}
