//! Row models of the BRENDA mirror
//!
//! One struct per table. Rows are produced by the normalizers in
//! `brenda-ingest` and written unchanged by the mirror writer; downstream
//! consumers only ever see them through SQL.

use serde::{Deserialize, Serialize};

// ============================================================================
// Well-known fact categories
// ============================================================================

/// Category of synonym facts.
pub const SYNONYMS_CATEGORY: &str = "synonyms";

/// Category of reaction facts.
pub const REACTION_CATEGORY: &str = "reaction";

/// Category of Km value facts.
pub const KM_VALUE_CATEGORY: &str = "km_value";

/// Category of turnover number facts.
pub const TURNOVER_NUMBER_CATEGORY: &str = "turnover_number";

/// Category of inhibitor facts.
pub const INHIBITOR_CATEGORY: &str = "inhibitor";

/// Separator used when a list is stored in a single text column.
pub const LIST_SEPARATOR: &str = ";";

// ============================================================================
// Tables
// ============================================================================

/// The four tables owned by the mirror writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MirrorTable {
    Enzymes,
    Proteins,
    EnzymeFacts,
    TextFacts,
}

impl MirrorTable {
    /// All tables in creation order.
    pub const ALL: [MirrorTable; 4] = [
        MirrorTable::Enzymes,
        MirrorTable::Proteins,
        MirrorTable::EnzymeFacts,
        MirrorTable::TextFacts,
    ];

    /// SQL table name
    pub fn as_str(&self) -> &'static str {
        match self {
            MirrorTable::Enzymes => "enzymes",
            MirrorTable::Proteins => "proteins",
            MirrorTable::EnzymeFacts => "enzyme_facts",
            MirrorTable::TextFacts => "text_facts",
        }
    }
}

impl std::fmt::Display for MirrorTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Enzymes
// ============================================================================

/// Derived counts stored on every enzyme row.
///
/// The accumulator is fed with every protein and fact row emitted for one
/// EC number, so the stored counts always match the detail tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnzymeCounts {
    pub protein_count: i64,
    pub synonym_count: i64,
    pub reaction_count: i64,
    pub km_count: i64,
    pub turnover_count: i64,
    pub inhibitor_count: i64,
}

impl EnzymeCounts {
    pub fn record_protein(&mut self) {
        self.protein_count += 1;
    }

    /// Count one fact row of the given category.
    ///
    /// Categories without a dedicated column are ignored here; they are still
    /// reported per category by the ingestion report.
    pub fn record_fact(&mut self, category: &str) {
        match category {
            SYNONYMS_CATEGORY => self.synonym_count += 1,
            REACTION_CATEGORY => self.reaction_count += 1,
            KM_VALUE_CATEGORY => self.km_count += 1,
            TURNOVER_NUMBER_CATEGORY => self.turnover_count += 1,
            INHIBITOR_CATEGORY => self.inhibitor_count += 1,
            _ => {},
        }
    }
}

/// One row of `enzymes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnzymeRow {
    /// EC number, e.g. "1.1.1.1"
    pub ec_number: String,

    /// Identifier carried by the source record (`id`)
    pub enzyme_id: Option<String>,

    pub recommended_name: Option<String>,

    pub systematic_name: Option<String>,

    /// Value of the first reaction entry
    pub reaction_summary: Option<String>,

    #[serde(flatten)]
    pub counts: EnzymeCounts,
}

// ============================================================================
// Proteins
// ============================================================================

/// One row of `proteins`: an organism-specific instance of an enzyme.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProteinRow {
    pub ec_number: String,
    pub protein_id: Option<String>,
    pub organism: Option<String>,
    pub comment: Option<String>,
    /// `;`-joined reference ids
    pub reference_ids: Option<String>,
    /// The source entry as compact JSON, unknown keys included
    pub raw_json: String,
}

// ============================================================================
// Enzyme facts
// ============================================================================

/// One row of `enzyme_facts`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnzymeFactRow {
    pub ec_number: String,

    /// Source key, stored verbatim (open domain)
    pub category: String,

    /// Raw value text
    pub value: Option<String>,

    pub value_numeric_low: Option<f64>,

    pub value_numeric_high: Option<f64>,

    pub unit: Option<String>,

    pub context: Option<String>,

    pub comment: Option<String>,

    /// `;`-joined protein ids
    pub proteins: Option<String>,

    /// `;`-joined reference ids
    pub reference_ids: Option<String>,

    pub raw_json: String,
}

// ============================================================================
// Text facts
// ============================================================================

/// One row of `text_facts`: one annotation entry of the flat-file release.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextFactRow {
    pub ec_number: String,
    pub field_code: String,
    /// Label from the field code table, or the code itself
    pub field_name: String,
    pub value_raw: String,
    /// Value with protein, reference and qualifier markers removed
    pub value_text: String,
    pub protein_tokens: Option<String>,
    pub reference_tokens: Option<String>,
    pub qualifiers: Option<String>,
}

// ============================================================================
// Helpers
// ============================================================================

/// Join list items into the single-column representation used by the mirror.
///
/// Blank items are dropped; an empty result is stored as NULL.
pub fn join_list<I, S>(items: I) -> Option<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let parts: Vec<String> = items
        .into_iter()
        .map(|item| item.as_ref().trim().to_string())
        .filter(|item| !item.is_empty())
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(LIST_SEPARATOR))
    }
}

/// Whether `value` looks like an EC number.
///
/// Accepts the four-level `d.d.d.d` form and preliminary numbers whose last
/// level is `n<digits>` (e.g. `1.1.1.n2`).
pub fn is_ec_number(value: &str) -> bool {
    let levels: Vec<&str> = value.split('.').collect();
    if levels.len() != 4 {
        return false;
    }

    levels[..3].iter().all(|level| is_digits(level))
        && (is_digits(levels[3]) || levels[3].strip_prefix('n').is_some_and(is_digits))
}

fn is_digits(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_follow_categories() {
        let mut counts = EnzymeCounts::default();
        counts.record_protein();
        counts.record_fact(INHIBITOR_CATEGORY);
        counts.record_fact(INHIBITOR_CATEGORY);
        counts.record_fact(KM_VALUE_CATEGORY);
        counts.record_fact("cofactor");

        assert_eq!(counts.protein_count, 1);
        assert_eq!(counts.inhibitor_count, 2);
        assert_eq!(counts.km_count, 1);
        assert_eq!(counts.synonym_count, 0);
    }

    #[test]
    fn test_join_list() {
        assert_eq!(join_list(["1", " 2 ", ""]), Some("1;2".to_string()));
        assert_eq!(join_list(Vec::<String>::new()), None);
        assert_eq!(join_list(["  "]), None);
    }

    #[test]
    fn test_is_ec_number() {
        assert!(is_ec_number("1.1.1.1"));
        assert!(is_ec_number("3.4.21.105"));
        assert!(is_ec_number("1.1.1.n2"));
        assert!(!is_ec_number("1.1.1"));
        assert!(!is_ec_number("1.1.1.x"));
        assert!(!is_ec_number("release"));
        assert!(!is_ec_number("1..1.1"));
    }

    #[test]
    fn test_enzyme_row_serializes_flat_counts() {
        let row = EnzymeRow {
            ec_number: "1.1.1.1".to_string(),
            enzyme_id: Some("1.1.1.1".to_string()),
            recommended_name: Some("alcohol dehydrogenase".to_string()),
            systematic_name: None,
            reaction_summary: None,
            counts: EnzymeCounts {
                protein_count: 3,
                ..Default::default()
            },
        };

        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["protein_count"], 3);
        assert_eq!(MirrorTable::EnzymeFacts.to_string(), "enzyme_facts");
    }
}
