//! Numeric extraction from fact values
//!
//! Fact values in the JSON release are free text. Only two shapes are read as
//! numbers:
//!
//! ```text
//! 0.5            single value       -> low = 0.5
//! 0.1-0.5 mM     range with unit    -> low = 0.1, high = 0.5, unit = "mM"
//! 12 – 15 {pH 7} range with context -> low = 12, high = 15, context = "pH 7"
//! ```
//!
//! Anything else (`more`, `<0.1`, `approx. 5`, multi-word tails) is left
//! non-numeric. Parsing never fails; the caller always keeps the raw text.

use regex::Regex;
use std::sync::LazyLock;

#[allow(clippy::expect_used)]
static CONTEXT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?s)(?P<body>.*?)\s*\{(?P<context>[^{}]*)\}$").expect("context pattern is valid")
});

// NUMBER [DASH NUMBER] [UNIT]; the unit is one token that cannot start like a
// number, a dash or an inequality sign
#[allow(clippy::expect_used)]
static NUMERIC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<low>[-+]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][-+]?\d+)?)(?:\s*[-\x{2010}\x{2012}-\x{2014}\x{2212}]\s*(?P<high>[-+]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][-+]?\d+)?))?(?:\s*(?P<unit>[^\s\d+\-.<>=~\x{2010}-\x{2014}\x{2212}\x{2264}\x{2265}]\S*))?$",
    )
    .expect("numeric pattern is valid")
});

/// Numeric reading of one fact value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedValue {
    pub low: Option<f64>,
    /// Set only for a proper range, always greater than `low`
    pub high: Option<f64>,
    pub unit: Option<String>,
    /// Trailing `{...}` annotation
    pub context: Option<String>,
}

impl ParsedValue {
    pub fn is_numeric(&self) -> bool {
        self.low.is_some()
    }
}

/// Extract bounds, unit and context from a raw value.
pub fn parse_value(text: &str) -> ParsedValue {
    let trimmed = text.trim();

    let (body, context) = match CONTEXT_RE.captures(trimmed) {
        Some(caps) => {
            let body = caps.name("body").map_or("", |m| m.as_str());
            let context = caps
                .name("context")
                .map(|m| m.as_str().trim())
                .filter(|c| !c.is_empty())
                .map(str::to_string);
            (body.trim(), context)
        },
        None => (trimmed, None),
    };

    let mut parsed = ParsedValue {
        context,
        ..Default::default()
    };

    let Some(caps) = NUMERIC_RE.captures(body) else {
        return parsed;
    };

    let low = caps.name("low").and_then(|m| parse_number(m.as_str()));
    let high = caps.name("high").and_then(|m| parse_number(m.as_str()));

    let (low, high) = match (low, high, caps.name("high").is_some()) {
        (Some(low), Some(high), _) => ordered_bounds(low, high),
        (Some(low), None, false) => (low, None),
        // an unreadable bound makes the whole value non-numeric
        _ => return parsed,
    };

    parsed.low = Some(low);
    parsed.high = high;
    parsed.unit = caps.name("unit").map(|m| m.as_str().to_string());
    parsed
}

/// Order two bounds; a degenerate range collapses to a single value.
pub fn ordered_bounds(a: f64, b: f64) -> (f64, Option<f64>) {
    if a < b {
        (a, Some(b))
    } else if b < a {
        (b, Some(a))
    } else {
        (a, None)
    }
}

fn parse_number(text: &str) -> Option<f64> {
    text.parse::<f64>().ok().filter(|n| n.is_finite())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_single_value() {
        let parsed = parse_value("0.5");
        assert_eq!(parsed.low, Some(0.5));
        assert_eq!(parsed.high, None);
        assert_eq!(parsed.unit, None);
    }

    #[test]
    fn test_sentinel_is_a_value() {
        let parsed = parse_value("-999");
        assert_eq!(parsed.low, Some(-999.0));
        assert_eq!(parsed.high, None);
    }

    #[test]
    fn test_ranges_with_dash_variants() {
        for text in ["0.1-0.5", "0.1 - 0.5", "0.1–0.5", "0.1 — 0.5", "0.1\u{2212}0.5", "0.1‒0.5"] {
            let parsed = parse_value(text);
            assert_eq!(parsed.low, Some(0.1), "low of {text:?}");
            assert_eq!(parsed.high, Some(0.5), "high of {text:?}");
        }
    }

    #[test]
    fn test_reversed_range_is_reordered() {
        let parsed = parse_value("40-25");
        assert_eq!(parsed.low, Some(25.0));
        assert_eq!(parsed.high, Some(40.0));
    }

    #[test]
    fn test_degenerate_range_keeps_low_only() {
        let parsed = parse_value("7-7");
        assert_eq!(parsed.low, Some(7.0));
        assert_eq!(parsed.high, None);
    }

    #[test]
    fn test_unit_and_context() {
        let parsed = parse_value("0.1-0.5 mM {25°C}");
        assert_eq!(parsed.low, Some(0.1));
        assert_eq!(parsed.high, Some(0.5));
        assert_eq!(parsed.unit.as_deref(), Some("mM"));
        assert_eq!(parsed.context.as_deref(), Some("25°C"));

        assert_eq!(parse_value("55 kDa").unit.as_deref(), Some("kDa"));
        assert_eq!(parse_value("12%").unit.as_deref(), Some("%"));
    }

    #[test]
    fn test_qualified_values_are_not_numeric() {
        for text in ["more", "<0.1", "> 5", "approx. 5", "0.5 at pH 7.5", "5-", "-", "", "n.d."] {
            let parsed = parse_value(text);
            assert!(!parsed.is_numeric(), "{text:?} should not be numeric");
            assert_eq!(parsed.high, None);
            assert_eq!(parsed.unit, None);
        }
    }

    #[test]
    fn test_context_survives_non_numeric_body() {
        let parsed = parse_value("more {pH 7.0}");
        assert!(!parsed.is_numeric());
        assert_eq!(parsed.context.as_deref(), Some("pH 7.0"));
    }

    #[test]
    fn test_exponent_and_overflow() {
        assert_eq!(parse_value("1.5e-3").low, Some(0.0015));
        assert!(!parse_value("1e999").is_numeric());
    }

    proptest! {
        #[test]
        fn prop_parse_value_never_panics(text in "\\PC*") {
            let _ = parse_value(&text);
        }

        #[test]
        fn prop_ranges_are_ordered(a in -1.0e6f64..1.0e6, b in -1.0e6f64..1.0e6) {
            let parsed = parse_value(&format!("{a}-{b}"));
            if let (Some(low), Some(high)) = (parsed.low, parsed.high) {
                prop_assert!(low < high);
            }
        }

        #[test]
        fn prop_integers_round_trip(n in -100_000i64..100_000) {
            prop_assert_eq!(parse_value(&n.to_string()).low, Some(n as f64));
        }
    }
}
