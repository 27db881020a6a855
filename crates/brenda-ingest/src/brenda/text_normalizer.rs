//! Flat-file entry -> `text_facts` row
//!
//! Entry values carry inline markup:
//!
//! ```text
//! #1,2# 0.5 {pH 7.0} (#1# wild-type enzyme <4>) <3,4>
//! ^^^^^     ^^^^^^^^ ^^^^^^^^^^^^^^^^^^^^^^^^^^ ^^^^^
//! proteins  qualifier  commentary qualifier     references
//! ```
//!
//! The tokenizer pulls the markers out and leaves the narrative text.
//! Malformed markup is never an error; it stays in the text as written.

use brenda_common::field_codes;
use brenda_common::types::{join_list, TextFactRow};
use std::collections::BTreeSet;
use tracing::warn;

use super::text_reader::RawTextEntry;

/// Markers split out of an entry value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenizedText {
    /// Value with all recognized markers removed, whitespace collapsed
    pub cleaned: String,
    pub proteins: Vec<String>,
    pub references: Vec<String>,
    pub qualifiers: Vec<String>,
}

/// Commentary blocks nested deeper than this are left in the text as written
const MAX_COMMENTARY_DEPTH: usize = 8;

/// Split protein (`#..#`), reference (`<..>`) and qualifier (`{..}`,
/// `(#..)`) markers out of `text`.
pub fn tokenize(text: &str) -> TokenizedText {
    let chars: Vec<char> = text.chars().collect();
    Markup::new(&chars).tokenize(0, chars.len(), 0)
}

/// Marker positions indexed once per value, so every lookup is constant time
struct Markup<'a> {
    chars: &'a [char],
    next_hash: Vec<Option<usize>>,
    next_angle: Vec<Option<usize>>,
    next_brace: Vec<Option<usize>>,
    next_visible: Vec<Option<usize>>,
    closing_paren: Vec<Option<usize>>,
}

impl<'a> Markup<'a> {
    fn new(chars: &'a [char]) -> Self {
        let n = chars.len();
        let mut next_hash = vec![None; n + 1];
        let mut next_angle = vec![None; n + 1];
        let mut next_brace = vec![None; n + 1];
        let mut next_visible = vec![None; n + 1];
        for i in (0..n).rev() {
            next_hash[i] = if chars[i] == '#' { Some(i) } else { next_hash[i + 1] };
            next_angle[i] = if chars[i] == '>' { Some(i) } else { next_angle[i + 1] };
            next_brace[i] = if chars[i] == '}' { Some(i) } else { next_brace[i + 1] };
            next_visible[i] = if chars[i].is_whitespace() {
                next_visible[i + 1]
            } else {
                Some(i)
            };
        }

        let mut closing_paren = vec![None; n];
        let mut open = Vec::new();
        for (i, c) in chars.iter().enumerate() {
            match c {
                '(' => open.push(i),
                ')' => {
                    if let Some(start) = open.pop() {
                        closing_paren[start] = Some(i);
                    }
                },
                _ => {},
            }
        }

        Self {
            chars,
            next_hash,
            next_angle,
            next_brace,
            next_visible,
            closing_paren,
        }
    }

    /// Tokenize `chars[start..end]`.
    fn tokenize(&self, start: usize, end: usize, depth: usize) -> TokenizedText {
        let chars = self.chars;
        let mut out = TokenizedText::default();
        let mut cleaned = String::with_capacity(end - start);
        let mut i = start;

        while i < end {
            let c = chars[i];
            let consumed = match c {
                '#' => self.id_list(i, end, &self.next_hash).map(|(ids, close)| {
                    out.proteins.extend(ids);
                    close
                }),
                '<' => self.id_list(i, end, &self.next_angle).map(|(ids, close)| {
                    out.references.extend(ids);
                    close
                }),
                '{' => within(&self.next_brace, i + 1, end).map(|close| {
                    push_qualifier(&mut out.qualifiers, &collect(&chars[i + 1..close]));
                    close
                }),
                '(' if depth < MAX_COMMENTARY_DEPTH && self.opens_commentary(i, end) => self
                    .closing_paren[i]
                    .filter(|close| *close < end)
                    .map(|close| {
                        let inner = self.tokenize(i + 1, close, depth + 1);
                        out.proteins.extend(inner.proteins);
                        out.references.extend(inner.references);
                        push_qualifier(&mut out.qualifiers, &inner.cleaned);
                        close
                    }),
                _ => None,
            };

            match consumed {
                Some(close) => {
                    cleaned.push(' ');
                    i = close + 1;
                },
                None => {
                    cleaned.push(c);
                    i += 1;
                },
            }
        }

        out.cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
        out
    }

    /// `#1,2#` / `<3,4>`: digits, commas and spaces only, at least one digit.
    fn id_list(
        &self,
        open: usize,
        end: usize,
        closers: &[Option<usize>],
    ) -> Option<(Vec<String>, usize)> {
        let close = within(closers, open + 1, end)?;
        let body = &self.chars[open + 1..close];

        let well_formed = body
            .iter()
            .all(|c| c.is_ascii_digit() || *c == ',' || c.is_whitespace())
            && body.iter().any(|c| c.is_ascii_digit());
        if !well_formed {
            return None;
        }

        let ids = collect(body)
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect();
        Some((ids, close))
    }

    /// `(` followed by optional whitespace and a protein marker
    fn opens_commentary(&self, open: usize, end: usize) -> bool {
        within(&self.next_visible, open + 1, end).is_some_and(|pos| self.chars[pos] == '#')
    }
}

/// Position recorded in `table` at `from`, if it falls before `end`
fn within(table: &[Option<usize>], from: usize, end: usize) -> Option<usize> {
    table
        .get(from)
        .copied()
        .flatten()
        .filter(|pos| *pos < end)
}

fn collect(chars: &[char]) -> String {
    chars.iter().collect()
}

fn push_qualifier(qualifiers: &mut Vec<String>, text: &str) {
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if !text.is_empty() {
        qualifiers.push(text);
    }
}

/// Converts flat-file entries into `text_facts` rows.
///
/// Remembers which field codes were missing from the code table so each is
/// reported once.
#[derive(Debug, Default)]
pub struct TextFactNormalizer {
    unknown_codes: BTreeSet<String>,
}

impl TextFactNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn normalize(&mut self, entry: RawTextEntry) -> TextFactRow {
        if field_codes::field_name(&entry.field_code).is_none()
            && self.unknown_codes.insert(entry.field_code.clone())
        {
            warn!(
                code = %entry.field_code,
                ec_number = %entry.ec_number,
                line = entry.line_number,
                "Unknown field code, using the code as its name"
            );
        }
        let field_name = field_codes::field_name_or_code(&entry.field_code);

        let tokens = tokenize(&entry.value);

        TextFactRow {
            ec_number: entry.ec_number,
            field_code: entry.field_code,
            field_name,
            value_text: tokens.cleaned,
            protein_tokens: join_list(&tokens.proteins),
            reference_tokens: join_list(&tokens.references),
            qualifiers: join_list(&tokens.qualifiers),
            value_raw: entry.value,
        }
    }

    /// Field codes seen so far that have no table entry, sorted
    pub fn unknown_codes(&self) -> impl Iterator<Item = &str> {
        self.unknown_codes.iter().map(String::as_str)
    }
}
