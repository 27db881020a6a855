//! Field codes of the BRENDA flat-file release
//!
//! Every annotation line of the text dump starts with a short code
//! (`KM`, `IN`, `SP`, ...). The table below maps the codes documented for the
//! release format to the labels stored in `text_facts.field_name`.

/// All known codes with their labels, sorted by code.
pub const FIELD_CODES: &[(&str, &str)] = &[
    ("AC", "activating compound"),
    ("AP", "application"),
    ("BR", "BRENDA release"),
    ("CF", "cofactor"),
    ("CL", "cloned"),
    ("CR", "crystallization"),
    ("EN", "engineering"),
    ("EXP", "expression"),
    ("GI", "general information"),
    ("GS", "general stability"),
    ("IC50", "IC50 value"),
    ("ID", "EC class"),
    ("IN", "inhibitor"),
    ("KI", "Ki value"),
    ("KKM", "kcat/KM value"),
    ("KM", "Km value"),
    ("LO", "localization"),
    ("ME", "metals/ions"),
    ("MW", "molecular weight"),
    ("NSP", "natural substrates/products"),
    ("OS", "oxygen stability"),
    ("OSS", "organic solvent stability"),
    ("PHO", "pH optimum"),
    ("PHR", "pH range"),
    ("PHS", "pH stability"),
    ("PI", "isoelectric point"),
    ("PM", "post translational modification"),
    ("PR", "protein"),
    ("PU", "purification"),
    ("RE", "reaction"),
    ("REN", "renatured"),
    ("RF", "reference"),
    ("RN", "recommended name"),
    ("RT", "reaction type"),
    ("SA", "specific activity"),
    ("SN", "systematic name"),
    ("SP", "substrate/product"),
    ("SS", "storage stability"),
    ("ST", "source tissue"),
    ("SU", "subunits"),
    ("SY", "synonym"),
    ("TN", "turnover number"),
    ("TO", "temperature optimum"),
    ("TR", "temperature range"),
    ("TS", "temperature stability"),
];

/// Look up the label of a field code.
pub fn field_name(code: &str) -> Option<&'static str> {
    FIELD_CODES
        .binary_search_by(|(known, _)| known.cmp(&code))
        .ok()
        .map(|idx| FIELD_CODES[idx].1)
}

/// Label for a field code, falling back to the code itself.
pub fn field_name_or_code(code: &str) -> String {
    field_name(code).map(str::to_string).unwrap_or_else(|| code.to_string())
}
