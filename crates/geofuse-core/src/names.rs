//! Core-name canonicalization for comparing country and sovereign names.

use once_cell::sync::Lazy;
use regex::Regex;

static POLITICAL_TOKENS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?-u:\b)(republic|rep\.?|democratic|dem\.?|people's|p\.?d\.?r\.?|kingdom|k\.?o\.?|federation|fed\.?|federal|islamic|state of|states|the|of|and|commonwealth|territory|islands|is\.?|province|admin\.?|administrative|region)(?-u:\b)",
    )
    .unwrap()
});

static PUNCTUATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.,()'\-]").unwrap());

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Core pairs that denote the same state although neither contains the other.
/// Checked in both directions.
const EQUIVALENT_CORES: &[(&str, &str)] = &[
    ("korea", "south korea"),
    ("korea", "north korea"),
    ("czech", "czechia"),
];

/// Strip political boilerplate and punctuation from a name.
///
/// `"Democratic Republic of the Congo"` -> `"congo"`.
pub fn core_name(name: &str) -> String {
    let lower = name.to_lowercase();
    let stripped = POLITICAL_TOKENS.replace_all(&lower, "");
    let stripped = PUNCTUATION.replace_all(&stripped, "");
    WHITESPACE.replace_all(&stripped, " ").trim().to_string()
}

fn is_equivalent_pair(a: &str, b: &str) -> bool {
    EQUIVALENT_CORES
        .iter()
        .any(|&(x, y)| (a == x && b == y) || (a == y && b == x))
}

/// Whether two names refer to the same political entity.
///
/// True when the cores are equal, when one non-empty core contains the other,
/// or when the pair is listed in the equivalence table.
pub fn cores_match(a: &str, b: &str) -> bool {
    let core_a = core_name(a);
    let core_b = core_name(b);

    if core_a == core_b {
        return true;
    }
    if !core_a.is_empty()
        && !core_b.is_empty()
        && (core_a.contains(&core_b) || core_b.contains(&core_a))
    {
        return true;
    }
    is_equivalent_pair(&core_a, &core_b)
}
