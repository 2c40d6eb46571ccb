use std::sync::OnceLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

static NON_ALPHANUM_RE: OnceLock<Regex> = OnceLock::new();
static PUNCTUATION_RE: OnceLock<Regex> = OnceLock::new();
static WHITESPACE_RE: OnceLock<Regex> = OnceLock::new();

/// Canonical form shared by the label table and request text.
///
/// The stages run in a fixed order; reordering them makes the table built at
/// startup diverge from what the models were trained on.
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let folded = fold_to_ascii(&lowered);
    let stripped = strip_non_alphanum(&folded);
    let stripped = strip_punctuation(&stripped);
    collapse_whitespace(&stripped)
}

/// NFKD-decompose, then drop everything outside the ASCII range. Accented
/// letters lose their marks; non-Latin scripts drop entirely.
fn fold_to_ascii(text: &str) -> String {
    text.nfkd().filter(|c| c.is_ascii()).collect()
}

fn strip_non_alphanum(text: &str) -> String {
    let re = NON_ALPHANUM_RE.get_or_init(|| Regex::new(r"[^a-zA-Z0-9\s]").expect("static regex"));
    re.replace_all(text, "").into_owned()
}

// Redundant for ASCII input after strip_non_alphanum, but the reference table
// was built with both passes, so both stay.
fn strip_punctuation(text: &str) -> String {
    let re = PUNCTUATION_RE.get_or_init(|| Regex::new(r"[^\w\s]").expect("static regex"));
    re.replace_all(text, "").into_owned()
}

fn collapse_whitespace(text: &str) -> String {
    let re = WHITESPACE_RE.get_or_init(|| Regex::new(r"\s+").expect("static regex"));
    re.replace_all(text, " ").trim().to_string()
}
