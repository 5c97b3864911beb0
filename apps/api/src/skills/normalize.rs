//! String folding helpers shared by the resolver chain.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Key used for variant lookups: trimmed, lowercased, inner whitespace collapsed.
pub fn lookup_key(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Aggressive fold for the fuzzy step: strips diacritics, case, whitespace and
/// separator punctuation. Symbols that carry meaning (`+`, `#`) are kept.
pub fn fold(raw: &str) -> String {
    raw.nfkd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .filter(|c| !c.is_whitespace() && !is_separator(*c))
        .collect()
}

fn is_separator(c: char) -> bool {
    matches!(c, '.' | '-' | '_' | '/' | ',' | '\'' | '"' | '(' | ')' | ':' | ';')
}

/// Splits a multi-token requirement ("Python / Django", "Machine Learning")
/// into its parts. Single-token input yields one part.
pub fn compound_parts(raw: &str) -> Vec<&str> {
    raw.split(|c: char| c.is_whitespace() || matches!(c, '/' | ',' | '&' | '|'))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}
