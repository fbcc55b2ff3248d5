use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref WORD: Regex = Regex::new(r"[A-Za-z]+").expect("valid regex");
}

/// Tokenize a record into lowercase terms. Non-alphabetic runs act as
/// separators; empty tokens never occur.
pub fn tokenize(text: &str) -> Vec<String> {
    WORD.find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

/// Normalize an entity name or query prefix for q-gram matching:
/// lowercase, all non-alphanumeric characters stripped.
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}
