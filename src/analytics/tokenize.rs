//! Word tokenization for page statistics
//!
//! A token is a maximal run of ASCII letters, digits and apostrophes,
//! lowercased, with leading and trailing apostrophes removed. Only tokens
//! containing at least one letter count as words.

use crate::analytics::stopwords::is_stop_word;

fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '\''
}

/// Iterates over every lowercase token of `text` that contains a letter
pub fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !is_token_char(c))
        .map(|raw| raw.trim_matches('\''))
        .filter(|token| token.chars().any(|c| c.is_ascii_alphabetic()))
        .map(|token| token.to_ascii_lowercase())
}

/// Number of words on a page, stop words included
pub fn word_count(text: &str) -> usize {
    words(text).count()
}

/// Words that feed the frequency table (stop words removed)
pub fn frequency_words(text: &str) -> Vec<String> {
    words(text).filter(|w| !is_stop_word(w)).collect()
}
