//! Lexical helpers shared by the scorers, extractors, and compressor.
//!
//! All deterministic, all allocation-light. These back the fallback path, so
//! they must behave identically regardless of embedding availability.

use std::collections::BTreeSet;

/// Words carrying no topical signal, stripped before overlap scoring and
/// topic extraction.
static STOP_WORDS: &[&str] = &[
    "a", "an", "the", "is", "are", "was", "were", "am", "be", "been", "being",
    "have", "has", "had", "do", "does", "did", "will", "would", "shall", "should",
    "may", "might", "must", "can", "could", "i", "me", "my", "we", "our", "you",
    "your", "he", "she", "it", "they", "them", "his", "her", "its", "their",
    "what", "which", "who", "whom", "this", "that", "these", "those", "of", "in",
    "to", "for", "with", "on", "at", "from", "by", "about", "as", "into", "through",
    "and", "but", "or", "not", "no", "so", "if", "then", "than", "too", "very",
    "just", "also", "up", "out", "all", "any", "some", "how", "when", "where",
    "why", "show", "tell", "give", "find", "get", "make", "more", "please",
];

/// Lowercase a word and strip surrounding punctuation.
pub fn normalize_word(word: &str) -> String {
    word.to_lowercase()
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_string()
}

pub fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(&word)
}

/// Normalized, stop-word-filtered terms of at least three characters.
///
/// This is the unit of lexical comparison everywhere: fallback similarity,
/// topic extraction, and ranking overlap all agree on it.
pub fn significant_words(text: &str) -> BTreeSet<String> {
    text.split_whitespace()
        .map(normalize_word)
        .filter(|w| w.len() >= 3 && !is_stop_word(w))
        .collect()
}

/// Whitespace-delimited word count of the raw message.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Split text into sentences on `.` `!` `?` followed by whitespace.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut result = Vec::new();
    let mut start = 0;
    let bytes = text.as_bytes();
    for (i, c) in text.char_indices() {
        if (c == '.' || c == '!' || c == '?') && i + 1 < text.len() {
            let next = bytes.get(i + 1).copied().unwrap_or(0);
            if next == b' ' || next == b'\n' {
                result.push(&text[start..=i]);
                start = i + 1;
            }
        }
    }
    if start < text.len() {
        result.push(&text[start..]);
    }
    result
}

/// Fraction of the query's significant words that also occur in `other`.
///
/// Returns 0.0 when the query has no significant words at all.
pub fn lexical_overlap(query: &str, other: &str) -> f64 {
    let query_words = significant_words(query);
    if query_words.is_empty() {
        return 0.0;
    }
    let other_words = significant_words(other);
    let shared = query_words.intersection(&other_words).count();
    shared as f64 / query_words.len() as f64
}
