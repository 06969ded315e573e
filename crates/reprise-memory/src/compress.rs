//! Lossy response compression.
//!
//! Keeps the first sentence verbatim, appends up to three extracted metrics
//! and three entities, then the final sentence when it adds anything, and
//! hard-caps the result length. Compression preserves the facts the ranking
//! signals depend on while bounding stored size.

use std::collections::BTreeSet;

use reprise_core::text::split_sentences;

/// Minimum length for a final sentence to be worth appending.
const TRIVIAL_SENTENCE_CHARS: usize = 10;

/// How many metrics and entities a summary carries at most.
const MAX_FACTS: usize = 3;

/// Summarizes responses into bounded strings.
#[derive(Debug, Clone, Copy)]
pub struct Compressor {
    max_chars: usize,
}

impl Compressor {
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }

    /// Build a bounded summary of a response.
    ///
    /// Returns `None` for empty or whitespace-only responses; the caller
    /// skips such exchanges rather than storing a useless summary.
    pub fn summarize(
        &self,
        response: &str,
        metrics: &BTreeSet<String>,
        entities: &BTreeSet<String>,
    ) -> Option<String> {
        let trimmed = response.trim();
        if trimmed.is_empty() {
            return None;
        }

        let sentences = split_sentences(trimmed);
        let first = sentences.first().map(|s| s.trim()).unwrap_or(trimmed);

        let mut parts: Vec<String> = vec![first.to_string()];

        if !metrics.is_empty() {
            let listed: Vec<&str> = metrics.iter().take(MAX_FACTS).map(String::as_str).collect();
            parts.push(format!("Metrics: {}.", listed.join(", ")));
        }
        if !entities.is_empty() {
            let listed: Vec<&str> = entities.iter().take(MAX_FACTS).map(String::as_str).collect();
            parts.push(format!("Entities: {}.", listed.join(", ")));
        }

        if sentences.len() > 1 {
            if let Some(last) = sentences.last().map(|s| s.trim()) {
                if last.len() > TRIVIAL_SENTENCE_CHARS && last != first {
                    parts.push(last.to_string());
                }
            }
        }

        let mut summary = parts.join(" ");
        if summary.chars().count() > self.max_chars {
            summary = summary
                .chars()
                .take(self.max_chars.saturating_sub(1))
                .collect::<String>()
                + "\u{2026}";
        }
        Some(summary)
    }
}
