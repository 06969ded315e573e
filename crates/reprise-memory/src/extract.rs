//! Deterministic lexical metadata extraction.
//!
//! Topics, entities, and metrics are pulled from exchange text with regex
//! and keyword rules only; no model is involved, so the same text always
//! yields the same sets.

use std::collections::BTreeSet;

use regex::Regex;
use reprise_core::text::{is_stop_word, significant_words};

/// The extracted sets for one piece of text.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExtractedMetadata {
    pub topics: BTreeSet<String>,
    pub entities: BTreeSet<String>,
    pub metrics: BTreeSet<String>,
}

/// Extracts topics, named entities, and numeric metrics from text.
pub struct MetadataExtractor {
    entity_regex: Regex,
    quoted_regex: Regex,
    metric_regex: Regex,
}

impl MetadataExtractor {
    /// Create an extractor with pre-compiled patterns.
    pub fn new() -> Self {
        Self {
            // Runs of capitalized words, allowing slash-joined names like
            // AC/DC.
            entity_regex: Regex::new(
                r"\b[A-Z][A-Za-z0-9]*(?:/[A-Z][A-Za-z0-9]*)*(?:\s+[A-Z][A-Za-z0-9]*(?:/[A-Z][A-Za-z0-9]*)*)*",
            )
            .expect("Invalid entity regex"),
            quoted_regex: Regex::new(r#""([^"]+)""#).expect("Invalid quote regex"),
            // Currency, percentages, number-with-unit, then bare numbers of
            // three or more digits. Alternation order matters: the unit form
            // must win over the bare number at the same position.
            metric_regex: Regex::new(
                r"(?i)\$\d[\d,]*(?:\.\d+)?|\d[\d,]*(?:\.\d+)?\s*%|\d[\d,]*(?:\.\d+)?\s+(?:sales|units|orders|customers|invoices|rows|records|tracks|albums|plays|downloads|percent|dollars|euros)\b|\b\d{3,}\b",
            )
            .expect("Invalid metric regex"),
        }
    }

    /// Extract all metadata sets from the given text.
    pub fn extract(&self, text: &str) -> ExtractedMetadata {
        let mut out = ExtractedMetadata::default();

        // Topics: significant words, numbers excluded.
        out.topics = significant_words(text)
            .into_iter()
            .filter(|w| !w.chars().all(|c| c.is_ascii_digit()))
            .collect();

        // Entities: capitalized runs plus double-quoted strings.
        for m in self.entity_regex.find_iter(text) {
            let candidate = m.as_str().trim();
            if is_entity_candidate(candidate) {
                out.entities.insert(candidate.to_string());
            }
        }
        for caps in self.quoted_regex.captures_iter(text) {
            if let Some(quoted) = caps.get(1) {
                let value = quoted.as_str().trim();
                if !value.is_empty() {
                    out.entities.insert(value.to_string());
                }
            }
        }

        // Metrics: numbers with currency, percent, or unit context.
        for m in self.metric_regex.find_iter(text) {
            out.metrics.insert(m.as_str().trim().to_lowercase());
        }

        out
    }
}

impl Default for MetadataExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Filter out capitalized words that are just sentence starts or calendar
/// words rather than names.
fn is_entity_candidate(candidate: &str) -> bool {
    if candidate.len() < 2 {
        return false;
    }
    // Single stop words capitalized at sentence start ("Show", "The", ...).
    if !candidate.contains(' ') && is_stop_word(&candidate.to_lowercase()) {
        return false;
    }
    !is_calendar_word(candidate)
}

fn is_calendar_word(s: &str) -> bool {
    matches!(
        s,
        "Monday"
            | "Tuesday"
            | "Wednesday"
            | "Thursday"
            | "Friday"
            | "Saturday"
            | "Sunday"
            | "January"
            | "February"
            | "March"
            | "April"
            | "May"
            | "June"
            | "July"
            | "August"
            | "September"
            | "October"
            | "November"
            | "December"
    )
}
