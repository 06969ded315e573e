//! Lexical reference-signal detection.
//!
//! Scans a message for the word classes that mark elliptical follow-ups:
//! pronouns, ordinals, comparatives, continuations, and explicit back
//! references. Pure and deterministic, with no failure mode.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// The maximum reference score; totals are clamped here.
pub const MAX_REFERENCE_SCORE: f64 = 0.4;

/// Multiplier applied when the session already has prior exchanges, since
/// reference words only resolve to something when history exists.
const HISTORY_MULTIPLIER: f64 = 1.5;

/// A class of reference-marking words.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SignalCategory {
    Pronoun,
    Ordinal,
    Comparison,
    Continuation,
    ExplicitReference,
}

impl SignalCategory {
    /// Per-match weight. Pronouns and ordinals are the strongest markers;
    /// continuation words the weakest.
    pub fn weight(&self) -> f64 {
        match self {
            SignalCategory::Pronoun => 0.08,
            SignalCategory::Ordinal => 0.08,
            SignalCategory::Comparison => 0.06,
            SignalCategory::Continuation => 0.04,
            SignalCategory::ExplicitReference => 0.06,
        }
    }
}

struct CategoryPattern {
    category: SignalCategory,
    regex: Regex,
}

static CATEGORY_PATTERNS: LazyLock<Vec<CategoryPattern>> = LazyLock::new(|| {
    let mk = |category: SignalCategory, words: &[&str]| CategoryPattern {
        category,
        regex: Regex::new(&format!(r"(?i)\b(?:{})\b", words.join("|")))
            .expect("Invalid reference-signal regex"),
    };

    vec![
        mk(
            SignalCategory::Pronoun,
            &[
                "it", "this", "that", "these", "those", "they", "them", "its", "one", "ones",
            ],
        ),
        mk(
            SignalCategory::Ordinal,
            &[
                "first", "second", "third", "fourth", "fifth", "last", "next", "another",
                "previous", "former", "latter",
            ],
        ),
        mk(
            SignalCategory::Comparison,
            &[
                "versus", "vs", "compared", "compare", "comparison", "than", "against",
                "difference", "better", "worse", "higher", "lower",
            ],
        ),
        mk(
            SignalCategory::Continuation,
            &[
                "also", "too", "moreover", "additionally", "furthermore", "again", "more",
                "still",
            ],
        ),
        mk(
            SignalCategory::ExplicitReference,
            &[
                "above", "earlier", "before", "previously", "mentioned", "aforementioned",
                "prior", "same",
            ],
        ),
    ]
});

/// Result of a reference scan: every matched word per category, plus the
/// clamped total score.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceSignals {
    pub matches: BTreeMap<SignalCategory, Vec<String>>,
    /// Weighted, history-adjusted total in `[0, MAX_REFERENCE_SCORE]`.
    pub score: f64,
}

impl ReferenceSignals {
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

/// Stateless detector over the compiled category patterns.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceSignalDetector;

impl ReferenceSignalDetector {
    pub fn new() -> Self {
        Self
    }

    /// Scan a message for reference signals.
    ///
    /// Every occurrence counts: "that one and that other one" contributes
    /// four pronoun matches. With prior history the total is multiplied by
    /// 1.5 before clamping.
    pub fn detect(&self, message: &str, has_history: bool) -> ReferenceSignals {
        let mut matches: BTreeMap<SignalCategory, Vec<String>> = BTreeMap::new();
        let mut score = 0.0;

        for pattern in CATEGORY_PATTERNS.iter() {
            let found: Vec<String> = pattern
                .regex
                .find_iter(message)
                .map(|m| m.as_str().to_lowercase())
                .collect();
            if found.is_empty() {
                continue;
            }
            score += pattern.category.weight() * found.len() as f64;
            matches.insert(pattern.category, found);
        }

        if has_history {
            score *= HISTORY_MULTIPLIER;
        }

        ReferenceSignals {
            matches,
            score: score.min(MAX_REFERENCE_SCORE),
        }
    }
}
