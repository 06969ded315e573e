//! Intent classification: shared result types, the canonical example
//! phrases used to build embedding prototypes, and the keyword fallback
//! classifier.
//!
//! The classifier never fails; input with no recognizable signal yields
//! `Intent::Unknown` with zero confidence.

use std::collections::BTreeMap;

use reprise_core::types::Intent;
use serde::{Deserialize, Serialize};

/// Canonical example phrases per intent. Embedding mode averages their
/// vectors into one prototype per intent at strategy construction.
pub(crate) static INTENT_EXAMPLES: &[(Intent, &[&str])] = &[
    (
        Intent::Clarification,
        &[
            "what do you mean by that",
            "can you explain that result again",
            "i am confused by the last answer",
            "could you clarify what that column is",
        ],
    ),
    (
        Intent::DrillDown,
        &[
            "tell me more about the first one",
            "show me more detail on that result",
            "break that down further",
            "drill into the top entry",
        ],
    ),
    (
        Intent::Visualization,
        &[
            "can you make a chart of this",
            "plot these results",
            "show that as a graph",
            "visualize the breakdown",
        ],
    ),
    (
        Intent::Comparison,
        &[
            "how does that compare to last year",
            "show the difference between the two",
            "which one is higher",
            "compare these results side by side",
        ],
    ),
    (
        Intent::Analysis,
        &[
            "why is that number so high",
            "what is the trend here",
            "analyze these figures",
            "what patterns do you see in this",
        ],
    ),
    (
        Intent::Continuation,
        &[
            "what else is there",
            "show me the next ones",
            "continue with the rest",
            "and the others",
        ],
    ),
    (
        Intent::Reference,
        &[
            "the one you mentioned earlier",
            "go back to the previous result",
            "the table from before",
            "run that same query again",
        ],
    ),
    (
        Intent::Modification,
        &[
            "filter that to this year only",
            "exclude the first row",
            "change it to monthly totals",
            "limit that to ten results",
        ],
    ),
    (
        Intent::NewQuery,
        &[
            "show me all customers",
            "list every invoice from the database",
            "what are the total sales by country",
            "give me a report of all employees",
        ],
    ),
];

/// Keyword phrases per intent for the fallback classifier, in registration
/// order. Ties break toward the earlier entry.
static INTENT_KEYWORDS: &[(Intent, &[&str])] = &[
    (
        Intent::Clarification,
        &[
            "what do you mean",
            "clarify",
            "explain",
            "confused",
            "rephrase",
            "not sure i understand",
        ],
    ),
    (
        Intent::DrillDown,
        &[
            "tell me more",
            "more about",
            "more detail",
            "more details",
            "drill down",
            "drill into",
            "expand on",
            "break down",
            "break that down",
            "deeper",
            "specifics",
        ],
    ),
    (
        Intent::Visualization,
        &[
            "chart",
            "charts",
            "graph",
            "plot",
            "visualize",
            "visualization",
            "draw",
        ],
    ),
    (
        Intent::Comparison,
        &[
            "compare",
            "comparison",
            "versus",
            "vs",
            "difference between",
            "compared to",
        ],
    ),
    (
        Intent::Analysis,
        &[
            "analyze",
            "analysis",
            "trend",
            "trends",
            "pattern",
            "patterns",
            "insight",
            "insights",
            "correlation",
            "why",
        ],
    ),
    (
        Intent::Continuation,
        &[
            "what else",
            "next one",
            "the next",
            "another",
            "the rest",
            "the others",
            "keep going",
            "continue",
        ],
    ),
    (
        Intent::Reference,
        &[
            "you mentioned",
            "you said",
            "earlier",
            "previously",
            "previous result",
            "from before",
            "go back",
            "same query",
        ],
    ),
    (
        Intent::Modification,
        &[
            "instead",
            "filter",
            "exclude",
            "only include",
            "limit to",
            "group by",
            "sort by",
            "change the",
            "update the",
        ],
    ),
    (
        Intent::NewQuery,
        &[
            "show me all",
            "list all",
            "list every",
            "report of",
            "new question",
            "different topic",
            "start over",
            "unrelated",
        ],
    ),
];

/// Outcome of intent classification.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IntentResult {
    pub intent: Intent,
    /// Raw confidence of the winning intent, in [0, 1].
    pub confidence: f64,
    /// Confidence after the follow-up adjustment: boosted for follow-up
    /// intents, inverted for `new_query` so confident fresh questions
    /// actively suppress the follow-up decision.
    pub followup_affinity: f64,
    /// Raw score per candidate intent.
    pub scores: BTreeMap<Intent, f64>,
}

impl IntentResult {
    pub fn unknown() -> Self {
        Self {
            intent: Intent::Unknown,
            confidence: 0.0,
            followup_affinity: 0.0,
            scores: BTreeMap::new(),
        }
    }
}

/// Apply the follow-up adjustment to a raw intent confidence.
pub(crate) fn followup_affinity(intent: Intent, confidence: f64, boost: f64) -> f64 {
    match intent {
        Intent::Unknown => 0.0,
        Intent::NewQuery => 1.0 - confidence.clamp(0.0, 1.0),
        _ => (confidence * boost).clamp(0.0, 1.0),
    }
}

/// Rebuild a message as a space-padded, punctuation-free lowercase haystack
/// so keyword phrases match on whole-word boundaries.
fn keyword_haystack(message: &str) -> String {
    let mut normalized: String = message
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    normalized = normalized.split_whitespace().collect::<Vec<_>>().join(" ");
    format!(" {} ", normalized)
}

/// Keyword-hit fallback classification.
///
/// Counts phrase hits per intent, picks the intent with the most hits (ties
/// break by registration order), and normalizes the winner's hit count by the
/// total hits across all intents.
pub(crate) fn classify_keywords(message: &str, boost: f64) -> IntentResult {
    let haystack = keyword_haystack(message);

    let mut hits: Vec<(Intent, usize)> = Vec::with_capacity(INTENT_KEYWORDS.len());
    let mut total = 0usize;
    for (intent, keywords) in INTENT_KEYWORDS {
        let count = keywords
            .iter()
            .filter(|kw| haystack.contains(&format!(" {} ", kw)))
            .count();
        total += count;
        hits.push((*intent, count));
    }

    if total == 0 {
        return IntentResult::unknown();
    }

    let mut scores = BTreeMap::new();
    let mut winner = Intent::Unknown;
    let mut winner_hits = 0usize;
    for (intent, count) in &hits {
        scores.insert(*intent, *count as f64 / total as f64);
        if *count > winner_hits {
            winner = *intent;
            winner_hits = *count;
        }
    }

    let confidence = winner_hits as f64 / total as f64;
    IntentResult {
        intent: winner,
        confidence,
        followup_affinity: followup_affinity(winner, confidence, boost),
        scores,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOOST: f64 = 1.25;

    #[test]
    fn test_classify_drill_down() {
        let result = classify_keywords("Tell me more about the first one", BOOST);
        assert_eq!(result.intent, Intent::DrillDown);
        assert!(result.confidence > 0.5);
        assert_eq!(result.followup_affinity, 1.0);
    }

    #[test]
    fn test_classify_visualization() {
        let result = classify_keywords("Can you make a chart of this?", BOOST);
        assert_eq!(result.intent, Intent::Visualization);
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn test_classify_comparison() {
        let result = classify_keywords("compare rock versus jazz sales", BOOST);
        assert_eq!(result.intent, Intent::Comparison);
    }

    #[test]
    fn test_classify_analysis() {
        let result = classify_keywords("why is the trend declining", BOOST);
        assert_eq!(result.intent, Intent::Analysis);
    }

    #[test]
    fn test_classify_continuation() {
        let result = classify_keywords("what else is there", BOOST);
        assert_eq!(result.intent, Intent::Continuation);
    }

    #[test]
    fn test_classify_reference() {
        let result = classify_keywords("the one you mentioned earlier", BOOST);
        assert_eq!(result.intent, Intent::Reference);
    }

    #[test]
    fn test_classify_modification() {
        let result = classify_keywords("filter to 2024 and exclude returns", BOOST);
        assert_eq!(result.intent, Intent::Modification);
    }

    #[test]
    fn test_classify_clarification() {
        let result = classify_keywords("what do you mean by margin?", BOOST);
        assert_eq!(result.intent, Intent::Clarification);
    }

    #[test]
    fn test_classify_new_query_inverts_affinity() {
        let result = classify_keywords("show me all customers", BOOST);
        assert_eq!(result.intent, Intent::NewQuery);
        assert_eq!(result.confidence, 1.0);
        assert_eq!(result.followup_affinity, 0.0);
    }

    #[test]
    fn test_no_signal_yields_unknown() {
        let result = classify_keywords("bananas oranges apples", BOOST);
        assert_eq!(result.intent, Intent::Unknown);
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.followup_affinity, 0.0);
        assert!(result.scores.is_empty());
    }

    #[test]
    fn test_empty_message_yields_unknown() {
        let result = classify_keywords("", BOOST);
        assert_eq!(result.intent, Intent::Unknown);
    }

    #[test]
    fn test_tie_breaks_by_registration_order() {
        // One visualization hit ("chart") and one comparison hit ("versus"):
        // visualization registers first and wins the tie.
        let result = classify_keywords("chart rock versus jazz", BOOST);
        assert_eq!(result.intent, Intent::Visualization);
        assert!((result.confidence - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_word_boundary_matching() {
        // "vs" must not match inside "investors".
        let result = classify_keywords("investors by region", BOOST);
        assert_ne!(result.intent, Intent::Comparison);
    }

    #[test]
    fn test_affinity_boost_clamped() {
        assert_eq!(followup_affinity(Intent::DrillDown, 0.9, 1.25), 1.0);
        assert!((followup_affinity(Intent::DrillDown, 0.4, 1.25) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_affinity_new_query_inversion() {
        assert!((followup_affinity(Intent::NewQuery, 0.8, 1.25) - 0.2).abs() < 1e-9);
        assert_eq!(followup_affinity(Intent::Unknown, 0.8, 1.25), 0.0);
    }

    #[test]
    fn test_scores_sum_to_one_when_hits_exist() {
        let result = classify_keywords("chart rock versus jazz", BOOST);
        let sum: f64 = result.scores.values().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_examples_cover_every_classifiable_intent() {
        assert_eq!(INTENT_EXAMPLES.len(), Intent::ALL.len());
        for ((example_intent, examples), intent) in INTENT_EXAMPLES.iter().zip(Intent::ALL) {
            assert_eq!(*example_intent, intent);
            assert!(!examples.is_empty());
        }
    }
}
