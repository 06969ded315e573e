//! Weighted multi-signal confidence aggregation.
//!
//! Combines context similarity, intent affinity, reference signals, and
//! message brevity into one bounded confidence plus a typed breakdown, so
//! tests and operators can see exactly which signal carried a decision.

use reprise_core::types::{Confidence, DetectionMethod, Intent};
use serde::{Deserialize, Serialize};

use crate::intent::IntentResult;
use crate::reference::{ReferenceSignals, MAX_REFERENCE_SCORE};
use crate::similarity::ContextScore;

const CONTEXT_WEIGHT: f64 = 0.4;
const INTENT_WEIGHT: f64 = 0.3;
const REFERENCE_WEIGHT: f64 = 0.2;
const BREVITY_WEIGHT: f64 = 0.1;

/// Bonus when more than one prior exchange corroborates the message.
const CORROBORATION_BONUS: f64 = 0.1;
/// Bonus when reference signals and prior context are present together.
const REFERENCE_CONTEXT_BONUS: f64 = 0.1;

/// Messages at or under this many words count as fully brief. Terse messages
/// are more likely elliptical follow-ups.
const BREVITY_WORD_LIMIT: usize = 5;

/// Per-signal weighted contributions that sum (with bonuses) to the final
/// confidence.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceBreakdown {
    pub context: f64,
    pub intent: f64,
    pub reference: f64,
    pub brevity: f64,
    pub corroboration_bonus: f64,
    pub reference_context_bonus: f64,
    pub method: Option<DetectionMethod>,
    pub notes: Vec<String>,
}

impl ConfidenceBreakdown {
    /// Human-readable one-line rendering of the contributions.
    pub fn summary(&self) -> String {
        format!(
            "context {:.3} + intent {:.3} + reference {:.3} + brevity {:.3} + bonuses {:.3}",
            self.context,
            self.intent,
            self.reference,
            self.brevity,
            self.corroboration_bonus + self.reference_context_bonus,
        )
    }
}

/// The aggregated follow-up decision.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FollowupDecision {
    pub confidence: Confidence,
    pub is_followup: bool,
    pub breakdown: ConfidenceBreakdown,
    pub suggestions: Vec<String>,
}

/// Combines the three detector signals plus brevity into one decision.
#[derive(Debug, Clone, Copy)]
pub struct ConfidenceAggregator {
    threshold: f64,
}

impl ConfidenceAggregator {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Aggregate all signals for one message.
    ///
    /// A session with no prior exchanges can never produce a follow-up,
    /// whatever the message says.
    pub fn aggregate(
        &self,
        context: &ContextScore,
        intent: &IntentResult,
        reference: &ReferenceSignals,
        message_words: usize,
        has_history: bool,
        method: DetectionMethod,
    ) -> FollowupDecision {
        let context_signal =
            (0.7 * context.max_similarity + 0.3 * context.weighted_mean_similarity).clamp(0.0, 1.0);
        let reference_signal = (reference.score / MAX_REFERENCE_SCORE).clamp(0.0, 1.0);
        let brevity_signal = if message_words == 0 {
            0.0
        } else if message_words <= BREVITY_WORD_LIMIT {
            1.0
        } else {
            BREVITY_WORD_LIMIT as f64 / message_words as f64
        };

        let mut breakdown = ConfidenceBreakdown {
            context: CONTEXT_WEIGHT * context_signal,
            intent: INTENT_WEIGHT * intent.followup_affinity,
            reference: REFERENCE_WEIGHT * reference_signal,
            brevity: BREVITY_WEIGHT * brevity_signal,
            corroboration_bonus: 0.0,
            reference_context_bonus: 0.0,
            method: Some(method),
            notes: Vec::new(),
        };

        if context.match_count > 1 {
            breakdown.corroboration_bonus = CORROBORATION_BONUS;
            breakdown
                .notes
                .push(format!("{} prior exchanges corroborate", context.match_count));
        }
        if has_history && reference.score > 0.0 {
            breakdown.reference_context_bonus = REFERENCE_CONTEXT_BONUS;
        }
        if method.is_degraded() {
            breakdown
                .notes
                .push(format!("degraded path: {}", method.as_str()));
        }

        let total = breakdown.context
            + breakdown.intent
            + breakdown.reference
            + breakdown.brevity
            + breakdown.corroboration_bonus
            + breakdown.reference_context_bonus;
        let confidence = Confidence::new(total);

        let is_followup = if has_history {
            confidence.0 >= self.threshold
        } else {
            breakdown
                .notes
                .push("no prior exchanges in session".to_string());
            false
        };

        FollowupDecision {
            confidence,
            is_followup,
            suggestions: suggestions_for(intent.intent),
            breakdown,
        }
    }
}

/// Downstream actions worth taking for each intent.
pub fn suggestions_for(intent: Intent) -> Vec<String> {
    let suggestions: &[&str] = match intent {
        Intent::Clarification => &[
            "restate the previous answer in simpler terms",
            "define the terms used in the previous answer",
        ],
        Intent::DrillDown => &[
            "show hierarchical breakdown",
            "include per-item details for the selected result",
        ],
        Intent::Visualization => &[
            "render the previous result as a chart",
            "offer alternative chart types",
        ],
        Intent::Comparison => &[
            "run the prior query for each candidate",
            "present the results side by side",
        ],
        Intent::Analysis => &[
            "compute trends over the prior result",
            "highlight outliers and correlations",
        ],
        Intent::Continuation => &[
            "fetch the next page of the previous result",
            "extend the prior query's range",
        ],
        Intent::Reference => &["reuse the referenced exchange as primary context"],
        Intent::Modification => &["re-run the prior query with adjusted filters"],
        Intent::NewQuery => &["start a fresh query without carrying prior context"],
        Intent::Unknown => &[],
    };
    suggestions.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn aggregator() -> ConfidenceAggregator {
        ConfidenceAggregator::new(0.45)
    }

    fn intent_result(intent: Intent, affinity: f64) -> IntentResult {
        IntentResult {
            intent,
            confidence: affinity,
            followup_affinity: affinity,
            scores: BTreeMap::new(),
        }
    }

    fn reference_with_score(score: f64) -> ReferenceSignals {
        ReferenceSignals {
            matches: BTreeMap::new(),
            score,
        }
    }

    fn context_with(max: f64, mean: f64, matches: usize) -> ContextScore {
        ContextScore {
            max_similarity: max,
            weighted_mean_similarity: mean,
            match_count: matches,
            evaluated: matches.max(1),
        }
    }

    #[test]
    fn test_empty_history_never_followup() {
        let decision = aggregator().aggregate(
            &context_with(1.0, 1.0, 5),
            &intent_result(Intent::DrillDown, 1.0),
            &reference_with_score(0.4),
            2,
            false,
            DetectionMethod::PatternOnly,
        );
        assert!(!decision.is_followup);
        assert!(decision
            .breakdown
            .notes
            .iter()
            .any(|n| n.contains("no prior exchanges")));
    }

    #[test]
    fn test_confidence_clamped_to_unit_interval() {
        let decision = aggregator().aggregate(
            &context_with(1.0, 1.0, 5),
            &intent_result(Intent::DrillDown, 1.0),
            &reference_with_score(0.4),
            1,
            true,
            DetectionMethod::Embedding,
        );
        assert!(decision.confidence.0 <= 1.0);
        assert!(decision.is_followup);
    }

    #[test]
    fn test_zero_signals_zero_confidence() {
        let decision = aggregator().aggregate(
            &ContextScore::default(),
            &IntentResult::unknown(),
            &ReferenceSignals::default(),
            0,
            true,
            DetectionMethod::PatternOnly,
        );
        assert_eq!(decision.confidence.0, 0.0);
        assert!(!decision.is_followup);
    }

    #[test]
    fn test_brevity_boundary() {
        let short = aggregator().aggregate(
            &ContextScore::default(),
            &IntentResult::unknown(),
            &ReferenceSignals::default(),
            5,
            true,
            DetectionMethod::PatternOnly,
        );
        assert!((short.breakdown.brevity - 0.1).abs() < 1e-9);

        let longer = aggregator().aggregate(
            &ContextScore::default(),
            &IntentResult::unknown(),
            &ReferenceSignals::default(),
            10,
            true,
            DetectionMethod::PatternOnly,
        );
        assert!((longer.breakdown.brevity - 0.05).abs() < 1e-9);
    }

    #[test]
    fn test_corroboration_bonus_requires_multiple_matches() {
        let single = aggregator().aggregate(
            &context_with(0.5, 0.5, 1),
            &IntentResult::unknown(),
            &ReferenceSignals::default(),
            3,
            true,
            DetectionMethod::Embedding,
        );
        assert_eq!(single.breakdown.corroboration_bonus, 0.0);

        let multiple = aggregator().aggregate(
            &context_with(0.5, 0.5, 2),
            &IntentResult::unknown(),
            &ReferenceSignals::default(),
            3,
            true,
            DetectionMethod::Embedding,
        );
        assert_eq!(multiple.breakdown.corroboration_bonus, 0.1);
    }

    #[test]
    fn test_reference_context_bonus() {
        let with_history = aggregator().aggregate(
            &ContextScore::default(),
            &IntentResult::unknown(),
            &reference_with_score(0.1),
            3,
            true,
            DetectionMethod::PatternOnly,
        );
        assert_eq!(with_history.breakdown.reference_context_bonus, 0.1);

        let without_history = aggregator().aggregate(
            &ContextScore::default(),
            &IntentResult::unknown(),
            &reference_with_score(0.1),
            3,
            false,
            DetectionMethod::PatternOnly,
        );
        assert_eq!(without_history.breakdown.reference_context_bonus, 0.0);
    }

    #[test]
    fn test_new_query_affinity_suppresses() {
        // Confident new_query carries ~zero intent contribution.
        let result = IntentResult {
            intent: Intent::NewQuery,
            confidence: 1.0,
            followup_affinity: 0.0,
            scores: BTreeMap::new(),
        };
        let decision = aggregator().aggregate(
            &context_with(0.4, 0.3, 1),
            &result,
            &ReferenceSignals::default(),
            4,
            true,
            DetectionMethod::Embedding,
        );
        assert_eq!(decision.breakdown.intent, 0.0);
        assert!(!decision.is_followup);
    }

    #[test]
    fn test_degraded_method_noted() {
        let decision = aggregator().aggregate(
            &ContextScore::default(),
            &IntentResult::unknown(),
            &ReferenceSignals::default(),
            3,
            true,
            DetectionMethod::EmbeddingFallback,
        );
        assert_eq!(
            decision.breakdown.method,
            Some(DetectionMethod::EmbeddingFallback)
        );
        assert!(decision
            .breakdown
            .notes
            .iter()
            .any(|n| n.contains("embedding_fallback")));
    }

    #[test]
    fn test_threshold_decision() {
        // Tuned inputs landing just above and just below the 0.45 threshold.
        let above = aggregator().aggregate(
            &context_with(1.0, 1.0, 1),
            &IntentResult::unknown(),
            &ReferenceSignals::default(),
            5,
            true,
            DetectionMethod::Embedding,
        );
        // 0.4 context + 0.1 brevity = 0.5
        assert!(above.is_followup);

        let below = aggregator().aggregate(
            &context_with(0.5, 0.5, 1),
            &IntentResult::unknown(),
            &ReferenceSignals::default(),
            20,
            true,
            DetectionMethod::Embedding,
        );
        // 0.2 context + 0.025 brevity = 0.225
        assert!(!below.is_followup);
    }

    #[test]
    fn test_suggestions_follow_intent() {
        let decision = aggregator().aggregate(
            &ContextScore::default(),
            &intent_result(Intent::DrillDown, 0.8),
            &ReferenceSignals::default(),
            3,
            true,
            DetectionMethod::Embedding,
        );
        assert!(decision
            .suggestions
            .iter()
            .any(|s| s.contains("hierarchical breakdown")));

        assert!(suggestions_for(Intent::Unknown).is_empty());
        assert!(!suggestions_for(Intent::Visualization).is_empty());
    }

    #[test]
    fn test_breakdown_summary_renders() {
        let decision = aggregator().aggregate(
            &context_with(0.6, 0.4, 1),
            &intent_result(Intent::Analysis, 0.7),
            &reference_with_score(0.2),
            4,
            true,
            DetectionMethod::Embedding,
        );
        let summary = decision.breakdown.summary();
        assert!(summary.contains("context"));
        assert!(summary.contains("intent"));
        assert!(summary.contains("bonuses"));
    }

    #[test]
    fn test_deterministic() {
        let run = || {
            aggregator().aggregate(
                &context_with(0.6, 0.4, 2),
                &intent_result(Intent::DrillDown, 0.9),
                &reference_with_score(0.3),
                6,
                true,
                DetectionMethod::Embedding,
            )
        };
        assert_eq!(run(), run());
    }
}
