//! Context similarity scoring over a recency-weighted window.
//!
//! Compares the incoming message against the most recent exchanges, either
//! by embedding cosine similarity (both the stored user message and the
//! stored response count, best side wins) or by lexical word overlap when no
//! vectors are available.

use reprise_core::text::lexical_overlap;
use reprise_core::types::Embedding;
use serde::{Deserialize, Serialize};

/// Monotonically decreasing weight per window position, most recent first.
pub const POSITION_WEIGHTS: [f64; 5] = [1.0, 0.8, 0.6, 0.4, 0.2];

/// A borrowed view of one prior exchange, most recent first in the slice
/// handed to the scorer.
#[derive(Clone, Copy, Debug)]
pub struct ExchangeView<'a> {
    pub user_message: &'a str,
    pub assistant_response: &'a str,
    pub user_embedding: Option<&'a Embedding>,
    pub response_embedding: Option<&'a Embedding>,
}

/// Aggregate similarity statistics over the window.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextScore {
    /// Best unweighted per-exchange similarity.
    pub max_similarity: f64,
    /// Mean of the position-weighted per-exchange values.
    pub weighted_mean_similarity: f64,
    /// Exchanges whose unweighted similarity exceeded the context threshold.
    pub match_count: usize,
    /// How many exchanges were actually scored.
    pub evaluated: usize,
}

/// Scorer over the last `window` exchanges.
#[derive(Debug, Clone, Copy)]
pub struct ContextSimilarityScorer {
    window: usize,
    context_threshold: f64,
}

impl ContextSimilarityScorer {
    /// The window is clamped to the supported position-weight table.
    pub fn new(window: usize, context_threshold: f64) -> Self {
        Self {
            window: window.clamp(1, POSITION_WEIGHTS.len()),
            context_threshold,
        }
    }

    /// Score by embedding similarity. Exchanges missing both embeddings
    /// contribute zero rather than being skipped, so positions stay aligned
    /// with recency.
    pub fn score_embedding(
        &self,
        query: &Embedding,
        recent: &[ExchangeView<'_>],
    ) -> ContextScore {
        self.score_with(recent, |view| {
            let user_sim = view
                .user_embedding
                .map(|e| query.cosine_similarity(e))
                .unwrap_or(0.0);
            let response_sim = view
                .response_embedding
                .map(|e| query.cosine_similarity(e))
                .unwrap_or(0.0);
            user_sim.max(response_sim).max(0.0)
        })
    }

    /// Lexical fallback: overlap of significant words between the message
    /// and each exchange's combined text.
    pub fn score_lexical(&self, message: &str, recent: &[ExchangeView<'_>]) -> ContextScore {
        self.score_with(recent, |view| {
            let combined = format!("{} {}", view.user_message, view.assistant_response);
            lexical_overlap(message, &combined)
        })
    }

    fn score_with<F>(&self, recent: &[ExchangeView<'_>], per_exchange: F) -> ContextScore
    where
        F: Fn(&ExchangeView<'_>) -> f64,
    {
        if recent.is_empty() {
            return ContextScore::default();
        }

        let mut max_similarity: f64 = 0.0;
        let mut weighted_sum = 0.0;
        let mut match_count = 0;
        let mut evaluated = 0;

        for (position, view) in recent.iter().take(self.window).enumerate() {
            let raw = per_exchange(view);
            max_similarity = max_similarity.max(raw);
            weighted_sum += raw * POSITION_WEIGHTS[position];
            if raw > self.context_threshold {
                match_count += 1;
            }
            evaluated += 1;
        }

        ContextScore {
            max_similarity,
            weighted_mean_similarity: weighted_sum / evaluated as f64,
            match_count,
            evaluated,
        }
    }
}
