//! Pluggable similarity strategy.
//!
//! One engine, two interchangeable implementations selected at construction:
//! `EmbeddingStrategy` when a provider is available, `PatternStrategy`
//! otherwise. The embedding strategy degrades per call to the same lexical
//! path the pattern strategy uses, so a provider outage changes the
//! `DetectionMethod` of a result, never its shape.

use std::collections::BTreeMap;

use reprise_core::config::DetectionConfig;
use reprise_core::error::Result;
use reprise_core::types::{DetectionMethod, Embedding, Intent};
use reprise_embed::DynEmbeddingProvider;
use tracing::debug;

use crate::intent::{classify_keywords, followup_affinity, IntentResult, INTENT_EXAMPLES};
use crate::similarity::{ContextScore, ContextSimilarityScorer, ExchangeView};

/// Strategy seam between the engine and its two scoring backends.
pub trait SimilarityStrategy: Send + Sync {
    /// Which method a call with (or without) a message embedding will use.
    fn method(&self, embedding_available: bool) -> DetectionMethod;

    /// Classify the message's intent. Never fails.
    fn classify(&self, message: &str, embedding: Option<&Embedding>) -> IntentResult;

    /// Score the message against recent exchanges, most recent first.
    fn score(
        &self,
        message: &str,
        embedding: Option<&Embedding>,
        recent: &[ExchangeView<'_>],
    ) -> ContextScore;
}

// =============================================================================
// PatternStrategy
// =============================================================================

/// Keyword and word-overlap scoring; used when the engine has no embedding
/// provider, and as the degraded path inside [`EmbeddingStrategy`].
pub struct PatternStrategy {
    boost: f64,
    scorer: ContextSimilarityScorer,
}

impl PatternStrategy {
    pub fn new(config: &DetectionConfig) -> Self {
        Self {
            boost: config.intent_boost,
            scorer: ContextSimilarityScorer::new(
                config.similarity_window,
                config.context_threshold,
            ),
        }
    }
}

impl SimilarityStrategy for PatternStrategy {
    fn method(&self, _embedding_available: bool) -> DetectionMethod {
        DetectionMethod::PatternOnly
    }

    fn classify(&self, message: &str, _embedding: Option<&Embedding>) -> IntentResult {
        classify_keywords(message, self.boost)
    }

    fn score(
        &self,
        message: &str,
        _embedding: Option<&Embedding>,
        recent: &[ExchangeView<'_>],
    ) -> ContextScore {
        self.scorer.score_lexical(message, recent)
    }
}

// =============================================================================
// EmbeddingStrategy
// =============================================================================

/// Cosine similarity against per-intent prototype embeddings.
///
/// Prototypes are the mean of each intent's canonical example embeddings,
/// computed once at construction; the struct is immutable afterwards and
/// safe to share read-only across sessions.
pub struct EmbeddingStrategy {
    prototypes: Vec<(Intent, Embedding)>,
    boost: f64,
    scorer: ContextSimilarityScorer,
    fallback: PatternStrategy,
}

impl EmbeddingStrategy {
    /// Build the intent prototypes through the given provider.
    ///
    /// Fails if any example cannot be embedded; the caller then falls back
    /// to [`PatternStrategy`] for the life of the engine.
    pub async fn initialize(
        provider: &dyn DynEmbeddingProvider,
        config: &DetectionConfig,
    ) -> Result<Self> {
        let mut prototypes = Vec::with_capacity(INTENT_EXAMPLES.len());
        for (intent, examples) in INTENT_EXAMPLES {
            let dims = provider.dimensions();
            let mut mean = vec![0.0f32; dims];
            for example in *examples {
                let vector = provider.embed_boxed(example).await?;
                for (slot, value) in mean.iter_mut().zip(vector.iter()) {
                    *slot += value;
                }
            }
            let n = examples.len() as f32;
            for slot in &mut mean {
                *slot /= n;
            }
            prototypes.push((*intent, Embedding::new(mean)));
        }
        debug!(intents = prototypes.len(), "Intent prototypes initialized");

        Ok(Self {
            prototypes,
            boost: config.intent_boost,
            scorer: ContextSimilarityScorer::new(
                config.similarity_window,
                config.context_threshold,
            ),
            fallback: PatternStrategy::new(config),
        })
    }
}

impl SimilarityStrategy for EmbeddingStrategy {
    fn method(&self, embedding_available: bool) -> DetectionMethod {
        if embedding_available {
            DetectionMethod::Embedding
        } else {
            DetectionMethod::EmbeddingFallback
        }
    }

    fn classify(&self, message: &str, embedding: Option<&Embedding>) -> IntentResult {
        let Some(embedding) = embedding else {
            return self.fallback.classify(message, None);
        };

        let mut scores = BTreeMap::new();
        let mut winner = Intent::Unknown;
        let mut best = 0.0f64;
        for (intent, prototype) in &self.prototypes {
            let similarity = embedding.cosine_similarity(prototype).max(0.0);
            scores.insert(*intent, similarity);
            // Strict comparison: earlier registration wins ties.
            if similarity > best {
                winner = *intent;
                best = similarity;
            }
        }

        if winner == Intent::Unknown {
            return IntentResult::unknown();
        }

        IntentResult {
            intent: winner,
            confidence: best,
            followup_affinity: followup_affinity(winner, best, self.boost),
            scores,
        }
    }

    fn score(
        &self,
        message: &str,
        embedding: Option<&Embedding>,
        recent: &[ExchangeView<'_>],
    ) -> ContextScore {
        match embedding {
            Some(embedding) => self.scorer.score_embedding(embedding, recent),
            None => self.scorer.score_lexical(message, recent),
        }
    }
}
