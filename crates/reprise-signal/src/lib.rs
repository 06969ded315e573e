//! Follow-up detection signals for the Reprise engine.
//!
//! Three independent signal sources (lexical reference patterns, intent
//! classification, and context similarity) feed a weighted confidence
//! aggregator. Intent and similarity run behind a pluggable
//! [`SimilarityStrategy`](strategy::SimilarityStrategy) so the embedding and
//! pattern paths share one code shape instead of drifting copies.

pub mod aggregate;
pub mod intent;
pub mod reference;
pub mod similarity;
pub mod strategy;

pub use aggregate::{ConfidenceAggregator, ConfidenceBreakdown, FollowupDecision};
pub use intent::IntentResult;
pub use reference::{ReferenceSignalDetector, ReferenceSignals, SignalCategory};
pub use similarity::{ContextScore, ContextSimilarityScorer, ExchangeView};
pub use strategy::{EmbeddingStrategy, PatternStrategy, SimilarityStrategy};
