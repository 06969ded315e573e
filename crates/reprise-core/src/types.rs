use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Enums
// =============================================================================

/// Coarse classification of what a user message is asking for.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Asking for clarification of a prior answer.
    Clarification,
    /// Digging deeper into a prior result.
    DrillDown,
    /// Asking for a chart or other visual rendering.
    Visualization,
    /// Comparing results against each other or a baseline.
    Comparison,
    /// Asking why, or for trends and patterns.
    Analysis,
    /// Continuing an enumeration ("what else", "the next ones").
    Continuation,
    /// Referring back to something said earlier.
    Reference,
    /// Restricting, reshaping, or otherwise adjusting a prior query.
    Modification,
    /// A fresh question unrelated to prior turns.
    NewQuery,
    /// No recognizable signal.
    #[default]
    Unknown,
}

impl Intent {
    /// All classifiable intents in registration order. `Unknown` is excluded:
    /// it is a result, never a candidate.
    pub const ALL: [Intent; 9] = [
        Intent::Clarification,
        Intent::DrillDown,
        Intent::Visualization,
        Intent::Comparison,
        Intent::Analysis,
        Intent::Continuation,
        Intent::Reference,
        Intent::Modification,
        Intent::NewQuery,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Clarification => "clarification",
            Intent::DrillDown => "drill_down",
            Intent::Visualization => "visualization",
            Intent::Comparison => "comparison",
            Intent::Analysis => "analysis",
            Intent::Continuation => "continuation",
            Intent::Reference => "reference",
            Intent::Modification => "modification",
            Intent::NewQuery => "new_query",
            Intent::Unknown => "unknown",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "clarification" => Some(Intent::Clarification),
            "drill_down" => Some(Intent::DrillDown),
            "visualization" => Some(Intent::Visualization),
            "comparison" => Some(Intent::Comparison),
            "analysis" => Some(Intent::Analysis),
            "continuation" => Some(Intent::Continuation),
            "reference" => Some(Intent::Reference),
            "modification" => Some(Intent::Modification),
            "new_query" => Some(Intent::NewQuery),
            "unknown" => Some(Intent::Unknown),
            _ => None,
        }
    }

    /// Whether a confident match on this intent argues *for* the message
    /// being a follow-up. `NewQuery` argues against; `Unknown` is neutral.
    pub fn is_followup(&self) -> bool {
        !matches!(self, Intent::NewQuery | Intent::Unknown)
    }
}

/// Coarse label for the dialogue's current mode. Observational only.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    #[default]
    Initial,
    Exploring,
    DrillingDown,
    Comparing,
    Visualizing,
    Analyzing,
    Modifying,
    Concluding,
}

impl ConversationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationState::Initial => "initial",
            ConversationState::Exploring => "exploring",
            ConversationState::DrillingDown => "drilling_down",
            ConversationState::Comparing => "comparing",
            ConversationState::Visualizing => "visualizing",
            ConversationState::Analyzing => "analyzing",
            ConversationState::Modifying => "modifying",
            ConversationState::Concluding => "concluding",
        }
    }
}

/// How a detection result was produced.
///
/// Distinguishes "no follow-up detected" from "the detector ran degraded":
/// `PatternOnly` means the engine was built without an embedding provider,
/// `EmbeddingFallback` means a provider is configured but failed or timed out
/// for this particular call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    Embedding,
    PatternOnly,
    EmbeddingFallback,
}

impl DetectionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionMethod::Embedding => "embedding",
            DetectionMethod::PatternOnly => "pattern_only",
            DetectionMethod::EmbeddingFallback => "embedding_fallback",
        }
    }

    /// True when the lexical path was used instead of vectors.
    pub fn is_degraded(&self) -> bool {
        !matches!(self, DetectionMethod::Embedding)
    }
}

// =============================================================================
// Newtype Wrappers
// =============================================================================

/// Arena index of an exchange within one session's conversation graph.
///
/// Assigned from a per-session counter starting at 0; never reused. Ids are
/// only meaningful within their own session.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ExchangeId(pub u64);

impl ExchangeId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A fixed-dimension embedding vector produced by an external provider.
///
/// The dimension is whatever the provider reports; it is fixed for the
/// lifetime of a process. Mismatched or zero-magnitude vectors compare as
/// 0.0 similarity rather than failing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Embedding(pub Vec<f32>);

impl Embedding {
    pub fn new(data: Vec<f32>) -> Self {
        Self(data)
    }

    pub fn dimension(&self) -> usize {
        self.0.len()
    }

    pub fn cosine_similarity(&self, other: &Embedding) -> f64 {
        if self.0.len() != other.0.len() || self.0.is_empty() {
            return 0.0;
        }
        let dot: f64 = self
            .0
            .iter()
            .zip(&other.0)
            .map(|(a, b)| (*a as f64) * (*b as f64))
            .sum();
        let mag_a: f64 = self.0.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
        let mag_b: f64 = other
            .0
            .iter()
            .map(|x| (*x as f64).powi(2))
            .sum::<f64>()
            .sqrt();
        if mag_a == 0.0 || mag_b == 0.0 {
            return 0.0;
        }
        dot / (mag_a * mag_b)
    }
}

/// Aggregated follow-up confidence. Range: 0.0 to 1.0, clamped on creation.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Confidence(pub f64);

impl Confidence {
    pub fn new(value: f64) -> Self {
        Self(value.clamp(0.0, 1.0))
    }
}

/// Caller-supplied weight of an exchange. Range: 0.0 to 1.0, clamped.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Importance(pub f64);

impl Importance {
    pub const DEFAULT: Importance = Importance(0.5);

    pub fn new(value: f64) -> Self {
        Self(value.clamp(0.0, 1.0))
    }
}

impl Default for Importance {
    fn default() -> Self {
        Self::DEFAULT
    }
}

// =============================================================================
// Data model
// =============================================================================

/// A directed, similarity-weighted link to another exchange in the same
/// session.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    pub target: ExchangeId,
    pub weight: f64,
}

/// One conversational turn: a user message, the assistant's response, and
/// everything derived from them.
///
/// Textual content is immutable after creation; only access and compression
/// metadata mutate.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Exchange {
    pub id: ExchangeId,
    pub user_message: String,
    pub assistant_response: String,
    pub timestamp: DateTime<Utc>,
    /// Embedding of the user message, when a provider was available.
    pub user_embedding: Option<Embedding>,
    /// Embedding of the assistant response, when a provider was available.
    pub response_embedding: Option<Embedding>,
    pub topics: BTreeSet<String>,
    pub entities: BTreeSet<String>,
    pub metrics: BTreeSet<String>,
    pub intent: Intent,
    pub importance: Importance,
    pub access_count: u32,
    pub last_accessed: DateTime<Utc>,
    pub references: Vec<Reference>,
    pub referenced_by: Vec<ExchangeId>,
    /// Bounded summary of the response, set at most once by the compressor.
    pub compressed: Option<String>,
}

impl Exchange {
    /// The response text to render in assembled context: the compressed
    /// summary when one exists, the full response otherwise.
    pub fn display_response(&self) -> &str {
        self.compressed.as_deref().unwrap_or(&self.assistant_response)
    }

    /// Cheap token estimate (characters / 4) of what this exchange
    /// contributes to the working-memory budget.
    pub fn token_estimate(&self) -> usize {
        (self.user_message.len() + self.display_response().len()) / 4
    }
}

/// One recorded state transition: the state that was left, and when.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateTransition {
    pub previous: ConversationState,
    pub at: DateTime<Utc>,
}

/// Aggregate facts about one session, for diagnostics and dashboards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionAnalytics {
    pub total_exchanges: usize,
    pub topics: Vec<String>,
    pub entities: Vec<String>,
    pub compression_events: u32,
    /// Mean relevance score of exchanges selected across all context reads;
    /// 0.0 when no context has been read yet.
    pub avg_relevance: f64,
    pub state: ConversationState,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_serialization() {
        let json = serde_json::to_string(&Intent::DrillDown).unwrap();
        assert_eq!(json, "\"drill_down\"");
        let back: Intent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Intent::DrillDown);
    }

    #[test]
    fn test_intent_parse_as_str_roundtrip() {
        for intent in Intent::ALL {
            assert_eq!(Intent::parse(intent.as_str()), Some(intent));
        }
        assert_eq!(Intent::parse("unknown"), Some(Intent::Unknown));
        assert_eq!(Intent::parse("nonsense"), None);
    }

    #[test]
    fn test_intent_is_followup() {
        assert!(Intent::Clarification.is_followup());
        assert!(Intent::DrillDown.is_followup());
        assert!(Intent::Modification.is_followup());
        assert!(!Intent::NewQuery.is_followup());
        assert!(!Intent::Unknown.is_followup());
    }

    #[test]
    fn test_intent_default_is_unknown() {
        assert_eq!(Intent::default(), Intent::Unknown);
    }

    #[test]
    fn test_conversation_state_serialization() {
        let json = serde_json::to_string(&ConversationState::DrillingDown).unwrap();
        assert_eq!(json, "\"drilling_down\"");
        assert_eq!(ConversationState::default(), ConversationState::Initial);
    }

    #[test]
    fn test_detection_method_degraded() {
        assert!(!DetectionMethod::Embedding.is_degraded());
        assert!(DetectionMethod::PatternOnly.is_degraded());
        assert!(DetectionMethod::EmbeddingFallback.is_degraded());
    }

    #[test]
    fn test_exchange_id_display_and_index() {
        let id = ExchangeId(7);
        assert_eq!(id.to_string(), "#7");
        assert_eq!(id.index(), 7);
    }

    #[test]
    fn test_embedding_cosine_similarity_identical() {
        let a = Embedding::new(vec![1.0, 2.0, 3.0]);
        let b = Embedding::new(vec![1.0, 2.0, 3.0]);
        assert!((a.cosine_similarity(&b) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_embedding_cosine_similarity_orthogonal() {
        let a = Embedding::new(vec![1.0, 0.0]);
        let b = Embedding::new(vec![0.0, 1.0]);
        assert!(a.cosine_similarity(&b).abs() < 1e-9);
    }

    #[test]
    fn test_embedding_cosine_similarity_dimension_mismatch() {
        let a = Embedding::new(vec![1.0, 0.0]);
        let b = Embedding::new(vec![1.0, 0.0, 0.0]);
        assert_eq!(a.cosine_similarity(&b), 0.0);
    }

    #[test]
    fn test_embedding_cosine_similarity_zero_vector() {
        let a = Embedding::new(vec![0.0, 0.0]);
        let b = Embedding::new(vec![1.0, 1.0]);
        assert_eq!(a.cosine_similarity(&b), 0.0);
    }

    #[test]
    fn test_confidence_clamp() {
        assert_eq!(Confidence::new(1.5).0, 1.0);
        assert_eq!(Confidence::new(-0.5).0, 0.0);
        assert_eq!(Confidence::new(0.45).0, 0.45);
    }

    #[test]
    fn test_importance_clamp_and_default() {
        assert_eq!(Importance::new(2.0).0, 1.0);
        assert_eq!(Importance::new(-1.0).0, 0.0);
        assert_eq!(Importance::default().0, 0.5);
    }

    fn make_exchange() -> Exchange {
        Exchange {
            id: ExchangeId(0),
            user_message: "Show me top artists by sales".to_string(),
            assistant_response: "Top artists: 1. AC/DC (1000 sales)".to_string(),
            timestamp: Utc::now(),
            user_embedding: None,
            response_embedding: None,
            topics: BTreeSet::from(["artists".to_string(), "sales".to_string()]),
            entities: BTreeSet::from(["AC/DC".to_string()]),
            metrics: BTreeSet::from(["1000 sales".to_string()]),
            intent: Intent::NewQuery,
            importance: Importance::DEFAULT,
            access_count: 0,
            last_accessed: Utc::now(),
            references: vec![],
            referenced_by: vec![],
            compressed: None,
        }
    }

    #[test]
    fn test_exchange_display_response_prefers_summary() {
        let mut ex = make_exchange();
        assert_eq!(ex.display_response(), "Top artists: 1. AC/DC (1000 sales)");
        ex.compressed = Some("Top artists summary".to_string());
        assert_eq!(ex.display_response(), "Top artists summary");
    }

    #[test]
    fn test_exchange_token_estimate_shrinks_with_compression() {
        let mut ex = make_exchange();
        let before = ex.token_estimate();
        ex.compressed = Some("short".to_string());
        assert!(ex.token_estimate() < before);
    }

    #[test]
    fn test_exchange_serialization_roundtrip() {
        let mut ex = make_exchange();
        ex.references.push(Reference {
            target: ExchangeId(3),
            weight: 0.62,
        });
        ex.referenced_by.push(ExchangeId(5));
        let json = serde_json::to_string(&ex).unwrap();
        let back: Exchange = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, ex.id);
        assert_eq!(back.user_message, ex.user_message);
        assert_eq!(back.topics, ex.topics);
        assert_eq!(back.references, ex.references);
        assert_eq!(back.referenced_by, ex.referenced_by);
    }

    #[test]
    fn test_session_analytics_serialization() {
        let analytics = SessionAnalytics {
            total_exchanges: 4,
            topics: vec!["sales".to_string()],
            entities: vec!["Beatles".to_string()],
            compression_events: 2,
            avg_relevance: 0.41,
            state: ConversationState::Exploring,
        };
        let json = serde_json::to_string(&analytics).unwrap();
        let back: SessionAnalytics = serde_json::from_str(&json).unwrap();
        assert_eq!(back, analytics);
    }
}
