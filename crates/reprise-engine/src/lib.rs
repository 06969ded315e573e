//! The Reprise context engine facade.
//!
//! Wires the signal detectors, the pluggable similarity strategy, and the
//! per-session memory store behind the engine's five public operations:
//! follow-up detection, context assembly, exchange recording, analytics,
//! and session clearing. One caller-owned instance serves any number of
//! sessions; sessions share no mutable state with each other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use reprise_core::config::EngineConfig;
use reprise_core::error::{RepriseError, Result};
use reprise_core::text::word_count;
use reprise_core::types::{
    Confidence, Embedding, ExchangeId, Importance, Intent, SessionAnalytics,
};
use reprise_embed::{embed_bounded, DynEmbeddingProvider};
use reprise_memory::{
    MemoryStore, NewExchange, Session, SessionSnapshot, SessionStore,
};
use reprise_signal::{
    ConfidenceAggregator, ConfidenceBreakdown, EmbeddingStrategy, ExchangeView, PatternStrategy,
    ReferenceSignalDetector, SimilarityStrategy,
};

pub use reprise_core::config;
pub use reprise_core::error;
pub use reprise_memory::InMemorySessionStore;

/// Result of follow-up detection for one message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FollowupReport {
    pub is_followup: bool,
    pub confidence: Confidence,
    pub intent: Intent,
    pub breakdown: ConfidenceBreakdown,
    pub suggestions: Vec<String>,
}

impl FollowupReport {
    fn empty_message(method_note: &str) -> Self {
        let mut breakdown = ConfidenceBreakdown::default();
        breakdown.notes.push(method_note.to_string());
        Self {
            is_followup: false,
            confidence: Confidence::new(0.0),
            intent: Intent::Unknown,
            breakdown,
            suggestions: Vec::new(),
        }
    }
}

/// The conversational context engine.
///
/// Construct once per process with [`ContextEngine::new`] (embedding mode,
/// degrading to patterns if prototype construction fails) or
/// [`ContextEngine::without_provider`] (pattern mode). All methods take
/// `&self`; per-session state is guarded by a per-session mutex, and no lock
/// is ever held across an await.
pub struct ContextEngine {
    config: EngineConfig,
    provider: Option<Box<dyn DynEmbeddingProvider>>,
    strategy: Box<dyn SimilarityStrategy>,
    detector: ReferenceSignalDetector,
    aggregator: ConfidenceAggregator,
    store: MemoryStore,
    sessions: RwLock<HashMap<String, Arc<Mutex<Session>>>>,
}

impl ContextEngine {
    /// Build an engine, using embeddings when a provider is supplied.
    ///
    /// Intent prototypes are computed once here and shared read-only for
    /// the engine's lifetime. If prototype construction fails, the engine
    /// comes up in pattern mode instead of failing.
    pub async fn new(
        config: EngineConfig,
        provider: Option<Box<dyn DynEmbeddingProvider>>,
    ) -> Self {
        let (strategy, provider): (Box<dyn SimilarityStrategy>, _) = match provider {
            Some(provider) => {
                match EmbeddingStrategy::initialize(provider.as_ref(), &config.detection).await {
                    Ok(strategy) => {
                        info!(dimensions = provider.dimensions(), "Engine in embedding mode");
                        (Box::new(strategy), Some(provider))
                    }
                    Err(e) => {
                        warn!(
                            "Intent prototype construction failed ({}); engine in pattern mode",
                            e
                        );
                        (Box::new(PatternStrategy::new(&config.detection)), None)
                    }
                }
            }
            None => (Box::new(PatternStrategy::new(&config.detection)), None),
        };

        let aggregator = ConfidenceAggregator::new(config.detection.followup_threshold);
        let store = MemoryStore::new(config.memory.clone());

        Self {
            config,
            provider,
            strategy,
            detector: ReferenceSignalDetector::new(),
            aggregator,
            store,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Build a pattern-mode engine with no embedding provider.
    pub fn without_provider(config: EngineConfig) -> Self {
        let aggregator = ConfidenceAggregator::new(config.detection.followup_threshold);
        let store = MemoryStore::new(config.memory.clone());
        let strategy = PatternStrategy::new(&config.detection);

        Self {
            config,
            provider: None,
            strategy: Box::new(strategy),
            detector: ReferenceSignalDetector::new(),
            aggregator,
            store,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    // -----------------------------------------------------------------
    // Public operations
    // -----------------------------------------------------------------

    /// Decide whether `message` is a follow-up to the session's prior
    /// exchanges.
    ///
    /// Never fails: empty messages and unknown sessions are normal inputs,
    /// and provider failures degrade to the lexical path with the
    /// `DetectionMethod` recorded in the breakdown. Does not mutate the
    /// session, so identical inputs yield identical reports.
    pub async fn detect_followup(&self, session_id: &str, message: &str) -> FollowupReport {
        let trimmed = message.trim();
        if trimmed.is_empty() {
            return FollowupReport::empty_message("empty message");
        }

        // Embed before touching the session so no lock spans the await.
        let embedding = self.embed(trimmed).await;
        let method = self.strategy.method(embedding.is_some());

        let session = self.session(session_id);
        let guard = session.lock().unwrap_or_else(PoisonError::into_inner);

        let has_history = guard.has_history();
        let recent = guard.recent_exchanges();
        let views: Vec<ExchangeView<'_>> = recent
            .iter()
            .map(|exchange| ExchangeView {
                user_message: &exchange.user_message,
                assistant_response: exchange.display_response(),
                user_embedding: exchange.user_embedding.as_ref(),
                response_embedding: exchange.response_embedding.as_ref(),
            })
            .collect();

        let reference = self.detector.detect(trimmed, has_history);
        let intent = self.strategy.classify(trimmed, embedding.as_ref());
        let context = self.strategy.score(trimmed, embedding.as_ref(), &views);

        let decision = self.aggregator.aggregate(
            &context,
            &intent,
            &reference,
            word_count(trimmed),
            has_history,
            method,
        );

        debug!(
            session = session_id,
            confidence = decision.confidence.0,
            is_followup = decision.is_followup,
            intent = intent.intent.as_str(),
            "Follow-up detection complete"
        );

        FollowupReport {
            is_followup: decision.is_followup,
            confidence: decision.confidence,
            intent: intent.intent,
            breakdown: decision.breakdown,
            suggestions: decision.suggestions,
        }
    }

    /// Assemble the relevance-ranked, bounded context string for a message.
    ///
    /// `max_exchanges` must be positive; zero is a caller error.
    pub async fn get_context(
        &self,
        session_id: &str,
        message: &str,
        max_exchanges: usize,
    ) -> Result<String> {
        if max_exchanges == 0 {
            return Err(RepriseError::InvalidArgument(
                "max_exchanges must be greater than zero".to_string(),
            ));
        }

        let embedding = self.embed(message).await;
        let session = self.session(session_id);
        let mut guard = session.lock().unwrap_or_else(PoisonError::into_inner);
        self.store
            .get_context(&mut guard, message, embedding.as_ref(), max_exchanges)
    }

    /// Record one completed turn. Embeddings are computed first; the session
    /// is then mutated in a single synchronous commit, so a cancelled call
    /// leaves no partial state behind.
    pub async fn add_exchange(
        &self,
        session_id: &str,
        user_message: &str,
        assistant_response: &str,
        intent: Intent,
        importance: f64,
    ) -> ExchangeId {
        let user_embedding = self.embed(user_message).await;
        let response_embedding = self.embed(assistant_response).await;

        let session = self.session(session_id);
        let mut guard = session.lock().unwrap_or_else(PoisonError::into_inner);
        self.store.add_exchange(
            &mut guard,
            NewExchange {
                user_message: user_message.to_string(),
                assistant_response: assistant_response.to_string(),
                intent,
                importance: Importance::new(importance),
                user_embedding,
                response_embedding,
            },
        )
    }

    /// Aggregate facts about a session. An unknown session reports as
    /// fresh and empty.
    pub fn analytics(&self, session_id: &str) -> SessionAnalytics {
        let session = self.session(session_id);
        let guard = session.lock().unwrap_or_else(PoisonError::into_inner);
        self.store.analytics(&guard)
    }

    /// Drop all state for a session.
    pub fn clear_session(&self, session_id: &str) {
        let mut sessions = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if sessions.remove(session_id).is_some() {
            info!(session = session_id, "Session cleared");
        }
    }

    // -----------------------------------------------------------------
    // Snapshots
    // -----------------------------------------------------------------

    /// Capture a session for durable storage. `None` for unknown sessions.
    pub fn export_session(&self, session_id: &str) -> Option<SessionSnapshot> {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        let session = sessions.get(session_id)?;
        let guard = session.lock().unwrap_or_else(PoisonError::into_inner);
        Some(guard.snapshot())
    }

    /// Replace a session's state from a snapshot.
    pub fn import_session(&self, session_id: &str, snapshot: SessionSnapshot) {
        let mut sessions = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        sessions.insert(
            session_id.to_string(),
            Arc::new(Mutex::new(Session::from_snapshot(snapshot))),
        );
    }

    /// Save a session through a [`SessionStore`].
    pub fn save_session(&self, store: &dyn SessionStore, session_id: &str) -> Result<()> {
        match self.export_session(session_id) {
            Some(snapshot) => store.save(session_id, &snapshot),
            None => Err(RepriseError::InvalidArgument(format!(
                "unknown session: {}",
                session_id
            ))),
        }
    }

    /// Load a session from a [`SessionStore`]. Returns whether a snapshot
    /// was found.
    pub fn load_session(&self, store: &dyn SessionStore, session_id: &str) -> Result<bool> {
        match store.load(session_id)? {
            Some(snapshot) => {
                self.import_session(session_id, snapshot);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // -----------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------

    async fn embed(&self, text: &str) -> Option<Embedding> {
        let provider = self.provider.as_ref()?;
        embed_bounded(
            provider.as_ref(),
            text,
            Duration::from_millis(self.config.embedding.timeout_ms),
        )
        .await
    }

    /// Fetch or lazily create the per-session state. First contact with a
    /// session id is a fresh, empty session, never an error.
    fn session(&self, session_id: &str) -> Arc<Mutex<Session>> {
        {
            let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(session) = sessions.get(session_id) {
                return Arc::clone(session);
            }
        }
        let mut sessions = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            sessions
                .entry(session_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(Session::new()))),
        )
    }
}
