//! The conversation memory store: exchange recording, similarity linking,
//! bounded working memory with compression, relevance-ranked context
//! assembly, and session analytics.

use std::collections::BTreeSet;

use chrono::Utc;
use reprise_core::config::MemoryConfig;
use reprise_core::error::{RepriseError, Result};
use reprise_core::text::lexical_overlap;
use reprise_core::types::{
    Embedding, Exchange, ExchangeId, Importance, Intent, SessionAnalytics,
};
use tracing::{debug, warn};

use crate::compress::Compressor;
use crate::extract::MetadataExtractor;
use crate::session::Session;

// Relevance ranking weights for context retrieval.
const SIMILARITY_WEIGHT: f64 = 0.4;
const TOPIC_WEIGHT: f64 = 0.2;
const ENTITY_WEIGHT: f64 = 0.2;
const RECENCY_WEIGHT: f64 = 0.1;
const IMPORTANCE_WEIGHT: f64 = 0.1;

/// The most recent exchanges a compression sweep leaves untouched.
const KEEP_RECENT_UNCOMPRESSED: usize = 2;

const CONTEXT_HEADER: &str = "Relevant conversation history (most relevant first):\n";
const CONTEXT_FOOTER: &str =
    "\nUse the exchanges above to resolve references and ellipsis in the current question.\n";

/// Input for recording one turn. Embeddings are computed by the caller so
/// the store itself stays synchronous and deterministic.
#[derive(Clone, Debug)]
pub struct NewExchange {
    pub user_message: String,
    pub assistant_response: String,
    pub intent: Intent,
    pub importance: Importance,
    pub user_embedding: Option<Embedding>,
    pub response_embedding: Option<Embedding>,
}

/// Stateless operations over per-session memory.
///
/// The store holds configuration and the extraction/compression machinery;
/// all mutable conversation state lives in the [`Session`] passed in, which
/// the caller is responsible for locking.
pub struct MemoryStore {
    config: MemoryConfig,
    extractor: MetadataExtractor,
    compressor: Compressor,
}

impl MemoryStore {
    pub fn new(config: MemoryConfig) -> Self {
        let compressor = Compressor::new(config.summary_max_chars);
        Self {
            config,
            extractor: MetadataExtractor::new(),
            compressor,
        }
    }

    // -----------------------------------------------------------------
    // Recording
    // -----------------------------------------------------------------

    /// Record one completed turn.
    ///
    /// Extracts lexical metadata, links the exchange to similar recent ones,
    /// appends it to working memory, and enforces the window and token
    /// budget. All mutation happens synchronously in this call; the working
    /// memory invariant holds on return.
    pub fn add_exchange(&self, session: &mut Session, new: NewExchange) -> ExchangeId {
        let now = Utc::now();
        let combined = format!("{} {}", new.user_message, new.assistant_response);
        let meta = self.extractor.extract(&combined);

        let mut exchange = Exchange {
            id: session.graph.next_id(),
            user_message: new.user_message,
            assistant_response: new.assistant_response,
            timestamp: now,
            user_embedding: new.user_embedding,
            response_embedding: new.response_embedding,
            topics: meta.topics,
            entities: meta.entities,
            metrics: meta.metrics,
            intent: new.intent,
            importance: new.importance,
            access_count: 0,
            last_accessed: now,
            references: vec![],
            referenced_by: vec![],
            compressed: None,
        };

        // Oversized responses are summarized at insert time, never silently
        // truncated.
        if exchange.assistant_response.len() > self.config.max_response_chars {
            match self.compressor.summarize(
                &exchange.assistant_response,
                &exchange.metrics,
                &exchange.entities,
            ) {
                Some(summary) => {
                    exchange.compressed = Some(summary);
                    session.compression_events += 1;
                }
                None => warn!(id = %exchange.id, "Skipping compression of oversized response"),
            }
        }

        // Collect similarity links against the most recent exchanges before
        // the new one enters the graph.
        let mut links: Vec<(ExchangeId, f64)> = Vec::new();
        for id in session.working.iter().rev().take(self.config.link_candidates) {
            if let Some(prior) = session.graph.get(*id) {
                let similarity = pair_similarity(&exchange, prior);
                if similarity > self.config.link_threshold {
                    links.push((*id, similarity));
                }
            }
        }

        let id = session.graph.insert(exchange);
        for (target, weight) in links {
            session.graph.link(id, target, weight);
        }

        session.working.push_back(id);
        while session.working.len() > self.config.max_context_exchanges {
            if let Some(evicted) = session.working.pop_front() {
                // Compress before the id leaves the window so the summary
                // stays addressable through the graph.
                self.compress_exchange(session, evicted);
            }
        }

        if self.working_token_estimate(session) > self.config.token_budget {
            self.sweep(session);
        }

        session.tracker.apply(new.intent, now);
        debug!(%id, working = session.working.len(), "Exchange recorded");
        id
    }

    // -----------------------------------------------------------------
    // Context retrieval
    // -----------------------------------------------------------------

    /// Rank working memory against the query and assemble the context
    /// string.
    ///
    /// Deterministic given identical inputs and identical embeddings; ties
    /// break toward the newer exchange. Selected exchanges get their access
    /// metadata bumped.
    pub fn get_context(
        &self,
        session: &mut Session,
        message: &str,
        query_embedding: Option<&Embedding>,
        max_exchanges: usize,
    ) -> Result<String> {
        if max_exchanges == 0 {
            return Err(RepriseError::InvalidArgument(
                "max_exchanges must be greater than zero".to_string(),
            ));
        }

        let query_meta = self.extractor.extract(message);
        let window_len = session.working.len();

        let mut scored: Vec<(f64, ExchangeId)> = Vec::with_capacity(window_len);
        for (position, id) in session.working.iter().rev().enumerate() {
            let Some(exchange) = session.graph.get(*id) else {
                continue;
            };

            let similarity = match query_embedding {
                Some(query)
                    if exchange.user_embedding.is_some()
                        || exchange.response_embedding.is_some() =>
                {
                    let user = exchange
                        .user_embedding
                        .as_ref()
                        .map(|e| query.cosine_similarity(e))
                        .unwrap_or(0.0);
                    let response = exchange
                        .response_embedding
                        .as_ref()
                        .map(|e| query.cosine_similarity(e))
                        .unwrap_or(0.0);
                    user.max(response).max(0.0)
                }
                _ => {
                    let combined =
                        format!("{} {}", exchange.user_message, exchange.display_response());
                    lexical_overlap(message, &combined)
                }
            };

            let topic_overlap = overlap_ratio(&exchange.topics, &query_meta.topics);
            let entity_overlap = overlap_ratio(&exchange.entities, &query_meta.entities);
            let recency = (window_len - position) as f64 / window_len as f64;

            let score = SIMILARITY_WEIGHT * similarity
                + TOPIC_WEIGHT * topic_overlap
                + ENTITY_WEIGHT * entity_overlap
                + RECENCY_WEIGHT * recency
                + IMPORTANCE_WEIGHT * exchange.importance.0;
            scored.push((score, *id));
        }

        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| b.1.cmp(&a.1)));
        scored.truncate(max_exchanges);

        let now = Utc::now();
        for (score, id) in &scored {
            if let Some(exchange) = session.graph.get_mut(*id) {
                exchange.access_count += 1;
                exchange.last_accessed = now;
            }
            session.relevance_sum += *score;
            session.relevance_samples += 1;
        }

        Ok(self.render_context(session, message, &scored))
    }

    fn render_context(
        &self,
        session: &Session,
        message: &str,
        selected: &[(f64, ExchangeId)],
    ) -> String {
        let mut out = String::from(CONTEXT_HEADER);

        for (score, id) in selected {
            let Some(exchange) = session.graph.get(*id) else {
                continue;
            };
            out.push('\n');
            out.push_str(&format!(
                "[{} | intent: {} | relevance: {:.2}]\n",
                exchange.id,
                exchange.intent.as_str(),
                score
            ));
            out.push_str(&format!("User: {}\n", exchange.user_message));
            out.push_str(&format!("Assistant: {}\n", exchange.display_response()));

            let mut facts: Vec<String> = Vec::new();
            if !exchange.topics.is_empty() {
                facts.push(format!("Topics: {}", join_set(&exchange.topics)));
            }
            if !exchange.entities.is_empty() {
                facts.push(format!("Entities: {}", join_set(&exchange.entities)));
            }
            if !exchange.metrics.is_empty() {
                facts.push(format!("Metrics: {}", join_set(&exchange.metrics)));
            }
            if !facts.is_empty() {
                out.push_str(&facts.join(" | "));
                out.push('\n');
            }
        }

        out.push_str(CONTEXT_FOOTER);
        out.push_str(&format!("Current question: {}\n", message));
        out
    }

    // -----------------------------------------------------------------
    // Compression
    // -----------------------------------------------------------------

    /// Compress one exchange's response in place. Idempotent: an already
    /// compressed exchange is left untouched and does not count as a new
    /// compression event.
    fn compress_exchange(&self, session: &mut Session, id: ExchangeId) -> bool {
        let summary = match session.graph.get(id) {
            Some(exchange) if exchange.compressed.is_none() => match self.compressor.summarize(
                &exchange.assistant_response,
                &exchange.metrics,
                &exchange.entities,
            ) {
                Some(summary) => summary,
                None => {
                    warn!(%id, "Skipping compression of malformed exchange");
                    return false;
                }
            },
            _ => return false,
        };

        if let Some(exchange) = session.graph.get_mut(id) {
            exchange.compressed = Some(summary);
            session.compression_events += 1;
            return true;
        }
        false
    }

    /// Compress everything in working memory except the most recent two.
    fn sweep(&self, session: &mut Session) {
        let targets: Vec<ExchangeId> = session
            .working
            .iter()
            .rev()
            .skip(KEEP_RECENT_UNCOMPRESSED)
            .copied()
            .collect();
        let mut compressed = 0;
        for id in targets {
            if self.compress_exchange(session, id) {
                compressed += 1;
            }
        }
        if compressed > 0 {
            debug!(compressed, "Compressed working memory to fit token budget");
        }
    }

    fn working_token_estimate(&self, session: &Session) -> usize {
        session
            .working
            .iter()
            .filter_map(|id| session.graph.get(*id))
            .map(Exchange::token_estimate)
            .sum()
    }

    // -----------------------------------------------------------------
    // Analytics
    // -----------------------------------------------------------------

    pub fn analytics(&self, session: &Session) -> SessionAnalytics {
        let mut topics: BTreeSet<String> = BTreeSet::new();
        let mut entities: BTreeSet<String> = BTreeSet::new();
        for exchange in session.graph.iter() {
            topics.extend(exchange.topics.iter().cloned());
            entities.extend(exchange.entities.iter().cloned());
        }

        SessionAnalytics {
            total_exchanges: session.graph.len(),
            topics: topics.into_iter().collect(),
            entities: entities.into_iter().collect(),
            compression_events: session.compression_events,
            avg_relevance: if session.relevance_samples > 0 {
                session.relevance_sum / session.relevance_samples as f64
            } else {
                0.0
            },
            state: session.tracker.current(),
        }
    }
}

/// Similarity between a new exchange and a prior one for graph linking:
/// embedding cosine when vectors exist on both sides, significant-word
/// overlap of the new user message against the prior exchange otherwise.
fn pair_similarity(new: &Exchange, prior: &Exchange) -> f64 {
    if let Some(query) = new.user_embedding.as_ref() {
        if prior.user_embedding.is_some() || prior.response_embedding.is_some() {
            let user = prior
                .user_embedding
                .as_ref()
                .map(|e| query.cosine_similarity(e))
                .unwrap_or(0.0);
            let response = prior
                .response_embedding
                .as_ref()
                .map(|e| query.cosine_similarity(e))
                .unwrap_or(0.0);
            return user.max(response).max(0.0);
        }
    }

    let combined = format!("{} {}", prior.user_message, prior.assistant_response);
    lexical_overlap(&new.user_message, &combined)
}

/// Share of the query's set covered by the exchange's set.
fn overlap_ratio(exchange_set: &BTreeSet<String>, query_set: &BTreeSet<String>) -> f64 {
    if query_set.is_empty() {
        return 0.0;
    }
    let shared = exchange_set.intersection(query_set).count();
    shared as f64 / query_set.len() as f64
}

fn join_set(set: &BTreeSet<String>) -> String {
    set.iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
