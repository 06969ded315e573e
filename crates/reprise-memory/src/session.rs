//! Per-session state and optional durable snapshots.
//!
//! A `Session` owns everything private to one conversation: the graph, the
//! working-memory window, the state tracker, and analytics counters.
//! Sessions serialize to [`SessionSnapshot`] for the optional durable store;
//! the engine is fully correct with the in-memory store alone.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use reprise_core::error::{RepriseError, Result};
use reprise_core::types::{Exchange, ExchangeId};
use serde::{Deserialize, Serialize};

use crate::graph::ConversationGraph;
use crate::state::StateTracker;

/// All mutable state for one conversation.
#[derive(Clone, Debug, Default)]
pub struct Session {
    pub(crate) graph: ConversationGraph,
    pub(crate) working: VecDeque<ExchangeId>,
    pub(crate) tracker: StateTracker,
    pub(crate) compression_events: u32,
    pub(crate) relevance_sum: f64,
    pub(crate) relevance_samples: u64,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the session has recorded any exchange at all. Evicted
    /// exchanges still count: the graph retains them.
    pub fn has_history(&self) -> bool {
        !self.graph.is_empty()
    }

    pub fn total_exchanges(&self) -> usize {
        self.graph.len()
    }

    pub fn working_len(&self) -> usize {
        self.working.len()
    }

    /// Working-memory exchanges, most recent first.
    pub fn recent_exchanges(&self) -> Vec<&Exchange> {
        self.working
            .iter()
            .rev()
            .filter_map(|id| self.graph.get(*id))
            .collect()
    }

    pub fn graph(&self) -> &ConversationGraph {
        &self.graph
    }

    pub fn state_tracker(&self) -> &StateTracker {
        &self.tracker
    }

    /// Capture the session for durable storage.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            graph: self.graph.clone(),
            working: self.working.iter().copied().collect(),
            tracker: self.tracker.clone(),
            compression_events: self.compression_events,
            relevance_sum: self.relevance_sum,
            relevance_samples: self.relevance_samples,
        }
    }

    /// Rebuild a session from a snapshot.
    pub fn from_snapshot(snapshot: SessionSnapshot) -> Self {
        Self {
            graph: snapshot.graph,
            working: snapshot.working.into_iter().collect(),
            tracker: snapshot.tracker,
            compression_events: snapshot.compression_events,
            relevance_sum: snapshot.relevance_sum,
            relevance_samples: snapshot.relevance_samples,
        }
    }
}

/// Serializable capture of a [`Session`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub graph: ConversationGraph,
    pub working: Vec<ExchangeId>,
    pub tracker: StateTracker,
    pub compression_events: u32,
    pub relevance_sum: f64,
    pub relevance_samples: u64,
}

/// Optional durable session storage.
///
/// Persistence is a durability concern, not a correctness one; callers that
/// want sessions to survive restarts save snapshots through this trait.
pub trait SessionStore: Send + Sync {
    fn load(&self, session_id: &str) -> Result<Option<SessionSnapshot>>;
    fn save(&self, session_id: &str, snapshot: &SessionSnapshot) -> Result<()>;
}

/// The default store: snapshots held in process memory.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    inner: Mutex<HashMap<String, SessionSnapshot>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for InMemorySessionStore {
    fn load(&self, session_id: &str) -> Result<Option<SessionSnapshot>> {
        let inner = self
            .inner
            .lock()
            .map_err(|e| RepriseError::Memory(format!("session store lock poisoned: {}", e)))?;
        Ok(inner.get(session_id).cloned())
    }

    fn save(&self, session_id: &str, snapshot: &SessionSnapshot) -> Result<()> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|e| RepriseError::Memory(format!("session store lock poisoned: {}", e)))?;
        inner.insert(session_id.to_string(), snapshot.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use reprise_core::types::{Importance, Intent};
    use std::collections::BTreeSet;

    fn exchange(user: &str) -> Exchange {
        Exchange {
            id: ExchangeId(0),
            user_message: user.to_string(),
            assistant_response: "response".to_string(),
            timestamp: Utc::now(),
            user_embedding: None,
            response_embedding: None,
            topics: BTreeSet::new(),
            entities: BTreeSet::new(),
            metrics: BTreeSet::new(),
            intent: Intent::NewQuery,
            importance: Importance::DEFAULT,
            access_count: 0,
            last_accessed: Utc::now(),
            references: vec![],
            referenced_by: vec![],
            compressed: None,
        }
    }

    fn session_with_two_exchanges() -> Session {
        let mut session = Session::new();
        let a = session.graph.insert(exchange("first"));
        let b = session.graph.insert(exchange("second"));
        session.working.push_back(a);
        session.working.push_back(b);
        session.tracker.apply(Intent::DrillDown, Utc::now());
        session.compression_events = 3;
        session.relevance_sum = 1.2;
        session.relevance_samples = 4;
        session
    }

    #[test]
    fn test_new_session_is_empty() {
        let session = Session::new();
        assert!(!session.has_history());
        assert_eq!(session.total_exchanges(), 0);
        assert_eq!(session.working_len(), 0);
        assert!(session.recent_exchanges().is_empty());
    }

    #[test]
    fn test_recent_exchanges_most_recent_first() {
        let session = session_with_two_exchanges();
        let recent = session.recent_exchanges();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].user_message, "second");
        assert_eq!(recent[1].user_message, "first");
    }

    #[test]
    fn test_has_history_counts_evicted_exchanges() {
        let mut session = session_with_two_exchanges();
        session.working.clear();
        assert!(session.has_history());
        assert_eq!(session.working_len(), 0);
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let session = session_with_two_exchanges();
        let snapshot = session.snapshot();
        let json = serde_json::to_string(&snapshot).unwrap();
        let decoded: SessionSnapshot = serde_json::from_str(&json).unwrap();
        let restored = Session::from_snapshot(decoded);

        assert_eq!(restored.total_exchanges(), 2);
        assert_eq!(restored.working_len(), 2);
        assert_eq!(restored.compression_events, 3);
        assert_eq!(restored.relevance_samples, 4);
        assert_eq!(
            restored.recent_exchanges()[0].user_message,
            session.recent_exchanges()[0].user_message
        );
    }

    #[test]
    fn test_in_memory_store_roundtrip() {
        let store = InMemorySessionStore::new();
        assert!(store.load("s1").unwrap().is_none());

        let session = session_with_two_exchanges();
        store.save("s1", &session.snapshot()).unwrap();

        let loaded = store.load("s1").unwrap().unwrap();
        assert_eq!(loaded.working.len(), 2);
        assert_eq!(loaded.compression_events, 3);

        // Other sessions remain isolated.
        assert!(store.load("s2").unwrap().is_none());
    }
}
