//! Arena-backed conversation graph.
//!
//! Exchanges live in a `Vec` indexed by [`ExchangeId`]; edges are adjacency
//! lists of ids. Exchanges are never removed from the arena (clearing a
//! session drops the whole graph), so ids stay valid for the session's
//! lifetime even after working-memory eviction.

use reprise_core::types::{Exchange, ExchangeId, Reference};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ConversationGraph {
    exchanges: Vec<Exchange>,
}

impl ConversationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }

    /// The id the next inserted exchange will get.
    pub fn next_id(&self) -> ExchangeId {
        ExchangeId(self.exchanges.len() as u64)
    }

    /// Insert an exchange. Its `id` must be `next_id()`; anything else is a
    /// caller bug and the exchange is reindexed to keep the arena sound.
    pub fn insert(&mut self, mut exchange: Exchange) -> ExchangeId {
        let id = self.next_id();
        exchange.id = id;
        self.exchanges.push(exchange);
        id
    }

    pub fn get(&self, id: ExchangeId) -> Option<&Exchange> {
        self.exchanges.get(id.index())
    }

    pub fn get_mut(&mut self, id: ExchangeId) -> Option<&mut Exchange> {
        self.exchanges.get_mut(id.index())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Exchange> {
        self.exchanges.iter()
    }

    /// Create a directed, weighted edge `from -> to`.
    ///
    /// Maintains the invariant that `from.references` containing `to`
    /// implies `to.referenced_by` contains `from`. Self-links and unknown
    /// ids are ignored; duplicate edges are not added twice.
    pub fn link(&mut self, from: ExchangeId, to: ExchangeId, weight: f64) {
        if from == to || from.index() >= self.exchanges.len() || to.index() >= self.exchanges.len()
        {
            return;
        }

        let source = &mut self.exchanges[from.index()];
        if source.references.iter().any(|r| r.target == to) {
            return;
        }
        source.references.push(Reference { target: to, weight });

        let target = &mut self.exchanges[to.index()];
        if !target.referenced_by.contains(&from) {
            target.referenced_by.push(from);
        }
    }
}
