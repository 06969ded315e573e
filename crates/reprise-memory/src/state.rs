//! Conversation state tracking.
//!
//! A small state machine recording the dialogue's current mode as a side
//! effect of intent classification. Purely observational: nothing reads the
//! state to gate behavior.

use chrono::{DateTime, Utc};
use reprise_core::types::{ConversationState, Intent, StateTransition};
use serde::{Deserialize, Serialize};

/// Tracks the current [`ConversationState`] and its transition history.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StateTracker {
    current: ConversationState,
    history: Vec<StateTransition>,
}

/// Which state, if any, an intent drives the conversation into.
///
/// `continuation`, `reference`, and `new_query` stay in whatever mode the
/// dialogue is in; `Concluding` is reserved for explicit session teardown.
fn target_state(intent: Intent) -> Option<ConversationState> {
    match intent {
        Intent::Clarification => Some(ConversationState::Exploring),
        Intent::DrillDown => Some(ConversationState::DrillingDown),
        Intent::Comparison => Some(ConversationState::Comparing),
        Intent::Visualization => Some(ConversationState::Visualizing),
        Intent::Analysis => Some(ConversationState::Analyzing),
        Intent::Modification => Some(ConversationState::Modifying),
        Intent::Continuation | Intent::Reference | Intent::NewQuery | Intent::Unknown => None,
    }
}

impl StateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> ConversationState {
        self.current
    }

    pub fn history(&self) -> &[StateTransition] {
        &self.history
    }

    /// Apply a classified intent. Returns the new state when an actual
    /// transition happened.
    ///
    /// The departing state is appended to history, stamped with `at`, before
    /// the current state is updated.
    pub fn apply(&mut self, intent: Intent, at: DateTime<Utc>) -> Option<ConversationState> {
        let next = target_state(intent)?;
        if next == self.current {
            return None;
        }
        self.history.push(StateTransition {
            previous: self.current,
            at,
        });
        self.current = next;
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let tracker = StateTracker::new();
        assert_eq!(tracker.current(), ConversationState::Initial);
        assert!(tracker.history().is_empty());
    }

    #[test]
    fn test_intent_transitions() {
        let cases = [
            (Intent::Clarification, ConversationState::Exploring),
            (Intent::DrillDown, ConversationState::DrillingDown),
            (Intent::Comparison, ConversationState::Comparing),
            (Intent::Visualization, ConversationState::Visualizing),
            (Intent::Analysis, ConversationState::Analyzing),
            (Intent::Modification, ConversationState::Modifying),
        ];
        for (intent, expected) in cases {
            let mut tracker = StateTracker::new();
            assert_eq!(tracker.apply(intent, Utc::now()), Some(expected));
            assert_eq!(tracker.current(), expected);
        }
    }

    #[test]
    fn test_non_forcing_intents_keep_state() {
        let mut tracker = StateTracker::new();
        tracker.apply(Intent::DrillDown, Utc::now());
        for intent in [Intent::Continuation, Intent::Reference, Intent::NewQuery, Intent::Unknown]
        {
            assert_eq!(tracker.apply(intent, Utc::now()), None);
            assert_eq!(tracker.current(), ConversationState::DrillingDown);
        }
        assert_eq!(tracker.history().len(), 1);
    }

    #[test]
    fn test_same_state_is_not_a_transition() {
        let mut tracker = StateTracker::new();
        tracker.apply(Intent::Analysis, Utc::now());
        assert_eq!(tracker.apply(Intent::Analysis, Utc::now()), None);
        assert_eq!(tracker.history().len(), 1);
    }

    #[test]
    fn test_history_records_previous_state() {
        let mut tracker = StateTracker::new();
        let t1 = Utc::now();
        tracker.apply(Intent::Clarification, t1);
        let t2 = Utc::now();
        tracker.apply(Intent::Visualization, t2);

        let history = tracker.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].previous, ConversationState::Initial);
        assert_eq!(history[0].at, t1);
        assert_eq!(history[1].previous, ConversationState::Exploring);
        assert_eq!(history[1].at, t2);
        assert_eq!(tracker.current(), ConversationState::Visualizing);
    }

    #[test]
    fn test_serialization_roundtrip() {
        let mut tracker = StateTracker::new();
        tracker.apply(Intent::Comparison, Utc::now());
        let json = serde_json::to_string(&tracker).unwrap();
        let back: StateTracker = serde_json::from_str(&json).unwrap();
        assert_eq!(back.current(), ConversationState::Comparing);
        assert_eq!(back.history().len(), 1);
    }
}
