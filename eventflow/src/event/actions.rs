//! Declared side-effects attached to an event.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The side-effects an event declares against its session.
///
/// Stages never write session state directly; they attach a
/// `state_delta` here and the runner applies it when the event is
/// delivered. `escalate` is the signal a checker raises to terminate
/// an enclosing loop.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventActions {
    /// When true, the enclosing loop terminates after this event.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub escalate: bool,

    /// State entries to merge into the session, last-write-wins per key.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub state_delta: HashMap<String, serde_json::Value>,
}

impl EventActions {
    /// Creates empty actions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates actions carrying only an escalation signal.
    #[must_use]
    pub fn escalating() -> Self {
        Self {
            escalate: true,
            state_delta: HashMap::new(),
        }
    }

    /// Returns true when the actions carry no effect at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.escalate && self.state_delta.is_empty()
    }
}
