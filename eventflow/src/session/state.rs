//! The session record: shared state map plus append-only event log.

use crate::event::Event;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Identifies a session by (application, user, session) triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    /// The application name.
    pub app_name: String,
    /// The user id.
    pub user_id: String,
    /// The session id.
    pub session_id: String,
}

impl SessionKey {
    /// Creates a new session key.
    #[must_use]
    pub fn new(
        app_name: impl Into<String>,
        user_id: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            user_id: user_id.into(),
            session_id: session_id.into(),
        }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.app_name, self.user_id, self.session_id)
    }
}

/// A session: mutable key-value state plus an append-only event log.
///
/// State merges are last-write-wins per key. The log is never
/// reordered and never pruned within a run. Mutation goes through the
/// session service's `append_event`; stages only ever read.
#[derive(Debug)]
pub struct Session {
    key: SessionKey,
    state: RwLock<HashMap<String, serde_json::Value>>,
    events: RwLock<Vec<Event>>,
}

impl Session {
    /// Creates an empty session for the given key.
    #[must_use]
    pub fn new(key: SessionKey) -> Self {
        Self {
            key,
            state: RwLock::new(HashMap::new()),
            events: RwLock::new(Vec::new()),
        }
    }

    /// Returns the session key.
    #[must_use]
    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    /// Gets a state value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        self.state.read().get(key).cloned()
    }

    /// Checks whether a state key exists.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.state.read().contains_key(key)
    }

    /// Merges a value into the state, overwriting any prior value.
    pub fn merge(&self, key: impl Into<String>, value: serde_json::Value) {
        self.state.write().insert(key.into(), value);
    }

    /// Returns a copy of the full state map.
    #[must_use]
    pub fn state_snapshot(&self) -> HashMap<String, serde_json::Value> {
        self.state.read().clone()
    }

    /// Appends an event to the log.
    pub fn append(&self, event: Event) {
        self.events.write().push(event);
    }

    /// Returns a copy of the event log, in production order.
    #[must_use]
    pub fn events(&self) -> Vec<Event> {
        self.events.read().clone()
    }

    /// Returns the number of logged events.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.events.read().len()
    }
}
