//! Session service trait and in-memory implementation.

use super::{Session, SessionKey};
use crate::errors::SessionError;
use crate::event::Event;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

/// Store abstraction for sessions.
///
/// `append_event` is the single mutation path for session state: it
/// applies the event's declared `state_delta` (last-write-wins per
/// key) and then appends the event to the log. Implementations must
/// not reorder either step. All methods are fallible so durable
/// backends can surface storage faults.
#[async_trait]
pub trait SessionService: Send + Sync {
    /// Looks up a session.
    async fn get(&self, key: &SessionKey) -> Result<Option<Arc<Session>>, SessionError>;

    /// Creates a session, failing if one already exists for the key.
    async fn create(&self, key: SessionKey) -> Result<Arc<Session>, SessionError>;

    /// Looks up a session, creating it on first use.
    async fn get_or_create(&self, key: SessionKey) -> Result<Arc<Session>, SessionError> {
        if let Some(session) = self.get(&key).await? {
            return Ok(session);
        }
        self.create(key).await
    }

    /// Applies an event's state delta and appends it to the log,
    /// returning the event for forwarding.
    async fn append_event(&self, session: &Session, event: Event) -> Result<Event, SessionError>;
}

/// An in-memory session service.
///
/// Sessions live for the process lifetime; durability is a concern for
/// other implementations of the trait.
#[derive(Debug, Default)]
pub struct InMemorySessionService {
    sessions: DashMap<SessionKey, Arc<Session>>,
}

impl InMemorySessionService {
    /// Creates an empty service.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of live sessions.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

#[async_trait]
impl SessionService for InMemorySessionService {
    async fn get(&self, key: &SessionKey) -> Result<Option<Arc<Session>>, SessionError> {
        Ok(self.sessions.get(key).map(|entry| entry.value().clone()))
    }

    async fn create(&self, key: SessionKey) -> Result<Arc<Session>, SessionError> {
        if self.sessions.contains_key(&key) {
            return Err(SessionError::AlreadyExists(key.to_string()));
        }

        debug!(session = %key, "creating session");
        let session = Arc::new(Session::new(key.clone()));
        self.sessions.insert(key, session.clone());
        Ok(session)
    }

    async fn get_or_create(&self, key: SessionKey) -> Result<Arc<Session>, SessionError> {
        let session = self
            .sessions
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Session::new(key)))
            .value()
            .clone();
        Ok(session)
    }

    async fn append_event(&self, session: &Session, event: Event) -> Result<Event, SessionError> {
        for (key, value) in &event.actions.state_delta {
            session.merge(key.clone(), value.clone());
        }
        session.append(event.clone());
        Ok(event)
    }
}
