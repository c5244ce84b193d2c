//! Error types for the eventflow runtime.
//!
//! The taxonomy follows the failure classes the pipeline distinguishes:
//! delegation failures (the reasoning capability), state-store failures
//! (the session service), and transport failures (the observer side).
//! A checker that does not signal escalation is not an error.

use thiserror::Error;

/// The main error type for eventflow operations.
#[derive(Debug, Error)]
pub enum EventflowError {
    /// A delegated reasoning invocation failed.
    #[error("{0}")]
    Reasoner(#[from] ReasonerError),

    /// The session store rejected an operation.
    #[error("{0}")]
    Session(#[from] SessionError),

    /// The observer-facing transport failed.
    #[error("{0}")]
    Transport(#[from] TransportError),

    /// A generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors raised by an external reasoning capability.
#[derive(Debug, Error)]
pub enum ReasonerError {
    /// The capability could not be reached.
    #[error("Reasoning capability unavailable: {0}")]
    Unavailable(String),

    /// The invocation itself failed.
    #[error("Reasoning invocation failed: {0}")]
    Invocation(String),

    /// The invocation exceeded its deadline.
    #[error("Reasoning invocation timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// Errors raised by a session store.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A session with the given key already exists.
    #[error("Session already exists: {0}")]
    AlreadyExists(String),

    /// No session with the given key exists.
    #[error("Session not found: {0}")]
    NotFound(String),

    /// The backing store failed.
    #[error("Session store failure: {0}")]
    Store(String),
}

/// Errors raised by an observer transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The remote observer has disconnected.
    #[error("Transport closed by remote")]
    Closed,

    /// A frame could not be transmitted.
    #[error("Transport send failed: {0}")]
    Send(String),
}
