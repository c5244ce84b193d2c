//! Transport-level frames sent to observers.

use crate::event::Event;
use serde::{Deserialize, Serialize};

/// One transport-level unit sent to an observer.
///
/// The bridge guarantees what goes into each frame; how frames are
/// encoded on the wire is the transport's concern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frame {
    /// A forwarded pipeline event.
    Event(EventFrame),
    /// A no-op frame keeping the connection visibly alive.
    KeepAlive,
    /// The single terminal frame reporting a failed run.
    Error {
        /// Human-readable failure description.
        message: String,
    },
}

/// The observer-facing projection of one event.
///
/// Function calls and responses are reduced to their names; the full
/// payloads stay in the session log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventFrame {
    /// Name of the producing stage.
    pub author: String,

    /// Concatenated text of the event content, when any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Names of attached sub-capability invocations, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub function_calls: Vec<String>,

    /// Names of attached sub-capability results, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub function_responses: Vec<String>,

    /// Whether this event escalated its enclosing loop.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub escalate: bool,

    /// The merged status value, included only when it changed since
    /// the previous frame.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_update: Option<serde_json::Value>,
}

impl EventFrame {
    /// Builds the projection of an event, with an optional status
    /// snapshot.
    #[must_use]
    pub fn from_event(event: &Event, status_update: Option<serde_json::Value>) -> Self {
        Self {
            author: event.author.clone(),
            text: event.text(),
            function_calls: event.function_call_names(),
            function_responses: event.function_response_names(),
            escalate: event.actions.escalate,
            status_update,
        }
    }
}
