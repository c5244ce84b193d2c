//! The event record produced by pipeline stages.

use super::{Content, EventActions, FunctionCall, FunctionResponse, Part};
use crate::utils::{generate_uuid_string, iso_timestamp};
use serde::{Deserialize, Serialize};

/// An immutable record produced by a stage during a run.
///
/// Events belong to exactly one run and are appended to the session
/// log exactly once, in production order. State mutation happens only
/// through the `actions.state_delta` the event declares.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Unique event id.
    pub id: String,

    /// Id of the run that produced this event.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub invocation_id: String,

    /// Name of the stage that produced this event.
    pub author: String,

    /// When the event was produced (ISO 8601).
    pub timestamp: String,

    /// The message payload, when the event carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Content>,

    /// Sub-capability invocations attached to this event.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub function_calls: Vec<FunctionCall>,

    /// Sub-capability results attached to this event.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub function_responses: Vec<FunctionResponse>,

    /// Declared side-effects.
    #[serde(default, skip_serializing_if = "EventActions::is_empty")]
    pub actions: EventActions,

    /// Set only on the synthetic terminal event surfaced for a failed
    /// delegation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl Event {
    /// Creates a new event with a generated id and timestamp.
    #[must_use]
    pub fn new(author: impl Into<String>) -> Self {
        Self {
            id: generate_uuid_string(),
            invocation_id: String::new(),
            author: author.into(),
            timestamp: iso_timestamp(),
            content: None,
            function_calls: Vec::new(),
            function_responses: Vec::new(),
            actions: EventActions::new(),
            error_message: None,
        }
    }

    /// Creates the terminal event surfaced when a delegation fails.
    #[must_use]
    pub fn delegation_failure(author: impl Into<String>, message: impl Into<String>) -> Self {
        let mut event = Self::new(author);
        event.error_message = Some(message.into());
        event
    }

    /// Sets the content.
    #[must_use]
    pub fn with_content(mut self, content: Content) -> Self {
        self.content = Some(content);
        self
    }

    /// Sets the invocation id.
    #[must_use]
    pub fn with_invocation_id(mut self, invocation_id: impl Into<String>) -> Self {
        self.invocation_id = invocation_id.into();
        self
    }

    /// Sets the escalation flag.
    #[must_use]
    pub const fn with_escalate(mut self, escalate: bool) -> Self {
        self.actions.escalate = escalate;
        self
    }

    /// Attaches a function call.
    #[must_use]
    pub fn with_function_call(mut self, call: FunctionCall) -> Self {
        self.function_calls.push(call);
        self
    }

    /// Attaches a function response.
    #[must_use]
    pub fn with_function_response(mut self, response: FunctionResponse) -> Self {
        self.function_responses.push(response);
        self
    }

    /// Adds a state-delta entry.
    #[must_use]
    pub fn with_state_delta_entry(
        mut self,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> Self {
        self.actions.state_delta.insert(key.into(), value);
        self
    }

    /// Returns the concatenated text of the content, when present.
    #[must_use]
    pub fn text(&self) -> Option<String> {
        self.content.as_ref().and_then(Content::text)
    }

    /// Returns the names of all attached function calls, in order.
    #[must_use]
    pub fn function_call_names(&self) -> Vec<String> {
        self.function_calls.iter().map(|c| c.name.clone()).collect()
    }

    /// Returns the names of all attached function responses, in order.
    #[must_use]
    pub fn function_response_names(&self) -> Vec<String> {
        self.function_responses
            .iter()
            .map(|r| r.name.clone())
            .collect()
    }

    /// Returns true when this is a terminal error event.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.error_message.is_some()
    }

    /// Extracts the structured output this event carries, if any.
    ///
    /// The last data part wins; otherwise text that parses as JSON is
    /// returned structured, and any other text as a JSON string. This
    /// is the value merged under a stage's output key.
    #[must_use]
    pub fn structured_output(&self) -> Option<serde_json::Value> {
        let content = self.content.as_ref()?;

        for part in content.parts.iter().rev() {
            if let Part::Data { data } = part {
                return Some(data.clone());
            }
        }

        let text = content.text()?;
        Some(serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text)))
    }
}
