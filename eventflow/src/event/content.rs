//! Message content types carried by events.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of a message participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// An observer-supplied input message.
    User,
    /// Output produced by a reasoning capability.
    Model,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Model => write!(f, "model"),
        }
    }
}

/// One part of a message payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Part {
    /// Plain text.
    Text {
        /// The text value.
        text: String,
    },
    /// A structured representation.
    Data {
        /// The structured value.
        data: serde_json::Value,
    },
}

impl Part {
    /// Creates a text part.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Creates a data part.
    #[must_use]
    pub const fn data(data: serde_json::Value) -> Self {
        Self::Data { data }
    }
}

/// A role tag plus an ordered sequence of parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    /// Who produced the payload.
    pub role: Role,
    /// The ordered message parts.
    pub parts: Vec<Part>,
}

impl Content {
    /// Creates content with the given role and parts.
    #[must_use]
    pub const fn new(role: Role, parts: Vec<Part>) -> Self {
        Self { role, parts }
    }

    /// Creates user content holding a single text part.
    #[must_use]
    pub fn user_text(text: impl Into<String>) -> Self {
        Self::new(Role::User, vec![Part::text(text)])
    }

    /// Creates model content holding a single text part.
    #[must_use]
    pub fn model_text(text: impl Into<String>) -> Self {
        Self::new(Role::Model, vec![Part::text(text)])
    }

    /// Creates model content holding a single data part.
    #[must_use]
    pub fn model_data(data: serde_json::Value) -> Self {
        Self::new(Role::Model, vec![Part::data(data)])
    }

    /// Returns all text parts concatenated, or `None` when the content
    /// carries no text.
    #[must_use]
    pub fn text(&self) -> Option<String> {
        let pieces: Vec<&str> = self
            .parts
            .iter()
            .filter_map(|part| match part {
                Part::Text { text } => Some(text.as_str()),
                Part::Data { .. } => None,
            })
            .collect();

        if pieces.is_empty() {
            None
        } else {
            Some(pieces.join(""))
        }
    }
}

/// A named invocation of an external sub-capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// The sub-capability name.
    pub name: String,
    /// The invocation arguments.
    #[serde(default)]
    pub args: serde_json::Value,
}

impl FunctionCall {
    /// Creates a new function call.
    #[must_use]
    pub fn new(name: impl Into<String>, args: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }
}

/// The result of a named sub-capability invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionResponse {
    /// The sub-capability name.
    pub name: String,
    /// The result payload.
    #[serde(default)]
    pub response: serde_json::Value,
}

impl FunctionResponse {
    /// Creates a new function response.
    #[must_use]
    pub fn new(name: impl Into<String>, response: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            response,
        }
    }
}
