//! The external reasoning capability consumed by leaf stages.
//!
//! The pipeline core never generates event content itself; leaf stages
//! delegate to an implementation of [`Reasoner`] and forward whatever
//! events it yields.

use crate::errors::ReasonerError;
use crate::event::{Content, Event};
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::collections::HashMap;

/// A lazy sequence of events produced by a reasoning invocation.
pub type EventStream = BoxStream<'static, Result<Event, ReasonerError>>;

/// The prompt context handed to a reasoning invocation.
#[derive(Debug, Clone)]
pub struct ReasoningRequest {
    /// Name of the delegating stage.
    pub stage: String,
    /// The stage's instruction, when it has one.
    pub instruction: Option<String>,
    /// The observer's input message for this run, when present.
    pub message: Option<Content>,
    /// Snapshot of the session state at invocation time.
    pub state: HashMap<String, serde_json::Value>,
}

impl ReasoningRequest {
    /// Creates a request with no instruction, message, or state.
    #[must_use]
    pub fn new(stage: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            instruction: None,
            message: None,
            state: HashMap::new(),
        }
    }

    /// Sets the instruction.
    #[must_use]
    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = Some(instruction.into());
        self
    }

    /// Sets the input message.
    #[must_use]
    pub fn with_message(mut self, message: Content) -> Self {
        self.message = Some(message);
        self
    }

    /// Sets the state snapshot.
    #[must_use]
    pub fn with_state(mut self, state: HashMap<String, serde_json::Value>) -> Self {
        self.state = state;
        self
    }
}

/// An external reasoning capability.
///
/// Given a prompt context and a state snapshot, asynchronously produces
/// zero or more events. May invoke named sub-capabilities, reflected as
/// function calls/responses on the events it yields. Failures surface
/// either from `invoke` itself or as an `Err` item mid-stream.
#[async_trait]
pub trait Reasoner: Send + Sync {
    /// Starts a reasoning invocation, returning its event sequence.
    async fn invoke(&self, request: ReasoningRequest) -> Result<EventStream, ReasonerError>;
}
