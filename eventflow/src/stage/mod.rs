//! Pipeline stages: the polymorphic units of pipeline logic.
//!
//! A stage is one of four variants:
//! - [`LeafStage`]: delegates to an external reasoning capability
//! - [`SequentialStage`]: ordered composition of children
//! - [`LoopStage`]: bounded repeated composition with early exit on
//!   escalation
//! - [`CheckerStage`]: pure deterministic verdict over session state
//!
//! Stages are stateless across runs; all run-scoped data lives in the
//! session. The runner walks the tree; stages only describe it.

use crate::event::Event;
use crate::reasoning::Reasoner;
use crate::session::Session;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// The state key a checker inspects by default.
pub const DEFAULT_STATUS_KEY: &str = "judge_output";

/// The status value that signals escalation.
const STATUS_PASS: &str = "pass";

/// The status assumed when the key is missing or malformed.
const STATUS_FAIL: &str = "fail";

/// A unit of pipeline logic.
#[derive(Debug, Clone)]
pub enum Stage {
    /// Delegates to the external reasoning capability.
    Leaf(LeafStage),
    /// Runs children in listed order.
    Sequential(SequentialStage),
    /// Repeats its body up to a bounded number of passes.
    Loop(LoopStage),
    /// Emits a deterministic verdict over session state.
    Checker(CheckerStage),
}

impl Stage {
    /// Returns the stage name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Leaf(stage) => stage.name(),
            Self::Sequential(stage) => stage.name(),
            Self::Loop(stage) => stage.name(),
            Self::Checker(stage) => stage.name(),
        }
    }
}

impl From<LeafStage> for Stage {
    fn from(stage: LeafStage) -> Self {
        Self::Leaf(stage)
    }
}

impl From<SequentialStage> for Stage {
    fn from(stage: SequentialStage) -> Self {
        Self::Sequential(stage)
    }
}

impl From<LoopStage> for Stage {
    fn from(stage: LoopStage) -> Self {
        Self::Loop(stage)
    }
}

impl From<CheckerStage> for Stage {
    fn from(stage: CheckerStage) -> Self {
        Self::Checker(stage)
    }
}

/// A stage that delegates event production to a [`Reasoner`].
///
/// When an `output_key` is declared, the structured output of each
/// content-bearing event the reasoner yields is merged into the
/// session under that key, last write winning.
#[derive(Clone)]
pub struct LeafStage {
    name: String,
    instruction: Option<String>,
    output_key: Option<String>,
    reasoner: Arc<dyn Reasoner>,
}

impl LeafStage {
    /// Creates a new leaf stage.
    #[must_use]
    pub fn new(name: impl Into<String>, reasoner: Arc<dyn Reasoner>) -> Self {
        Self {
            name: name.into(),
            instruction: None,
            output_key: None,
            reasoner,
        }
    }

    /// Sets the instruction handed to the reasoner.
    #[must_use]
    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = Some(instruction.into());
        self
    }

    /// Sets the key the stage's output is merged under.
    #[must_use]
    pub fn with_output_key(mut self, output_key: impl Into<String>) -> Self {
        self.output_key = Some(output_key.into());
        self
    }

    /// Returns the stage name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the instruction, if any.
    #[must_use]
    pub fn instruction(&self) -> Option<&str> {
        self.instruction.as_deref()
    }

    /// Returns the output key, if any.
    #[must_use]
    pub fn output_key(&self) -> Option<&str> {
        self.output_key.as_deref()
    }

    /// Returns the reasoner handle.
    #[must_use]
    pub fn reasoner(&self) -> &Arc<dyn Reasoner> {
        &self.reasoner
    }
}

impl fmt::Debug for LeafStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LeafStage")
            .field("name", &self.name)
            .field("instruction", &self.instruction)
            .field("output_key", &self.output_key)
            .finish_non_exhaustive()
    }
}

/// An ordered composition of child stages.
///
/// Each child's event sequence is drained fully before the next child
/// starts; the composition adds no events of its own.
#[derive(Debug, Clone)]
pub struct SequentialStage {
    name: String,
    children: Vec<Stage>,
}

impl SequentialStage {
    /// Creates a new sequential stage.
    #[must_use]
    pub fn new(name: impl Into<String>, children: Vec<Stage>) -> Self {
        Self {
            name: name.into(),
            children,
        }
    }

    /// Returns the stage name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the children in execution order.
    #[must_use]
    pub fn children(&self) -> &[Stage] {
        &self.children
    }
}

/// A bounded repeated composition.
///
/// Each pass runs the body children in order as a sequential
/// composition. A pass during which an event carried the escalate
/// signal is the last pass; otherwise the loop stops after
/// `max_iterations` passes and control moves on to the next sibling.
#[derive(Debug, Clone)]
pub struct LoopStage {
    name: String,
    children: Vec<Stage>,
    max_iterations: u32,
}

impl LoopStage {
    /// Creates a new loop stage.
    ///
    /// `max_iterations` bounds the number of body passes and should be
    /// at least 1; a bound of 0 produces no passes at all.
    #[must_use]
    pub fn new(name: impl Into<String>, children: Vec<Stage>, max_iterations: u32) -> Self {
        Self {
            name: name.into(),
            children,
            max_iterations,
        }
    }

    /// Returns the stage name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the body children in execution order.
    #[must_use]
    pub fn children(&self) -> &[Stage] {
        &self.children
    }

    /// Returns the pass bound.
    #[must_use]
    pub const fn max_iterations(&self) -> u32 {
        self.max_iterations
    }
}

/// A stage that reads the designated status key and signals whether
/// the enclosing loop should terminate.
///
/// No reasoning capability is involved: the verdict is a pure function
/// of session state. A status of `"pass"` escalates; anything else,
/// including a missing or malformed value, continues the loop.
#[derive(Debug, Clone)]
pub struct CheckerStage {
    name: String,
    status_key: String,
}

impl CheckerStage {
    /// Creates a checker reading the default status key.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status_key: DEFAULT_STATUS_KEY.to_string(),
        }
    }

    /// Sets the status key to inspect.
    #[must_use]
    pub fn with_status_key(mut self, status_key: impl Into<String>) -> Self {
        self.status_key = status_key.into();
        self
    }

    /// Returns the stage name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the status key.
    #[must_use]
    pub fn status_key(&self) -> &str {
        &self.status_key
    }

    /// Produces the verdict event for the current session state.
    #[must_use]
    pub fn evaluate(&self, session: &Session) -> Event {
        let status = session
            .get(&self.status_key)
            .and_then(|value| match value {
                serde_json::Value::Object(map) => map
                    .get("status")
                    .and_then(|s| s.as_str().map(String::from)),
                serde_json::Value::String(s) => Some(s),
                _ => None,
            })
            .unwrap_or_else(|| STATUS_FAIL.to_string());

        let escalate = status == STATUS_PASS;
        debug!(stage = %self.name, status = %status, escalate, "checker verdict");

        Event::new(&self.name).with_escalate(escalate)
    }
}
