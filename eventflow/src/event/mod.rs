//! Event model: the immutable records stages produce.
//!
//! This module contains:
//! - Message content (role plus ordered parts)
//! - Event actions (escalation signal and declared state effects)
//! - The event record itself

mod actions;
mod content;
#[allow(clippy::module_inception)]
mod event;

pub use actions::EventActions;
pub use content::{Content, FunctionCall, FunctionResponse, Part, Role};
pub use event::Event;
