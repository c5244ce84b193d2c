//! Testing utilities for eventflow pipelines.
//!
//! This module provides:
//! - Scripted and failing reasoners
//! - A frame-collecting transport with scriptable disconnects
//! - Fixtures for the canonical review-loop pipeline

mod fixtures;
mod mocks;

pub use fixtures::{draft_event, judge_verdict, review_pipeline, script_review_round};
pub use mocks::{CollectingTransport, FailingReasoner, ScriptedReasoner, SlowReasoner};
