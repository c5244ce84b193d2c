//! Fixtures for the canonical review-loop pipeline.
//!
//! The shape under test everywhere: a sequential root holding one
//! loop whose body is reviser, judge (merging its verdict under
//! `judge_output`), then checker.

use super::ScriptedReasoner;
use crate::event::{Content, Event};
use crate::stage::{CheckerStage, LeafStage, LoopStage, SequentialStage, Stage};
use std::sync::Arc;

/// Builds a draft event as the reviser would produce it.
#[must_use]
pub fn draft_event(author: &str, text: &str) -> Event {
    Event::new(author).with_content(Content::model_text(text))
}

/// Builds a verdict event as the judge would produce it.
#[must_use]
pub fn judge_verdict(author: &str, status: &str) -> Event {
    Event::new(author).with_content(Content::model_data(serde_json::json!({ "status": status })))
}

/// Queues one full review round: a reviser draft followed by a judge
/// verdict.
pub fn script_review_round(reasoner: &ScriptedReasoner, draft: &str, status: &str) {
    reasoner.script("reviser", vec![draft_event("reviser", draft)]);
    reasoner.script("judge", vec![judge_verdict("judge", status)]);
}

/// Builds the review pipeline: `Sequential[Loop[reviser, judge,
/// checker]]` with the given pass bound.
#[must_use]
pub fn review_pipeline(reasoner: &Arc<ScriptedReasoner>, max_iterations: u32) -> Stage {
    let body = vec![
        LeafStage::new("reviser", reasoner.clone()).into(),
        LeafStage::new("judge", reasoner.clone())
            .with_output_key("judge_output")
            .into(),
        CheckerStage::new("checker").into(),
    ];

    SequentialStage::new(
        "review_pipeline",
        vec![LoopStage::new("review_loop", body, max_iterations).into()],
    )
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_judge_verdict_shape() {
        let event = judge_verdict("judge", "pass");
        assert_eq!(
            event.structured_output(),
            Some(serde_json::json!({"status": "pass"}))
        );
    }

    #[test]
    fn test_review_pipeline_shape() {
        let reasoner = Arc::new(ScriptedReasoner::new());
        let pipeline = review_pipeline(&reasoner, 3);

        let Stage::Sequential(root) = &pipeline else {
            panic!("expected sequential root");
        };
        assert_eq!(root.children().len(), 1);

        let Stage::Loop(looped) = &root.children()[0] else {
            panic!("expected loop child");
        };
        assert_eq!(looped.max_iterations(), 3);
        assert_eq!(looped.children().len(), 3);
    }
}
