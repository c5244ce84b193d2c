//! The stream bridge serving loop.

use super::{EventFrame, Frame, Transport};
use crate::cancellation::CancellationToken;
use crate::runner::RunStream;
use crate::session::Session;
use crate::stage::DEFAULT_STATUS_KEY;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Default interval between keep-alive frames.
pub const DEFAULT_KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// How a serve call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeOutcome {
    /// The run's event sequence was exhausted.
    Completed,
    /// The observer disconnected (or a send failed) before exhaustion.
    Cancelled,
    /// The run failed; one error frame was attempted.
    Failed,
}

/// Summary of one serve call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServeSummary {
    /// Frames successfully transmitted, keep-alives included.
    pub frames_sent: usize,
    /// How serving ended.
    pub outcome: ServeOutcome,
}

/// Forwards a run's events to one connected observer.
///
/// One frame per event, keep-alive frames on a fixed interval, and at
/// most one terminal error frame. Cancellation is cooperative: the
/// disconnect callback sets a flag and the bridge stops at the next
/// event boundary, so cancellation latency is bounded by one leaf
/// delegation.
#[derive(Debug, Clone)]
pub struct StreamBridge {
    keep_alive_interval: Duration,
    status_key: String,
}

impl Default for StreamBridge {
    fn default() -> Self {
        Self {
            keep_alive_interval: DEFAULT_KEEP_ALIVE_INTERVAL,
            status_key: DEFAULT_STATUS_KEY.to_string(),
        }
    }
}

impl StreamBridge {
    /// Creates a bridge with the default keep-alive interval and
    /// status key.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the keep-alive interval.
    #[must_use]
    pub const fn with_keep_alive_interval(mut self, interval: Duration) -> Self {
        self.keep_alive_interval = interval;
        self
    }

    /// Sets the state key snapshotted into event frames.
    #[must_use]
    pub fn with_status_key(mut self, status_key: impl Into<String>) -> Self {
        self.status_key = status_key.into();
        self
    }

    /// Serves a run over a transport until the sequence is exhausted,
    /// the observer disconnects, or the run fails.
    ///
    /// The transport is always closed before returning. Failures on
    /// the pipeline side produce exactly one error frame; transport
    /// failures produce none and count as cancellation.
    pub async fn serve(
        &self,
        mut run: RunStream<'_>,
        transport: Arc<dyn Transport>,
    ) -> ServeSummary {
        let cancel = Arc::new(CancellationToken::new());
        {
            let cancel = cancel.clone();
            transport.on_close(Box::new(move || {
                cancel.cancel("observer disconnected");
            }));
        }

        let sent = Arc::new(AtomicUsize::new(0));
        let keep_alive = self.spawn_keep_alive(transport.clone(), cancel.clone(), sent.clone());
        cancel.on_cancel({
            let abort = keep_alive.abort_handle();
            move || abort.abort()
        });

        let mut last_status: Option<serde_json::Value> = None;

        let outcome = loop {
            if cancel.is_cancelled() {
                debug!(reason = ?cancel.reason(), "serving cancelled");
                break ServeOutcome::Cancelled;
            }

            match run.next_event().await {
                Some(Ok(event)) => {
                    if cancel.is_cancelled() {
                        debug!(reason = ?cancel.reason(), "serving cancelled at event boundary");
                        break ServeOutcome::Cancelled;
                    }

                    if event.is_error() {
                        let message = event.error_message.clone().unwrap_or_default();
                        if transport.send(&Frame::Error { message }).await.is_ok() {
                            sent.fetch_add(1, Ordering::Relaxed);
                        }
                        break ServeOutcome::Failed;
                    }

                    let frame = self.event_frame(&event, run.session(), &mut last_status);
                    match transport.send(&frame).await {
                        Ok(()) => {
                            sent.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(err) => {
                            debug!(error = %err, "send failed, treating as disconnect");
                            cancel.cancel("transport send failed");
                            break ServeOutcome::Cancelled;
                        }
                    }
                }
                Some(Err(err)) => {
                    let message = err.to_string();
                    if transport.send(&Frame::Error { message }).await.is_ok() {
                        sent.fetch_add(1, Ordering::Relaxed);
                    }
                    break ServeOutcome::Failed;
                }
                None => break ServeOutcome::Completed,
            }
        };

        cancel.cancel("serving finished");
        keep_alive.abort();
        transport.close().await;

        let frames_sent = sent.load(Ordering::Relaxed);
        info!(frames = frames_sent, outcome = ?outcome, "stream bridge finished");
        ServeSummary {
            frames_sent,
            outcome,
        }
    }

    /// Builds the frame for one event, snapshotting the status key
    /// when its merged value changed since the previous frame.
    fn event_frame(
        &self,
        event: &crate::event::Event,
        session: &Session,
        last_status: &mut Option<serde_json::Value>,
    ) -> Frame {
        let status = session.get(&self.status_key);
        let status_update = if status == *last_status {
            None
        } else {
            last_status.clone_from(&status);
            status
        };

        Frame::Event(EventFrame::from_event(event, status_update))
    }

    /// Starts the keep-alive timer task. The task stops on
    /// cancellation or when a send fails; the caller additionally
    /// aborts it the moment serving ends.
    fn spawn_keep_alive(
        &self,
        transport: Arc<dyn Transport>,
        cancel: Arc<CancellationToken>,
        sent: Arc<AtomicUsize>,
    ) -> tokio::task::JoinHandle<()> {
        let interval = self.keep_alive_interval;
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                if cancel.is_cancelled() {
                    break;
                }
                if transport.send(&Frame::KeepAlive).await.is_err() {
                    break;
                }
                sent.fetch_add(1, Ordering::Relaxed);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Content;
    use crate::runner::PipelineRunner;
    use crate::session::{InMemorySessionService, SessionKey, SessionService};
    use crate::stage::{LeafStage, SequentialStage, Stage};
    use crate::testing::{
        review_pipeline, script_review_round, CollectingTransport, FailingReasoner,
        ScriptedReasoner, SlowReasoner,
    };
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn test_key() -> SessionKey {
        SessionKey::new("course_app", "user-1", "session-1")
    }

    fn quick_bridge() -> StreamBridge {
        // Long enough that no keep-alive fires during a fast test.
        StreamBridge::new().with_keep_alive_interval(Duration::from_secs(30))
    }

    async fn setup(
        reasoner: &Arc<ScriptedReasoner>,
        max_iterations: u32,
    ) -> (
        Arc<InMemorySessionService>,
        Arc<crate::session::Session>,
        Stage,
    ) {
        let service = Arc::new(InMemorySessionService::new());
        let session = service.get_or_create(test_key()).await.unwrap();
        let pipeline = review_pipeline(reasoner, max_iterations);
        (service, session, pipeline)
    }

    #[tokio::test]
    async fn test_serve_forwards_one_frame_per_event() {
        let reasoner = Arc::new(ScriptedReasoner::new());
        script_review_round(&reasoner, "draft one", "fail");
        script_review_round(&reasoner, "draft two", "fail");
        script_review_round(&reasoner, "draft three", "pass");

        let (service, session, pipeline) = setup(&reasoner, 3).await;
        let runner = PipelineRunner::new(service);
        let run = runner.run(
            &pipeline,
            &session,
            Some(Content::user_text("Create a course on the history of Coffee.")),
        );

        let transport = Arc::new(CollectingTransport::new());
        let summary = quick_bridge().serve(run, transport.clone()).await;

        assert_eq!(summary.outcome, ServeOutcome::Completed);
        assert_eq!(summary.frames_sent, 9);
        assert!(transport.is_closed());

        let frames = transport.event_frames();
        assert_eq!(frames.len(), 9);
        assert_eq!(frames[0].author, "reviser");
        assert_eq!(frames[0].text.as_deref(), Some("draft one"));
        assert!(frames[8].escalate);
        assert!(transport.error_messages().is_empty());
    }

    #[tokio::test]
    async fn test_serve_snapshots_status_only_on_change() {
        let reasoner = Arc::new(ScriptedReasoner::new());
        script_review_round(&reasoner, "draft one", "fail");
        script_review_round(&reasoner, "draft two", "fail");
        script_review_round(&reasoner, "draft three", "pass");

        let (service, session, pipeline) = setup(&reasoner, 3).await;
        let runner = PipelineRunner::new(service);
        let run = runner.run(&pipeline, &session, None);

        let transport = Arc::new(CollectingTransport::new());
        quick_bridge().serve(run, transport.clone()).await;

        let frames = transport.event_frames();
        // First reviser frame precedes any verdict.
        assert_eq!(frames[0].status_update, None);
        // The first judge frame carries the newly merged verdict.
        assert_eq!(
            frames[1].status_update,
            Some(serde_json::json!({"status": "fail"}))
        );
        // Checker frame: value unchanged since the judge frame.
        assert_eq!(frames[2].status_update, None);
        // Second round's verdict equals the first; not re-sent.
        assert_eq!(frames[4].status_update, None);
        // Third round flips the verdict.
        assert_eq!(
            frames[7].status_update,
            Some(serde_json::json!({"status": "pass"}))
        );
    }

    #[tokio::test]
    async fn test_replaying_log_reproduces_frame_sequence() {
        let reasoner = Arc::new(ScriptedReasoner::new());
        script_review_round(&reasoner, "draft one", "fail");
        script_review_round(&reasoner, "draft two", "pass");

        let (service, session, pipeline) = setup(&reasoner, 3).await;
        let runner = PipelineRunner::new(service);
        let run = runner.run(&pipeline, &session, None);

        let transport = Arc::new(CollectingTransport::new());
        quick_bridge().serve(run, transport.clone()).await;

        // Replay the log through the same projection rules.
        let mut state: HashMap<String, serde_json::Value> = HashMap::new();
        let mut last_status: Option<serde_json::Value> = None;
        let mut replayed = Vec::new();
        for event in session.events() {
            for (key, value) in &event.actions.state_delta {
                state.insert(key.clone(), value.clone());
            }
            let status = state.get("judge_output").cloned();
            let update = if status == last_status {
                None
            } else {
                last_status.clone_from(&status);
                status
            };
            replayed.push(EventFrame::from_event(&event, update));
        }

        assert_eq!(replayed, transport.event_frames());
    }

    #[tokio::test]
    async fn test_serve_sends_one_error_frame_on_delegation_failure() {
        let reasoner = Arc::new(ScriptedReasoner::new());
        reasoner.script(
            "reviser",
            vec![crate::testing::draft_event("reviser", "draft one")],
        );
        let failing: Arc<dyn crate::reasoning::Reasoner> =
            Arc::new(FailingReasoner::new("model overloaded"));

        let pipeline: Stage = SequentialStage::new(
            "root",
            vec![
                LeafStage::new("reviser", reasoner.clone()).into(),
                LeafStage::new("judge", failing).into(),
            ],
        )
        .into();

        let service = Arc::new(InMemorySessionService::new());
        let session = service.get_or_create(test_key()).await.unwrap();
        let runner = PipelineRunner::new(service);
        let run = runner.run(&pipeline, &session, None);

        let transport = Arc::new(CollectingTransport::new());
        let summary = quick_bridge().serve(run, transport.clone()).await;

        assert_eq!(summary.outcome, ServeOutcome::Failed);
        assert_eq!(transport.event_frames().len(), 1);

        let errors = transport.error_messages();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("model overloaded"));
        assert!(transport.is_closed());
    }

    #[tokio::test]
    async fn test_serve_stops_at_event_boundary_on_disconnect() {
        let reasoner = Arc::new(ScriptedReasoner::new());
        for draft in ["draft one", "draft two", "draft three"] {
            script_review_round(&reasoner, draft, "fail");
        }

        let (service, session, pipeline) = setup(&reasoner, 3).await;
        let runner = PipelineRunner::new(service);
        let run = runner.run(&pipeline, &session, None);

        let keep_alive = Duration::from_millis(10);
        let transport = Arc::new(CollectingTransport::new());
        transport.close_after_event_frames(4);

        let summary = StreamBridge::new()
            .with_keep_alive_interval(keep_alive)
            .serve(run, transport.clone())
            .await;

        assert_eq!(summary.outcome, ServeOutcome::Cancelled);
        // Nothing past the frame that triggered the disconnect.
        assert_eq!(transport.event_frames().len(), 4);
        assert!(transport.error_messages().is_empty());

        // The keep-alive timer stopped with the connection.
        let keep_alives_at_close = transport.keep_alive_count();
        tokio::time::sleep(keep_alive * 5).await;
        assert_eq!(transport.keep_alive_count(), keep_alives_at_close);
    }

    #[tokio::test]
    async fn test_keep_alive_frames_flow_during_slow_delegation() {
        let slow: Arc<dyn crate::reasoning::Reasoner> = Arc::new(SlowReasoner::new(
            Duration::from_millis(120),
            vec![crate::testing::draft_event("reviser", "slow draft")],
        ));

        let pipeline: Stage =
            SequentialStage::new("root", vec![LeafStage::new("reviser", slow).into()]).into();

        let service = Arc::new(InMemorySessionService::new());
        let session = service.get_or_create(test_key()).await.unwrap();
        let runner = PipelineRunner::new(service);
        let run = runner.run(&pipeline, &session, None);

        let transport = Arc::new(CollectingTransport::new());
        let summary = StreamBridge::new()
            .with_keep_alive_interval(Duration::from_millis(20))
            .serve(run, transport.clone())
            .await;

        assert_eq!(summary.outcome, ServeOutcome::Completed);
        assert_eq!(transport.event_frames().len(), 1);
        assert!(transport.keep_alive_count() >= 2);
    }

    #[tokio::test]
    async fn test_custom_status_key() {
        let reasoner = Arc::new(ScriptedReasoner::new());
        reasoner.script(
            "grader",
            vec![crate::testing::judge_verdict("grader", "pass")],
        );

        let pipeline: Stage = SequentialStage::new(
            "root",
            vec![LeafStage::new("grader", reasoner.clone())
                .with_output_key("grade")
                .into()],
        )
        .into();

        let service = Arc::new(InMemorySessionService::new());
        let session = service.get_or_create(test_key()).await.unwrap();
        let runner = PipelineRunner::new(service);
        let run = runner.run(&pipeline, &session, None);

        let transport = Arc::new(CollectingTransport::new());
        quick_bridge()
            .with_status_key("grade")
            .serve(run, transport.clone())
            .await;

        let frames = transport.event_frames();
        assert_eq!(
            frames[0].status_update,
            Some(serde_json::json!({"status": "pass"}))
        );
    }
}
