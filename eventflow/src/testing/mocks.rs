//! Mock reasoners and transports for testing.

use crate::bridge::{CloseCallback, EventFrame, Frame, Transport};
use crate::errors::{ReasonerError, TransportError};
use crate::event::Event;
use crate::reasoning::{EventStream, Reasoner, ReasoningRequest};
use async_trait::async_trait;
use futures::stream;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};

/// A reasoner that replays scripted event batches.
///
/// Each invocation for a stage pops the next scripted batch; an
/// unscripted invocation yields an empty sequence. All requests are
/// recorded for inspection.
#[derive(Default)]
pub struct ScriptedReasoner {
    scripts: Mutex<HashMap<String, VecDeque<Vec<Event>>>>,
    requests: Mutex<Vec<ReasoningRequest>>,
}

impl ScriptedReasoner {
    /// Creates a reasoner with no scripts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues one batch of events for the next invocation of `stage`.
    pub fn script(&self, stage: &str, events: Vec<Event>) {
        self.scripts
            .lock()
            .entry(stage.to_string())
            .or_default()
            .push_back(events);
    }

    /// Returns all recorded requests, in invocation order.
    #[must_use]
    pub fn requests(&self) -> Vec<ReasoningRequest> {
        self.requests.lock().clone()
    }

    /// Returns how many times `stage` was invoked.
    #[must_use]
    pub fn invocation_count(&self, stage: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.stage == stage)
            .count()
    }
}

#[async_trait]
impl Reasoner for ScriptedReasoner {
    async fn invoke(&self, request: ReasoningRequest) -> Result<EventStream, ReasonerError> {
        let batch = self
            .scripts
            .lock()
            .get_mut(&request.stage)
            .and_then(VecDeque::pop_front)
            .unwrap_or_default();
        self.requests.lock().push(request);

        Ok(Box::pin(stream::iter(batch.into_iter().map(Ok))))
    }
}

impl std::fmt::Debug for ScriptedReasoner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedReasoner")
            .field("recorded_requests", &self.requests.lock().len())
            .finish_non_exhaustive()
    }
}

/// A reasoner that fails, either on invocation or mid-stream after a
/// preamble of events.
#[derive(Debug, Default)]
pub struct FailingReasoner {
    message: String,
    preamble: Vec<Event>,
}

impl FailingReasoner {
    /// Creates a reasoner whose invocations fail immediately.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            preamble: Vec::new(),
        }
    }

    /// Yields the given events first, then fails mid-stream.
    #[must_use]
    pub fn with_preamble(mut self, events: Vec<Event>) -> Self {
        self.preamble = events;
        self
    }
}

#[async_trait]
impl Reasoner for FailingReasoner {
    async fn invoke(&self, _request: ReasoningRequest) -> Result<EventStream, ReasonerError> {
        if self.preamble.is_empty() {
            return Err(ReasonerError::Invocation(self.message.clone()));
        }

        let items: Vec<Result<Event, ReasonerError>> = self
            .preamble
            .iter()
            .cloned()
            .map(Ok)
            .chain(std::iter::once(Err(ReasonerError::Invocation(
                self.message.clone(),
            ))))
            .collect();
        Ok(Box::pin(stream::iter(items)))
    }
}

/// A reasoner that delays before yielding its events, for exercising
/// keep-alive and cancellation timing.
#[derive(Debug)]
pub struct SlowReasoner {
    delay: std::time::Duration,
    events: Vec<Event>,
}

impl SlowReasoner {
    /// Creates a reasoner that sleeps for `delay` on every invocation
    /// before yielding `events`.
    #[must_use]
    pub const fn new(delay: std::time::Duration, events: Vec<Event>) -> Self {
        Self { delay, events }
    }
}

#[async_trait]
impl Reasoner for SlowReasoner {
    async fn invoke(&self, _request: ReasoningRequest) -> Result<EventStream, ReasonerError> {
        tokio::time::sleep(self.delay).await;
        let events = self.events.clone();
        Ok(Box::pin(stream::iter(events.into_iter().map(Ok))))
    }
}

/// A transport that records frames and can script a remote disconnect.
#[derive(Default)]
pub struct CollectingTransport {
    frames: Mutex<Vec<Frame>>,
    callbacks: Mutex<Vec<CloseCallback>>,
    closed: AtomicBool,
    remote_closed: AtomicBool,
    close_after_events: Mutex<Option<usize>>,
}

impl CollectingTransport {
    /// Creates an open transport collecting every frame.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates the remote observer closing after `count` event
    /// frames have been transmitted.
    pub fn close_after_event_frames(&self, count: usize) {
        *self.close_after_events.lock() = Some(count);
    }

    /// Simulates an immediate remote disconnect.
    pub fn disconnect(&self) {
        if !self.remote_closed.swap(true, Ordering::SeqCst) {
            for callback in self.callbacks.lock().iter() {
                callback();
            }
        }
    }

    /// Returns all recorded frames, in transmission order.
    #[must_use]
    pub fn frames(&self) -> Vec<Frame> {
        self.frames.lock().clone()
    }

    /// Returns only the event frames, in transmission order.
    #[must_use]
    pub fn event_frames(&self) -> Vec<EventFrame> {
        self.frames
            .lock()
            .iter()
            .filter_map(|frame| match frame {
                Frame::Event(event) => Some(event.clone()),
                _ => None,
            })
            .collect()
    }

    /// Returns the number of keep-alive frames recorded.
    #[must_use]
    pub fn keep_alive_count(&self) -> usize {
        self.frames
            .lock()
            .iter()
            .filter(|frame| matches!(frame, Frame::KeepAlive))
            .count()
    }

    /// Returns the messages of all error frames recorded.
    #[must_use]
    pub fn error_messages(&self) -> Vec<String> {
        self.frames
            .lock()
            .iter()
            .filter_map(|frame| match frame {
                Frame::Error { message } => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    /// Returns whether the bridge has closed the transport.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for CollectingTransport {
    async fn send(&self, frame: &Frame) -> Result<(), TransportError> {
        if self.remote_closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }

        self.frames.lock().push(frame.clone());

        if matches!(frame, Frame::Event(_)) {
            let events_sent = self
                .frames
                .lock()
                .iter()
                .filter(|f| matches!(f, Frame::Event(_)))
                .count();
            let threshold = *self.close_after_events.lock();
            if threshold.is_some_and(|n| events_sent >= n) {
                self.disconnect();
            }
        }

        Ok(())
    }

    fn on_close(&self, callback: CloseCallback) {
        if self.remote_closed.load(Ordering::SeqCst) {
            callback();
        } else {
            self.callbacks.lock().push(callback);
        }
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for CollectingTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectingTransport")
            .field("frames", &self.frames.lock().len())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
