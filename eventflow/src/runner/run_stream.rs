//! The lazy event sequence produced by one pipeline run.

use crate::errors::EventflowError;
use crate::event::{Content, Event};
use crate::reasoning::{EventStream, ReasoningRequest};
use crate::session::{Session, SessionService};
use crate::stage::Stage;
use crate::utils::generate_uuid_string;
use futures::StreamExt;
use std::sync::Arc;
use tracing::{debug, warn};

/// A walk frame: one composite stage currently being traversed.
enum Frame<'a> {
    Sequential {
        children: &'a [Stage],
        index: usize,
    },
    Loop {
        name: &'a str,
        children: &'a [Stage],
        index: usize,
        iteration: u32,
        max_iterations: u32,
        escalated: bool,
    },
}

/// The leaf delegation currently being drained.
struct ActiveLeaf {
    stream: EventStream,
    author: String,
    output_key: Option<String>,
}

impl ActiveLeaf {
    /// Stamps authorship and, when the leaf declares an output key,
    /// the event's structured output as a state delta under that key.
    fn stamp(&self, mut event: Event) -> Event {
        event.author.clone_from(&self.author);
        if let Some(key) = &self.output_key {
            if let Some(output) = event.structured_output() {
                event.actions.state_delta.insert(key.clone(), output);
            }
        }
        event
    }
}

/// What the walk decided to do after inspecting the top frame.
enum Walk<'a> {
    Enter(&'a Stage),
    Pop,
    NextPass,
}

/// The lazy, pull-driven event sequence of one run.
///
/// Each call to [`next_event`](Self::next_event) advances the walk
/// just far enough to produce one event, applies that event to the
/// session, and returns it. Dropping the stream abandons the rest of
/// the run; nothing executes between pulls.
pub struct RunStream<'a> {
    service: Arc<dyn SessionService>,
    session: Arc<Session>,
    input: Option<Content>,
    invocation_id: String,
    stack: Vec<Frame<'a>>,
    active: Option<ActiveLeaf>,
    finished: bool,
}

impl<'a> RunStream<'a> {
    pub(crate) fn new(
        service: Arc<dyn SessionService>,
        session: Arc<Session>,
        root: &'a Stage,
        input: Option<Content>,
    ) -> Self {
        Self {
            service,
            session,
            input,
            invocation_id: generate_uuid_string(),
            stack: vec![Frame::Sequential {
                children: std::slice::from_ref(root),
                index: 0,
            }],
            active: None,
            finished: false,
        }
    }

    /// Returns the session this run mutates.
    #[must_use]
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Returns the id stamped on every event of this run.
    #[must_use]
    pub fn invocation_id(&self) -> &str {
        &self.invocation_id
    }

    /// Returns true once the sequence is exhausted or terminated.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// Pulls the next event.
    ///
    /// Returns `None` when the run is over. An `Err` item reports a
    /// session-store failure and ends the sequence; a delegation
    /// failure instead surfaces as a terminal error event (`Ok`) so it
    /// reaches observers as part of the stream.
    pub async fn next_event(&mut self) -> Option<Result<Event, EventflowError>> {
        loop {
            if self.finished {
                return None;
            }

            if let Some(mut active) = self.active.take() {
                match active.stream.next().await {
                    Some(Ok(event)) => {
                        let event = active.stamp(event);
                        self.active = Some(active);
                        return Some(self.deliver(event).await);
                    }
                    Some(Err(err)) => {
                        warn!(stage = %active.author, error = %err, "delegation failed, ending run");
                        self.finished = true;
                        let event = Event::delegation_failure(&active.author, err.to_string());
                        return Some(self.deliver(event).await);
                    }
                    None => continue,
                }
            }

            let action = match self.stack.last_mut() {
                None => {
                    self.finished = true;
                    return None;
                }
                Some(Frame::Sequential { children, index }) => {
                    if *index < children.len() {
                        let kids: &'a [Stage] = *children;
                        let child = &kids[*index];
                        *index += 1;
                        Walk::Enter(child)
                    } else {
                        Walk::Pop
                    }
                }
                Some(Frame::Loop {
                    name,
                    children,
                    index,
                    iteration,
                    max_iterations,
                    escalated,
                }) => {
                    if *index < children.len() {
                        let kids: &'a [Stage] = *children;
                        let child = &kids[*index];
                        *index += 1;
                        Walk::Enter(child)
                    } else if *escalated {
                        debug!(stage = %name, passes = *iteration + 1, "loop escalated");
                        Walk::Pop
                    } else {
                        *iteration += 1;
                        if *iteration >= *max_iterations {
                            warn!(
                                stage = %name,
                                passes = *iteration,
                                "loop exhausted without escalation, continuing pipeline"
                            );
                            Walk::Pop
                        } else {
                            debug!(stage = %name, iteration = *iteration, "starting next pass");
                            *index = 0;
                            Walk::NextPass
                        }
                    }
                }
            };

            match action {
                Walk::Enter(child) => {
                    if let Some(result) = self.enter(child).await {
                        return Some(result);
                    }
                }
                Walk::Pop => {
                    self.stack.pop();
                }
                Walk::NextPass => {}
            }
        }
    }

    /// Drains the remaining sequence, returning all events in order.
    pub async fn collect_remaining(mut self) -> Result<Vec<Event>, EventflowError> {
        let mut events = Vec::new();
        while let Some(result) = self.next_event().await {
            events.push(result?);
        }
        Ok(events)
    }

    /// Begins executing one stage: composites push a frame, a checker
    /// yields its verdict immediately, a leaf starts its delegation.
    async fn enter(&mut self, stage: &'a Stage) -> Option<Result<Event, EventflowError>> {
        match stage {
            Stage::Sequential(seq) => {
                debug!(stage = %seq.name(), "entering sequential stage");
                self.stack.push(Frame::Sequential {
                    children: seq.children(),
                    index: 0,
                });
                None
            }
            Stage::Loop(looped) => {
                if looped.max_iterations() == 0 {
                    debug!(stage = %looped.name(), "loop bound is zero, skipping");
                    return None;
                }
                debug!(
                    stage = %looped.name(),
                    max_iterations = looped.max_iterations(),
                    "entering loop stage"
                );
                self.stack.push(Frame::Loop {
                    name: looped.name(),
                    children: looped.children(),
                    index: 0,
                    iteration: 0,
                    max_iterations: looped.max_iterations(),
                    escalated: false,
                });
                None
            }
            Stage::Checker(checker) => {
                let event = checker.evaluate(&self.session);
                Some(self.deliver(event).await)
            }
            Stage::Leaf(leaf) => {
                let mut request =
                    ReasoningRequest::new(leaf.name()).with_state(self.session.state_snapshot());
                if let Some(instruction) = leaf.instruction() {
                    request = request.with_instruction(instruction);
                }
                if let Some(message) = &self.input {
                    request = request.with_message(message.clone());
                }

                debug!(stage = %leaf.name(), "delegating to reasoner");
                match leaf.reasoner().invoke(request).await {
                    Ok(stream) => {
                        self.active = Some(ActiveLeaf {
                            stream,
                            author: leaf.name().to_string(),
                            output_key: leaf.output_key().map(String::from),
                        });
                        None
                    }
                    Err(err) => {
                        warn!(stage = %leaf.name(), error = %err, "delegation failed, ending run");
                        self.finished = true;
                        let event = Event::delegation_failure(leaf.name(), err.to_string());
                        Some(self.deliver(event).await)
                    }
                }
            }
        }
    }

    /// Applies an event to the session and hands it to the caller.
    async fn deliver(&mut self, mut event: Event) -> Result<Event, EventflowError> {
        event.invocation_id.clone_from(&self.invocation_id);
        if event.actions.escalate {
            self.mark_escalated();
        }

        match self.service.append_event(&self.session, event).await {
            Ok(event) => Ok(event),
            Err(err) => {
                warn!(error = %err, "session store failed, ending run");
                self.finished = true;
                Err(EventflowError::Session(err))
            }
        }
    }

    /// Records escalation against the nearest enclosing loop.
    fn mark_escalated(&mut self) {
        for frame in self.stack.iter_mut().rev() {
            if let Frame::Loop { escalated, .. } = frame {
                *escalated = true;
                return;
            }
        }
    }
}

impl std::fmt::Debug for RunStream<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunStream")
            .field("invocation_id", &self.invocation_id)
            .field("finished", &self.finished)
            .field("depth", &self.stack.len())
            .finish_non_exhaustive()
    }
}
