//! Pipeline execution: drives a stage tree against a session.
//!
//! The runner walks the tree depth-first with an explicit frame stack,
//! pulling one event at a time. Every event is applied to the session
//! (state delta merged, log appended) before it is handed to the
//! caller, so a consumer reading session state after receiving an
//! event always observes that event's effects.

mod run_stream;


pub use run_stream::RunStream;

use crate::errors::EventflowError;
use crate::event::Content;
use crate::session::{Session, SessionKey, SessionService};
use crate::stage::Stage;
use std::sync::Arc;

/// Drives a root stage against a session for one invocation.
pub struct PipelineRunner {
    service: Arc<dyn SessionService>,
}

impl PipelineRunner {
    /// Creates a runner backed by the given session service.
    #[must_use]
    pub fn new(service: Arc<dyn SessionService>) -> Self {
        Self { service }
    }

    /// Returns the session service.
    #[must_use]
    pub fn session_service(&self) -> &Arc<dyn SessionService> {
        &self.service
    }

    /// Starts a run of `root` against an existing session.
    ///
    /// The returned stream is lazy: no stage executes until the first
    /// event is pulled.
    #[must_use]
    pub fn run<'a>(
        &self,
        root: &'a Stage,
        session: &Arc<Session>,
        input: Option<Content>,
    ) -> RunStream<'a> {
        RunStream::new(self.service.clone(), session.clone(), root, input)
    }

    /// Resolves the session for `key` (creating it on first use) and
    /// starts a run against it.
    pub async fn start<'a>(
        &self,
        root: &'a Stage,
        key: SessionKey,
        input: Option<Content>,
    ) -> Result<RunStream<'a>, EventflowError> {
        let session = self.service.get_or_create(key).await?;
        Ok(self.run(root, &session, input))
    }
}

impl std::fmt::Debug for PipelineRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineRunner").finish_non_exhaustive()
    }
}
