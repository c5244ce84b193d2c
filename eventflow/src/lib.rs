//! # Eventflow
//!
//! A staged pipeline runner that streams every intermediate event it
//! produces to a remote observer over a long-lived connection.
//!
//! Eventflow is built around two tightly-coupled cores:
//!
//! - **Pipeline state machine**: compose stages (sequential execution,
//!   bounded loops with a deterministic escalation check) and merge their
//!   declared side-effects into a shared session store with defined
//!   ordering rules
//! - **Streaming bridge**: forward the live event sequence to one
//!   connected observer with keep-alive frames, partial-failure
//!   reporting, and cooperative cancellation on disconnect
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use eventflow::prelude::*;
//!
//! // Compose a pipeline: revise, judge, check, at most three rounds
//! let pipeline = Stage::from(SequentialStage::new(
//!     "review_pipeline",
//!     vec![LoopStage::new(
//!         "review_loop",
//!         vec![
//!             LeafStage::new("reviser", reasoner.clone()).into(),
//!             LeafStage::new("judge", reasoner)
//!                 .with_output_key("judge_output")
//!                 .into(),
//!             CheckerStage::new("checker").into(),
//!         ],
//!         3,
//!     )
//!     .into()],
//! ));
//!
//! // Run it against a session and stream the events out
//! let session = service.get_or_create(key).await?;
//! let run = runner.run(&pipeline, &session, Some(Content::user_text("...")));
//! let summary = StreamBridge::new().serve(run, transport).await;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod bridge;
pub mod cancellation;
pub mod errors;
pub mod event;
pub mod observability;
pub mod reasoning;
pub mod runner;
pub mod session;
pub mod stage;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::bridge::{
        EventFrame, Frame, ServeOutcome, ServeSummary, StreamBridge, Transport,
    };
    pub use crate::cancellation::CancellationToken;
    pub use crate::errors::{
        EventflowError, ReasonerError, SessionError, TransportError,
    };
    pub use crate::event::{
        Content, Event, EventActions, FunctionCall, FunctionResponse, Part, Role,
    };
    pub use crate::reasoning::{EventStream, Reasoner, ReasoningRequest};
    pub use crate::runner::{PipelineRunner, RunStream};
    pub use crate::session::{
        InMemorySessionService, Session, SessionKey, SessionService,
    };
    pub use crate::stage::{
        CheckerStage, LeafStage, LoopStage, SequentialStage, Stage,
    };
    pub use crate::utils::{generate_uuid, iso_timestamp};
}
