//! Streaming bridge: forwards a run's events to one connected observer.
//!
//! This module provides:
//! - The frame types an observer receives
//! - The transport trait the bridge writes through
//! - The bridge itself, with keep-alive and cooperative cancellation

mod frame;
mod transport;

#[allow(clippy::module_inception)]
mod bridge;

pub use bridge::{ServeOutcome, ServeSummary, StreamBridge, DEFAULT_KEEP_ALIVE_INTERVAL};
pub use frame::{EventFrame, Frame};
pub use transport::{CloseCallback, Transport};
