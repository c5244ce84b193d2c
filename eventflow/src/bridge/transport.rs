//! The observer-facing transport trait.

use super::Frame;
use crate::errors::TransportError;
use async_trait::async_trait;

/// A callback invoked when the remote observer disconnects.
pub type CloseCallback = Box<dyn Fn() + Send + Sync>;

/// A long-lived connection to one observer.
///
/// Implementations own the wire format; the bridge only decides what
/// goes into each [`Frame`] and when to stop sending. `on_close` must
/// invoke its callbacks as soon as the remote side disconnects so the
/// bridge can cancel promptly.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Transmits one frame.
    async fn send(&self, frame: &Frame) -> Result<(), TransportError>;

    /// Registers a callback for remote disconnection.
    fn on_close(&self, callback: CloseCallback);

    /// Closes the connection from this side.
    async fn close(&self);
}
