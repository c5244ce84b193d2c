//! Cooperative cancellation for stream serving.

mod token;

pub use token::{CancelCallback, CancellationToken};
