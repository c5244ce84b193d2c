//! Tracing setup helpers.
//!
//! The library itself only emits `tracing` events; installing a
//! subscriber is the embedding process's choice. These helpers cover
//! the common cases.

use tracing_subscriber::EnvFilter;

/// Installs a human-readable subscriber honoring `RUST_LOG`.
///
/// Defaults to `info` when no filter is configured. Safe to call more
/// than once; later calls are no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init();
}

/// Installs a JSON subscriber honoring `RUST_LOG`, for log pipelines.
///
/// Defaults to `info` when no filter is configured. Safe to call more
/// than once; later calls are no-ops.
pub fn init_tracing_json() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_is_idempotent() {
        init_tracing();
        init_tracing();
        // Should not panic
    }
}
