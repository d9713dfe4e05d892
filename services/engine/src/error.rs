//! Error types for the event engine.

use thiserror::Error;

/// Construction-time failures. The running pipeline itself has no error
/// surface: per-event failures are counted, not raised.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The one-slot-sacrifice ring needs at least one usable slot.
    #[error("queue capacity must be at least 2, got {0}")]
    InvalidCapacity(usize),

    /// A pool with no workers can never drain the queue.
    #[error("worker pool needs at least one thread")]
    NoWorkers,

    /// The underlying adapter rejected its configuration.
    #[error(transparent)]
    Adapter(#[from] adapter::AdapterError),
}
