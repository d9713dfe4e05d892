//! Error types for the adapter crate.
//!
//! These are internal currency: per-call failures are converted into failure
//! responses at the channel boundary, and tier probe failures cascade to the
//! next tier. The only variant a caller ever sees from the public surface is
//! `InvalidConfig`, raised at construction time.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for adapter operations.
pub type Result<T> = std::result::Result<T, AdapterError>;

/// Failures inside the adapter's probing and transport machinery.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Rejected configuration at construction time.
    #[error("invalid adapter configuration: {0}")]
    InvalidConfig(String),

    /// The native module could not be loaded or linked.
    #[error("native module unavailable: {0}")]
    NativeLoad(#[from] libloading::Error),

    /// The native module misbehaved at the call boundary.
    #[error("native call failed: {0}")]
    NativeCall(String),

    /// The worker binary does not exist at the resolved path.
    #[error("worker binary not found at {0}")]
    WorkerMissing(PathBuf),

    /// I/O failure while spawning or talking to the worker.
    #[error("worker transport error: {0}")]
    Io(#[from] std::io::Error),

    /// The worker closed the connection without a response line.
    #[error("worker closed the connection without responding")]
    NoResponse,

    /// Envelope encode/decode failure on the transport path.
    #[error(transparent)]
    Codec(#[from] envelope::EnvelopeError),
}
