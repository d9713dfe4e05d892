//! # Strata Event Engine
//!
//! The one subsystem doing real streaming work: a high-rate stream of market
//! events is absorbed into a bounded circular buffer and drained concurrently
//! through the tiered execution adapter, without blocking producers and
//! without losing throughput.
//!
//! ```text
//! producer(s) --offer--> BoundedEventQueue --poll--> PipelineWorkerPool
//!                                                         |
//!                                                  Adapter::execute
//!                                              (Linked | Subprocess | Embedded)
//!                                                         |
//!                                                  metrics update
//! ```
//!
//! A full queue turns `offer` into an immediate `false` - that return value
//! is the backpressure signal, and the producer decides whether to spin,
//! retry, or drop. A failed event turns into a counted `ok: false` response -
//! the drain loop keeps running either way.

pub mod engine;
pub mod event;
pub mod metrics;
pub mod ops;
pub mod pool;
pub mod queue;

mod error;

pub use engine::{EngineConfig, EventEngine};
pub use error::PipelineError;
pub use event::Event;
pub use metrics::{MetricsSnapshot, PipelineMetrics};
pub use ops::{AggregateHandler, FIELD_NOTIONAL, OP_AGGREGATE};
pub use pool::{PipelineWorkerPool, PoolState};
pub use queue::BoundedEventQueue;

/// Subsystem name used for environment prefixes and artifact defaults.
pub const SUBSYSTEM: &str = "engine";

/// Default loopback port for the engine's subprocess worker.
pub const DEFAULT_PORT: u16 = 9094;
