//! The engine facade: queue + pool + adapter behind one surface.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;

use adapter::{Adapter, AdapterConfig};
use envelope::Tier;

use crate::error::PipelineError;
use crate::metrics::MetricsSnapshot;
use crate::ops::AggregateHandler;
use crate::pool::PipelineWorkerPool;
use crate::queue::BoundedEventQueue;
use crate::{DEFAULT_PORT, SUBSYSTEM};

/// Construction parameters for [`EventEngine`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Physical slot count of the intake buffer.
    pub capacity: usize,
    /// Consumer thread count.
    pub threads: usize,
    /// Tier selection and transport settings.
    pub adapter: AdapterConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            capacity: 1 << 14,
            threads: thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
            adapter: AdapterConfig::from_env(SUBSYSTEM, DEFAULT_PORT),
        }
    }
}

/// High-frequency event engine: absorbs ticks into the bounded queue and
/// drains them through whichever execution tier resolved at construction.
pub struct EventEngine {
    queue: Arc<BoundedEventQueue>,
    pool: PipelineWorkerPool,
    adapter: Arc<Adapter>,
    // The ring is single-producer; admission from arbitrary caller threads is
    // funneled through this (uncontended in the single-producer case).
    admit: Mutex<()>,
}

impl EventEngine {
    /// Resolve the execution tier and allocate the pipeline.
    ///
    /// This is the engine's only fallible surface; see
    /// [`PipelineError`] for the construction-time rejections.
    pub fn new(config: EngineConfig) -> Result<Self, PipelineError> {
        if config.threads == 0 {
            return Err(PipelineError::NoWorkers);
        }
        let queue = Arc::new(BoundedEventQueue::with_capacity(config.capacity)?);
        let adapter = Arc::new(Adapter::resolve(config.adapter, Arc::new(AggregateHandler))?);
        let pool = PipelineWorkerPool::new(Arc::clone(&queue), Arc::clone(&adapter), config.threads);
        Ok(Self {
            queue,
            pool,
            adapter,
            admit: Mutex::new(()),
        })
    }

    /// Admit one tick. Returns `false` when the buffer is full; the caller
    /// decides whether to retry or drop.
    pub fn offer(&self, timestamp_ms: u64, symbol: &str, price: f64, quantity: u64) -> bool {
        let _admit = self.admit.lock();
        self.queue.offer(timestamp_ms, symbol, price, quantity)
    }

    /// Start the drain workers. No-op if already started or stopped.
    pub fn start(&self) {
        self.pool.start();
    }

    /// Stop the workers and tear down the adapter. Abrupt: events still
    /// queued are discarded. Idempotent, and terminal - the engine cannot be
    /// restarted afterwards.
    pub fn stop(&self) {
        self.pool.stop();
        self.adapter.shutdown();
    }

    /// The execution tier bound at construction.
    pub fn tier(&self) -> Tier {
        self.adapter.tier()
    }

    /// Current pipeline counters.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.pool.metrics()
    }

    /// Events currently resident in the intake buffer.
    pub fn backlog(&self) -> usize {
        self.queue.len()
    }
}
