//! Consumer threads draining the queue through the execution adapter.
//!
//! Each worker loops: poll the queue; if empty, yield and retry (a
//! non-blocking spin, not an OS block); otherwise build the aggregate request
//! from the event's precomputed record, execute it on the bound tier, and
//! update the counters. A per-event failure updates the failed counter and
//! continues - nothing an event does can stop the loop.
//!
//! Dequeue is serialized across workers so the buffer-level FIFO contract
//! holds; with more than one worker, completion order across threads is not
//! guaranteed, only dequeue order.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use adapter::Adapter;
use envelope::Request;

use crate::metrics::{MetricsSnapshot, PipelineMetrics};
use crate::ops::OP_AGGREGATE;
use crate::queue::BoundedEventQueue;

const IDLE: u8 = 0;
const RUNNING: u8 = 1;
const STOPPED: u8 = 2;

/// Lifecycle state of the worker pool.
///
/// One-way: once stopped, a pool cannot be restarted; `start` after `stop`
/// is a no-op. (A deliberate limitation - see DESIGN.md.)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    /// Constructed, not yet started.
    Idle,
    /// Workers are draining the queue.
    Running,
    /// Terminal. Workers joined, queued events discarded.
    Stopped,
}

struct Shared {
    queue: Arc<BoundedEventQueue>,
    adapter: Arc<Adapter>,
    metrics: PipelineMetrics,
    state: AtomicU8,
    drain: Mutex<()>,
}

/// Fixed-size pool of OS consumer threads.
pub struct PipelineWorkerPool {
    shared: Arc<Shared>,
    threads: usize,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl PipelineWorkerPool {
    /// Build a pool of `threads` workers over `queue` and `adapter`.
    /// Workers do not run until [`start`](Self::start).
    pub fn new(queue: Arc<BoundedEventQueue>, adapter: Arc<Adapter>, threads: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                queue,
                adapter,
                metrics: PipelineMetrics::new(),
                state: AtomicU8::new(IDLE),
                drain: Mutex::new(()),
            }),
            threads: threads.max(1),
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Spawn the workers. No-op if the pool is already running or stopped.
    pub fn start(&self) {
        match self
            .shared
            .state
            .compare_exchange(IDLE, RUNNING, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => {
                let mut handles = self.handles.lock();
                for worker in 0..self.threads {
                    let shared = Arc::clone(&self.shared);
                    let builder = thread::Builder::new().name(format!("drain-{worker}"));
                    match builder.spawn(move || consume_loop(&shared)) {
                        Ok(handle) => handles.push(handle),
                        Err(error) => warn!(%error, worker, "failed to spawn drain worker"),
                    }
                }
                info!(threads = handles.len(), "pipeline workers started");
            }
            Err(_) => debug!("start ignored: pool is not idle"),
        }
    }

    /// Stop the pool and join the workers. Abrupt, not a graceful drain:
    /// events still resident in the queue are discarded. No-op when the pool
    /// never started or already stopped. Terminal - there is no restart.
    pub fn stop(&self) {
        let previous = self.shared.state.swap(STOPPED, Ordering::AcqRel);
        if previous != RUNNING {
            debug!("stop ignored: pool was not running");
            return;
        }
        let handles = std::mem::take(&mut *self.handles.lock());
        for handle in handles {
            let _ = handle.join();
        }
        let snapshot = self.shared.metrics.snapshot();
        let discarded = self.shared.queue.len();
        info!(
            processed = snapshot.processed,
            failed = snapshot.failed,
            discarded,
            "pipeline workers stopped"
        );
    }

    pub fn state(&self) -> PoolState {
        match self.shared.state.load(Ordering::Acquire) {
            IDLE => PoolState::Idle,
            RUNNING => PoolState::Running,
            _ => PoolState::Stopped,
        }
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.shared.metrics.snapshot()
    }
}

fn consume_loop(shared: &Shared) {
    while shared.state.load(Ordering::Acquire) == RUNNING {
        let event = {
            let _drain = shared.drain.lock();
            shared.queue.poll()
        };
        let Some(event) = event else {
            thread::yield_now();
            continue;
        };
        let request = Request::new(OP_AGGREGATE).with_param("record", event.record.as_str());
        let response = shared.adapter.execute(&request);
        shared.metrics.record(&response);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adapter::AdapterConfig;
    use std::time::{Duration, Instant};

    fn embedded_pool(capacity: usize, threads: usize) -> (Arc<BoundedEventQueue>, PipelineWorkerPool)
    {
        let mut config = AdapterConfig::from_env("pool_test", 19991);
        config.native_module = "no-such-module.so".into();
        config.worker_bin = "no-such-worker".into();
        let adapter =
            Arc::new(Adapter::resolve(config, Arc::new(crate::ops::AggregateHandler)).unwrap());
        let queue = Arc::new(BoundedEventQueue::with_capacity(capacity).unwrap());
        let pool = PipelineWorkerPool::new(Arc::clone(&queue), adapter, threads);
        (queue, pool)
    }

    fn wait_for_processed(pool: &PipelineWorkerPool, expected: u64) {
        let deadline = Instant::now() + Duration::from_secs(30);
        while pool.metrics().processed < expected {
            assert!(Instant::now() < deadline, "pipeline stalled");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn drains_events_and_tracks_the_last_value() {
        let (queue, pool) = embedded_pool(64, 1);
        pool.start();
        assert!(queue.offer(1000, "ABC", 55.25, 120));
        wait_for_processed(&pool, 1);
        let snapshot = pool.metrics();
        assert_eq!(snapshot.failed, 0);
        assert_eq!(snapshot.last_notional, 6630.0);
        pool.stop();
    }

    #[test]
    fn lifecycle_transitions_are_one_way_no_ops_at_the_edges() {
        let (_queue, pool) = embedded_pool(8, 2);
        assert_eq!(pool.state(), PoolState::Idle);

        pool.start();
        assert_eq!(pool.state(), PoolState::Running);
        pool.start(); // already running: no-op

        pool.stop();
        assert_eq!(pool.state(), PoolState::Stopped);
        pool.stop(); // already stopped: no-op
        pool.start(); // terminal: no restart
        assert_eq!(pool.state(), PoolState::Stopped);
    }

    #[test]
    fn stop_before_start_is_terminal() {
        let (_queue, pool) = embedded_pool(8, 1);
        pool.stop();
        assert_eq!(pool.state(), PoolState::Stopped);
        pool.start();
        assert_eq!(pool.state(), PoolState::Stopped);
    }

    #[test]
    fn multi_worker_drain_processes_every_admitted_event() {
        let (queue, pool) = embedded_pool(128, 4);
        pool.start();
        let mut admitted = 0u64;
        while admitted < 5_000 {
            if queue.offer(admitted, "XYZ", 10.0, 2) {
                admitted += 1;
            } else {
                thread::yield_now();
            }
        }
        wait_for_processed(&pool, 5_000);
        pool.stop();
        assert_eq!(pool.metrics().processed, 5_000);
        assert_eq!(pool.metrics().failed, 0);
    }
}
