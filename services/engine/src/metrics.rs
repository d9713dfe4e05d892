//! Consumer-side pipeline counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;

use envelope::Response;

use crate::ops::FIELD_NOTIONAL;

/// Monotonic counters updated only by the consumer side.
///
/// `last_notional` is stored as raw `f64` bits so a single atomic carries it;
/// a failed event leaves the last-known value in place.
#[derive(Default)]
pub struct PipelineMetrics {
    processed: AtomicU64,
    failed: AtomicU64,
    last_notional: AtomicU64,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of one drained event.
    pub(crate) fn record(&self, response: &Response) {
        let notional = response
            .ok
            .then(|| response.result.get(FIELD_NOTIONAL).and_then(Value::as_f64))
            .flatten();
        match notional {
            Some(value) => self.last_notional.store(value.to_bits(), Ordering::Relaxed),
            None => {
                self.failed.fetch_add(1, Ordering::Relaxed);
            }
        }
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    /// Current counter values.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            processed: self.processed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            last_notional: f64::from_bits(self.last_notional.load(Ordering::Relaxed)),
        }
    }
}

/// Point-in-time view of the pipeline counters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricsSnapshot {
    /// Events drained from the queue, successful or not.
    pub processed: u64,
    /// Events whose response was `ok: false` or carried no usable value.
    pub failed: u64,
    /// Most recent successfully derived notional.
    pub last_notional: f64,
}
