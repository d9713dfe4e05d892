//! Bounded single-producer/single-consumer event intake.
//!
//! A fixed array of pre-allocated slots indexed by two atomics. The buffer is
//! *full* when `(head + 1) % capacity == tail` - it holds at most
//! `capacity - 1` live events, sacrificing one slot so full and empty are
//! distinguishable - and *empty* when `head == tail`. Slots are never
//! reallocated; `offer` overwrites the slot at `head` only when it is not the
//! unread tail slot.
//!
//! Index discipline: `head` is written only by the producer side, `tail` only
//! by the consumer side, each with a plain release store paired with the
//! other side's acquire load. No compare-and-swap and no locks - correctness
//! rests entirely on each side owning exactly one index. Callers with more
//! than one thread per side must serialize that side externally (the engine
//! facade and the worker pool both do).

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::PipelineError;
use crate::event::Event;

/// Fixed-capacity circular buffer absorbing producer events.
pub struct BoundedEventQueue {
    slots: Box<[UnsafeCell<Event>]>,
    head: AtomicUsize,
    tail: AtomicUsize,
}

// SAFETY: a slot is touched mutably only by the single producer (the slot at
// `head`, before head is published) or the single consumer (the slot at
// `tail`, before tail is published). The release/acquire pairing on the
// indices orders those accesses, so no slot is ever reached from two threads
// at once.
unsafe impl Sync for BoundedEventQueue {}
unsafe impl Send for BoundedEventQueue {}

impl BoundedEventQueue {
    /// Allocate a queue holding up to `capacity - 1` live events.
    ///
    /// Rejects capacities below 2: with the one-slot sacrifice there would be
    /// no usable slot at all.
    pub fn with_capacity(capacity: usize) -> Result<Self, PipelineError> {
        if capacity < 2 {
            return Err(PipelineError::InvalidCapacity(capacity));
        }
        let slots = (0..capacity)
            .map(|_| UnsafeCell::new(Event::default()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Ok(Self {
            slots,
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
        })
    }

    /// Physical slot count (one more than the live-event capacity).
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Admit one event. Never blocks.
    ///
    /// Returns `false` immediately when the buffer is full - that return
    /// value is the backpressure signal; whether to spin, retry, or drop is
    /// the producer's decision, not the queue's.
    pub fn offer(&self, timestamp_ms: u64, symbol: &str, price: f64, quantity: u64) -> bool {
        let head = self.head.load(Ordering::Relaxed);
        let next = (head + 1) % self.slots.len();
        if next == self.tail.load(Ordering::Acquire) {
            return false;
        }
        // SAFETY: `head` is owned by this (single) producer and `next != tail`,
        // so the consumer cannot be reading this slot.
        unsafe {
            (*self.slots[head].get()).fill(timestamp_ms, symbol, price, quantity);
        }
        self.head.store(next, Ordering::Release);
        true
    }

    /// Remove the oldest event, or `None` when the buffer is empty.
    ///
    /// The slot is reusable the moment this returns - the event is moved out,
    /// not borrowed.
    pub fn poll(&self) -> Option<Event> {
        let tail = self.tail.load(Ordering::Relaxed);
        if tail == self.head.load(Ordering::Acquire) {
            return None;
        }
        // SAFETY: `tail` is owned by this (single) consumer and `tail != head`,
        // so the producer has published this slot and cannot be writing it.
        let event = unsafe { std::mem::take(&mut *self.slots[tail].get()) };
        self.tail.store((tail + 1) % self.slots.len(), Ordering::Release);
        Some(event)
    }

    /// Number of events currently resident.
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        (head + self.slots.len() - tail) % self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_below_two_is_rejected() {
        assert!(matches!(
            BoundedEventQueue::with_capacity(0),
            Err(PipelineError::InvalidCapacity(0))
        ));
        assert!(matches!(
            BoundedEventQueue::with_capacity(1),
            Err(PipelineError::InvalidCapacity(1))
        ));
        assert!(BoundedEventQueue::with_capacity(2).is_ok());
    }

    #[test]
    fn full_at_capacity_minus_one_and_reopens_after_poll() {
        let queue = BoundedEventQueue::with_capacity(4).unwrap();
        for i in 0..3 {
            assert!(queue.offer(i, "ABC", 1.0, 1), "offer {i} should be admitted");
        }
        assert!(!queue.offer(3, "ABC", 1.0, 1), "buffer should be full");

        assert_eq!(queue.poll().unwrap().timestamp_ms, 0);
        assert!(queue.offer(3, "ABC", 1.0, 1), "one slot should have reopened");
    }

    #[test]
    fn wraparound_preserves_fifo_without_overwrite() {
        let queue = BoundedEventQueue::with_capacity(4).unwrap();
        // Travel several times past the physical bound, keeping the buffer
        // near-full the whole way.
        let mut next_in = 0u64;
        let mut next_out = 0u64;
        for _ in 0..3 {
            assert!(queue.offer(next_in, "ABC", 1.0, 1));
            next_in += 1;
        }
        for _ in 0..25 {
            assert!(!queue.offer(next_in, "ABC", 1.0, 1));
            let event = queue.poll().unwrap();
            assert_eq!(event.timestamp_ms, next_out);
            next_out += 1;
            assert!(queue.offer(next_in, "ABC", 1.0, 1));
            next_in += 1;
        }
        while let Some(event) = queue.poll() {
            assert_eq!(event.timestamp_ms, next_out);
            next_out += 1;
        }
        assert_eq!(next_out, next_in);
    }

    #[test]
    fn len_tracks_admissions_and_drains() {
        let queue = BoundedEventQueue::with_capacity(8).unwrap();
        assert!(queue.is_empty());
        for i in 0..5 {
            queue.offer(i, "ABC", 1.0, 1);
        }
        assert_eq!(queue.len(), 5);
        queue.poll();
        queue.poll();
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn spsc_handoff_across_threads_delivers_everything_in_order() {
        use std::sync::Arc;

        let queue = Arc::new(BoundedEventQueue::with_capacity(64).unwrap());
        let total = 10_000u64;

        let producer = {
            let queue = Arc::clone(&queue);
            std::thread::spawn(move || {
                let mut sent = 0u64;
                while sent < total {
                    if queue.offer(sent, "ABC", 1.0, 1) {
                        sent += 1;
                    } else {
                        std::thread::yield_now();
                    }
                }
            })
        };

        let mut expected = 0u64;
        while expected < total {
            match queue.poll() {
                Some(event) => {
                    assert_eq!(event.timestamp_ms, expected);
                    expected += 1;
                }
                None => std::thread::yield_now(),
            }
        }
        producer.join().unwrap();
    }
}
