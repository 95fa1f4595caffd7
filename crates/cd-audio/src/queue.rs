//! Bounded callout queue between the engine thread and the audio worker.
//!
//! Pushes never block: on overflow the oldest entry is dropped — a stale
//! callout is worse than a missing one.  The worker blocks on `pop_timeout`
//! for the first item and then `drain`s whatever else queued up during the
//! previous playback, which is what lets back-to-back callouts coalesce
//! into one "into" chain.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::Duration;

/// One queued utterance.
#[derive(Clone, Debug, PartialEq)]
pub struct Callout {
    pub text: String,
    pub priority: u8,
}

/// Fixed-capacity FIFO with drop-oldest overflow.
pub struct CalloutQueue {
    inner: Mutex<VecDeque<Callout>>,
    available: Condvar,
    capacity: usize,
}

impl CalloutQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            available: Condvar::new(),
            capacity,
        }
    }

    /// Enqueue without ever blocking the producer.
    pub fn push(&self, callout: Callout) {
        let mut queue = self.inner.lock().expect("callout queue poisoned");
        if queue.len() == self.capacity {
            queue.pop_front();
        }
        queue.push_back(callout);
        self.available.notify_one();
    }

    /// Blocking pop with a timeout; `None` when nothing arrived.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<Callout> {
        let queue = self.inner.lock().expect("callout queue poisoned");
        let (mut queue, _timed_out) = self
            .available
            .wait_timeout_while(queue, timeout, |q| q.is_empty())
            .expect("callout queue poisoned");
        queue.pop_front()
    }

    /// Take everything currently queued, without waiting.
    pub fn drain(&self) -> Vec<Callout> {
        let mut queue = self.inner.lock().expect("callout queue poisoned");
        queue.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("callout queue poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
