//! Unbounded MPMC FIFO with a blocking `dequeue`.
//!
//! Items live in a lock-free `SegQueue`. The mutex/condvar pair exists
//! only to park consumers while the queue is empty: producers push first,
//! then notify under the lock, so a consumer that saw the queue empty
//! under the same lock cannot miss the wakeup.

use std::sync::{Condvar, Mutex, PoisonError};

use crossbeam_queue::SegQueue;
use tracing::debug;

/// A queue entry: real work, or the signal for one worker to exit
#[derive(Debug, PartialEq, Eq)]
pub enum Job<T> {
    Work(T),
    Stop,
}

pub struct WorkQueue<T> {
    items: SegQueue<Job<T>>,
    lock: Mutex<()>,
    ready: Condvar,
}

impl<T> Default for WorkQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> WorkQueue<T> {
    pub fn new() -> Self {
        Self {
            items: SegQueue::new(),
            lock: Mutex::new(()),
            ready: Condvar::new(),
        }
    }

    /// Append `job` at the tail and wake one waiting consumer.
    /// Never blocks beyond the brief notify lock.
    pub fn enqueue(&self, job: Job<T>) {
        self.items.push(job);
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.ready.notify_one();
    }

    /// Remove and return the head, blocking while the queue is empty.
    ///
    /// Wakeups are only hints; emptiness is re-checked after each one.
    pub fn dequeue(&self) -> Job<T> {
        loop {
            if let Some(job) = self.items.pop() {
                return job;
            }
            let mut guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
            while self.items.is_empty() {
                debug!("queue empty, waiting");
                guard = self
                    .ready
                    .wait(guard)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        }
    }

    /// Non-blocking variant of `dequeue`
    pub fn try_dequeue(&self) -> Option<Job<T>> {
        self.items.pop()
    }

    /// Pending jobs, including `Stop`s
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================
