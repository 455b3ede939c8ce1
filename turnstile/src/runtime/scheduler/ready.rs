use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, PoisonError};

/// Shared handle to the ready queue.
pub(crate) type ReadyHandle = Arc<ReadyQueue>;

/// Something the event loop can poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Runnable {
    /// The future passed to `Runtime::block_on`.
    Root,
    /// A spawned task, by its index in the task table.
    Task(usize),
}

/// Queue of runnables that have been woken and await a poll.
///
/// The event loop itself is single-threaded, but wakers are `Send + Sync`
/// and may fire from any thread. The queue is therefore guarded by a
/// standard mutex, and a condition variable lets the event loop park
/// while nothing is runnable.
pub(crate) struct ReadyQueue {
    /// Woken runnables, in wake order.
    queue: Mutex<VecDeque<Runnable>>,

    /// Signalled on every push.
    condvar: Condvar,
}

impl ReadyQueue {
    /// Creates an empty queue able to hold `capacity` entries without
    /// reallocating.
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            queue: Mutex::new(VecDeque::with_capacity(capacity)),
            condvar: Condvar::new(),
        }
    }

    /// Pushes a woken runnable and wakes the parked event loop.
    pub(crate) fn push(&self, runnable: Runnable) {
        self.lock().push_back(runnable);
        self.condvar.notify_one();
    }

    /// Takes the oldest woken runnable.
    pub(crate) fn pop(&self) -> Option<Runnable> {
        self.lock().pop_front()
    }

    /// Blocks the current thread until the queue is non-empty.
    ///
    /// Returns immediately if something is already queued.
    pub(crate) fn park(&self) {
        let queue = self.lock();

        let _queue = self
            .condvar
            .wait_while(queue, |queue| queue.is_empty())
            .unwrap_or_else(PoisonError::into_inner);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Runnable>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
