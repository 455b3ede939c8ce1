use crate::runtime::context::enter_context;
use crate::runtime::scheduler::{Runnable, Scheduler};
use crate::runtime::task::JoinHandle;
use crate::runtime::task::waker::{TaskWaker, make_waker};

use std::fmt;
use std::future::Future;
use std::pin::pin;
use std::rc::Rc;
use std::sync::Arc;
use std::task::{Context, Poll};

use tracing::debug;

/// The main runtime handle.
///
/// `Runtime` is a single-threaded, cooperative event loop. It is
/// responsible for:
/// - spawning asynchronous tasks,
/// - driving the `block_on` future and every spawned task on the
///   calling thread,
/// - parking the thread while nothing is runnable.
///
/// Futures run by a `Runtime` do not need to be `Send`. Dropping the
/// runtime drops every task that has not completed.
pub struct Runtime {
    /// Task table and ready queue, shared with the thread-local context.
    scheduler: Rc<Scheduler>,

    /// Spawned tasks polled between two polls of the `block_on` future.
    event_interval: usize,
}

impl Runtime {
    /// Creates a new runtime instance.
    ///
    /// # Arguments
    ///
    /// * `queue_capacity` - Initial capacity of the task table.
    /// * `event_interval` - Spawned tasks polled per turn of the loop.
    pub(crate) fn new(queue_capacity: usize, event_interval: usize) -> Self {
        debug!(queue_capacity, event_interval, "runtime started");

        Self {
            scheduler: Rc::new(Scheduler::new(queue_capacity)),
            event_interval,
        }
    }

    /// Spawns a future onto the runtime.
    ///
    /// The future starts running the next time the runtime is driven by
    /// [`block_on`](Self::block_on).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use turnstile::RuntimeBuilder;
    ///
    /// let runtime = RuntimeBuilder::new().build();
    /// let handle = runtime.spawn(async { "background" });
    ///
    /// assert_eq!(runtime.block_on(handle), "background");
    /// ```
    pub fn spawn<F, T>(&self, future: F) -> JoinHandle<T>
    where
        F: Future<Output = T> + 'static,
        T: 'static,
    {
        self.scheduler.spawn(future)
    }

    /// Runs a future to completion on the current thread.
    ///
    /// This method is typically used as the synchronous entry point
    /// of the runtime (e.g. in `main` or tests). Spawned tasks make
    /// progress while the future is pending; when nothing is runnable
    /// the thread parks until a waker fires.
    ///
    /// A future that waits on something no task or thread will ever
    /// wake, such as a lock whose holder never releases, blocks forever.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use turnstile::RuntimeBuilder;
    ///
    /// let runtime = RuntimeBuilder::new().build();
    /// let result = runtime.block_on(async { 42 });
    ///
    /// assert_eq!(result, 42);
    /// ```
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        enter_context(self.scheduler.clone(), || self.run(future))
    }

    /// The event loop.
    fn run<F: Future>(&self, future: F) -> F::Output {
        let ready = self.scheduler.ready().clone();
        let root = Arc::new(TaskWaker::new(Runnable::Root, ready.clone()));
        let waker = make_waker(root.clone());
        let mut cx = Context::from_waker(&waker);

        let mut future = pin!(future);
        let mut poll_root = true;

        loop {
            if poll_root {
                root.unschedule();

                if let Poll::Ready(output) = future.as_mut().poll(&mut cx) {
                    return output;
                }
            }

            poll_root = false;
            let mut budget = self.event_interval;

            while budget > 0 {
                match ready.pop() {
                    Some(Runnable::Root) => {
                        poll_root = true;
                        break;
                    }
                    Some(Runnable::Task(id)) => {
                        self.scheduler.run(id);
                        budget -= 1;
                    }
                    None => break,
                }
            }

            // Out of budget: go around again without parking.
            if poll_root || budget == 0 {
                continue;
            }

            ready.park();
        }
    }
}

impl Drop for Runtime {
    /// Shuts down the runtime, dropping every unfinished task.
    ///
    /// Destructors of those tasks run inside the runtime context, so that
    /// whatever they release can still reach the scheduler.
    fn drop(&mut self) {
        let dropped = enter_context(self.scheduler.clone(), || self.scheduler.shutdown());

        debug!(dropped, "runtime shut down");
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("event_interval", &self.event_interval)
            .finish_non_exhaustive()
    }
}
