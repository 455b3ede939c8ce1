//! Single-threaded task scheduler.
//!
//! This module contains the data structures the event loop works on:
//! - [`ready`]: the queue of woken runnables, which also lets the event
//!   loop park while nothing is runnable,
//! - the [`Scheduler`] itself, owning the table of spawned tasks.
//!
//! Tasks never migrate between threads, which is what allows the
//! synchronization primitives of this crate to rely on `Rc` and
//! `RefCell`.

mod ready;

pub(crate) use ready::{ReadyHandle, ReadyQueue, Runnable};

use crate::runtime::task::waker::{TaskWaker, make_waker};
use crate::runtime::task::{JoinHandle, LocalFuture, Task};
use crate::sync::deferred;
use crate::utils::Slab;

use std::cell::RefCell;
use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;
use std::task::{Context, Poll};

use tracing::trace;

/// Owner of every spawned task of one runtime.
pub(crate) struct Scheduler {
    /// Spawned tasks, indexed by the id carried in their wakers.
    tasks: RefCell<Slab<Task>>,

    /// Woken runnables awaiting a poll.
    ready: ReadyHandle,
}

impl Scheduler {
    /// Creates a scheduler whose task table and ready queue start with
    /// room for `capacity` entries.
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            tasks: RefCell::new(Slab::new(capacity)),
            ready: Arc::new(ReadyQueue::new(capacity)),
        }
    }

    /// Returns the shared ready queue.
    pub(crate) fn ready(&self) -> &ReadyHandle {
        &self.ready
    }

    /// Spawns `future` and returns a handle resolving to its output.
    pub(crate) fn spawn<F, T>(&self, future: F) -> JoinHandle<T>
    where
        F: Future<Output = T> + 'static,
        T: 'static,
    {
        let (resolver, result) = deferred::<T, Infallible>();

        self.submit(Box::pin(async move {
            resolver.resolve(future.await);
        }));

        JoinHandle { result }
    }

    /// Inserts a type-erased future into the task table and queues it for
    /// its first poll.
    fn submit(&self, future: LocalFuture) {
        let mut tasks = self.tasks.borrow_mut();

        let id = tasks.vacant_key();
        let waker = Arc::new(TaskWaker::new(Runnable::Task(id), self.ready.clone()));

        let inserted = tasks.insert(Task::new(future, waker.clone()));
        debug_assert_eq!(inserted, id);

        trace!(task = id, live = tasks.len(), "task spawned");

        waker.schedule();
    }

    /// Polls the task `id` once.
    ///
    /// Wakes for tasks that have already completed are ignored; a wake for
    /// an id that was reused by a newer task costs that task a spurious
    /// poll, which futures tolerate.
    pub(crate) fn run(&self, id: usize) {
        let (mut future, target) = {
            let mut tasks = self.tasks.borrow_mut();

            let Some(task) = tasks.get_mut(id) else {
                return;
            };
            let Some(future) = task.future.take() else {
                return;
            };

            (future, task.waker.clone())
        };

        target.unschedule();

        let waker = make_waker(target);
        let mut cx = Context::from_waker(&waker);

        match future.as_mut().poll(&mut cx) {
            Poll::Ready(()) => {
                let finished = self.tasks.borrow_mut().remove(id);
                drop(finished);

                trace!(task = id, "task completed");
            }
            Poll::Pending => {
                if let Some(task) = self.tasks.borrow_mut().get_mut(id) {
                    task.future = Some(future);
                }
            }
        }
    }

    /// Drops every task that has not completed yet and returns how many
    /// there were.
    pub(crate) fn shutdown(&self) -> usize {
        let unfinished = self.tasks.borrow_mut().drain();
        let count = unfinished.len();

        // Dropped outside the borrow: a task's destructor may release a
        // lock, and with it wake or spawn other tasks.
        drop(unfinished);

        count
    }
}
