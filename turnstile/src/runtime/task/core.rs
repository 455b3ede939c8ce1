use super::JoinHandle;
use super::waker::TaskWaker;
use crate::runtime::context::CURRENT_SCHEDULER;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// A type-erased future owned by the scheduler.
pub(crate) type LocalFuture = Pin<Box<dyn Future<Output = ()>>>;

/// A spawned asynchronous task managed by the runtime.
///
/// A `Task` is the scheduler's record for one spawned future: the future
/// itself and the wake target its wakers point to. Output values travel
/// through the task's [`JoinHandle`], not through the task.
pub(crate) struct Task {
    /// The underlying future.
    ///
    /// `None` while the scheduler is polling it; the future is moved out of
    /// the task table for the duration of the poll so that the task can
    /// spawn further tasks.
    pub(crate) future: Option<LocalFuture>,

    /// Wake target used to build the waker passed to `poll`.
    pub(crate) waker: Arc<TaskWaker>,
}

impl Task {
    pub(crate) fn new(future: LocalFuture, waker: Arc<TaskWaker>) -> Self {
        Self {
            future: Some(future),
            waker,
        }
    }
}

/// Spawns a future as a task onto the current runtime.
///
/// The task is queued and first polled by the runtime's event loop after
/// the current task yields. The future does not need to be `Send`: every
/// task of a runtime runs on the thread that drives it.
///
/// # Panics
///
/// Panics if called outside the context of a running runtime.
///
/// # Examples
///
/// ```rust
/// use turnstile::{RuntimeBuilder, task};
///
/// let runtime = RuntimeBuilder::new().build();
///
/// let sum = runtime.block_on(async {
///     let handle = task::spawn(async { 20 + 22 });
///     handle.await
/// });
///
/// assert_eq!(sum, 42);
/// ```
pub fn spawn<F, T>(future: F) -> JoinHandle<T>
where
    F: Future<Output = T> + 'static,
    T: 'static,
{
    let scheduler = CURRENT_SCHEDULER.with(|cell| cell.borrow().clone());

    let Some(scheduler) = scheduler else {
        panic!("spawn must be called within the context of a runtime");
    };

    scheduler.spawn(future)
}
