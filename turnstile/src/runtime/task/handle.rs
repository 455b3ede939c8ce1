use crate::sync::Deferred;

use std::convert::Infallible;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// A handle to a spawned task.
///
/// A `JoinHandle` allows awaiting the result of a task spawned onto
/// the runtime. It implements [`Future`] and resolves once the task
/// has completed.
///
/// Dropping the `JoinHandle` does **not** cancel the task; it only
/// discards the ability to observe its result. If the runtime is dropped
/// before the task completes, the handle never resolves.
pub struct JoinHandle<T> {
    /// Resolved by the task wrapper with the future's output.
    pub(crate) result: Deferred<T, Infallible>,
}

impl<T> JoinHandle<T> {
    /// Returns `true` once the task has produced its output.
    pub fn is_finished(&self) -> bool {
        self.result.is_settled()
    }
}

impl<T> Future for JoinHandle<T> {
    /// The output of the spawned task.
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        match Pin::new(&mut self.get_mut().result).poll(cx) {
            Poll::Ready(Ok(value)) => Poll::Ready(value),
            Poll::Ready(Err(never)) => match never {},
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<T> fmt::Debug for JoinHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoinHandle")
            .field("finished", &self.is_finished())
            .finish()
    }
}
