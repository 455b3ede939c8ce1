use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// A future that yields execution back to the event loop exactly once.
struct YieldNow {
    yielded: bool,
}

impl Future for YieldNow {
    type Output = ();

    /// On the first poll, the task re-queues itself through its waker and
    /// returns `Poll::Pending`. On the second poll, the future completes.
    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.yielded {
            return Poll::Ready(());
        }

        self.yielded = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}

/// Yields execution back to the event loop.
///
/// Every task that was woken before this call gets polled before the
/// current task resumes. Since the runtime is cooperative, this is the
/// way for a long-running task to let others make progress.
///
/// # Examples
///
/// ```rust,ignore
/// async fn task() {
///     // Allow other tasks to run
///     turnstile::yield_now().await;
/// }
/// ```
pub async fn yield_now() {
    YieldNow { yielded: false }.await
}
