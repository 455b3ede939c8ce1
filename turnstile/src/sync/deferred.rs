use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

/// Creates a new unsettled deferred and the handle that settles it.
///
/// The [`Resolver`] is the externally exposed side: whoever holds it decides
/// when, and how, the paired [`Deferred`] completes. Settling consumes the
/// resolver, so a deferred can be settled at most once.
///
/// # Example
///
/// ```rust
/// use turnstile::sync::deferred;
///
/// let (resolver, signal) = deferred::<u32, ()>();
/// assert!(!signal.is_settled());
///
/// resolver.resolve(7);
/// assert!(signal.is_settled());
/// ```
pub fn deferred<T, E>() -> (Resolver<T, E>, Deferred<T, E>) {
    let slot = Rc::new(RefCell::new(Slot {
        state: State::Pending,
        waker: None,
    }));

    (Resolver { slot: slot.clone() }, Deferred { slot })
}

/// Lifecycle of the shared slot.
enum State<T, E> {
    /// Not settled yet.
    Pending,
    /// Settled, outcome not yet observed by the deferred.
    Settled(Result<T, E>),
    /// Outcome already handed out by `poll`.
    Taken,
}

struct Slot<T, E> {
    state: State<T, E>,
    /// Waker of the task awaiting the deferred, if any.
    waker: Option<Waker>,
}

impl<T, E> Slot<T, E> {
    fn is_settled(&self) -> bool {
        !matches!(self.state, State::Pending)
    }
}

/// The settling half of a [`deferred`] pair.
pub struct Resolver<T, E> {
    slot: Rc<RefCell<Slot<T, E>>>,
}

impl<T, E> Resolver<T, E> {
    /// Completes the paired deferred with `Ok(value)`.
    pub fn resolve(self, value: T) {
        self.settle(Ok(value));
    }

    /// Completes the paired deferred with `Err(error)`.
    pub fn reject(self, error: E) {
        self.settle(Err(error));
    }

    /// Returns `true` if the paired deferred has already been settled.
    ///
    /// Only ever `false` while this resolver is alive, kept for symmetry
    /// with [`Deferred::is_settled`].
    pub fn is_settled(&self) -> bool {
        self.slot.borrow().is_settled()
    }

    fn settle(self, outcome: Result<T, E>) {
        let waker = {
            let mut slot = self.slot.borrow_mut();
            slot.state = State::Settled(outcome);
            slot.waker.take()
        };

        // The borrow is released before waking: a waker may poll inline.
        if let Some(waker) = waker {
            waker.wake();
        }
    }
}

impl<T, E> fmt::Debug for Resolver<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("settled", &self.is_settled())
            .finish()
    }
}

/// A single-resolution future settled from the outside through its
/// [`Resolver`].
///
/// Resolves to `Ok(T)` or `Err(E)` depending on how it was settled. If the
/// resolver is dropped without settling, the deferred stays pending forever.
pub struct Deferred<T, E> {
    slot: Rc<RefCell<Slot<T, E>>>,
}

impl<T, E> Deferred<T, E> {
    /// Returns `true` once the deferred has been resolved or rejected.
    pub fn is_settled(&self) -> bool {
        self.slot.borrow().is_settled()
    }
}

impl<T, E> Future for Deferred<T, E> {
    type Output = Result<T, E>;

    /// Polls the deferred.
    ///
    /// If it has been settled the outcome is returned; otherwise the
    /// current waker replaces any previously registered one.
    ///
    /// # Panics
    ///
    /// Panics if polled again after returning `Poll::Ready`.
    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut slot = self.slot.borrow_mut();

        match std::mem::replace(&mut slot.state, State::Taken) {
            State::Settled(outcome) => Poll::Ready(outcome),
            State::Pending => {
                slot.state = State::Pending;
                slot.waker = Some(cx.waker().clone());
                Poll::Pending
            }
            State::Taken => panic!("`Deferred` polled after completion"),
        }
    }
}

impl<T, E> fmt::Debug for Deferred<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("settled", &self.is_settled())
            .finish()
    }
}
