use super::deferred::{Deferred, Resolver, deferred};
use super::error::{Access, StaleGuard};
use crate::utils::Slab;

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use tracing::{trace, warn};

/// Number of waiter slots allocated up front by [`Mutex::new`].
const INITIAL_WAITERS: usize = 4;

/// Where a guard is in its lifecycle.
///
/// `Queued -> Holding -> Released`, or straight to `Released` on a forced
/// unlock. `Released` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GuardState {
    Queued,
    Holding,
    Released,
}

/// Rejection delivered to waiters that were still queued when
/// [`Mutex::forced_unlock`] ran.
#[derive(Debug)]
struct ForcedRelease;

/// One outstanding `lock()` call.
struct Entry {
    /// Shared with the guard so that a forced unlock is visible to it.
    state: Rc<Cell<GuardState>>,

    /// Completes the waiter's `Lock` future. Taken once granted.
    grant: Option<Resolver<(), ForcedRelease>>,
}

/// Wait queue and release registry.
struct Waiters {
    /// Tokens in call order. The front is the current holder.
    queue: VecDeque<usize>,

    /// Every outstanding guard, keyed by token.
    registry: Slab<Entry>,
}

impl Waiters {
    /// Marks the queue head as holding and returns its grant, if the head
    /// has not been granted yet.
    fn grant_head(&mut self) -> Option<Resolver<(), ForcedRelease>> {
        let token = *self.queue.front()?;
        let entry = self.registry.get_mut(token)?;

        entry.state.set(GuardState::Holding);
        entry.grant.take()
    }
}

/// An asynchronous, FIFO-fair mutex for a single-threaded cooperative
/// executor.
///
/// Every call to [`lock`](Self::lock) takes a place in the wait queue at
/// the moment of the call, not when the returned future is first polled.
/// Guards are handed out strictly in that order: for two calls A then B,
/// B's future cannot complete until A's guard has been released.
///
/// The mutex is not `Sync`; share it between tasks of the same runtime with
/// an `Rc`.
///
/// # Example
///
/// ```rust
/// use turnstile::RuntimeBuilder;
/// use turnstile::sync::Mutex;
///
/// let runtime = RuntimeBuilder::new().build();
///
/// runtime.block_on(async {
///     let mutex = Mutex::new("x");
///
///     let guard = mutex.lock().await;
///     guard.set("y");
///     guard.unlock();
///
///     assert_eq!(mutex.lock().await.get(), "y");
/// });
/// ```
pub struct Mutex<V> {
    /// The protected value.
    ///
    /// Only reachable through a guard in the `Holding` state, or through
    /// `&mut self`.
    value: RefCell<V>,

    waiters: RefCell<Waiters>,
}

impl<V> Mutex<V> {
    /// Creates a new, unlocked mutex wrapping the given value.
    pub fn new(value: V) -> Mutex<V> {
        Self {
            value: RefCell::new(value),
            waiters: RefCell::new(Waiters {
                queue: VecDeque::with_capacity(INITIAL_WAITERS),
                registry: Slab::new(INITIAL_WAITERS),
            }),
        }
    }

    /// Takes a place in the wait queue and returns a future resolving to
    /// the guard once every earlier caller has released.
    ///
    /// The place is reserved synchronously by this call. If the mutex is
    /// free the returned future is ready on its first poll.
    ///
    /// Dropping the future before it completes gives the place up again.
    /// Holding on to it without ever awaiting it, on the other hand, stalls
    /// every later caller.
    pub fn lock(&self) -> Lock<'_, V> {
        let state = Rc::new(Cell::new(GuardState::Queued));
        let (resolver, grant) = deferred();

        let (token, granted) = {
            let mut waiters = self.waiters.borrow_mut();

            let token = waiters.registry.insert(Entry {
                state: state.clone(),
                grant: Some(resolver),
            });
            waiters.queue.push_back(token);

            let granted = if waiters.queue.len() == 1 {
                waiters.grant_head()
            } else {
                None
            };

            trace!(token, lockers = waiters.registry.len(), "lock requested");

            (token, granted)
        };

        if let Some(granted) = granted {
            granted.resolve(());
        }

        Lock {
            guard: Some(MutexGuard {
                mutex: self,
                token,
                state,
            }),
            grant,
        }
    }

    /// Acquires the mutex only if nobody holds it or waits for it.
    pub fn try_lock(&self) -> Option<MutexGuard<'_, V>> {
        if self.is_locked() {
            return None;
        }

        self.lock().guard.take()
    }

    /// Awaits the lock, runs `f` on the protected value and releases.
    ///
    /// The guard is released when this future completes, and also if `f`
    /// panics or the future is dropped while waiting.
    ///
    /// # Panics
    ///
    /// Panics if the guard was force-released before `f` could run.
    pub async fn with_lock<R>(&self, f: impl FnOnce(&mut V) -> R) -> R {
        let guard = self.lock().await;
        guard.with_mut(f)
    }

    /// Releases every outstanding guard at once, holding or queued.
    ///
    /// This breaks mutual exclusion: a guard that believed it had exclusive
    /// access may overlap with callers that lock afterwards. It exists to
    /// break deadlocks and is never part of the normal protocol.
    ///
    /// Afterwards [`lockers_count`](Self::lockers_count) is 0, every guard
    /// reports `has_lock() == false`, and pending [`Lock`] futures complete
    /// with an already released guard. The order in which the guards are
    /// released is unspecified.
    pub fn forced_unlock(&self) {
        let entries = {
            let mut waiters = self.waiters.borrow_mut();
            waiters.queue.clear();
            waiters.registry.drain()
        };

        if entries.is_empty() {
            return;
        }

        warn!(released = entries.len(), "forced unlock of every outstanding guard");

        // Rejecting a grant may run a waiter inline, so the whole batch is
        // marked released before the first rejection.
        for entry in &entries {
            entry.state.set(GuardState::Released);
        }

        for grant in entries.into_iter().filter_map(|entry| entry.grant) {
            grant.reject(ForcedRelease);
        }
    }

    /// Number of `lock()` calls not yet matched by a release.
    pub fn lockers_count(&self) -> usize {
        self.waiters.borrow().registry.len()
    }

    /// Returns `true` while at least one guard is outstanding.
    pub fn is_locked(&self) -> bool {
        !self.waiters.borrow().registry.is_empty()
    }

    /// Returns a mutable reference to the value.
    ///
    /// The exclusive borrow guarantees that no guard is alive.
    pub fn get_mut(&mut self) -> &mut V {
        self.value.get_mut()
    }

    /// Consumes the mutex, returning the value.
    pub fn into_inner(self) -> V {
        self.value.into_inner()
    }

    /// Removes `token` from the registry and the queue, granting the next
    /// waiter if `token` was at the head.
    ///
    /// Nothing happens if the slot behind `token` is no longer owned by
    /// `state`, as after a forced unlock handed the slot to a new caller.
    fn release(&self, token: usize, state: &Rc<Cell<GuardState>>) {
        let next = {
            let mut waiters = self.waiters.borrow_mut();

            let owned = waiters
                .registry
                .get_mut(token)
                .is_some_and(|entry| Rc::ptr_eq(&entry.state, state));
            if !owned {
                return;
            }
            waiters.registry.remove(token);

            let position = waiters.queue.iter().position(|&t| t == token);
            if let Some(position) = position {
                waiters.queue.remove(position);
            }

            trace!(token, lockers = waiters.registry.len(), "lock released");

            if position == Some(0) {
                waiters.grant_head()
            } else {
                None
            }
        };

        if let Some(next) = next {
            next.resolve(());
        }
    }
}

impl<V: Default> Default for Mutex<V> {
    fn default() -> Self {
        Self::new(V::default())
    }
}

impl<V> From<V> for Mutex<V> {
    fn from(value: V) -> Self {
        Self::new(value)
    }
}

impl<V> fmt::Debug for Mutex<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mutex")
            .field("lockers", &self.lockers_count())
            .finish_non_exhaustive()
    }
}

/// Future returned by [`Mutex::lock`].
///
/// Resolves to the guard once every earlier waiter has released, or
/// immediately after a [`Mutex::forced_unlock`] (the guard is then already
/// released).
#[must_use = "an un-awaited `Lock` keeps its place in the queue until dropped"]
pub struct Lock<'a, V> {
    /// The guard issued by `lock()`, handed out on completion.
    guard: Option<MutexGuard<'a, V>>,

    /// Settled when this waiter reaches the head of the queue.
    grant: Deferred<(), ForcedRelease>,
}

impl<'a, V> Future for Lock<'a, V> {
    type Output = MutexGuard<'a, V>;

    /// Polls the grant signal.
    ///
    /// # Panics
    ///
    /// Panics if polled again after returning the guard.
    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        let Some(guard) = this.guard.take() else {
            panic!("`Lock` polled after completion");
        };

        match Pin::new(&mut this.grant).poll(cx) {
            Poll::Pending => {
                this.guard = Some(guard);
                Poll::Pending
            }
            Poll::Ready(Ok(())) => Poll::Ready(guard),
            Poll::Ready(Err(ForcedRelease)) => {
                trace!(token = guard.token, "lock completed after forced unlock");
                Poll::Ready(guard)
            }
        }
    }
}

impl<V> fmt::Debug for Lock<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lock")
            .field("guard", &self.guard)
            .field("granted", &self.grant.is_settled())
            .finish()
    }
}

/// Capability to access the value of a [`Mutex`] and to release it once.
///
/// Obtained by awaiting [`Mutex::lock`]. The lock is released by
/// [`unlock`](Self::unlock) or, if that never happened, when the guard is
/// dropped. After the release every access fails: the bare methods panic
/// and the `try_*` methods return [`StaleGuard`].
pub struct MutexGuard<'a, V> {
    mutex: &'a Mutex<V>,

    /// Key in the mutex's release registry.
    token: usize,

    state: Rc<Cell<GuardState>>,
}

impl<V> MutexGuard<'_, V> {
    /// Returns `true` until the guard has been released.
    pub fn has_lock(&self) -> bool {
        self.state.get() != GuardState::Released
    }

    /// Returns a copy of the protected value.
    ///
    /// # Panics
    ///
    /// Panics if the guard has been released.
    pub fn get(&self) -> V
    where
        V: Clone,
    {
        self.try_get().unwrap_or_else(|err| panic!("{err}"))
    }

    /// Overwrites the protected value.
    ///
    /// # Panics
    ///
    /// Panics if the guard has been released.
    pub fn set(&self, value: V) {
        self.try_set(value).unwrap_or_else(|err| panic!("{err}"))
    }

    /// Overwrites the protected value, returning the previous one.
    ///
    /// # Panics
    ///
    /// Panics if the guard has been released.
    pub fn replace(&self, value: V) -> V {
        self.try_replace(value).unwrap_or_else(|err| panic!("{err}"))
    }

    /// Runs `f` with a mutable borrow of the protected value.
    ///
    /// # Panics
    ///
    /// Panics if the guard has been released, or if `f` accesses the value
    /// again through this guard.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut V) -> R) -> R {
        self.try_with_mut(f).unwrap_or_else(|err| panic!("{err}"))
    }

    /// Releases the lock and lets the next waiter in.
    ///
    /// # Panics
    ///
    /// Panics if the guard has already been released.
    pub fn unlock(&self) {
        self.try_unlock().unwrap_or_else(|err| panic!("{err}"))
    }

    /// Fallible [`get`](Self::get).
    ///
    /// Only a released guard is reported as an error.
    ///
    /// # Panics
    ///
    /// Panics if called from inside [`with_mut`](Self::with_mut) or
    /// [`try_with_mut`](Self::try_with_mut) on the same mutex, while the
    /// value is mutably borrowed. The same holds for every `try_*` accessor.
    pub fn try_get(&self) -> Result<V, StaleGuard>
    where
        V: Clone,
    {
        self.authorize(Access::Get)?;
        Ok(self.mutex.value.borrow().clone())
    }

    /// Fallible [`set`](Self::set).
    pub fn try_set(&self, value: V) -> Result<(), StaleGuard> {
        self.try_replace(value).map(drop)
    }

    /// Fallible [`replace`](Self::replace).
    ///
    /// # Panics
    ///
    /// Panics if called from inside [`with_mut`](Self::with_mut) on the
    /// same mutex.
    pub fn try_replace(&self, value: V) -> Result<V, StaleGuard> {
        self.authorize(Access::Set)?;
        Ok(self.mutex.value.replace(value))
    }

    /// Fallible [`with_mut`](Self::with_mut).
    ///
    /// # Panics
    ///
    /// Panics if `f` reaches the value again through this guard, with any
    /// accessor including the `try_*` ones.
    pub fn try_with_mut<R>(&self, f: impl FnOnce(&mut V) -> R) -> Result<R, StaleGuard> {
        self.authorize(Access::Update)?;

        let mut value = self.mutex.value.borrow_mut();
        Ok(f(&mut *value))
    }

    /// Fallible [`unlock`](Self::unlock).
    ///
    /// The first call succeeds; every later call returns an error.
    pub fn try_unlock(&self) -> Result<(), StaleGuard> {
        if !self.has_lock() {
            return Err(StaleGuard::new(Access::Unlock));
        }

        self.state.set(GuardState::Released);
        self.mutex.release(self.token, &self.state);

        Ok(())
    }

    /// Only a guard at the head of the queue may touch the value.
    fn authorize(&self, access: Access) -> Result<(), StaleGuard> {
        match self.state.get() {
            GuardState::Holding => Ok(()),
            GuardState::Queued | GuardState::Released => Err(StaleGuard::new(access)),
        }
    }
}

impl<V> Drop for MutexGuard<'_, V> {
    /// Releases the lock if it has not been released yet.
    fn drop(&mut self) {
        if self.has_lock() {
            let _ = self.try_unlock();
        }
    }
}

impl<V> fmt::Debug for MutexGuard<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutexGuard")
            .field("token", &self.token)
            .field("state", &self.state.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{GuardState, Lock, Mutex};

    use std::cell::{Cell, RefCell};
    use std::future::Future;
    use std::pin::pin;
    use std::rc::Rc;
    use std::sync::Arc;
    use std::task::{Context, Poll, Wake, Waker};

    thread_local! {
        static ON_WAKE: RefCell<Option<Box<dyn FnOnce()>>> = const { RefCell::new(None) };
    }

    /// Waker that runs the installed `ON_WAKE` hook inline, like an
    /// executor polling the woken task on the spot.
    struct InlineWaker;

    impl Wake for InlineWaker {
        fn wake(self: Arc<Self>) {
            let hook = ON_WAKE.with(|hook| hook.borrow_mut().take());
            if let Some(hook) = hook {
                hook();
            }
        }
    }

    #[test]
    fn lock_registers_before_first_poll() {
        let mutex = Mutex::new(0);

        let first = mutex.lock();
        let second = mutex.lock();

        assert_eq!(mutex.lockers_count(), 2);
        assert_eq!(mutex.waiters.borrow().queue.len(), 2);

        drop(first);
        drop(second);
        assert!(!mutex.is_locked());
    }

    #[test]
    fn queued_guard_is_not_authorized() {
        let mutex = Mutex::new(1);
        let mut cx = Context::from_waker(Waker::noop());

        let _holder = mutex.lock();
        let mut queued = pin!(mutex.lock());

        assert!(queued.as_mut().poll(&mut cx).is_pending());

        let guard = queued.guard.as_ref().map(|g| g.state.get());
        assert_eq!(guard, Some(GuardState::Queued));
        assert!(queued.guard.as_ref().is_some_and(|g| g.try_get().is_err()));
    }

    #[test]
    fn release_grants_next_in_line() {
        let mutex = Mutex::new(());
        let mut cx = Context::from_waker(Waker::noop());

        let mut first = pin!(mutex.lock());
        let mut second = pin!(mutex.lock());

        let Poll::Ready(guard) = first.as_mut().poll(&mut cx) else {
            panic!("free mutex must be granted immediately");
        };
        assert!(second.as_mut().poll(&mut cx).is_pending());

        guard.unlock();

        let Poll::Ready(next) = second.as_mut().poll(&mut cx) else {
            panic!("release must grant the next waiter");
        };
        assert!(next.has_lock());
        assert_eq!(mutex.lockers_count(), 1);
    }

    #[test]
    fn dropping_a_queued_lock_gives_up_its_place() {
        let mutex = Mutex::new(());
        let mut cx = Context::from_waker(Waker::noop());

        let holder = mutex.lock();
        let abandoned = mutex.lock();
        let mut last = pin!(mutex.lock());

        drop(abandoned);
        assert_eq!(mutex.lockers_count(), 2);

        drop(holder);
        assert!(last.as_mut().poll(&mut cx).is_ready());
    }

    #[test]
    fn try_lock_respects_waiters() {
        let mutex = Mutex::new(5);

        let guard = mutex.try_lock();
        assert!(guard.is_some());
        assert!(mutex.try_lock().is_none());

        drop(guard);
        assert_eq!(mutex.try_lock().map(|g| g.get()), Some(5));
    }

    #[test]
    fn exclusive_access_without_guards() {
        let mut mutex = Mutex::new(vec![1]);
        mutex.get_mut().push(2);

        assert_eq!(mutex.into_inner(), vec![1, 2]);
    }

    #[test]
    fn forced_unlock_marks_every_guard_before_waking() {
        let mutex: &'static Mutex<()> = Box::leak(Box::new(Mutex::new(())));
        let waker = Waker::from(Arc::new(InlineWaker));
        let mut cx = Context::from_waker(&waker);

        let holder = mutex.lock();
        let mut queued = Box::pin(mutex.lock());
        assert!(queued.as_mut().poll(&mut cx).is_pending());
        let late = mutex.lock();

        let fresh: Rc<RefCell<Vec<Lock<'static, ()>>>> = Rc::default();
        let seen = Rc::new(Cell::new(None));
        {
            let fresh = fresh.clone();
            let seen = seen.clone();
            let hook = move || {
                seen.set(late.guard.as_ref().map(|g| g.state.get()));
                fresh.borrow_mut().extend((0..3).map(|_| mutex.lock()));
                drop(late);
            };
            ON_WAKE.with(|slot| *slot.borrow_mut() = Some(Box::new(hook)));
        }

        mutex.forced_unlock();

        assert_eq!(seen.get(), Some(GuardState::Released));
        assert_eq!(mutex.lockers_count(), 3);

        drop(holder);
        drop(queued);
        assert_eq!(mutex.lockers_count(), 3);

        fresh.borrow_mut().clear();
        assert!(!mutex.is_locked());
    }

    #[test]
    fn release_of_a_reused_slot_is_ignored() {
        let mutex = Mutex::new(());

        let stale = mutex.try_lock();
        mutex.forced_unlock();

        let current = mutex.try_lock();
        let (Some(stale), Some(current)) = (stale, current) else {
            panic!("an idle mutex must be granted immediately");
        };
        assert_eq!(stale.token, current.token);

        stale.state.set(GuardState::Holding);
        drop(stale);

        assert_eq!(mutex.lockers_count(), 1);
        assert!(current.has_lock());
    }

    #[test]
    #[should_panic(expected = "borrowed")]
    fn accessor_inside_with_mut_panics() {
        let mutex = Mutex::new(1);
        let Some(guard) = mutex.try_lock() else {
            panic!("an idle mutex must be granted immediately");
        };

        let _ = guard.try_with_mut(|_| guard.try_get());
    }
}
