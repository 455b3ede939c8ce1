use crate::runtime::scheduler::{ReadyHandle, Runnable};

use std::mem;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{RawWaker, RawWakerVTable, Waker};

/// Wake target shared by every waker of one runnable.
///
/// Waking pushes the runnable onto the ready queue, at most once between
/// two polls.
pub(crate) struct TaskWaker {
    /// What to poll when woken.
    runnable: Runnable,

    /// Queue of the owning runtime.
    ready: ReadyHandle,

    /// Set while the runnable sits in the ready queue.
    scheduled: AtomicBool,
}

impl TaskWaker {
    pub(crate) fn new(runnable: Runnable, ready: ReadyHandle) -> Self {
        Self {
            runnable,
            ready,
            scheduled: AtomicBool::new(false),
        }
    }

    /// Queues the runnable unless it is already queued.
    pub(crate) fn schedule(&self) {
        if !self.scheduled.swap(true, Ordering::AcqRel) {
            self.ready.push(self.runnable);
        }
    }

    /// Clears the queued flag right before the runnable is polled, so that
    /// a wake during the poll queues it again.
    pub(crate) fn unschedule(&self) {
        self.scheduled.store(false, Ordering::Release);
    }
}

/// The vtable shared by every runtime waker.
///
/// # Safety
///
/// All functions in the vtable must uphold the invariants required
/// by [`RawWaker`], in particular:
/// - reference counts must be correctly managed,
/// - the data pointer must come from `Arc::<TaskWaker>::into_raw`.
static VTABLE: RawWakerVTable = RawWakerVTable::new(clone_raw, wake_raw, wake_by_ref_raw, drop_raw);

/// Creates a [`Waker`] that schedules `target` when woken.
pub(crate) fn make_waker(target: Arc<TaskWaker>) -> Waker {
    // SAFETY: the pointer comes from `Arc::into_raw` and every vtable
    // function balances the reference count it was handed.
    unsafe { Waker::from_raw(RawWaker::new(Arc::into_raw(target).cast(), &VTABLE)) }
}

/// Clones the raw waker by bumping the reference count.
fn clone_raw(ptr: *const ()) -> RawWaker {
    let arc = unsafe { Arc::<TaskWaker>::from_raw(ptr.cast()) };
    let cloned = arc.clone();
    mem::forget(arc);

    RawWaker::new(Arc::into_raw(cloned).cast(), &VTABLE)
}

/// Wakes and consumes the waker.
fn wake_raw(ptr: *const ()) {
    let arc = unsafe { Arc::<TaskWaker>::from_raw(ptr.cast()) };
    arc.schedule();
}

/// Wakes without consuming the waker.
fn wake_by_ref_raw(ptr: *const ()) {
    let arc = unsafe { Arc::<TaskWaker>::from_raw(ptr.cast()) };
    arc.schedule();
    mem::forget(arc);
}

/// Drops the raw waker, releasing one reference.
fn drop_raw(ptr: *const ()) {
    unsafe { drop(Arc::<TaskWaker>::from_raw(ptr.cast())) };
}
