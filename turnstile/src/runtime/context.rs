use crate::runtime::scheduler::Scheduler;

use std::cell::RefCell;
use std::rc::Rc;

thread_local! {
    /// Thread-local handle to the scheduler of the runtime currently
    /// driving this thread.
    ///
    /// This is set while a runtime runs `block_on` and allows
    /// [`task::spawn`](crate::task::spawn) to reach the scheduler without
    /// explicit parameter passing.
    pub(crate) static CURRENT_SCHEDULER: RefCell<Option<Rc<Scheduler>>> =
        const { RefCell::new(None) };
}

/// Restores the previous scheduler when dropped, including on unwind.
struct ContextGuard {
    previous: Option<Rc<Scheduler>>,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CURRENT_SCHEDULER.with(|cell| cell.replace(previous));
    }
}

/// Enters the runtime execution context for the current thread.
///
/// This function installs `scheduler` as the current scheduler for the
/// duration of the closure `f`. After the closure completes, or unwinds,
/// the previous context is restored, so runtimes may be nested.
pub(crate) fn enter_context<R>(scheduler: Rc<Scheduler>, f: impl FnOnce() -> R) -> R {
    let previous = CURRENT_SCHEDULER.with(|cell| cell.replace(Some(scheduler)));
    let _guard = ContextGuard { previous };

    f()
}

#[cfg(test)]
mod tests {
    use super::{CURRENT_SCHEDULER, enter_context};
    use crate::runtime::scheduler::Scheduler;

    use std::panic;
    use std::rc::Rc;

    fn installed() -> Option<Rc<Scheduler>> {
        CURRENT_SCHEDULER.with(|cell| cell.borrow().clone())
    }

    #[test]
    fn nested_contexts_restore_the_outer_one() {
        let outer = Rc::new(Scheduler::new(1));
        let inner = Rc::new(Scheduler::new(1));

        enter_context(outer.clone(), || {
            enter_context(inner.clone(), || {
                assert!(installed().is_some_and(|s| Rc::ptr_eq(&s, &inner)));
            });
            assert!(installed().is_some_and(|s| Rc::ptr_eq(&s, &outer)));
        });

        assert!(installed().is_none());
    }

    #[test]
    fn context_is_cleared_after_a_panic() {
        let scheduler = Rc::new(Scheduler::new(1));

        let result = panic::catch_unwind(panic::AssertUnwindSafe(|| {
            enter_context::<()>(scheduler, || panic!("boom"));
        }));

        assert!(result.is_err());
        assert!(installed().is_none());
    }
}
