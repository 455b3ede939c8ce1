use turnstile::sync::{Mutex, StaleGuard, deferred};
use turnstile::{RuntimeBuilder, task, yield_now};

use std::cell::RefCell;
use std::future::{Future, pending};
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};
use std::thread;
use std::time::Duration;

#[test]
fn block_on_returns_the_output() {
    let rt = RuntimeBuilder::new().build();

    let result = rt.block_on(async { 42 });
    assert_eq!(result, 42);
}

#[test]
fn custom_configuration_runs_many_tasks() {
    let rt = RuntimeBuilder::new()
        .queue_capacity(1)
        .event_interval(1)
        .build();

    let total = rt.block_on(async {
        let handles: Vec<_> = (0..100).map(|i| task::spawn(async move { i })).collect();

        let mut total = 0;
        for handle in handles {
            total += handle.await;
        }
        total
    });

    assert_eq!(total, 4950);
}

#[test]
#[should_panic(expected = "queue_capacity must be > 0")]
fn zero_queue_capacity_is_rejected() {
    let _ = RuntimeBuilder::new().queue_capacity(0);
}

#[test]
#[should_panic(expected = "event_interval must be > 0")]
fn zero_event_interval_is_rejected() {
    let _ = RuntimeBuilder::default().event_interval(0);
}

#[test]
#[should_panic(expected = "within the context of a runtime")]
fn spawn_outside_a_runtime_panics() {
    let _ = task::spawn(async {});
}

#[test]
fn tasks_spawned_before_block_on_run_inside_it() {
    let rt = RuntimeBuilder::new().build();
    let handle = rt.spawn(async { "background" });

    assert!(!handle.is_finished());
    assert_eq!(rt.block_on(handle), "background");
}

#[test]
fn tasks_start_in_spawn_order() {
    let rt = RuntimeBuilder::new().build();
    let order = Rc::new(RefCell::new(Vec::new()));

    let recorded = order.clone();
    rt.block_on(async move {
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let order = recorded.clone();
                task::spawn(async move { order.borrow_mut().push(i) })
            })
            .collect();

        for handle in handles {
            handle.await;
        }
    });

    assert_eq!(*order.borrow(), vec![0, 1, 2, 3]);
}

#[test]
fn yield_now_interleaves_tasks() {
    let rt = RuntimeBuilder::new().build();
    let order = Rc::new(RefCell::new(Vec::new()));

    let recorded = order.clone();
    rt.block_on(async move {
        let worker = |name: &'static str| {
            let order = recorded.clone();
            task::spawn(async move {
                for round in 0..2 {
                    order.borrow_mut().push(format!("{name}{round}"));
                    yield_now().await;
                }
            })
        };

        let a = worker("a");
        let b = worker("b");
        a.await;
        b.await;
    });

    assert_eq!(*order.borrow(), vec!["a0", "b0", "a1", "b1"]);
}

#[test]
fn tasks_can_spawn_tasks() {
    let rt = RuntimeBuilder::new().build();

    let result = rt.block_on(async {
        let outer = task::spawn(async {
            let inner = task::spawn(async { 21 });
            inner.await * 2
        });
        outer.await
    });

    assert_eq!(result, 42);
}

#[test]
fn deferred_settled_by_another_task() {
    let rt = RuntimeBuilder::new().build();

    let outcome = rt.block_on(async {
        let (resolver, signal) = deferred::<&str, ()>();

        task::spawn(async move {
            yield_now().await;
            resolver.resolve("ready");
        });

        signal.await
    });

    assert_eq!(outcome, Ok("ready"));
}

/// Completes once a helper thread has fired its waker.
struct RemoteWake {
    fired: Arc<AtomicBool>,
    started: bool,
}

impl Future for RemoteWake {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.fired.load(Ordering::Acquire) {
            return Poll::Ready(());
        }

        if !self.started {
            self.started = true;

            let fired = self.fired.clone();
            let waker = cx.waker().clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(10));
                fired.store(true, Ordering::Release);
                waker.wake();
            });
        }

        Poll::Pending
    }
}

#[test]
fn parked_loop_is_woken_from_another_thread() {
    let rt = RuntimeBuilder::new().build();

    rt.block_on(RemoteWake {
        fired: Arc::new(AtomicBool::new(false)),
        started: false,
    });
}

#[test]
fn dropping_the_runtime_releases_locks_held_by_unfinished_tasks() {
    let mutex = Rc::new(Mutex::new(0));

    {
        let rt = RuntimeBuilder::new().build();
        let shared = mutex.clone();

        rt.block_on(async move {
            let holder = shared.clone();
            task::spawn(async move {
                let _guard = holder.lock().await;
                pending::<()>().await;
            });

            yield_now().await;
            assert!(shared.is_locked());
        });

        assert!(mutex.is_locked());
    }

    assert!(!mutex.is_locked());
}

#[turnstile::test(queue_capacity = 2, event_interval = 1)]
async fn test_attribute_accepts_builder_options() {
    let handles: Vec<_> = (0..8).map(|i| task::spawn(async move { i * i })).collect();

    let mut squares = Vec::new();
    for handle in handles {
        squares.push(handle.await);
    }

    assert_eq!(squares, vec![0, 1, 4, 9, 16, 25, 36, 49]);
}

#[turnstile::test(event_interval = 2)]
async fn test_attribute_keeps_the_signature() -> Result<(), StaleGuard> {
    let mutex = Mutex::new(3);
    let guard = mutex.lock().await;

    guard.try_set(guard.try_get()? + 1)?;
    guard.try_unlock()?;

    assert_eq!(mutex.lock().await.try_get(), Ok(4));
    Ok(())
}
