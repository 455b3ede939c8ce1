use turnstile::sync::Mutex;
use turnstile::{RuntimeBuilder, join, yield_now};

use std::cell::RefCell;
use std::rc::Rc;

#[test]
fn test_join_single_future() {
    let rt = RuntimeBuilder::new().build();

    let result = rt.block_on(async {
        let a = join!(async { 42 });
        a
    });

    assert_eq!(result, 42);
}

#[test]
fn test_join_two_futures() {
    let rt = RuntimeBuilder::new().build();

    let result = rt.block_on(async {
        let (a, b) = join!(async { 10 }, async { 20 });
        (a, b)
    });

    assert_eq!(result, (10, 20));
}

#[turnstile::test]
async fn test_join_three_futures() {
    let (a, b, c) = join!(async { "hello" }, async { 42 }, async { true });

    assert_eq!((a, b, c), ("hello", 42, true));
}

#[turnstile::test]
async fn test_join_with_trailing_comma() {
    let (a, b) = join!(async { 1 }, async { 2 },);

    assert_eq!(a + b, 3);
}

#[turnstile::test]
async fn test_join_with_paths_and_calls() {
    let (a, b) = join!(std::future::ready(1), std::future::ready::<&str>("two"));

    assert_eq!((a, b), (1, "two"));
}

#[turnstile::test]
async fn test_join_polls_concurrently() {
    let order = Rc::new(RefCell::new(Vec::new()));

    let step = |name: &'static str| {
        let order = order.clone();
        async move {
            order.borrow_mut().push(format!("{name}:start"));
            yield_now().await;
            order.borrow_mut().push(format!("{name}:end"));
        }
    };

    join!(step("a"), step("b"));

    assert_eq!(*order.borrow(), vec!["a:start", "b:start", "a:end", "b:end"]);
}

#[turnstile::test]
async fn test_join_contending_for_a_mutex() {
    let mutex = &Mutex::new(0);

    let bump = || async move {
        let guard = mutex.lock().await;
        let seen = guard.get();
        yield_now().await;
        guard.set(seen + 1);
    };

    join!(bump(), bump(), bump());

    assert_eq!(mutex.lock().await.get(), 3);
}
