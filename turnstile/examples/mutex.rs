//! Example: several tasks appending to a shared log, served in the order
//! they asked for the lock, followed by a forced unlock breaking a stuck
//! holder.

use turnstile::sync::Mutex;
use turnstile::{task, yield_now};

use std::rc::Rc;

#[turnstile::main(event_interval = 4)]
async fn main() {
    let log = Rc::new(Mutex::new(Vec::new()));

    let handles: Vec<_> = (0..5)
        .map(|i| {
            let log = log.clone();
            task::spawn(async move {
                let guard = log.lock().await;
                yield_now().await;
                guard.with_mut(|entries| entries.push(format!("writer {i}")));
            })
        })
        .collect();

    for handle in handles {
        handle.await;
    }

    println!("{:?}", log.lock().await.get());

    // A holder that never lets go stalls everyone queued behind it.
    let stuck = log.lock().await;
    let waiting = log.lock();
    println!("lockers before forced unlock: {}", log.lockers_count());

    log.forced_unlock();

    let late = waiting.await;
    println!(
        "stuck holder still has lock: {}, late waiter has lock: {}",
        stuck.has_lock(),
        late.has_lock()
    );
}
