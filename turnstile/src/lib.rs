//! # turnstile
//!
//! **turnstile** is a FIFO-fair asynchronous mutex for single-threaded,
//! cooperative async code, together with the small event loop that drives
//! it.
//!
//! Callers of [`Mutex::lock`](sync::Mutex::lock) take their place in line
//! at the moment of the call and are let through strictly in that order.
//! The guard handed to each caller is the only way to read, write and
//! release the protected value, and it turns stale after its single
//! release.
//!
//! The crate offers:
//!
//! - [`sync::Mutex`] and [`sync::MutexGuard`], with panicking and
//!   `try_*` (returning [`sync::StaleGuard`]) access methods
//! - [`sync::Deferred`], a single-resolution future settled from outside
//! - A **single-threaded runtime** ([`RuntimeBuilder`], [`task::spawn`],
//!   [`yield_now`]) that runs non-`Send` futures
//! - **Ergonomic macros** like `#[turnstile::main]`, `#[turnstile::test]`
//!   and `join!`
//!
//! ## Quick Start
//!
//! ```rust
//! use std::rc::Rc;
//! use turnstile::sync::Mutex;
//! use turnstile::{RuntimeBuilder, task};
//!
//! let runtime = RuntimeBuilder::new().build();
//!
//! let log = runtime.block_on(async {
//!     let log = Rc::new(Mutex::new(Vec::new()));
//!
//!     let handles: Vec<_> = (0..3)
//!         .map(|i| {
//!             let log = log.clone();
//!             task::spawn(async move {
//!                 log.with_lock(|entries| entries.push(i)).await;
//!             })
//!         })
//!         .collect();
//!
//!     for handle in handles {
//!         handle.await;
//!     }
//!
//!     log.lock().await.get()
//! });
//!
//! assert_eq!(log, vec![0, 1, 2]);
//! ```
//!
//! ## Modules
//!
//! - [`sync`] — The mutex, its guard and the deferred signal
//! - [`task`] — Spawning and joining tasks
//!
//! ## Logging
//!
//! Lock traffic is reported through [`tracing`] at `trace` level, runtime
//! lifecycle at `debug`, and forced unlocks at `warn`. No subscriber is
//! installed by the crate.

mod runtime;
mod utils;

pub mod sync;

pub use runtime::Runtime;
pub use runtime::builder::RuntimeBuilder;
pub use runtime::task;
pub use runtime::yield_now::yield_now;

pub use turnstile_macros::*;
