//! Synchronization primitives for turnstile.
//!
//! This module provides async-aware synchronization tools for the
//! single-threaded cooperative runtime:
//! - [`Mutex`] — an asynchronous mutual exclusion primitive with strict
//!   FIFO fairness among waiters,
//! - [`Deferred`] — a single-resolution future settled from the outside,
//!   which the mutex uses to signal each waiter's turn.
//!
//! ## Design notes
//!
//! - The primitives do not spawn tasks and never block the thread.
//! - Tasks that cannot immediately acquire a lock are suspended and woken
//!   when every earlier waiter has released.
//! - None of the types are `Sync`; share them between tasks with `Rc`.
//! - Guard misuse is reported as [`StaleGuard`]: the bare guard methods
//!   panic with it, the `try_*` methods return it.

mod deferred;
mod error;
mod mutex;

pub use deferred::{Deferred, Resolver, deferred};
pub use error::{Access, StaleGuard};
pub use mutex::{Lock, Mutex, MutexGuard};
