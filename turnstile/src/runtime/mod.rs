//! Core runtime components.
//!
//! This module contains the single-threaded event loop that drives the
//! futures of this crate, including task execution, scheduling and
//! cooperative yielding.
//!
//! It is responsible for:
//! - executing asynchronous tasks on the calling thread,
//! - queueing woken tasks in wake order,
//! - providing the runtime context used by [`task::spawn`],
//! - enabling cooperative multitasking via yielding.

mod core;
mod scheduler;

pub(crate) mod builder;
pub(crate) mod context;
pub(crate) mod yield_now;

pub mod task;

pub use self::core::Runtime;
