//! Asynchronous task primitives.
//!
//! This module defines how the runtime represents, wakes and joins
//! spawned tasks.
//!
//! It includes:
//! - the task record kept in the scheduler's task table,
//! - custom waker integration with the ready queue,
//! - join handles for awaiting task completion.
//!
//! Most users will interact with this module through [`spawn`] and
//! [`JoinHandle`]; the lower-level components are used internally by the
//! scheduler.

pub(crate) mod handle;
pub(crate) mod waker;

pub(crate) mod core;

pub(crate) use self::core::{LocalFuture, Task};

pub use self::core::spawn;
pub use handle::JoinHandle;
