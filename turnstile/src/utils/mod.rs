//! Utilities for memory-efficient data structures.
//!
//! This module provides low-level utilities used internally by the crate.
//! In particular, it exposes a [`Slab`] used for fast indexed storage with
//! reuse of freed slots, both by the executor's task table and by the
//! mutex's release registry.

mod slab;

pub(crate) use slab::Slab;
