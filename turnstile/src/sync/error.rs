use std::fmt;

use thiserror::Error;

/// The guard operation that was attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Reading the protected value.
    Get,
    /// Overwriting the protected value.
    Set,
    /// Borrowing the protected value mutably through a closure.
    Update,
    /// Releasing the lock.
    Unlock,
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Access::Get => "get",
            Access::Set => "set",
            Access::Update => "update",
            Access::Unlock => "unlock",
        };

        f.write_str(name)
    }
}

/// Use of a [`MutexGuard`](super::MutexGuard) that no longer holds its lock.
///
/// Raised by every value access and by any `unlock` after the guard's single
/// release, whether that release was explicit or forced by
/// [`Mutex::forced_unlock`](super::Mutex::forced_unlock). It signals a logic
/// error in the caller; retrying is never meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("stale mutex guard: cannot {access}, the guard is already unlocked")]
pub struct StaleGuard {
    access: Access,
}

impl StaleGuard {
    pub(crate) fn new(access: Access) -> Self {
        Self { access }
    }

    /// Returns the operation that was rejected.
    pub fn access(&self) -> Access {
        self.access
    }
}
