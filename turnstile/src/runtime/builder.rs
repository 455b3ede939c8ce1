use super::Runtime;

/// Initial capacity of the task table and ready queue.
const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Spawned tasks polled between two polls of the `block_on` future.
const DEFAULT_EVENT_INTERVAL: usize = 32;

/// Builder for configuring and creating a runtime.
///
/// `RuntimeBuilder` allows customizing runtime parameters before
/// constructing the runtime.
///
/// # Examples
///
/// ```rust
/// use turnstile::RuntimeBuilder;
///
/// let runtime = RuntimeBuilder::new()
///     .queue_capacity(16)
///     .event_interval(8)
///     .build();
///
/// assert_eq!(runtime.block_on(async { 1 + 1 }), 2);
/// ```
#[derive(Debug, Clone)]
pub struct RuntimeBuilder {
    /// Number of task slots allocated up front.
    queue_capacity: usize,

    /// Maximum number of spawned tasks polled before the `block_on`
    /// future gets another chance to run.
    event_interval: usize,
}

impl RuntimeBuilder {
    /// Creates a new `RuntimeBuilder` with default configuration.
    pub fn new() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            event_interval: DEFAULT_EVENT_INTERVAL,
        }
    }

    /// Sets how many tasks the runtime can hold before its task table
    /// has to grow.
    ///
    /// # Panics
    ///
    /// Panics if `n == 0`.
    pub fn queue_capacity(mut self, n: usize) -> Self {
        assert!(n > 0, "queue_capacity must be > 0");

        self.queue_capacity = n;
        self
    }

    /// Sets how many spawned tasks may be polled in a row while the
    /// `block_on` future is ready to make progress.
    ///
    /// # Panics
    ///
    /// Panics if `n == 0`.
    pub fn event_interval(mut self, n: usize) -> Self {
        assert!(n > 0, "event_interval must be > 0");

        self.event_interval = n;
        self
    }

    /// Builds the runtime with the configured options.
    pub fn build(self) -> Runtime {
        Runtime::new(self.queue_capacity, self.event_interval)
    }
}

impl Default for RuntimeBuilder {
    /// Creates a default `RuntimeBuilder`.
    fn default() -> Self {
        Self::new()
    }
}
