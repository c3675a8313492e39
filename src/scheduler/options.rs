//! Scheduler configuration.

/// Concurrency used when the host cannot report its parallelism.
pub const FALLBACK_CONCURRENCY: usize = 4;

/// Number of parallel execution units on this host.
pub fn host_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(FALLBACK_CONCURRENCY)
}

/// What to do when a tile fails to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Record the failure and keep going
    #[default]
    Continue,
    /// Stop admitting jobs after the first failure
    Abort,
}

/// Options for [`WorkerScheduler`](super::WorkerScheduler).
#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    /// Maximum number of jobs in flight
    pub concurrency: usize,

    /// Failure handling
    pub failure_policy: FailurePolicy,

    /// Report progress every N finished tiles (the last tile always reports)
    pub progress_every: usize,
}

impl SchedulerOptions {
    /// Create new scheduler options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the concurrency bound.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the failure policy.
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Stop at the first failed tile.
    pub fn abort_on_first_failure(mut self) -> Self {
        self.failure_policy = FailurePolicy::Abort;
        self
    }

    /// Set the progress cadence.
    pub fn with_progress_every(mut self, every: usize) -> Self {
        self.progress_every = every;
        self
    }
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            concurrency: host_parallelism(),
            failure_policy: FailurePolicy::Continue,
            progress_every: 1,
        }
    }
}
