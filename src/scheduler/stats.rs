//! Run counters shared between workers and the progress reporter.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Monotonic tile counters for one run.
///
/// Workers bump these concurrently; readers only ever see a
/// [`StatsSnapshot`].
#[derive(Debug, Default)]
pub struct PipelineStats {
    total: AtomicU64,
    completed: AtomicU64,
    elided: AtomicU64,
    failed: AtomicU64,
}

impl PipelineStats {
    pub fn new(total: u64) -> Self {
        Self {
            total: AtomicU64::new(total),
            ..Self::default()
        }
    }

    /// Start a new run over `total` tiles.
    pub(crate) fn reset(&self, total: u64) {
        self.total.store(total, Ordering::SeqCst);
        self.completed.store(0, Ordering::SeqCst);
        self.elided.store(0, Ordering::SeqCst);
        self.failed.store(0, Ordering::SeqCst);
    }

    /// A tile was rendered and written.
    pub(crate) fn record_written(&self) {
        self.completed.fetch_add(1, Ordering::AcqRel);
    }

    /// A tile was rendered and found blank.
    pub(crate) fn record_elided(&self) {
        self.elided.fetch_add(1, Ordering::AcqRel);
        self.completed.fetch_add(1, Ordering::AcqRel);
    }

    /// A tile failed to render.
    pub(crate) fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::AcqRel);
    }

    /// Read the current counter values.
    pub fn snapshot(&self) -> StatsSnapshot {
        let completed = self.completed.load(Ordering::Acquire);
        StatsSnapshot {
            total: self.total.load(Ordering::Acquire),
            completed,
            // A reader can land between the two increments of `record_elided`.
            elided: self.elided.load(Ordering::Acquire).min(completed),
            failed: self.failed.load(Ordering::Acquire),
        }
    }
}

/// Point-in-time copy of [`PipelineStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Tiles in the whole plan
    pub total: u64,
    /// Tiles rendered successfully (written or elided)
    pub completed: u64,
    /// Completed tiles that were blank and not written
    pub elided: u64,
    /// Tiles whose rendering failed
    pub failed: u64,
}

impl StatsSnapshot {
    /// Tiles finished either way.
    pub fn processed(&self) -> u64 {
        self.completed + self.failed
    }

    /// Tiles persisted to disk.
    pub fn written(&self) -> u64 {
        self.completed.saturating_sub(self.elided)
    }

    /// Tiles not yet started or still in flight.
    pub fn remaining(&self) -> u64 {
        self.total.saturating_sub(self.processed())
    }

    /// Whole-number progress percentage, floored.
    pub fn percent(&self) -> u64 {
        if self.total == 0 {
            return 100;
        }
        100 * self.processed() / self.total
    }

    /// Whether every tile has been processed.
    pub fn is_complete(&self) -> bool {
        self.processed() >= self.total
    }
}
