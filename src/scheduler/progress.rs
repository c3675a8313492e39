//! Progress reporting and cooperative cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::stats::StatsSnapshot;

/// Receives progress updates from the scheduler.
///
/// Called from the thread that invoked `run`, never from a worker.
pub trait ProgressSink {
    /// A batch of tiles finished (cadence set by `progress_every`).
    fn on_progress(&self, stats: &StatsSnapshot);

    /// The run is over, successfully or not.
    fn on_finish(&self, _stats: &StatsSnapshot) {}
}

impl<F> ProgressSink for F
where
    F: Fn(&StatsSnapshot),
{
    fn on_progress(&self, stats: &StatsSnapshot) {
        self(stats)
    }
}

/// Logs progress lines at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn on_progress(&self, stats: &StatsSnapshot) {
        log::info!("{}", progress_line(stats));
    }

    fn on_finish(&self, stats: &StatsSnapshot) {
        log::info!(
            "Finished: {} tiles written, {} blank tiles skipped, {} failed",
            stats.written(),
            stats.elided,
            stats.failed
        );
    }
}

/// Discards progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&self, _stats: &StatsSnapshot) {}
}

/// `Processing tiles... 12 / 40 tiles... 30%`
pub fn progress_line(stats: &StatsSnapshot) -> String {
    format!(
        "Processing tiles... {} / {} tiles... {}%",
        stats.processed(),
        stats.total,
        stats.percent()
    )
}

/// Shared flag asking the scheduler to stop admitting jobs.
///
/// In-flight jobs always run to completion.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}
