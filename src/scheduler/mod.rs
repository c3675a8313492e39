//! Bounded worker pool that drives one rasterization job per tile.
//!
//! The whole job list is built up front from the plan (ascending `z`,
//! row-major inside each level) and queued on a channel. A fixed set of
//! workers pull from the queue, so at most `concurrency` jobs run at any
//! instant and a freed worker picks up the next job right away. Each worker
//! sends a completion message back to the calling thread, which collects
//! failures and reports progress.
//!
//! # Example
//!
//! ```
//! use image::{Rgba, RgbaImage};
//! use pdfpyramid::scheduler::{NoProgress, SchedulerOptions, WorkerScheduler};
//! use pdfpyramid::{DocumentSpec, JobResult, PyramidOptions, PyramidPlan};
//!
//! let plan = PyramidPlan::new(&DocumentSpec::new(100.0, 100.0, 50, 1.0), &PyramidOptions::default());
//! let scheduler = WorkerScheduler::new(SchedulerOptions::new().with_concurrency(2));
//!
//! let outcome = scheduler.run(
//!     &plan,
//!     |job| {
//!         Ok(JobResult {
//!             coordinate: job.coordinate,
//!             pixels: RgbaImage::from_pixel(50, 50, Rgba([255, 255, 255, 255])),
//!             is_blank: true,
//!         })
//!     },
//!     &pdfpyramid::output::DiscardSink,
//!     &NoProgress,
//! )?;
//!
//! assert_eq!(outcome.stats.elided, 5);
//! # Ok::<(), pdfpyramid::Error>(())
//! ```

mod options;
mod progress;
mod stats;

pub use options::{host_parallelism, FailurePolicy, SchedulerOptions, FALLBACK_CONCURRENCY};
pub use progress::{progress_line, CancellationToken, LogProgress, NoProgress, ProgressSink};
pub use stats::{PipelineStats, StatsSnapshot};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};

use crate::error::{Error, JobError, Result};
use crate::output::TileSink;
use crate::plan::{PyramidPlan, TileCoordinate};
use crate::raster::{JobResult, RasterizationJob};

/// What a worker reports back after one job.
enum Completion {
    Finished,
    Failed(JobError),
    Fatal(TileCoordinate, Error),
}

/// Result of one scheduler run.
#[derive(Debug)]
pub struct ScheduleOutcome {
    /// Final counter values
    pub stats: StatsSnapshot,
    /// Tiles that failed to render, in completion order
    pub failures: Vec<JobError>,
    /// Whether the run stopped early on a cancellation request
    pub cancelled: bool,
    /// Wall-clock time of the run
    pub elapsed: Duration,
}

impl ScheduleOutcome {
    /// Every tile rendered and nothing was cancelled.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && !self.cancelled
    }
}

/// Runs rasterization jobs on a fixed-size worker pool.
pub struct WorkerScheduler {
    options: SchedulerOptions,
    stats: Arc<PipelineStats>,
    cancel: CancellationToken,
}

impl WorkerScheduler {
    /// Create a scheduler with its own cancellation token.
    pub fn new(options: SchedulerOptions) -> Self {
        Self {
            options,
            stats: Arc::new(PipelineStats::default()),
            cancel: CancellationToken::new(),
        }
    }

    /// Share an external cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Options in use.
    pub fn options(&self) -> &SchedulerOptions {
        &self.options
    }

    /// Live counters, for observers on other threads.
    pub fn stats(&self) -> Arc<PipelineStats> {
        Arc::clone(&self.stats)
    }

    /// Token that cancels this scheduler.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Visit every tile of `plan` exactly once.
    ///
    /// `job_fn` renders and classifies a tile; non-blank results go to
    /// `sink`. Render failures are collected, or end the run under
    /// [`FailurePolicy::Abort`]. Sink errors always end the run. Either way
    /// the call returns only after every in-flight job has finished.
    pub fn run<F, S>(
        &self,
        plan: &PyramidPlan,
        job_fn: F,
        sink: &S,
        progress: &dyn ProgressSink,
    ) -> Result<ScheduleOutcome>
    where
        F: Fn(&RasterizationJob) -> std::result::Result<JobResult, JobError> + Sync,
        S: TileSink + ?Sized,
    {
        let concurrency = self.options.concurrency;
        if concurrency == 0 {
            return Err(Error::Validation(
                "concurrency must be at least 1".to_string(),
            ));
        }

        let started = Instant::now();
        let total = plan.total_tiles();
        self.stats.reset(total);

        let job_rx = queue_jobs(plan)?;
        let workers = (concurrency as u64).min(total).max(1) as usize;
        log::info!("Working with {} threads on {} tiles", workers, total);

        let (done_tx, done_rx) = crossbeam_channel::unbounded::<Completion>();
        let halt = AtomicBool::new(false);
        let abort_on_failure = self.options.failure_policy == FailurePolicy::Abort;
        let cadence = self.options.progress_every.max(1);

        let mut failures = Vec::new();
        let mut fatal: Option<Error> = None;

        thread::scope(|scope| {
            for worker_id in 0..workers {
                let job_rx = job_rx.clone();
                let done_tx = done_tx.clone();
                let job_fn = &job_fn;
                let halt = &halt;

                let spawned = thread::Builder::new()
                    .name(format!("tile-worker-{}", worker_id))
                    .spawn_scoped(scope, move || {
                        self.worker_loop(job_rx, done_tx, job_fn, sink, halt)
                    });

                if let Err(e) = spawned {
                    halt.store(true, Ordering::Release);
                    fatal = Some(Error::Io(e));
                    break;
                }
            }
            // Only workers hold senders now; the loop below ends when they exit.
            drop(done_tx);
            drop(job_rx);

            let mut since_report = 0usize;
            for completion in done_rx.iter() {
                match completion {
                    Completion::Finished => {}
                    Completion::Failed(err) => {
                        log::warn!("{}", err);
                        if abort_on_failure {
                            halt.store(true, Ordering::Release);
                        }
                        failures.push(err);
                    }
                    Completion::Fatal(coordinate, err) => {
                        log::error!("Tile {}: {}", coordinate, err);
                        halt.store(true, Ordering::Release);
                        if fatal.is_none() {
                            fatal = Some(err);
                        }
                    }
                }

                since_report += 1;
                if since_report >= cadence {
                    progress.on_progress(&self.stats.snapshot());
                    since_report = 0;
                }
            }

            if since_report > 0 {
                progress.on_progress(&self.stats.snapshot());
            }
        });

        let stats = self.stats.snapshot();
        let elapsed = started.elapsed();
        progress.on_finish(&stats);
        log::info!("Whole process: {} ms", elapsed.as_millis());

        if let Some(err) = fatal {
            return Err(err);
        }
        if abort_on_failure && !failures.is_empty() {
            return Err(Error::Render(failures.swap_remove(0)));
        }

        let cancelled = !stats.is_complete() && self.cancel.is_cancelled();
        if cancelled {
            log::warn!(
                "Cancelled: {} of {} tiles processed",
                stats.processed(),
                stats.total
            );
        }

        Ok(ScheduleOutcome {
            stats,
            failures,
            cancelled,
            elapsed,
        })
    }

    fn worker_loop<F, S>(
        &self,
        jobs: Receiver<RasterizationJob>,
        done: Sender<Completion>,
        job_fn: &F,
        sink: &S,
        halt: &AtomicBool,
    ) where
        F: Fn(&RasterizationJob) -> std::result::Result<JobResult, JobError> + Sync,
        S: TileSink + ?Sized,
    {
        while let Ok(job) = jobs.recv() {
            // Checked after taking a job so that nothing starts once stopped.
            if halt.load(Ordering::Acquire) || self.cancel.is_cancelled() {
                break;
            }

            let completion = self.execute(&job, job_fn, sink);
            if done.send(completion).is_err() {
                break;
            }
        }
    }

    fn execute<F, S>(&self, job: &RasterizationJob, job_fn: &F, sink: &S) -> Completion
    where
        F: Fn(&RasterizationJob) -> std::result::Result<JobResult, JobError> + Sync,
        S: TileSink + ?Sized,
    {
        let coordinate = job.coordinate;
        let result = match job_fn(job) {
            Ok(result) => result,
            Err(err) => {
                self.stats.record_failed();
                return Completion::Failed(err);
            }
        };

        if result.is_blank {
            log::debug!("Tile {} is blank, skipped", coordinate);
            self.stats.record_elided();
            return Completion::Finished;
        }

        match sink.write(&coordinate, &result.pixels) {
            Ok(()) => {
                self.stats.record_written();
                Completion::Finished
            }
            Err(err) => Completion::Fatal(coordinate, err),
        }
    }
}

/// Build the full job list and queue it.
fn queue_jobs(plan: &PyramidPlan) -> Result<Receiver<RasterizationJob>> {
    let (tx, rx) = crossbeam_channel::unbounded();
    for coordinate in plan.coordinates() {
        let level = plan
            .level(coordinate.z)
            .copied()
            .ok_or_else(|| Error::Other(format!("No level {} in plan", coordinate.z)))?;
        tx.send(RasterizationJob::new(coordinate, level, plan.tile_resolution()))
            .map_err(|_| Error::Other("Job queue closed".to_string()))?;
    }
    Ok(rx)
}
