//! Integration tests for the worker scheduler.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use image::{Rgba, RgbaImage};

use pdfpyramid::output::TileSink;
use pdfpyramid::scheduler::NoProgress;
use pdfpyramid::{
    CancellationToken, DocumentSpec, JobResult, PixelBuffer, PyramidOptions, PyramidPlan,
    RasterizationJob, Result, SchedulerOptions, StatsSnapshot, TileCoordinate, WorkerScheduler,
};

fn plan(width: f64, height: f64, tile: u32) -> PyramidPlan {
    PyramidPlan::new(
        &DocumentSpec::new(width, height, tile, 1.0),
        &PyramidOptions::default(),
    )
}

fn result(job: &RasterizationJob, is_blank: bool) -> JobResult {
    JobResult {
        coordinate: job.coordinate,
        pixels: RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 255])),
        is_blank,
    }
}

/// Records every coordinate handed to it.
#[derive(Default)]
struct RecordingSink {
    written: Mutex<Vec<TileCoordinate>>,
}

impl TileSink for RecordingSink {
    fn write(&self, coordinate: &TileCoordinate, _pixels: &PixelBuffer) -> Result<()> {
        self.written.lock().unwrap().push(*coordinate);
        Ok(())
    }
}

#[test]
fn test_concurrency_never_exceeds_limit() {
    for limit in [1usize, 2, 4] {
        let plan = plan(400.0, 300.0, 32);
        let in_flight = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        let scheduler = WorkerScheduler::new(SchedulerOptions::new().with_concurrency(limit));

        scheduler
            .run(
                &plan,
                |job| {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(1));
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok(result(job, true))
                },
                &RecordingSink::default(),
                &NoProgress,
            )
            .unwrap();

        let peak = peak.load(Ordering::SeqCst);
        assert!(peak >= 1 && peak <= limit, "peak {} over limit {}", peak, limit);
    }
}

#[test]
fn test_all_workers_are_busy_at_once() {
    for limit in [2usize, 4] {
        let plan = plan(400.0, 300.0, 32);
        assert!(plan.total_tiles() > limit as u64);
        let in_flight = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        let scheduler = WorkerScheduler::new(SchedulerOptions::new().with_concurrency(limit));

        scheduler
            .run(
                &plan,
                |job| {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    // Hold the slot until every worker has picked up a job.
                    let deadline = Instant::now() + Duration::from_secs(2);
                    while peak.load(Ordering::SeqCst) < limit && Instant::now() < deadline {
                        thread::sleep(Duration::from_millis(1));
                    }
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok(result(job, true))
                },
                &RecordingSink::default(),
                &NoProgress,
            )
            .unwrap();

        assert_eq!(peak.load(Ordering::SeqCst), limit);
    }
}

#[test]
fn test_slow_job_does_not_hold_back_other_workers() {
    const OVERTAKERS: usize = 3;

    let plan = plan(256.0, 256.0, 32);
    let (release_tx, release_rx) = crossbeam_channel::bounded::<()>(1);
    let slow_claimed = AtomicBool::new(false);
    let slow_blocked = AtomicBool::new(false);
    let released_by_others = AtomicBool::new(false);
    let done_while_blocked = AtomicUsize::new(0);
    let scheduler = WorkerScheduler::new(SchedulerOptions::new().with_concurrency(2));

    let outcome = scheduler
        .run(
            &plan,
            |job| {
                if !slow_claimed.swap(true, Ordering::SeqCst) {
                    slow_blocked.store(true, Ordering::SeqCst);
                    let released = release_rx.recv_timeout(Duration::from_secs(5)).is_ok();
                    released_by_others.store(released, Ordering::SeqCst);
                    slow_blocked.store(false, Ordering::SeqCst);
                } else if slow_blocked.load(Ordering::SeqCst) {
                    let done = done_while_blocked.fetch_add(1, Ordering::SeqCst) + 1;
                    if done == OVERTAKERS {
                        let _ = release_tx.try_send(());
                    }
                }
                Ok(result(job, true))
            },
            &RecordingSink::default(),
            &NoProgress,
        )
        .unwrap();

    assert!(released_by_others.load(Ordering::SeqCst));
    assert!(done_while_blocked.load(Ordering::SeqCst) >= OVERTAKERS);
    assert_eq!(outcome.stats.processed(), plan.total_tiles());
}

#[test]
fn test_only_non_blank_tiles_reach_the_sink() {
    let plan = plan(256.0, 128.0, 64);
    let sink = RecordingSink::default();
    let scheduler = WorkerScheduler::new(SchedulerOptions::new().with_concurrency(3));

    let outcome = scheduler
        .run(
            &plan,
            |job| Ok(result(job, job.coordinate.x % 2 == 1)),
            &sink,
            &NoProgress,
        )
        .unwrap();

    let written: HashSet<_> = sink.written.into_inner().unwrap().into_iter().collect();
    let expected: HashSet<_> = plan.coordinates().filter(|c| c.x % 2 == 0).collect();
    assert_eq!(written, expected);
    assert_eq!(outcome.stats.written(), expected.len() as u64);
    assert_eq!(
        outcome.stats.elided,
        plan.total_tiles() - expected.len() as u64
    );
}

#[test]
fn test_cancellation_lets_in_flight_jobs_finish() {
    let plan = plan(512.0, 512.0, 32);
    let token = CancellationToken::new();
    let started = AtomicUsize::new(0);
    let finished = AtomicUsize::new(0);
    let scheduler = WorkerScheduler::new(SchedulerOptions::new().with_concurrency(4))
        .with_cancellation(token.clone());

    let outcome = scheduler
        .run(
            &plan,
            |job| {
                if started.fetch_add(1, Ordering::SeqCst) == 10 {
                    token.cancel();
                }
                thread::sleep(Duration::from_millis(2));
                finished.fetch_add(1, Ordering::SeqCst);
                Ok(result(job, true))
            },
            &RecordingSink::default(),
            &NoProgress,
        )
        .unwrap();

    assert!(outcome.cancelled);
    assert!(!outcome.is_success());
    assert_eq!(
        started.load(Ordering::SeqCst),
        finished.load(Ordering::SeqCst)
    );
    assert_eq!(outcome.stats.processed(), finished.load(Ordering::SeqCst) as u64);
    assert!(outcome.stats.processed() < plan.total_tiles());
}

#[test]
fn test_progress_reaches_total() {
    let plan = plan(300.0, 300.0, 50);
    let last = Mutex::new(StatsSnapshot::default());
    let scheduler = WorkerScheduler::new(SchedulerOptions::new().with_concurrency(2));
    let sink = |s: &StatsSnapshot| *last.lock().unwrap() = *s;

    scheduler
        .run(&plan, |job| Ok(result(job, false)), &RecordingSink::default(), &sink)
        .unwrap();

    let last = *last.lock().unwrap();
    assert_eq!(last.processed(), plan.total_tiles());
    assert_eq!(last.percent(), 100);
}
