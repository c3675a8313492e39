//! End-to-end pyramid generation: plan, render, persist, compress.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::blank::BlankTileDetector;
use crate::compress::{CompressionReport, CompressionStage};
use crate::document::DocumentSpec;
use crate::error::{Error, Result};
use crate::output::{OutputLayout, TileWriter};
use crate::plan::{PyramidOptions, PyramidPlan};
use crate::raster::{JobResult, TileRasterizer};
use crate::scheduler::{
    host_parallelism, CancellationToken, ProgressSink, ScheduleOutcome, SchedulerOptions,
    WorkerScheduler,
};

/// Default directory that receives one sub-directory per document.
pub const DEFAULT_OUTPUT_ROOT: &str = "output";

/// Options for a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Directory that receives `{stem}/png` and `{stem}/webp`
    pub output_root: PathBuf,
    /// Level planning
    pub pyramid: PyramidOptions,
    /// Worker pool
    pub scheduler: SchedulerOptions,
    /// Blank tile classification
    pub detector: BlankTileDetector,
    /// Skip the WebP pass
    pub skip_compression: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from(DEFAULT_OUTPUT_ROOT),
            pyramid: PyramidOptions::default(),
            scheduler: SchedulerOptions::default(),
            detector: BlankTileDetector::default(),
            skip_compression: false,
        }
    }
}

impl PipelineOptions {
    /// Create new pipeline options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the output root directory.
    pub fn with_output_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.output_root = root.into();
        self
    }

    /// Set the pyramid options.
    pub fn with_pyramid(mut self, pyramid: PyramidOptions) -> Self {
        self.pyramid = pyramid;
        self
    }

    /// Set the scheduler options.
    pub fn with_scheduler(mut self, scheduler: SchedulerOptions) -> Self {
        self.scheduler = scheduler;
        self
    }

    /// Set the blank tile detector.
    pub fn with_detector(mut self, detector: BlankTileDetector) -> Self {
        self.detector = detector;
        self
    }

    /// Leave tiles as PNG only.
    pub fn skip_compression(mut self) -> Self {
        self.skip_compression = true;
        self
    }
}

/// Everything a finished run produced.
#[derive(Debug)]
pub struct PipelineReport {
    /// Where the tiles went
    pub layout: OutputLayout,
    /// The plan that was executed
    pub plan: PyramidPlan,
    /// Scheduler counters and failures
    pub outcome: ScheduleOutcome,
    /// WebP pass summary, unless skipped
    pub compression: Option<CompressionReport>,
}

impl PipelineReport {
    /// Turn collected tile failures into an error.
    pub fn into_result(self) -> Result<Self> {
        match self.outcome.failures.first() {
            Some(first) => Err(Error::TileFailures {
                count: self.outcome.failures.len(),
                first: first.clone(),
            }),
            None => Ok(self),
        }
    }
}

/// Drives one document through planning, rendering and compression.
pub struct TilePipeline {
    rasterizer: Arc<dyn TileRasterizer>,
    options: PipelineOptions,
    cancel: CancellationToken,
}

impl TilePipeline {
    /// Create a pipeline around a rasterizer.
    pub fn new(rasterizer: Arc<dyn TileRasterizer>, options: PipelineOptions) -> Self {
        Self {
            rasterizer,
            options,
            cancel: CancellationToken::new(),
        }
    }

    /// Share an external cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Options in use.
    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Token that cancels this pipeline.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// The plan a run over `document` would execute.
    pub fn plan(&self, document: &DocumentSpec) -> PyramidPlan {
        PyramidPlan::new(document, &self.options.pyramid)
    }

    /// Generate the pyramid of `source` described by `document`.
    ///
    /// The tile directory is reset before the first job starts. Render
    /// failures are collected in the report; cancellation and output
    /// errors end the run with an error.
    pub fn run(
        &self,
        source: &Path,
        document: &DocumentSpec,
        progress: &dyn ProgressSink,
    ) -> Result<PipelineReport> {
        let layout = OutputLayout::new(&self.options.output_root, source)?;
        let plan = self.plan(document);
        log_plan(document, &plan);

        let writer = TileWriter::prepare(layout.png_dir())?;
        log::info!(
            "Rendering {} with {} into {}",
            source.display(),
            self.rasterizer.name(),
            writer.dir().display()
        );

        let scheduler = WorkerScheduler::new(self.options.scheduler.clone())
            .with_cancellation(self.cancel.clone());
        let detector = &self.options.detector;
        let rasterizer = &self.rasterizer;

        let outcome = scheduler.run(
            &plan,
            |job| {
                let pixels = rasterizer.render(job)?;
                let is_blank = detector.is_blank(&pixels);
                Ok(JobResult {
                    coordinate: job.coordinate,
                    pixels,
                    is_blank,
                })
            },
            &writer,
            progress,
        )?;

        if outcome.cancelled {
            return Err(Error::Cancelled {
                completed: outcome.stats.processed(),
                total: outcome.stats.total,
            });
        }

        let compression = if self.options.skip_compression {
            log::info!("Skipping WEBP conversion");
            None
        } else {
            Some(CompressionStage::for_layout(&layout).compress(&layout.png_dir())?)
        };

        Ok(PipelineReport {
            layout,
            plan,
            outcome,
            compression,
        })
    }
}

fn log_plan(document: &DocumentSpec, plan: &PyramidPlan) {
    let (width, height) = document.render_resolution();
    log::info!("Host has {} CPU threads", host_parallelism());
    log::info!(
        "Space resolution: {:.4} px per unit, native size {}x{} px",
        document.pixels_per_unit,
        width,
        height
    );
    for level in plan.levels() {
        log::info!(
            "Level {}: {}x{} tiles, {}x{} px, scale {}",
            level.z,
            level.columns,
            level.rows,
            level.width_px,
            level.height_px,
            level.scale
        );
    }
    log::info!("{} tiles to process", plan.total_tiles());
}
