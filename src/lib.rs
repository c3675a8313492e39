//! # pdfpyramid
//!
//! Multi-resolution tile pyramid generator for PDF drawings.
//!
//! A document of known physical size is rendered into square tiles at a
//! series of zoom levels, from a single overview tile down to native
//! resolution. Blank tiles are skipped, the rest are written as PNG and then
//! re-encoded as lossless WebP.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use pdfpyramid::{LogProgress, PdfiumRasterizer, PipelineOptions, RenderConfig, TilePipeline};
//! use pdfpyramid::{DistanceUnit, DocumentSpec, ReferenceSize};
//!
//! fn main() -> pdfpyramid::Result<()> {
//!     let source = Path::new("floorplan.pdf");
//!     let document = DocumentSpec::from_reference(
//!         842.0,
//!         595.0,
//!         2048,
//!         ReferenceSize::new(1.0, DistanceUnit::Meter),
//!         64.0,
//!         72.0,
//!     );
//!
//!     let rasterizer = PdfiumRasterizer::new(RenderConfig::new(source, document.tile_resolution))?;
//!     let pipeline = TilePipeline::new(Arc::new(rasterizer), PipelineOptions::default());
//!     let report = pipeline.run(source, &document, &LogProgress)?;
//!     println!("{} tiles written", report.outcome.stats.written());
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Deterministic planning**: level geometry depends only on the inputs
//! - **Bounded parallelism**: fixed worker pool over a shared job queue
//! - **Blank elision**: uniform background tiles are never written
//! - **Lossless compression**: WebP pass with an integrity check
//! - **Pluggable rendering**: any [`TileRasterizer`]; pdfium behind the `pdfium` feature

pub mod blank;
pub mod compress;
pub mod detect;
pub mod document;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod plan;
pub mod raster;
pub mod scheduler;
pub mod units;
pub mod validate;

// Re-export commonly used types
pub use blank::BlankTileDetector;
pub use compress::{CompressionReport, CompressionStage};
pub use detect::{detect_format_from_path, is_pdf, PdfFormat};
pub use document::{DocumentSpec, ReferenceSize};
pub use error::{Error, JobError, RenderErrorKind, Result};
pub use output::{OutputLayout, TileSink, TileWriter};
pub use pipeline::{PipelineOptions, PipelineReport, TilePipeline};
pub use plan::{PyramidOptions, PyramidPlan, TileCoordinate, ZoomLevel};
pub use raster::{JobResult, PixelBuffer, RasterizationJob, RenderConfig, TileRasterizer};
pub use scheduler::{
    CancellationToken, FailurePolicy, LogProgress, NoProgress, ProgressSink, ScheduleOutcome,
    SchedulerOptions, StatsSnapshot, WorkerScheduler,
};
pub use units::DistanceUnit;
pub use validate::{GeometryParams, InvocationParams, ValidatedGeometry, ValidatedParams};

#[cfg(feature = "pdfium")]
pub use raster::PdfiumRasterizer;

use std::path::Path;

/// Plan a pyramid from raw geometry parameters.
///
/// # Example
///
/// ```
/// use pdfpyramid::{plan_from_params, GeometryParams};
///
/// let params = GeometryParams {
///     width: "100".into(),
///     height: "100".into(),
///     reference_value: "1".into(),
///     unit: "meter".into(),
///     units_per_meter: "64".into(),
///     tile_resolution: Some("50".into()),
///     ..Default::default()
/// };
/// let plan = plan_from_params(&params).unwrap();
/// assert_eq!(plan.total_tiles(), 5);
/// ```
pub fn plan_from_params(params: &GeometryParams) -> Result<PyramidPlan> {
    let geometry = params.validate()?;
    Ok(PyramidPlan::new(&geometry.document, &geometry.pyramid))
}

/// Re-encode the `png` tiles of a document directory into its `webp` directory.
///
/// # Example
///
/// ```no_run
/// let report = pdfpyramid::compress_tiles("output/floorplan").unwrap();
/// println!("{:.2}% of the original size", report.ratio_percent());
/// ```
pub fn compress_tiles<P: AsRef<Path>>(base_dir: P) -> Result<CompressionReport> {
    let layout = OutputLayout::from_base(base_dir.as_ref());
    let png_dir = layout.png_dir();
    if !png_dir.is_dir() {
        return Err(Error::Validation(format!(
            "{} does not exist or is not a directory",
            png_dir.display()
        )));
    }
    CompressionStage::for_layout(&layout).compress(&png_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_plan_from_params_rejects_bad_unit() {
        let params = GeometryParams {
            width: "10".into(),
            height: "10".into(),
            reference_value: "1".into(),
            unit: "parsec".into(),
            units_per_meter: "1".into(),
            ..Default::default()
        };
        assert!(matches!(plan_from_params(&params), Err(Error::Validation(_))));
    }

    #[test]
    fn test_compress_tiles_requires_png_dir() {
        let tmp = tempdir().unwrap();
        let result = compress_tiles(tmp.path());
        assert!(matches!(result, Err(Error::Validation(_))));
        assert!(!tmp.path().join("webp").exists());
    }

    #[test]
    fn test_compress_tiles() {
        let tmp = tempdir().unwrap();
        let png = tmp.path().join("png");
        std::fs::create_dir(&png).unwrap();
        image::RgbaImage::new(4, 4).save(png.join("0_0_0.png")).unwrap();

        let report = compress_tiles(tmp.path()).unwrap();
        assert_eq!(report.file_count, 1);
        assert!(tmp.path().join("webp/0_0_0.webp").is_file());
    }
}
