//! Rasterizer boundary.
//!
//! The pyramid core never renders pixels itself. It hands a
//! [`RasterizationJob`] to a [`TileRasterizer`] and gets back a pixel
//! buffer of exactly `tile_resolution x tile_resolution` pixels. Engines
//! that render whole levels can use [`extract_tile`] to cut the tile out and
//! pad edge tiles with the background color.

#[cfg(feature = "pdfium")]
mod pdfium;

#[cfg(feature = "pdfium")]
pub use pdfium::PdfiumRasterizer;

use std::path::PathBuf;

use image::{imageops, Rgba, RgbaImage};

use crate::error::JobError;
use crate::plan::{TileCoordinate, ZoomLevel};

/// Pixel buffer of one rendered tile.
pub type PixelBuffer = RgbaImage;

/// Everything an engine needs to know about the document.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Path to the source document
    pub document: PathBuf,
    /// Tile edge length in pixels
    pub tile_resolution: u32,
    /// Color used outside the document area
    pub background: Rgba<u8>,
    /// Directory to look for the rendering engine library in
    pub library_dir: Option<PathBuf>,
}

impl RenderConfig {
    /// Create a render config with a white background.
    pub fn new(document: impl Into<PathBuf>, tile_resolution: u32) -> Self {
        Self {
            document: document.into(),
            tile_resolution,
            background: Rgba([255, 255, 255, 255]),
            library_dir: None,
        }
    }

    /// Set the background color.
    pub fn with_background(mut self, background: Rgba<u8>) -> Self {
        self.background = background;
        self
    }

    /// Look for the engine library in a specific directory first.
    pub fn with_library_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.library_dir = Some(dir.into());
        self
    }
}

/// One tile to render, with its resolved level geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterizationJob {
    pub coordinate: TileCoordinate,
    pub level: ZoomLevel,
    pub tile_resolution: u32,
}

impl RasterizationJob {
    pub fn new(coordinate: TileCoordinate, level: ZoomLevel, tile_resolution: u32) -> Self {
        Self {
            coordinate,
            level,
            tile_resolution,
        }
    }

    /// Rendering scale relative to native resolution.
    pub fn scale(&self) -> f64 {
        self.level.scale
    }

    /// Whether the coordinate lies on its level's grid.
    pub fn in_range(&self) -> bool {
        self.coordinate.z == self.level.z && self.level.contains(self.coordinate.x, self.coordinate.y)
    }

    /// Part of the level image covered by this tile: `(x, y, width, height)`.
    ///
    /// Width or height is below `tile_resolution` on the last column or row,
    /// and zero when the tile lies entirely outside the document.
    pub fn source_rect(&self) -> (u32, u32, u32, u32) {
        let tile = self.tile_resolution;
        let x = self.coordinate.x.saturating_mul(tile);
        let y = self.coordinate.y.saturating_mul(tile);
        let width = self.level.width_px.saturating_sub(x).min(tile);
        let height = self.level.height_px.saturating_sub(y).min(tile);
        (x, y, width, height)
    }
}

/// A rendered tile and whether it can be elided.
#[derive(Debug, Clone)]
pub struct JobResult {
    pub coordinate: TileCoordinate,
    pub pixels: PixelBuffer,
    pub is_blank: bool,
}

/// Renders the pixel buffer of a single tile.
pub trait TileRasterizer: Send + Sync {
    /// Render one tile. The buffer is `tile_resolution` pixels square.
    fn render(&self, job: &RasterizationJob) -> Result<PixelBuffer, JobError>;

    /// Engine name for logs.
    fn name(&self) -> &str;
}

/// Cut a tile out of a full level image, padding with `background`.
pub fn extract_tile(level_image: &RgbaImage, job: &RasterizationJob, background: Rgba<u8>) -> RgbaImage {
    let tile = job.tile_resolution;
    let mut out = RgbaImage::from_pixel(tile, tile, background);

    let (x, y, width, height) = job.source_rect();
    let (image_width, image_height) = level_image.dimensions();
    let width = width.min(image_width.saturating_sub(x));
    let height = height.min(image_height.saturating_sub(y));
    if width == 0 || height == 0 {
        return out;
    }

    let region = imageops::crop_imm(level_image, x, y, width, height).to_image();
    imageops::replace(&mut out, &region, 0, 0);
    out
}
