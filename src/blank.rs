//! Blank tile detection.
//!
//! A tile is blank when every pixel matches the background color. Fully
//! transparent pixels count as background, since an untouched canvas is
//! transparent. The detector first probes a coarse grid, which finds content
//! on most non-blank tiles after a handful of samples, and only then scans
//! every pixel. Both passes stop at the first non-background pixel.

use image::{Rgba, RgbaImage};

/// Default coarse-grid stride in pixels.
pub const DEFAULT_SAMPLE_STRIDE: u32 = 16;

/// Decides whether a rendered tile can be skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlankTileDetector {
    /// Background color
    pub background: Rgba<u8>,
    /// Maximum per-channel difference still treated as background
    pub tolerance: u8,
    /// Coarse-grid stride (1 disables the coarse pass)
    pub sample_stride: u32,
}

impl Default for BlankTileDetector {
    fn default() -> Self {
        Self {
            background: Rgba([255, 255, 255, 255]),
            tolerance: 0,
            sample_stride: DEFAULT_SAMPLE_STRIDE,
        }
    }
}

impl BlankTileDetector {
    /// Exact-match detector for white backgrounds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the background color.
    pub fn with_background(mut self, background: Rgba<u8>) -> Self {
        self.background = background;
        self
    }

    /// Accept near-background pixels.
    pub fn with_tolerance(mut self, tolerance: u8) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set the coarse sampling stride.
    pub fn with_sample_stride(mut self, stride: u32) -> Self {
        self.sample_stride = stride.max(1);
        self
    }

    /// Whether a single pixel counts as background.
    #[inline]
    pub fn is_background(&self, pixel: &Rgba<u8>) -> bool {
        if pixel[3] == 0 {
            return true;
        }
        pixel
            .0
            .iter()
            .zip(self.background.0.iter())
            .all(|(&a, &b)| a.abs_diff(b) <= self.tolerance)
    }

    /// Whether the whole buffer is background.
    pub fn is_blank(&self, pixels: &RgbaImage) -> bool {
        let (width, height) = pixels.dimensions();
        let stride = self.sample_stride.max(1);

        if stride > 1 {
            for y in (0..height).step_by(stride as usize) {
                for x in (0..width).step_by(stride as usize) {
                    if !self.is_background(pixels.get_pixel(x, y)) {
                        return false;
                    }
                }
            }
        }

        pixels.pixels().all(|p| self.is_background(p))
    }
}
