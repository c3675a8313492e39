//! Physical document description and rendering resolution.

use serde::{Deserialize, Serialize};

use crate::units::DistanceUnit;

/// Pixel span given to the reference size at the native level.
pub const DEFAULT_REFERENCE_PIXELS: f64 = 64.0;

/// Default edge length of a square tile, in pixels.
pub const DEFAULT_TILE_RESOLUTION: u32 = 2048;

/// A real-world length used to pin the pixel scale.
///
/// At the native (finest) level, a length of `value` `unit`s covers
/// `reference_pixels` pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferenceSize {
    pub value: f64,
    pub unit: DistanceUnit,
}

impl ReferenceSize {
    pub fn new(value: f64, unit: DistanceUnit) -> Self {
        Self { value, unit }
    }

    /// The reference length in meters.
    pub fn meters(&self) -> f64 {
        self.value * self.unit.meters()
    }

    /// Pixels per meter when this reference spans `reference_pixels`.
    pub fn pixels_per_meter(&self, reference_pixels: f64) -> f64 {
        reference_pixels / self.meters()
    }
}

/// Immutable description of the source document.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DocumentSpec {
    /// Width in document units
    pub width: f64,
    /// Height in document units
    pub height: f64,
    /// Edge length of a square tile in pixels
    pub tile_resolution: u32,
    /// Native pixels per document unit
    pub pixels_per_unit: f64,
}

impl DocumentSpec {
    /// Create a document spec with an explicit pixel scale.
    pub fn new(width: f64, height: f64, tile_resolution: u32, pixels_per_unit: f64) -> Self {
        Self {
            width,
            height,
            tile_resolution,
            pixels_per_unit,
        }
    }

    /// Derive the pixel scale from a real-world reference size.
    ///
    /// `units_per_meter` is the number of document units in one meter.
    pub fn from_reference(
        width: f64,
        height: f64,
        tile_resolution: u32,
        reference: ReferenceSize,
        reference_pixels: f64,
        units_per_meter: f64,
    ) -> Self {
        let pixels_per_unit = reference.pixels_per_meter(reference_pixels) / units_per_meter;
        Self::new(width, height, tile_resolution, pixels_per_unit)
    }

    /// Unrounded native resolution in pixels.
    pub fn render_size(&self) -> (f64, f64) {
        (
            self.width * self.pixels_per_unit,
            self.height * self.pixels_per_unit,
        )
    }

    /// Native resolution in whole pixels (rounded up, never zero).
    pub fn render_resolution(&self) -> (u32, u32) {
        let (w, h) = self.render_size();
        (to_pixels(w), to_pixels(h))
    }
}

/// Round a pixel length up to a whole, non-zero pixel count.
pub(crate) fn to_pixels(value: f64) -> u32 {
    if !value.is_finite() || value <= 1.0 {
        return 1;
    }
    value.ceil().min(u32::MAX as f64) as u32
}
