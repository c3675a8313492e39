//! Invocation parameter validation.
//!
//! Every check here runs before any directory is touched or any engine is
//! loaded. Numbers arrive as text so a malformed value is reported as a
//! validation failure with the offending field named.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::detect::detect_format_from_path;
use crate::document::{DocumentSpec, ReferenceSize, DEFAULT_REFERENCE_PIXELS, DEFAULT_TILE_RESOLUTION};
use crate::error::{Error, Result};
use crate::plan::{PyramidOptions, MAX_PYRAMID_LEVELS};
use crate::scheduler::host_parallelism;
use crate::units::DistanceUnit;

/// Largest native resolution accepted on either axis, in pixels.
pub const MAX_RENDER_DIMENSION: u32 = 1 << 20;

/// Largest tile edge length accepted, in pixels.
pub const MAX_TILE_RESOLUTION: u32 = 16_384;

/// Raw geometry parameters, as typed by the user.
#[derive(Debug, Clone, Default)]
pub struct GeometryParams {
    pub width: String,
    pub height: String,
    pub reference_value: String,
    pub unit: String,
    pub units_per_meter: String,
    pub tile_resolution: Option<String>,
    pub reference_pixels: Option<String>,
    pub max_levels: Option<String>,
}

/// Validated document geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ValidatedGeometry {
    pub document: DocumentSpec,
    pub reference: ReferenceSize,
    pub units_per_meter: f64,
    pub reference_pixels: f64,
    #[serde(skip)]
    pub pyramid: PyramidOptions,
}

impl GeometryParams {
    /// Check every field and derive the document description.
    pub fn validate(&self) -> Result<ValidatedGeometry> {
        let width = positive_number("width", &self.width)?;
        let height = positive_number("height", &self.height)?;
        let reference_value = positive_number("reference size", &self.reference_value)?;
        let unit: DistanceUnit = self.unit.parse()?;
        let units_per_meter = positive_number("units per meter", &self.units_per_meter)?;

        let tile_resolution = match &self.tile_resolution {
            Some(raw) => positive_integer("tile size", raw, MAX_TILE_RESOLUTION)?,
            None => DEFAULT_TILE_RESOLUTION,
        };
        let reference_pixels = match &self.reference_pixels {
            Some(raw) => positive_number("reference pixels", raw)?,
            None => DEFAULT_REFERENCE_PIXELS,
        };
        let mut pyramid = PyramidOptions::new();
        if let Some(raw) = &self.max_levels {
            pyramid = pyramid.with_max_levels(positive_integer("max levels", raw, MAX_PYRAMID_LEVELS)?);
        }

        let reference = ReferenceSize::new(reference_value, unit);
        let document = DocumentSpec::from_reference(
            width,
            height,
            tile_resolution,
            reference,
            reference_pixels,
            units_per_meter,
        );

        let (render_width, render_height) = document.render_size();
        if !render_width.is_finite()
            || !render_height.is_finite()
            || render_width > MAX_RENDER_DIMENSION as f64
            || render_height > MAX_RENDER_DIMENSION as f64
        {
            return Err(Error::Validation(format!(
                "native resolution {:.0}x{:.0} px exceeds the limit of {} px per side",
                render_width, render_height, MAX_RENDER_DIMENSION
            )));
        }

        Ok(ValidatedGeometry {
            document,
            reference,
            units_per_meter,
            reference_pixels,
            pyramid,
        })
    }
}

/// Raw parameters of a full generation run.
#[derive(Debug, Clone, Default)]
pub struct InvocationParams {
    pub document: PathBuf,
    pub geometry: GeometryParams,
    pub concurrency: Option<String>,
}

/// Parameters that passed validation.
#[derive(Debug, Clone)]
pub struct ValidatedParams {
    pub document: PathBuf,
    pub geometry: ValidatedGeometry,
    pub concurrency: usize,
}

impl InvocationParams {
    /// Validate geometry, concurrency and the input document.
    pub fn validate(&self) -> Result<ValidatedParams> {
        let geometry = self.geometry.validate()?;
        let concurrency = match &self.concurrency {
            Some(raw) => positive_integer("threads", raw, u32::MAX)? as usize,
            None => host_parallelism(),
        };
        check_document(&self.document)?;

        Ok(ValidatedParams {
            document: self.document.clone(),
            geometry,
            concurrency,
        })
    }
}

/// The input must be an existing, readable PDF file.
pub fn check_document(path: &Path) -> Result<()> {
    if !path.is_file() {
        return Err(Error::Validation(format!(
            "{} does not exist or is not a file",
            path.display()
        )));
    }
    let format = detect_format_from_path(path)?;
    log::debug!("{} detected as {}", path.display(), format);
    Ok(())
}

fn positive_number(field: &str, raw: &str) -> Result<f64> {
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() && value > 0.0 => Ok(value),
        _ => Err(Error::Validation(format!(
            "{} must be a positive number, got '{}'",
            field, raw
        ))),
    }
}

fn positive_integer(field: &str, raw: &str, max: u32) -> Result<u32> {
    match raw.trim().parse::<u32>() {
        Ok(value) if value >= 1 && value <= max => Ok(value),
        _ => Err(Error::Validation(format!(
            "{} must be a whole number between 1 and {}, got '{}'",
            field, max, raw
        ))),
    }
}
