//! Zoom pyramid planning.
//!
//! Planning is a pure function of the document size, the native rendering
//! resolution and the tile resolution. The finest level renders the document
//! at native resolution; every coarser level halves it, until the whole
//! document fits into a single tile. Levels are indexed coarsest first, so
//! `z = 0` is the overview and the last level is native resolution.
//!
//! # Example
//!
//! ```
//! use pdfpyramid::{DocumentSpec, PyramidOptions, PyramidPlan};
//!
//! let doc = DocumentSpec::new(100.0, 100.0, 50, 1.0);
//! let plan = PyramidPlan::new(&doc, &PyramidOptions::default());
//!
//! assert_eq!(plan.levels().len(), 2);
//! assert_eq!(plan.total_tiles(), 1 + 4);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::document::{to_pixels, DocumentSpec};

/// Hard ceiling on the number of levels, whatever the options say.
pub const MAX_PYRAMID_LEVELS: u32 = 32;

/// Options for pyramid planning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PyramidOptions {
    /// Keep at most this many of the finest levels (None = down to one tile)
    pub max_levels: Option<u32>,
}

impl PyramidOptions {
    /// Create new pyramid options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound the number of levels.
    pub fn with_max_levels(mut self, levels: u32) -> Self {
        self.max_levels = Some(levels);
        self
    }
}

/// One resolution step of the pyramid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomLevel {
    /// Level index, 0 = coarsest
    pub z: u32,
    /// Tile grid width
    pub columns: u32,
    /// Tile grid height
    pub rows: u32,
    /// Rendering scale relative to native resolution
    pub scale: f64,
    /// Document width at this level in pixels
    pub width_px: u32,
    /// Document height at this level in pixels
    pub height_px: u32,
}

impl ZoomLevel {
    /// Number of tiles on this level.
    pub fn tile_count(&self) -> u64 {
        self.columns as u64 * self.rows as u64
    }

    /// Whether `(x, y)` lies inside the grid.
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x < self.columns && y < self.rows
    }
}

/// Identifies one tile: level, column and row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoordinate {
    pub z: u32,
    pub x: u32,
    pub y: u32,
}

impl TileCoordinate {
    pub fn new(z: u32, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }

    /// Output file name, e.g. `2_0_1.png`.
    pub fn file_name(&self, extension: &str) -> String {
        format!("{}.{}", self, extension)
    }
}

impl fmt::Display for TileCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.z, self.x, self.y)
    }
}

/// Compute the zoom levels for a native render size.
///
/// `render_size` is the unrounded document size in native pixels.
pub fn plan_levels(
    render_size: (f64, f64),
    tile_resolution: u32,
    options: &PyramidOptions,
) -> Vec<ZoomLevel> {
    let tile = tile_resolution.max(1);
    let limit = options
        .max_levels
        .unwrap_or(MAX_PYRAMID_LEVELS)
        .clamp(1, MAX_PYRAMID_LEVELS);

    // Finest first, reversed below.
    let mut levels = Vec::new();
    let mut scale = 1.0_f64;
    loop {
        let width_px = to_pixels(render_size.0 * scale);
        let height_px = to_pixels(render_size.1 * scale);
        levels.push(ZoomLevel {
            z: 0,
            columns: width_px.div_ceil(tile).max(1),
            rows: height_px.div_ceil(tile).max(1),
            scale,
            width_px,
            height_px,
        });

        let fits_one_tile = width_px <= tile && height_px <= tile;
        if fits_one_tile || levels.len() as u32 >= limit {
            break;
        }
        scale /= 2.0;
    }

    levels.reverse();
    for (z, level) in levels.iter_mut().enumerate() {
        level.z = z as u32;
    }
    levels
}

/// The full, read-only tiling plan of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PyramidPlan {
    levels: Vec<ZoomLevel>,
    tile_resolution: u32,
}

impl PyramidPlan {
    /// Plan the pyramid for a document.
    pub fn new(document: &DocumentSpec, options: &PyramidOptions) -> Self {
        Self::from_levels(
            plan_levels(document.render_size(), document.tile_resolution, options),
            document.tile_resolution,
        )
    }

    /// Wrap precomputed levels.
    pub fn from_levels(levels: Vec<ZoomLevel>, tile_resolution: u32) -> Self {
        Self {
            levels,
            tile_resolution,
        }
    }

    /// Levels, coarsest first.
    pub fn levels(&self) -> &[ZoomLevel] {
        &self.levels
    }

    /// Level by index.
    pub fn level(&self, z: u32) -> Option<&ZoomLevel> {
        self.levels.get(z as usize)
    }

    /// The native-resolution level.
    pub fn finest(&self) -> Option<&ZoomLevel> {
        self.levels.last()
    }

    /// Tile edge length in pixels.
    pub fn tile_resolution(&self) -> u32 {
        self.tile_resolution
    }

    /// Sum of `columns * rows` over all levels.
    pub fn total_tiles(&self) -> u64 {
        self.levels.iter().map(ZoomLevel::tile_count).sum()
    }

    /// Whether the coordinate belongs to this plan.
    pub fn contains(&self, coordinate: &TileCoordinate) -> bool {
        self.level(coordinate.z)
            .is_some_and(|level| level.contains(coordinate.x, coordinate.y))
    }

    /// Every coordinate: ascending `z`, row-major inside a level.
    pub fn coordinates(&self) -> impl Iterator<Item = TileCoordinate> + '_ {
        self.levels.iter().flat_map(|level| {
            let z = level.z;
            let columns = level.columns;
            (0..level.rows)
                .flat_map(move |y| (0..columns).map(move |x| TileCoordinate::new(z, x, y)))
        })
    }
}
