//! Output layout and tile persistence.
//!
//! Tiles land in `{root}/{document stem}/png/{z}_{x}_{y}.png`; the compressed
//! copies go next to them in `.../webp/{z}_{x}_{y}.webp`.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::ImageFormat;

use crate::error::{Error, Result};
use crate::plan::TileCoordinate;
use crate::raster::PixelBuffer;

/// Extension of rasterized tiles.
pub const PNG_EXTENSION: &str = "png";

/// Extension of compressed tiles.
pub const WEBP_EXTENSION: &str = "webp";

/// Directory layout of one document's pyramid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    base: PathBuf,
}

impl OutputLayout {
    /// Layout for `document` under `root`, keyed by the file stem.
    pub fn new(root: impl AsRef<Path>, document: impl AsRef<Path>) -> Result<Self> {
        let document = document.as_ref();
        let stem = document
            .file_stem()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                Error::Validation(format!(
                    "Cannot derive an output name from {}",
                    document.display()
                ))
            })?;
        Ok(Self {
            base: root.as_ref().join(stem),
        })
    }

    /// Layout rooted at an existing document directory.
    pub fn from_base(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// `{root}/{stem}`
    pub fn base_dir(&self) -> &Path {
        &self.base
    }

    /// `{root}/{stem}/png`
    pub fn png_dir(&self) -> PathBuf {
        self.base.join(PNG_EXTENSION)
    }

    /// `{root}/{stem}/webp`
    pub fn webp_dir(&self) -> PathBuf {
        self.base.join(WEBP_EXTENSION)
    }

    /// Path of a rasterized tile.
    pub fn png_path(&self, coordinate: &TileCoordinate) -> PathBuf {
        self.png_dir().join(coordinate.file_name(PNG_EXTENSION))
    }

    /// Path of a compressed tile.
    pub fn webp_path(&self, coordinate: &TileCoordinate) -> PathBuf {
        self.webp_dir().join(coordinate.file_name(WEBP_EXTENSION))
    }
}

/// Destination for non-blank tiles. Called concurrently from workers.
pub trait TileSink: Sync {
    /// Persist one tile. Errors are fatal to the run.
    fn write(&self, coordinate: &TileCoordinate, pixels: &PixelBuffer) -> Result<()>;
}

/// Sink that drops every tile. Handy for dry runs and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardSink;

impl TileSink for DiscardSink {
    fn write(&self, _coordinate: &TileCoordinate, _pixels: &PixelBuffer) -> Result<()> {
        Ok(())
    }
}

/// Writes tiles as PNG files named by coordinate.
#[derive(Debug, Clone)]
pub struct TileWriter {
    dir: PathBuf,
}

impl TileWriter {
    /// Writer for an already prepared directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Reset `dir` to an empty directory and return a writer for it.
    ///
    /// Anything left by a previous run is removed, so the directory only
    /// ever holds tiles of the current geometry.
    pub fn prepare(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        reset_dir(&dir)?;
        Ok(Self { dir })
    }

    /// Target directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path a tile is written to.
    pub fn tile_path(&self, coordinate: &TileCoordinate) -> PathBuf {
        self.dir.join(coordinate.file_name(PNG_EXTENSION))
    }
}

impl TileSink for TileWriter {
    fn write(&self, coordinate: &TileCoordinate, pixels: &PixelBuffer) -> Result<()> {
        let mut encoded = Cursor::new(Vec::new());
        pixels.write_to(&mut encoded, ImageFormat::Png)?;
        fs::write(self.tile_path(coordinate), encoded.into_inner())?;
        Ok(())
    }
}

/// Remove `dir` if it exists, then create it empty.
pub fn reset_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        if dir.is_dir() {
            fs::remove_dir_all(dir)?;
        } else {
            fs::remove_file(dir)?;
        }
    }
    fs::create_dir_all(dir)?;
    Ok(())
}
