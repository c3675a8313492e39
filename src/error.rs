//! Error types for the pdfpyramid library.

use std::fmt;
use std::io;
use thiserror::Error;

use crate::plan::TileCoordinate;

/// Result type alias for pdfpyramid operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while building a tile pyramid.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or missing input parameter. Raised before any work starts.
    #[error("Invalid parameter: {0}")]
    Validation(String),

    /// A single tile failed to rasterize.
    #[error("{0}")]
    Render(#[from] JobError),

    /// Some tiles failed to render while the run continued past them.
    #[error("{count} tiles failed to render (first: {first})")]
    TileFailures {
        /// Number of failed tiles
        count: usize,
        /// First failure reported
        first: JobError,
    },

    /// I/O error when preparing or writing the output tree.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Image encoding or decoding failed.
    #[error("Image codec error: {0}")]
    Encode(#[from] image::ImageError),

    /// Compressed output does not match the source tile set.
    #[error("Integrity error: {source_files} source tiles but {target_files} compressed tiles")]
    Integrity {
        /// Number of files found in the source directory
        source_files: usize,
        /// Number of files produced in the target directory
        target_files: usize,
    },

    /// The run was cancelled before all tiles were processed.
    #[error("Cancelled after {completed} of {total} tiles")]
    Cancelled {
        /// Tiles finished before cancellation took effect
        completed: u64,
        /// Tiles in the whole plan
        total: u64,
    },

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Validation(_) => 1,
            Error::Integrity { .. } => 2,
            Error::Render(_) | Error::TileFailures { .. } => 4,
            Error::Cancelled { .. } => 130,
            Error::Io(_) | Error::Encode(_) | Error::Other(_) => 3,
        }
    }
}

/// Why a rasterization job failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderErrorKind {
    /// The document could not be opened or parsed.
    Document(String),
    /// The coordinate lies outside the level grid.
    OutOfRange,
    /// The rendering engine reported a failure.
    Engine(String),
}

impl fmt::Display for RenderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderErrorKind::Document(msg) => write!(f, "malformed document: {}", msg),
            RenderErrorKind::OutOfRange => write!(f, "coordinate out of range"),
            RenderErrorKind::Engine(msg) => write!(f, "{}", msg),
        }
    }
}

/// A failed rasterization job, always attributed to its tile.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Render error at tile {coordinate}: {kind}")]
pub struct JobError {
    /// Tile that failed
    pub coordinate: TileCoordinate,
    /// Failure cause
    pub kind: RenderErrorKind,
}

impl JobError {
    /// Create a new job error.
    pub fn new(coordinate: TileCoordinate, kind: RenderErrorKind) -> Self {
        Self { coordinate, kind }
    }

    /// Engine failure with a message.
    pub fn engine(coordinate: TileCoordinate, msg: impl Into<String>) -> Self {
        Self::new(coordinate, RenderErrorKind::Engine(msg.into()))
    }
}
