//! Post-pass that re-encodes written tiles as lossless WebP.
//!
//! The stage works on a directory tree only. It knows nothing about levels
//! or coordinates; output names keep the source stem and swap the extension.
//! A run fails with [`Error::Integrity`] unless it produces exactly one
//! output per input file. Partial output is left in place for inspection.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use image::codecs::webp::WebPEncoder;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::output::{reset_dir, OutputLayout, WEBP_EXTENSION};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Summary of one compression run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompressionReport {
    /// Number of tiles compressed (equal in source and target)
    pub file_count: usize,
    /// Total size of the source tree in bytes
    pub source_bytes: u64,
    /// Total size of the target tree in bytes
    pub target_bytes: u64,
    /// Wall-clock time of the run
    #[serde(skip)]
    pub elapsed: Duration,
}

impl CompressionReport {
    /// Source size in megabytes.
    pub fn source_mb(&self) -> f64 {
        self.source_bytes as f64 / BYTES_PER_MB
    }

    /// Target size in megabytes.
    pub fn target_mb(&self) -> f64 {
        self.target_bytes as f64 / BYTES_PER_MB
    }

    /// Target size as a percentage of the source size.
    pub fn ratio_percent(&self) -> f64 {
        if self.source_bytes == 0 {
            return 100.0;
        }
        self.target_bytes as f64 / self.source_bytes as f64 * 100.0
    }
}

/// Re-encodes a tile directory into a sibling directory.
#[derive(Debug, Clone)]
pub struct CompressionStage {
    target_dir: PathBuf,
    parallel: bool,
}

impl CompressionStage {
    /// Compress into `target_dir`.
    pub fn new(target_dir: impl Into<PathBuf>) -> Self {
        Self {
            target_dir: target_dir.into(),
            parallel: true,
        }
    }

    /// Compress a document layout's `png` directory into its `webp` directory.
    pub fn for_layout(layout: &OutputLayout) -> Self {
        Self::new(layout.webp_dir())
    }

    /// Disable parallel encoding.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Target directory.
    pub fn target_dir(&self) -> &Path {
        &self.target_dir
    }

    /// Re-encode every file of `tile_dir`.
    pub fn compress(&self, tile_dir: &Path) -> Result<CompressionReport> {
        let started = Instant::now();
        let sources = list_files(tile_dir)?;
        reset_dir(&self.target_dir)?;

        log::info!(
            "Converting {} tiles from {} to WEBP...",
            sources.len(),
            tile_dir.display()
        );

        let encode = |source: &PathBuf| {
            if let Err(e) = self.encode_one(source) {
                log::warn!("Failed to convert {}: {}", source.display(), e);
            }
        };
        if self.parallel {
            sources.par_iter().for_each(encode);
        } else {
            sources.iter().for_each(encode);
        }

        let source_files = sources.len();
        let target_files = list_files(&self.target_dir)?.len();
        if source_files != target_files {
            return Err(Error::Integrity {
                source_files,
                target_files,
            });
        }

        let report = CompressionReport {
            file_count: source_files,
            source_bytes: dir_size(tile_dir),
            target_bytes: dir_size(&self.target_dir),
            elapsed: started.elapsed(),
        };

        log::info!("Converted {} PNG files to WEBP format.", report.file_count);
        log::info!(
            "The original size of all the PNG files together was {:.2} MB, the size of the WEBP files together is {:.2} MB",
            report.source_mb(),
            report.target_mb()
        );
        log::info!(
            "Which means the new size is {:.2}% of the original size.",
            report.ratio_percent()
        );

        Ok(report)
    }

    fn encode_one(&self, source: &Path) -> Result<()> {
        let target = self.target_path(source)?;
        let rgba = image::open(source)?.into_rgba8();

        let writer = BufWriter::new(File::create(&target)?);
        rgba.write_with_encoder(WebPEncoder::new_lossless(writer))?;
        Ok(())
    }

    fn target_path(&self, source: &Path) -> Result<PathBuf> {
        let stem = source
            .file_stem()
            .ok_or_else(|| Error::Other(format!("{} has no file name", source.display())))?;
        let mut name = stem.to_os_string();
        name.push(".");
        name.push(WEBP_EXTENSION);
        Ok(self.target_dir.join(name))
    }
}

/// Regular files directly inside `dir`, sorted by name.
fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// Total size of every file below `dir`, recursively.
pub fn dir_size(dir: &Path) -> u64 {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .map(|meta| meta.len())
        .sum()
}
