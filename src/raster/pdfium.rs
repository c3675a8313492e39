//! Tile rasterizer backed by the pdfium rendering engine.
//!
//! Page 1 of the document is stretched to the level size. Each job renders
//! only its own tile: pdfium draws into a `tile_resolution` bitmap with the
//! page scaled to the level and shifted by the tile offset, so memory use
//! follows the tile size rather than the level size.

use std::fs;
use std::path::{Path, PathBuf};

use pdfium_render::prelude::*;

use super::{PixelBuffer, RasterizationJob, RenderConfig, TileRasterizer};
use crate::error::{Error, JobError, RenderErrorKind, Result};

/// Renders tiles from a PDF document with pdfium.
pub struct PdfiumRasterizer {
    pdfium: Pdfium,
    config: RenderConfig,
    document: Vec<u8>,
    /// Page size in PDF points.
    page_size: (f32, f32),
}

impl PdfiumRasterizer {
    /// Bind the pdfium library and check that the document opens.
    pub fn new(config: RenderConfig) -> Result<Self> {
        let pdfium = bind_pdfium(config.library_dir.as_deref())?;
        let document = fs::read(&config.document)?;

        let page_size = {
            let pdf = pdfium
                .load_pdf_from_byte_slice(&document, None)
                .map_err(|e| Error::Other(format!("Cannot open {}: {}", config.document.display(), e)))?;
            let page = pdf
                .pages()
                .get(0)
                .map_err(|_| Error::Other(format!("{} has no pages", config.document.display())))?;
            (page.width().value, page.height().value)
        };
        if page_size.0 <= 0.0 || page_size.1 <= 0.0 {
            return Err(Error::Other(format!(
                "{} has an empty first page",
                config.document.display()
            )));
        }
        log::debug!("pdfium: page size {}x{} pt", page_size.0, page_size.1);

        Ok(Self {
            pdfium,
            config,
            document,
            page_size,
        })
    }

    /// The render configuration in use.
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    fn render_tile(&self, job: &RasterizationJob) -> std::result::Result<PixelBuffer, RenderErrorKind> {
        let document = self
            .pdfium
            .load_pdf_from_byte_slice(&self.document, None)
            .map_err(|e| RenderErrorKind::Document(e.to_string()))?;
        let page = document
            .pages()
            .get(0)
            .map_err(|e| RenderErrorKind::Document(e.to_string()))?;

        let [a, b, c, d, e, f] = tile_transform(job, self.page_size);
        let background = self.config.background;
        let tile = job.tile_resolution as Pixels;
        let render_config = PdfRenderConfig::new()
            .set_fixed_size(tile, tile)
            .set_clear_color(PdfColor::new(
                background[0],
                background[1],
                background[2],
                background[3],
            ))
            .transform(a, b, c, d, e, f)
            .map_err(|e| RenderErrorKind::Engine(e.to_string()))?;

        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| RenderErrorKind::Engine(e.to_string()))?;
        Ok(bitmap.as_image().into_rgba8())
    }
}

impl TileRasterizer for PdfiumRasterizer {
    fn render(&self, job: &RasterizationJob) -> std::result::Result<PixelBuffer, JobError> {
        if !job.in_range() {
            return Err(JobError::new(job.coordinate, RenderErrorKind::OutOfRange));
        }

        self.render_tile(job)
            .map_err(|kind| JobError::new(job.coordinate, kind))
    }

    fn name(&self) -> &str {
        "pdfium"
    }
}

/// Matrix mapping top-left page points to the pixels of one tile.
///
/// The page is scaled to the level size, then shifted so the tile's
/// top-left corner lands on the bitmap origin.
fn tile_transform(job: &RasterizationJob, page_size: (f32, f32)) -> [PdfMatrixValue; 6] {
    let (x, y, _, _) = job.source_rect();
    let scale_x = job.level.width_px as f32 / page_size.0;
    let scale_y = job.level.height_px as f32 / page_size.1;
    [scale_x, 0.0, 0.0, scale_y, -(x as f32), -(y as f32)]
}

fn library_search_paths(library_dir: Option<&Path>) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(dir) = library_dir {
        paths.push(dir.to_path_buf());
    }
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            paths.push(exe_dir.join("libs"));
            paths.push(exe_dir.to_path_buf());
        }
    }
    paths.push(PathBuf::from("./"));
    paths
}

fn bind_pdfium(library_dir: Option<&Path>) -> Result<Pdfium> {
    for path in library_search_paths(library_dir) {
        let lib_path = Pdfium::pdfium_platform_library_name_at_path(&path);
        log::debug!("pdfium: trying {}", lib_path.display());

        if let Ok(bindings) = Pdfium::bind_to_library(&lib_path) {
            log::info!("pdfium: loaded from {}", path.display());
            return Ok(Pdfium::new(bindings));
        }
    }

    log::debug!("pdfium: trying system library");
    Pdfium::bind_to_system_library()
        .map(Pdfium::new)
        .map_err(|e| Error::Other(format!("pdfium library not available: {}", e)))
}
