//! Integration tests for the WebP compression pass.

use std::fs;
use std::path::Path;

use image::{Rgba, RgbaImage};
use tempfile::tempdir;

use pdfpyramid::output::TileSink;
use pdfpyramid::{compress_tiles, CompressionStage, Error, OutputLayout, TileCoordinate, TileWriter};

fn write_tiles(layout: &OutputLayout, coordinates: &[TileCoordinate]) {
    let writer = TileWriter::prepare(layout.png_dir()).unwrap();
    for (i, coordinate) in coordinates.iter().enumerate() {
        let mut pixels = RgbaImage::from_pixel(32, 32, Rgba([255, 255, 255, 255]));
        pixels.put_pixel(i as u32 % 32, 5, Rgba([0, 0, 200, 255]));
        writer.write(coordinate, &pixels).unwrap();
    }
}

fn count_files(dir: &Path) -> usize {
    fs::read_dir(dir).unwrap().count()
}

#[test]
fn test_every_tile_gets_a_webp_twin() {
    let tmp = tempdir().unwrap();
    let layout = OutputLayout::new(tmp.path(), "site.pdf").unwrap();
    let coordinates: Vec<_> = (0..4)
        .flat_map(|x| (0..4).map(move |y| TileCoordinate::new(2, x, y)))
        .collect();
    write_tiles(&layout, &coordinates);

    let report = CompressionStage::for_layout(&layout)
        .compress(&layout.png_dir())
        .unwrap();

    assert_eq!(report.file_count, 16);
    assert_eq!(count_files(&layout.webp_dir()), 16);
    for coordinate in &coordinates {
        let png = image::open(layout.png_path(coordinate)).unwrap().into_rgba8();
        let webp = image::open(layout.webp_path(coordinate)).unwrap().into_rgba8();
        assert_eq!(png, webp, "tile {} changed", coordinate);
    }
}

#[test]
fn test_standalone_compress_of_document_dir() {
    let tmp = tempdir().unwrap();
    let layout = OutputLayout::new(tmp.path(), "site.pdf").unwrap();
    write_tiles(&layout, &[TileCoordinate::new(0, 0, 0), TileCoordinate::new(1, 0, 0)]);

    let report = compress_tiles(layout.base_dir()).unwrap();
    assert_eq!(report.file_count, 2);
    assert!(report.ratio_percent() > 0.0);

    // Running again replaces the previous output.
    let report = compress_tiles(layout.base_dir()).unwrap();
    assert_eq!(report.file_count, 2);
    assert_eq!(count_files(&layout.webp_dir()), 2);
}

#[test]
fn test_corrupt_tile_fails_integrity_check() {
    let tmp = tempdir().unwrap();
    let layout = OutputLayout::new(tmp.path(), "site.pdf").unwrap();
    write_tiles(&layout, &[TileCoordinate::new(0, 0, 0)]);
    fs::write(layout.png_path(&TileCoordinate::new(1, 1, 1)), b"garbage").unwrap();

    let err = compress_tiles(layout.base_dir()).unwrap_err();
    assert!(matches!(
        err,
        Error::Integrity {
            source_files: 2,
            target_files: 1
        }
    ));
    assert_eq!(err.exit_code(), 2);
}
