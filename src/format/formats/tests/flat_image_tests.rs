//! Tests for flattened image export.

use image::{Rgba as Pixel, RgbaImage};

use super::{scratch_dir, square_record};
use crate::format::formats::{FlatImageFormat, composite, paint_overlay};
use crate::format::{AnnotationFormat, ExportOptions, ExportResult, FormatError, ProjectData};
use crate::model::MaskBitmap;

fn black(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_pixel(width, height, Pixel([0, 0, 0, 255]))
}

/// Blending may truncate instead of round.
fn assert_pixel_near(actual: &Pixel<u8>, expected: [u8; 4]) {
    for (a, e) in actual.0.iter().zip(expected) {
        assert!(a.abs_diff(e) <= 1, "{actual:?} vs {expected:?}");
    }
}

#[test]
fn test_overlay_fills_interior_pixels() {
    let records = vec![square_record(1, "mask1", (2, 2), 4, (10, 10))];
    let mut result = ExportResult::new();
    let overlay = paint_overlay(10, 10, &records, &mut result);

    assert_eq!(result.annotations_exported, 1);
    for y in 0..10 {
        for x in 0..10 {
            let inside = (2..=6).contains(&x) && (2..=6).contains(&y);
            assert_eq!(overlay.get_pixel(x, y)[3] != 0, inside, "pixel ({x}, {y})");
        }
    }
}

#[test]
fn test_later_records_paint_over_earlier() {
    let mut top = square_record(2, "mask2", (0, 0), 4, (4, 4));
    top.mask_color = crate::model::Rgba::new(255, 0, 0, 255);
    let records = vec![square_record(1, "mask1", (0, 0), 4, (4, 4)), top];

    let overlay = paint_overlay(4, 4, &records, &mut ExportResult::new());
    assert_eq!(overlay.get_pixel(1, 1), &Pixel([255, 0, 0, 255]));
}

#[test]
fn test_composite_over_opaque_base() {
    let mut overlay = RgbaImage::new(2, 1);
    overlay.put_pixel(0, 0, Pixel([30, 144, 255, 75]));

    let out = composite(&black(2, 1), &overlay);

    assert_pixel_near(out.get_pixel(0, 0), [9, 42, 75, 255]);
    assert_eq!(out.get_pixel(1, 0), &Pixel([0, 0, 0, 255]));
}

#[test]
fn test_export_png() {
    let dir = scratch_dir("flat_png");
    let path = dir.join("flat.png");
    let data = ProjectData::new()
        .with_image(black(8, 8))
        .with_records(vec![square_record(1, "mask1", (1, 1), 3, (8, 8))]);

    let result = FlatImageFormat
        .export(&data, &path, &ExportOptions::default())
        .unwrap();
    assert_eq!(result.files_created, vec![path.clone()]);

    let written = image::open(&path).unwrap().to_rgba8();
    assert_eq!(written.dimensions(), (8, 8));
    assert_pixel_near(written.get_pixel(2, 2), [9, 42, 75, 255]);
    assert_eq!(written.get_pixel(6, 6), &Pixel([0, 0, 0, 255]));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_export_jpeg_drops_alpha() {
    let dir = scratch_dir("flat_jpg");
    let path = dir.join("flat.jpg");
    let data = ProjectData::new().with_image(black(8, 8));

    FlatImageFormat
        .export(&data, &path, &ExportOptions::default())
        .unwrap();
    assert!(path.exists());

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_export_requires_image() {
    let err = FlatImageFormat
        .export(
            &ProjectData::new(),
            std::path::Path::new("never.png"),
            &ExportOptions::default(),
        )
        .unwrap_err();
    assert!(matches!(err, FormatError::MissingField { .. }));
}

#[test]
fn test_degenerate_outline_is_skipped_with_warning() {
    let mut flat = square_record(1, "mask1", (1, 1), 3, (8, 8));
    flat.points = vec![(1.0, 1.0), (4.0, 1.0), (1.2, 0.8)];
    let mut result = ExportResult::new();
    let overlay = paint_overlay(8, 8, &[flat], &mut result);

    assert_eq!(result.annotations_exported, 0);
    assert_eq!(result.warnings.len(), 1);
    assert!(overlay.pixels().all(|p| p[3] == 0));
}

#[test]
fn test_rasterize_outline_covers_square_with_edges() {
    let record = square_record(1, "mask1", (3, 2), 4, (12, 10));
    let mask = crate::format::formats::rasterize_outline(&record.points, 12, 10);
    let expected = MaskBitmap::from_fn(12, 10, |x, y| (3..=7).contains(&x) && (2..=6).contains(&y));
    assert_eq!(mask, expected);
}

#[test]
fn test_rasterize_outline_clips_to_image() {
    let points = [(-4.0, -4.0), (20.0, -4.0), (20.0, 20.0), (-4.0, 20.0)];
    let mask = crate::format::formats::rasterize_outline(&points, 6, 5);
    assert_eq!(mask.area(), 30);
}
