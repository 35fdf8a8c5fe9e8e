//! Tests for the project bundle format.

use std::io::{Cursor, Write};

use image::{Rgba as Pixel, RgbaImage};
use zip::write::SimpleFileOptions;

use super::square_record;
use crate::format::formats::SgmtFormat;
use crate::format::{FormatError, ProjectData};

fn image() -> RgbaImage {
    RgbaImage::from_fn(5, 3, |x, y| Pixel([x as u8 * 40, y as u8 * 80, 7, 255]))
}

fn write(data: &ProjectData) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    SgmtFormat.write_bundle(data, &mut buffer).unwrap();
    buffer.into_inner()
}

#[test]
fn test_bundle_preserves_pixels_and_records() {
    let data = ProjectData::new()
        .with_image(image())
        .with_image_path("dive/frame_0001.png")
        .with_records(vec![
            square_record(1, "mask1", (0, 0), 2, (5, 3)),
            square_record(4, "mask3", (2, 1), 2, (5, 3)),
        ]);

    let loaded = SgmtFormat.read_bundle(Cursor::new(write(&data))).unwrap();

    assert_eq!(loaded.image.as_ref(), Some(&image()));
    assert_eq!(loaded.dimensions, Some((5, 3)));
    assert_eq!(
        loaded.image_path.as_deref(),
        Some(std::path::Path::new("dive/frame_0001.png"))
    );
    assert_eq!(loaded.records.len(), 2);
    for (original, restored) in data.records.iter().zip(&loaded.records) {
        assert_eq!(restored.polygon_id, original.polygon_id);
        assert_eq!(restored.name, original.name);
        assert_eq!(restored.display_name, original.display_name);
        assert_eq!(restored.group_id, original.group_id);
        assert_eq!(restored.mask_color, original.mask_color);
        assert_eq!(restored.points, original.points);
        assert_eq!(restored.seed_point, original.seed_point);
        // Bitmaps are not stored in the bundle.
        assert!(restored.mask.is_none());
    }
    assert!(loaded.metadata.created.is_some());
}

#[test]
fn test_bundle_without_records() {
    let data = ProjectData::new().with_image(image());
    let loaded = SgmtFormat.read_bundle(Cursor::new(write(&data))).unwrap();
    assert!(loaded.records.is_empty());
}

#[test]
fn test_bundle_requires_image() {
    let mut buffer = Cursor::new(Vec::new());
    let err = SgmtFormat
        .write_bundle(&ProjectData::new(), &mut buffer)
        .unwrap_err();
    assert!(matches!(err, FormatError::MissingField { .. }));
}

#[test]
fn test_rejects_incompatible_version() {
    let mut buffer = Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut buffer);
        zip.start_file("polygons.json", SimpleFileOptions::default())
            .unwrap();
        zip.write_all(br#"{"version": "3.0.0", "polygons": []}"#)
            .unwrap();
        zip.finish().unwrap();
    }
    buffer.set_position(0);

    let err = SgmtFormat.read_bundle(buffer).unwrap_err();
    assert!(matches!(err, FormatError::InvalidFormat { .. }));
}

#[test]
fn test_rejects_non_zip() {
    let err = SgmtFormat
        .read_bundle(Cursor::new(b"not a bundle".to_vec()))
        .unwrap_err();
    assert!(matches!(err, FormatError::Zip(_)));
}
