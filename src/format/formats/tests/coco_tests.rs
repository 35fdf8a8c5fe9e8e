//! Tests for COCO format export.

use super::{scratch_dir, square_record};
use crate::format::formats::{CocoFormat, CocoRle};
use crate::format::{AnnotationFormat, ExportOptions, FormatError, ImportOptions, ProjectData};
use crate::model::MaskBitmap;

fn project() -> ProjectData {
    ProjectData::new()
        .with_image(image::RgbaImage::new(8, 6))
        .with_image_path("reef/site_04.png")
        .with_records(vec![
            square_record(3, "mask1", (1, 1), 2, (8, 6)),
            square_record(9, "mask2", (4, 2), 3, (8, 6)),
        ])
}

#[test]
fn test_dataset_header() {
    let (dataset, result) = CocoFormat.build_dataset(&project(), &ExportOptions::default());

    assert_eq!(dataset.info.version, 1);
    assert_eq!(dataset.categories.len(), 1);
    assert_eq!(dataset.categories[0].id, 0);
    assert_eq!(dataset.categories[0].name, "coral");
    assert_eq!(dataset.categories[0].supercategory, "none");

    let image = &dataset.images[0];
    assert_eq!(image.id, 0);
    assert_eq!(image.file_name, "reef/site_04.png");
    assert_eq!((image.width, image.height), (8, 6));
    assert_eq!(image.date_captured, "unknown");
    assert_eq!(result.annotations_exported, 2);
}

#[test]
fn test_annotation_fields() {
    let (dataset, _) = CocoFormat.build_dataset(&project(), &ExportOptions::default());

    let ann = &dataset.annotations[1];
    assert_eq!(ann.id, 9);
    assert_eq!(ann.image_id, 0);
    assert_eq!(ann.category_id, 0);
    assert_eq!(ann.bbox, [4.0, 2.0, 3.0, 3.0]);
    assert_eq!(ann.area, 9.0);
    assert_eq!(ann.iscrowd, 0);
    assert_eq!(ann.segmentation.size, [6, 8]);
}

#[test]
fn test_custom_category_and_description() {
    let options = ExportOptions::new()
        .category_name("sponge")
        .description("survey 12");
    let (dataset, _) = CocoFormat.build_dataset(&project(), &options);

    assert_eq!(dataset.categories[0].name, "sponge");
    assert_eq!(dataset.info.description, "survey 12");
}

#[test]
fn test_records_without_mask_are_skipped() {
    let mut data = project();
    data.records[0].mask = None;

    let (dataset, result) = CocoFormat.build_dataset(&data, &ExportOptions::default());

    assert_eq!(dataset.annotations.len(), 1);
    assert_eq!(result.annotations_exported, 1);
    assert_eq!(result.warnings.len(), 1);
    assert_eq!(result.warnings[0].annotation.as_deref(), Some("mask1"));
}

#[test]
fn test_rle_is_column_major() {
    // 2 × 3 mask with only (1, 0) set: column 0 is empty, column 1 starts set.
    let mut mask = MaskBitmap::new(2, 3);
    mask.set(1, 0, true);

    let rle = CocoRle::encode(&mask);
    assert_eq!(rle.size, [3, 2]);
    assert_eq!(rle.counts, vec![3, 1, 2]);
    assert_eq!(rle.decode(), Some(mask));
}

#[test]
fn test_rle_rejects_wrong_total() {
    let rle = CocoRle {
        size: [2, 2],
        counts: vec![1, 1],
    };
    assert!(rle.decode().is_none());
}

#[test]
fn test_export_writes_json() {
    let dir = scratch_dir("coco_export");
    let path = dir.join("annotations.json");

    let result = CocoFormat
        .export(&project(), &path, &ExportOptions::default())
        .unwrap();
    assert_eq!(result.files_created, vec![path.clone()]);

    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(value["annotations"].as_array().unwrap().len(), 2);
    assert_eq!(value["images"][0]["file_name"], "reef/site_04.png");
    assert!(value["info"]["date_created"].is_string());

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_import_unsupported() {
    let err = CocoFormat
        .import(std::path::Path::new("x.json"), &ImportOptions::default())
        .unwrap_err();
    assert!(matches!(err, FormatError::UnsupportedOperation(_)));
}
