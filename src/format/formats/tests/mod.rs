//! Unit tests for annotation format implementations.
//!
//! These tests verify serialization of each format and the round trips the
//! importable formats support.

mod coco_tests;
mod flat_image_tests;
mod sgmt_tests;

use std::path::PathBuf;

use crate::model::{ExportRecord, MaskBitmap, Rgba};

/// Scratch directory unique to this process and test.
pub(super) fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("segpaint_{}_{}", name, std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// A square record covering `[x, x + size) × [y, y + size)` in a
/// `width × height` image.
pub(super) fn square_record(
    id: u64,
    name: &str,
    (x, y): (u32, u32),
    size: u32,
    (width, height): (u32, u32),
) -> ExportRecord {
    let mask = MaskBitmap::from_fn(width, height, |px, py| {
        px >= x && px < x + size && py >= y && py < y + size
    });
    let (x0, y0) = (x as f32, y as f32);
    let (x1, y1) = ((x + size) as f32, (y + size) as f32);
    ExportRecord {
        polygon_id: id,
        name: name.to_string(),
        display_name: "coral".to_string(),
        group_id: "none".to_string(),
        mask_color: Rgba::new(30, 144, 255, 75),
        points: vec![(x0, y0), (x1, y0), (x1, y1), (x0, y1)],
        seed_point: ((x0 + x1) / 2.0, (y0 + y1) / 2.0),
        mask: Some(mask),
    }
}
