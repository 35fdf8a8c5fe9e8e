//! Flattened image export: masks painted over the source image.

use std::path::Path;

use image::{DynamicImage, GrayImage, Luma, Rgba as Pixel, RgbaImage, imageops};
use imageproc::drawing::draw_polygon_mut;
use imageproc::point::Point as GridPoint;

use crate::format::error::FormatError;
use crate::format::project::ProjectData;
use crate::format::traits::{
    AnnotationFormat, ExportOptions, ExportResult, FormatWarning, ImportOptions,
};
use crate::model::{ExportRecord, MaskBitmap, Rgba};

/// Raster export of the annotated image (export only).
pub struct FlatImageFormat;

impl AnnotationFormat for FlatImageFormat {
    fn id(&self) -> &'static str {
        "png"
    }

    fn display_name(&self) -> &'static str {
        "Flattened image"
    }

    fn extensions(&self) -> &[&'static str] {
        &["png", "jpg", "jpeg", "bmp", "tif", "tiff"]
    }

    fn supports_import(&self) -> bool {
        false
    }

    fn export(
        &self,
        data: &ProjectData,
        path: &Path,
        _options: &ExportOptions,
    ) -> Result<ExportResult, FormatError> {
        log::info!("Exporting flattened image to {:?}", path);

        let image = data
            .image
            .as_ref()
            .ok_or_else(|| FormatError::missing_field("image"))?;

        let mut result = ExportResult::new();
        let overlay = paint_overlay(image.width(), image.height(), &data.records, &mut result);
        let flattened = composite(image, &overlay);

        let is_jpeg = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| matches!(e.to_ascii_lowercase().as_str(), "jpg" | "jpeg"))
            .unwrap_or(false);
        if is_jpeg {
            DynamicImage::ImageRgba8(flattened).to_rgb8().save(path)?;
        } else {
            flattened.save(path)?;
        }

        result.files_created = vec![path.to_path_buf()];
        Ok(result)
    }

    fn import(&self, _path: &Path, _options: &ImportOptions) -> Result<ProjectData, FormatError> {
        Err(FormatError::UnsupportedOperation(
            "flattened images cannot be imported".to_string(),
        ))
    }
}

/// Fill every record's outline into a transparent layer. Later records
/// overwrite earlier ones.
pub fn paint_overlay(
    width: u32,
    height: u32,
    records: &[ExportRecord],
    result: &mut ExportResult,
) -> RgbaImage {
    let mut overlay = RgbaImage::new(width, height);
    for record in records {
        let Some(polygon) = pixel_polygon(&record.points) else {
            result.add_warning(
                FormatWarning::info(format!("'{}' has no area, not painted", record.name))
                    .with_annotation(&record.name),
            );
            continue;
        };
        draw_polygon_mut(&mut overlay, &polygon, Pixel(record.mask_color.to_array()));
        result.annotations_exported += 1;
    }
    overlay
}

/// Bitmap of the pixels covered by `points`, edges included.
pub fn rasterize_outline(points: &[(f32, f32)], width: u32, height: u32) -> MaskBitmap {
    let mut layer = GrayImage::new(width, height);
    if let Some(polygon) = pixel_polygon(points) {
        draw_polygon_mut(&mut layer, &polygon, Luma([255]));
    }
    MaskBitmap::from_fn(width, height, |x, y| layer.get_pixel(x, y)[0] != 0)
}

/// Outline snapped to the pixel grid, without repeated vertices or a closing
/// point. `None` when fewer than three distinct vertices remain.
fn pixel_polygon(points: &[(f32, f32)]) -> Option<Vec<GridPoint<i32>>> {
    let mut polygon: Vec<GridPoint<i32>> = Vec::with_capacity(points.len());
    for &(x, y) in points {
        let p = GridPoint::new(x.round() as i32, y.round() as i32);
        if polygon.last() != Some(&p) {
            polygon.push(p);
        }
    }
    while polygon.len() > 1 && polygon.first() == polygon.last() {
        polygon.pop();
    }
    (polygon.len() >= 3).then_some(polygon)
}

/// Alpha-composite `overlay` onto a copy of `base`.
pub fn composite(base: &RgbaImage, overlay: &RgbaImage) -> RgbaImage {
    let mut out = base.clone();
    imageops::overlay(&mut out, overlay, 0, 0);
    out
}
