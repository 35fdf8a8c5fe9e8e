//! COCO JSON format implementation.
//!
//! Writes one annotation per displayed mask with an uncompressed RLE
//! segmentation. Masks loaded from vertex-only formats have no bitmap and are
//! skipped.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::format::error::FormatError;
use crate::format::project::ProjectData;
use crate::format::traits::{
    AnnotationFormat, ExportOptions, ExportResult, FormatWarning, ImportOptions,
};
use crate::model::MaskBitmap;

/// COCO JSON format (export only).
pub struct CocoFormat;

impl AnnotationFormat for CocoFormat {
    fn id(&self) -> &'static str {
        "coco"
    }

    fn display_name(&self) -> &'static str {
        "COCO (JSON)"
    }

    fn extensions(&self) -> &[&'static str] {
        &["json"]
    }

    fn supports_import(&self) -> bool {
        false
    }

    fn export(
        &self,
        data: &ProjectData,
        path: &Path,
        options: &ExportOptions,
    ) -> Result<ExportResult, FormatError> {
        log::info!("Exporting COCO annotations to {:?}", path);

        let (dataset, mut result) = self.build_dataset(data, options);
        let file = std::fs::File::create(path)?;
        serde_json::to_writer(std::io::BufWriter::new(file), &dataset)?;
        result.files_created = vec![path.to_path_buf()];

        log::info!(
            "Exported {} annotations ({} warnings)",
            result.annotations_exported,
            result.warnings.len()
        );

        Ok(result)
    }

    fn import(&self, _path: &Path, _options: &ImportOptions) -> Result<ProjectData, FormatError> {
        Err(FormatError::UnsupportedOperation(
            "COCO import is not supported".to_string(),
        ))
    }
}

impl CocoFormat {
    /// Build the COCO document for `data`.
    pub fn build_dataset(
        &self,
        data: &ProjectData,
        options: &ExportOptions,
    ) -> (CocoDataset, ExportResult) {
        let mut result = ExportResult::new();
        let (width, height) = data.dimensions.unwrap_or((0, 0));

        let mut dataset = CocoDataset {
            info: CocoInfo {
                date_created: chrono::Local::now().to_string(),
                version: 1,
                description: options.description.clone(),
            },
            categories: vec![CocoCategory {
                id: 0,
                name: options.category_name.clone(),
                supercategory: "none".to_string(),
            }],
            images: vec![CocoImage {
                id: 0,
                file_name: data.image_file_name(),
                height,
                width,
                date_captured: "unknown".to_string(),
            }],
            annotations: Vec::new(),
        };

        for record in &data.records {
            let Some(mask) = record.mask.as_ref() else {
                result.add_warning(
                    FormatWarning::warning(format!("'{}' has no mask bitmap, skipped", record.name))
                        .with_annotation(&record.name),
                );
                continue;
            };
            dataset
                .annotations
                .push(CocoAnnotation::from_mask(record.polygon_id, 0, 0, mask));
        }

        result.annotations_exported = dataset.annotations.len();
        (dataset, result)
    }
}

// COCO JSON structures

#[derive(Debug, Serialize, Deserialize)]
pub struct CocoDataset {
    pub info: CocoInfo,
    pub categories: Vec<CocoCategory>,
    pub images: Vec<CocoImage>,
    pub annotations: Vec<CocoAnnotation>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CocoInfo {
    pub date_created: String,
    pub version: u32,
    pub description: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CocoCategory {
    pub id: u32,
    pub name: String,
    pub supercategory: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CocoImage {
    pub id: u64,
    pub file_name: String,
    pub height: u32,
    pub width: u32,
    pub date_captured: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CocoAnnotation {
    pub id: u64,
    pub image_id: u64,
    pub category_id: u32,
    /// `[x, y, width, height]` of the set pixels.
    pub bbox: [f64; 4],
    pub area: f64,
    pub segmentation: CocoRle,
    pub iscrowd: u8,
}

impl CocoAnnotation {
    fn from_mask(id: u64, image_id: u64, category_id: u32, mask: &MaskBitmap) -> Self {
        let bbox = mask
            .bounds()
            .map(|[x, y, w, h]| [f64::from(x), f64::from(y), f64::from(w), f64::from(h)])
            .unwrap_or([0.0; 4]);
        Self {
            id,
            image_id,
            category_id,
            bbox,
            area: mask.area() as f64,
            segmentation: CocoRle::encode(mask),
            iscrowd: 0,
        }
    }
}

/// Uncompressed run-length encoding over column-major pixels.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CocoRle {
    /// `[height, width]`
    pub size: [u32; 2],
    pub counts: Vec<u64>,
}

impl CocoRle {
    pub fn encode(mask: &MaskBitmap) -> Self {
        Self {
            size: [mask.height(), mask.width()],
            counts: mask.column_major_runs(),
        }
    }

    /// Decode back into a mask.
    pub fn decode(&self) -> Option<MaskBitmap> {
        let [height, width] = self.size;
        let total = u64::from(height) * u64::from(width);
        if self.counts.iter().sum::<u64>() != total {
            return None;
        }
        let mut mask = MaskBitmap::new(width, height);
        let mut index = 0u64;
        let mut value = false;
        for &run in &self.counts {
            if value {
                for i in index..index + run {
                    let x = (i / u64::from(height)) as u32;
                    let y = (i % u64::from(height)) as u32;
                    mask.set(x, y, true);
                }
            }
            index += run;
            value = !value;
        }
        Some(mask)
    }
}
