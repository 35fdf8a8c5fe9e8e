//! Project bundle format (`.sgmt`).
//!
//! A zip archive with two entries:
//! - `image.npy`: the full-resolution pixels as an `H × W × 4` `u8` array
//! - `polygons.json`: the manifest with one record per displayed annotation

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::{Path, PathBuf};

use image::RgbaImage;
use ndarray::Array3;
use ndarray_npy::{ReadNpyExt, WriteNpyExt};
use serde::{Deserialize, Serialize};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::format::error::FormatError;
use crate::format::project::{ProjectData, ProjectMetadata};
use crate::format::traits::{AnnotationFormat, ExportOptions, ExportResult, ImportOptions};
use crate::model::ExportRecord;

const IMAGE_ENTRY: &str = "image.npy";
const MANIFEST_ENTRY: &str = "polygons.json";

/// Native project bundle.
pub struct SgmtFormat;

/// Serialized form of `polygons.json`.
#[derive(Debug, Serialize, Deserialize)]
struct BundleManifest {
    version: String,
    #[serde(default)]
    image_path: Option<PathBuf>,
    #[serde(default)]
    metadata: ProjectMetadata,
    polygons: Vec<ExportRecord>,
}

impl AnnotationFormat for SgmtFormat {
    fn id(&self) -> &'static str {
        "sgmt"
    }

    fn display_name(&self) -> &'static str {
        "Segmentation project (.sgmt)"
    }

    fn extensions(&self) -> &[&'static str] {
        &["sgmt"]
    }

    fn supports_import(&self) -> bool {
        true
    }

    fn export(
        &self,
        data: &ProjectData,
        path: &Path,
        _options: &ExportOptions,
    ) -> Result<ExportResult, FormatError> {
        log::info!("Saving project to {:?}", path);

        let file = BufWriter::new(File::create(path)?);
        self.write_bundle(data, file)?;

        let mut result = ExportResult::new();
        result.annotations_exported = data.records.len();
        result.files_created = vec![path.to_path_buf()];

        log::info!("Saved {} annotations", result.annotations_exported);
        Ok(result)
    }

    fn import(&self, path: &Path, _options: &ImportOptions) -> Result<ProjectData, FormatError> {
        log::info!("Loading project from {:?}", path);
        let data = self.read_bundle(BufReader::new(File::open(path)?))?;
        log::info!(
            "Loaded {} annotations on a {:?} image",
            data.records.len(),
            data.dimensions
        );
        Ok(data)
    }
}

impl SgmtFormat {
    /// Write a bundle to any seekable writer.
    pub fn write_bundle<W: Write + Seek>(
        &self,
        data: &ProjectData,
        writer: W,
    ) -> Result<(), FormatError> {
        let image = data
            .image
            .as_ref()
            .ok_or_else(|| FormatError::missing_field("image"))?;
        let (width, height) = image.dimensions();
        let pixels = Array3::from_shape_vec(
            (height as usize, width as usize, 4),
            image.as_raw().clone(),
        )?;

        let manifest = BundleManifest {
            version: ProjectData::CURRENT_VERSION.to_string(),
            image_path: data.image_path.clone(),
            metadata: ProjectMetadata::now(),
            polygons: data.records.clone(),
        };

        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut zip = ZipWriter::new(writer);

        zip.start_file(IMAGE_ENTRY, options)?;
        pixels.write_npy(&mut zip)?;

        zip.start_file(MANIFEST_ENTRY, options)?;
        serde_json::to_writer_pretty(&mut zip, &manifest)?;

        zip.finish()?;
        Ok(())
    }

    /// Read a bundle from any seekable reader.
    pub fn read_bundle<R: Read + Seek>(&self, reader: R) -> Result<ProjectData, FormatError> {
        let mut archive = ZipArchive::new(reader)?;

        let manifest: BundleManifest = {
            let entry = archive.by_name(MANIFEST_ENTRY)?;
            serde_json::from_reader(entry)?
        };
        if !ProjectData::is_version_compatible(&manifest.version) {
            return Err(FormatError::invalid_format(format!(
                "unsupported project version {} (expected {})",
                manifest.version,
                ProjectData::CURRENT_VERSION
            )));
        }

        let pixels = {
            let entry = archive.by_name(IMAGE_ENTRY)?;
            Array3::<u8>::read_npy(entry)?
        };
        let image = array_to_image(&pixels)?;

        Ok(ProjectData {
            version: manifest.version,
            image_path: manifest.image_path,
            dimensions: Some(image.dimensions()),
            image: Some(image),
            records: manifest.polygons,
            metadata: manifest.metadata,
        })
    }
}

/// Convert an `H × W × C` array (C = 3 or 4) into an RGBA image.
fn array_to_image(pixels: &Array3<u8>) -> Result<RgbaImage, FormatError> {
    let (height, width, channels) = pixels.dim();
    let raw: Vec<u8> = match channels {
        4 => pixels.iter().copied().collect(),
        3 => pixels
            .outer_iter()
            .flat_map(|row| {
                row.outer_iter()
                    .flat_map(|px| [px[0], px[1], px[2], u8::MAX])
                    .collect::<Vec<_>>()
            })
            .collect(),
        other => {
            return Err(FormatError::invalid_format(format!(
                "image array has {other} channels, expected 3 or 4"
            )));
        }
    };
    RgbaImage::from_raw(width as u32, height as u32, raw)
        .ok_or_else(|| FormatError::invalid_format("image array size mismatch"))
}
