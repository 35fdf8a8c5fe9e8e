//! Project data structures for import/export.
//!
//! `ProjectData` is the intermediate representation shared by every format:
//! the image, its metadata and one [`ExportRecord`] per annotation. Only the
//! displayed version of each annotation is captured; version history does not
//! survive a save/load cycle.
//!
//! # Versioning
//!
//! Bundles carry a `MAJOR.MINOR.PATCH` version. While the major version is 0,
//! only files with the same minor version are accepted.

use std::path::PathBuf;

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::georef::AffineTransform;
use crate::model::ExportRecord;

/// Everything a format needs to write or produces when read.
#[derive(Debug, Clone)]
pub struct ProjectData {
    /// Format version for compatibility checking.
    pub version: String,

    /// Path of the source image, when known.
    pub image_path: Option<PathBuf>,

    /// Image dimensions (width, height).
    pub dimensions: Option<(u32, u32)>,

    /// Full-resolution pixels.
    pub image: Option<RgbaImage>,

    /// Displayed annotations, in creation order.
    pub records: Vec<ExportRecord>,

    /// Project metadata.
    pub metadata: ProjectMetadata,
}

impl ProjectData {
    /// Current version of the bundle format.
    pub const CURRENT_VERSION: &'static str = "0.1.0";

    /// Major version number for compatibility checking.
    pub const VERSION_MAJOR: u32 = 0;

    /// Minor version number.
    pub const VERSION_MINOR: u32 = 1;

    /// Create an empty project.
    pub fn new() -> Self {
        Self {
            version: Self::CURRENT_VERSION.to_string(),
            image_path: None,
            dimensions: None,
            image: None,
            records: Vec::new(),
            metadata: ProjectMetadata::default(),
        }
    }

    /// Attach an image, taking its dimensions from the pixels.
    pub fn with_image(mut self, image: RgbaImage) -> Self {
        self.dimensions = Some(image.dimensions());
        self.image = Some(image);
        self
    }

    pub fn with_image_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.image_path = Some(path.into());
        self
    }

    pub fn with_records(mut self, records: Vec<ExportRecord>) -> Self {
        self.records = records;
        self
    }

    /// Parse a version string into (major, minor, patch) components.
    pub fn parse_version(version: &str) -> Option<(u32, u32, u32)> {
        let parts: Vec<&str> = version.split('.').collect();
        if parts.len() != 3 {
            return None;
        }
        let major = parts[0].parse().ok()?;
        let minor = parts[1].parse().ok()?;
        let patch = parts[2].parse().ok()?;
        Some((major, minor, patch))
    }

    /// Check if a version is compatible with the current version.
    pub fn is_version_compatible(file_version: &str) -> bool {
        let Some((file_major, file_minor, _)) = Self::parse_version(file_version) else {
            return false;
        };

        if Self::VERSION_MAJOR == 0 {
            file_major == 0 && file_minor == Self::VERSION_MINOR
        } else {
            file_major == Self::VERSION_MAJOR
        }
    }

    /// Georeferencing of the source image, if it is a GeoTIFF with a world file.
    pub fn georef(&self) -> Option<AffineTransform> {
        let path = self.image_path.as_deref()?;
        match AffineTransform::load_for_image(path) {
            Ok(transform) => transform,
            Err(e) => {
                log::warn!("Ignoring georeferencing for {:?}: {}", path, e);
                None
            }
        }
    }

    /// Image file name for display and COCO `file_name`.
    pub fn image_file_name(&self) -> String {
        self.image_path
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|| "None".to_string())
    }
}

impl Default for ProjectData {
    fn default() -> Self {
        Self::new()
    }
}

/// Project metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectMetadata {
    /// Creation timestamp (RFC 3339).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,

    /// Tool that wrote the file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
}

impl ProjectMetadata {
    /// Metadata stamped with the current time and crate version.
    pub fn now() -> Self {
        Self {
            created: Some(chrono::Local::now().to_rfc3339()),
            tool: Some(format!("segpaint {}", env!("CARGO_PKG_VERSION"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_compatibility() {
        assert!(ProjectData::is_version_compatible("0.1.0"));
        assert!(ProjectData::is_version_compatible("0.1.7"));
        assert!(!ProjectData::is_version_compatible("0.2.0"));
        assert!(!ProjectData::is_version_compatible("1.1.0"));
        assert!(!ProjectData::is_version_compatible("garbage"));
    }

    #[test]
    fn test_with_image_sets_dimensions() {
        let data = ProjectData::new().with_image(RgbaImage::new(7, 3));
        assert_eq!(data.dimensions, Some((7, 3)));
        assert_eq!(data.image_file_name(), "None");
    }
}
