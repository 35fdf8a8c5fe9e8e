//! Trait definitions for format implementations.

use std::path::{Path, PathBuf};

use crate::constants::DEFAULT_LABEL;
use crate::format::error::FormatError;
use crate::format::project::ProjectData;
use crate::georef::AffineTransform;

/// Trait for project and annotation format implementations.
///
/// Each format (project bundle, COCO, Shapefile, flattened image) converts
/// between [`ProjectData`] and a file on disk.
pub trait AnnotationFormat: Send + Sync {
    /// Unique identifier for this format (e.g., "sgmt", "coco", "shp", "png").
    fn id(&self) -> &'static str;

    /// Human-readable name for UI display.
    fn display_name(&self) -> &'static str;

    /// File extensions this format uses.
    fn extensions(&self) -> &[&'static str];

    /// Whether [`import`](Self::import) is implemented.
    fn supports_import(&self) -> bool;

    /// Export project data to the specified path.
    fn export(
        &self,
        data: &ProjectData,
        path: &Path,
        options: &ExportOptions,
    ) -> Result<ExportResult, FormatError>;

    /// Import project data from the specified path.
    fn import(&self, path: &Path, options: &ImportOptions) -> Result<ProjectData, FormatError>;
}

/// Options for export operations.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Pixel to map transform for georeferenced output. Without one, Y is
    /// negated.
    pub georef: Option<AffineTransform>,

    /// COCO category name.
    pub category_name: String,

    /// COCO `info.description`.
    pub description: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            georef: None,
            category_name: DEFAULT_LABEL.to_string(),
            description: "Exported from segpaint".to_string(),
        }
    }
}

impl ExportOptions {
    /// Create new export options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the georeferencing transform.
    pub fn georef(mut self, transform: Option<AffineTransform>) -> Self {
        self.georef = transform;
        self
    }

    /// Set the COCO category name.
    pub fn category_name(mut self, name: impl Into<String>) -> Self {
        self.category_name = name.into();
        self
    }

    /// Set the COCO description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Options for import operations.
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Pixel to map transform of the image the data is imported onto.
    pub georef: Option<AffineTransform>,
}

impl ImportOptions {
    /// Create new import options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the georeferencing transform.
    pub fn georef(mut self, transform: Option<AffineTransform>) -> Self {
        self.georef = transform;
        self
    }
}

/// Result of an export operation.
#[derive(Debug, Default)]
pub struct ExportResult {
    /// Number of annotations exported.
    pub annotations_exported: usize,

    /// Warnings generated during export (e.g., skipped masks).
    pub warnings: Vec<FormatWarning>,

    /// Files created during export.
    pub files_created: Vec<PathBuf>,
}

impl ExportResult {
    /// Create a new export result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a warning to the result.
    pub fn add_warning(&mut self, warning: FormatWarning) {
        log::warn!("{}", warning.message);
        self.warnings.push(warning);
    }

    /// Check if there were any warnings.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Warning generated during format conversion.
#[derive(Debug, Clone)]
pub struct FormatWarning {
    /// Name of the annotation this warning relates to (if applicable).
    pub annotation: Option<String>,

    /// Human-readable warning message.
    pub message: String,

    /// Severity level of the warning.
    pub severity: WarningSeverity,
}

impl FormatWarning {
    /// Create a new warning.
    pub fn new(message: impl Into<String>, severity: WarningSeverity) -> Self {
        Self {
            annotation: None,
            message: message.into(),
            severity,
        }
    }

    /// Create an info-level warning.
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(message, WarningSeverity::Info)
    }

    /// Create a warning-level warning.
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(message, WarningSeverity::Warning)
    }

    /// Set the annotation this warning relates to.
    pub fn with_annotation(mut self, name: impl Into<String>) -> Self {
        self.annotation = Some(name.into());
        self
    }
}

/// Severity level for format warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningSeverity {
    /// Informational message, not a problem.
    Info,
    /// Warning that something was skipped or modified.
    Warning,
}
