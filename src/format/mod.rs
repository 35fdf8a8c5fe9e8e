//! Project and annotation format import/export.
//!
//! Formats implement the `AnnotationFormat` trait and exchange data through
//! `ProjectData`.
//!
//! ## Supported Formats
//!
//! - **Project bundle (`.sgmt`)**: zip with the pixel array and polygon records
//! - **COCO JSON**: RLE segmentation of each displayed mask (export only)
//! - **Shapefile**: polygon geometry with attribute columns, optionally
//!   georeferenced
//! - **Flattened image**: masks alpha-composited over the image (export only)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use segpaint::format::{FormatRegistry, ExportOptions};
//!
//! let registry = FormatRegistry::new();
//! let format = registry.get("coco").unwrap();
//! let result = format.export(&project_data, path, &ExportOptions::default())?;
//! ```

mod error;
pub mod formats;
mod project;
mod registry;
mod traits;

pub use error::FormatError;
pub use project::{ProjectData, ProjectMetadata};
pub use registry::FormatRegistry;
pub use traits::{
    AnnotationFormat, ExportOptions, ExportResult, FormatWarning, ImportOptions, WarningSeverity,
};
