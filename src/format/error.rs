//! Error types for project and export format operations.

use thiserror::Error;

/// Errors that can occur while reading or writing annotation files.
#[derive(Error, Debug)]
pub enum FormatError {
    /// I/O error during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing or serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Project bundle archive error
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Pixel array could not be read from the bundle
    #[error("NPY read error: {0}")]
    ReadNpy(#[from] ndarray_npy::ReadNpyError),

    /// Pixel array could not be written to the bundle
    #[error("NPY write error: {0}")]
    WriteNpy(#[from] ndarray_npy::WriteNpyError),

    /// Pixel array has an unexpected shape
    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    /// Shapefile reading or writing error
    #[error("Shapefile error: {0}")]
    Shapefile(#[from] shapefile::Error),

    /// Image encoding or decoding error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Invalid format structure or content
    #[error("Invalid format: {message}")]
    InvalidFormat {
        /// Description of the format error
        message: String,
    },

    /// Required field is missing
    #[error("Missing required field: {field}")]
    MissingField {
        /// Name of the missing field
        field: String,
    },

    /// Attribute table lacks required columns
    #[error("Missing required columns: {}", .columns.join(", "))]
    MissingColumns {
        /// Names of the missing columns
        columns: Vec<String>,
    },

    /// Operation not supported by this format
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),
}

impl FormatError {
    /// Create an invalid format error with a message.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    /// Create a missing field error.
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Create a missing columns error.
    pub fn missing_columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::MissingColumns {
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }
}
