//! Format registry for discovering and accessing formats.

use std::collections::HashMap;

use crate::format::formats::{CocoFormat, FlatImageFormat, SgmtFormat, ShapefileFormat};
use crate::format::traits::AnnotationFormat;

/// Registry of available formats.
///
/// All built-in formats are registered automatically on creation.
pub struct FormatRegistry {
    formats: HashMap<&'static str, Box<dyn AnnotationFormat>>,
}

impl FormatRegistry {
    /// Create a new registry with all built-in formats registered.
    pub fn new() -> Self {
        let mut registry = Self {
            formats: HashMap::new(),
        };

        registry.register(Box::new(SgmtFormat));
        registry.register(Box::new(CocoFormat));
        registry.register(Box::new(ShapefileFormat));
        registry.register(Box::new(FlatImageFormat));

        registry
    }

    /// Register a format implementation.
    pub fn register(&mut self, format: Box<dyn AnnotationFormat>) {
        self.formats.insert(format.id(), format);
    }

    /// Get a format by its ID.
    pub fn get(&self, id: &str) -> Option<&dyn AnnotationFormat> {
        self.formats.get(id).map(|f| f.as_ref())
    }

    /// Find formats by file extension.
    pub fn by_extension(&self, ext: &str) -> Vec<&dyn AnnotationFormat> {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        self.formats
            .values()
            .filter(|f| f.extensions().iter().any(|e| *e == ext))
            .map(|f| f.as_ref())
            .collect()
    }

    /// Get all registered formats.
    pub fn all(&self) -> Vec<&dyn AnnotationFormat> {
        self.formats.values().map(|f| f.as_ref()).collect()
    }

    /// Get all format IDs.
    pub fn ids(&self) -> Vec<&'static str> {
        self.formats.keys().copied().collect()
    }

    /// Get the native project bundle format.
    pub fn native(&self) -> &dyn AnnotationFormat {
        self.get("sgmt")
            .expect("Native format should always be registered")
    }

    /// Formats that can be read back.
    pub fn import_formats(&self) -> Vec<&dyn AnnotationFormat> {
        self.all()
            .into_iter()
            .filter(|f| f.supports_import())
            .collect()
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::new()
    }
}
