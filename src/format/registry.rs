//! Registry of available annotation formats.

use crate::format::codecs::{CsvCodec, JsonCodec, PascalVocCodec, YoloCodec};
use crate::format::traits::AnnotationCodec;

/// Holds the built-in codecs and resolves them by id or file extension.
pub struct CodecRegistry {
    codecs: Vec<Box<dyn AnnotationCodec>>,
}

impl CodecRegistry {
    /// Create a registry with all built-in formats registered.
    pub fn new() -> Self {
        Self {
            codecs: vec![
                Box::new(PascalVocCodec),
                Box::new(YoloCodec),
                Box::new(JsonCodec),
                Box::new(CsvCodec),
            ],
        }
    }

    /// Register an additional format.
    pub fn register(&mut self, codec: Box<dyn AnnotationCodec>) {
        self.codecs.push(codec);
    }

    /// All registered codecs, in registration order.
    pub fn all(&self) -> impl Iterator<Item = &dyn AnnotationCodec> {
        self.codecs.iter().map(|c| c.as_ref())
    }

    /// Look up a codec by its identifier.
    pub fn get(&self, id: &str) -> Option<&dyn AnnotationCodec> {
        self.all().find(|c| c.id() == id)
    }

    /// Look up a codec by annotation file extension (without the dot).
    pub fn by_extension(&self, extension: &str) -> Option<&dyn AnnotationCodec> {
        self.all().find(|c| c.extensions().contains(&extension))
    }

    /// Codecs able to represent polygon shapes.
    pub fn supporting_polygons(&self) -> impl Iterator<Item = &dyn AnnotationCodec> {
        self.all().filter(|c| c.supports_polygons())
    }

    /// Codecs able to represent nested part shapes.
    pub fn supporting_parts(&self) -> impl Iterator<Item = &dyn AnnotationCodec> {
        self.all().filter(|c| c.supports_parts())
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::new()
    }
}
