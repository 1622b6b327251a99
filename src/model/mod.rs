//! In-memory annotation data model.
//!
//! The canonical coordinate space is absolute pixels in the image's
//! orientation-corrected frame; format-specific conventions live in the
//! codecs, never here.

mod annotation;
mod category;
mod geometry;
mod shape;

pub use annotation::{AnnotationSet, ImageAnnotation, ImageIndex, ImageMetaData};
pub use category::{Category, CategoryError, CategoryRegistry};
pub use geometry::{Point, Rect};
pub use shape::{MIN_POLYGON_POINTS, ShapeData};
