//! Image-annotation data model and multi-format codecs.
//!
//! The [`model`] module holds the canonical in-memory representation:
//! categories with colors, box and polygon shapes with tags and nested
//! parts, and the per-image annotation set. The [`format`] module reads
//! and writes that model in four on-disk formats (Pascal VOC XML, YOLO
//! text, a custom JSON schema, and CSV) with partial-success semantics:
//! invalid files or entries are reported individually and never abort a
//! batch.
//!
//! Shape coordinates are absolute pixels, 0-based and half-open, in the
//! image's orientation-corrected frame; each codec owns the translation
//! to and from its format's conventions.

pub mod color_utils;
pub mod format;
pub mod model;

pub use format::{
    AnnotationCodec, CancelFlag, CodecRegistry, FormatError, ImportOptions,
    export_annotations, import_annotations,
};
pub use model::{AnnotationSet, Category, ImageAnnotation, ImageIndex, ImageMetaData, ShapeData};
