//! Trait definitions for annotation codec implementations.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::format::error::FormatError;
use crate::model::{AnnotationSet, Category, ImageAnnotation, ImageIndex};

/// One validation problem, attributed to the source that produced it.
///
/// Entries sort by (source, description) so consolidated reports are
/// deterministic regardless of processing order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ErrorEntry {
    /// Identifier of the offending source: an annotation file name, an
    /// image file name, or the document name for single-file formats.
    pub source: String,
    /// Human-readable description of the problem.
    pub description: String,
}

impl ErrorEntry {
    pub fn new(source: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            description: description.into(),
        }
    }
}

/// Cooperative cancellation flag shared between a caller and a running
/// import/export operation.
///
/// Cancellation is checked between files, never mid-file: a file is always
/// parsed or written to completion. A cancelled operation still returns a
/// well-formed partial report covering the files it finished.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of the running operation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Result of decoding a batch of in-memory files.
#[derive(Debug, Default)]
pub struct DecodedBatch {
    /// Successfully parsed per-image annotations.
    pub annotations: Vec<ImageAnnotation>,
    /// Categories discovered during parsing, in first-seen order.
    pub categories: Vec<Category>,
    /// Validation problems, one entry per dropped source/item.
    pub errors: Vec<ErrorEntry>,
    /// Number of codec-defined items parsed successfully (files for
    /// per-image formats, entries for JSON, rows for CSV).
    pub success_count: usize,
}

impl DecodedBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, source: impl Into<String>, description: impl Into<String>) {
        self.errors.push(ErrorEntry::new(source, description));
    }

    /// Register a category if it is not already known, preserving
    /// first-seen order.
    pub fn add_category(&mut self, category: Category) {
        if !self.categories.iter().any(|c| c.name == category.name) {
            self.categories.push(category);
        }
    }

    /// A syntactically valid source that contained nothing: zero
    /// annotations and zero errors. Callers surface this differently from
    /// a parse failure (which carries an error entry).
    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty() && self.errors.is_empty()
    }
}

/// Result of encoding an annotation set to in-memory files.
#[derive(Debug, Default)]
pub struct EncodedBatch {
    /// Filename -> file content, in deterministic name order.
    pub files: BTreeMap<String, String>,
    /// Number of shapes written out.
    pub shapes_encoded: usize,
    /// Shapes the format could not represent, one entry each.
    pub errors: Vec<ErrorEntry>,
}

impl EncodedBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self, name: impl Into<String>, content: impl Into<String>) {
        self.files.insert(name.into(), content.into());
    }

    pub fn add_error(&mut self, source: impl Into<String>, description: impl Into<String>) {
        self.errors.push(ErrorEntry::new(source, description));
    }
}

/// A paired reader/writer for one on-disk annotation format.
///
/// Codecs are pure transformations between in-memory file-content maps and
/// the model; all file I/O belongs to the orchestrator in
/// [`crate::format::io`]. Validation failures go into the batch's error
/// list; `Err` is reserved for hard failures.
pub trait AnnotationCodec: Send + Sync {
    /// Unique identifier (e.g. "voc", "yolo", "json", "csv").
    fn id(&self) -> &'static str;

    /// Human-readable name for display.
    fn display_name(&self) -> &'static str;

    /// File extensions the format's annotation files use.
    fn extensions(&self) -> &[&'static str];

    /// Whether this format can represent polygon shapes.
    fn supports_polygons(&self) -> bool;

    /// Whether this format can represent nested part shapes.
    fn supports_parts(&self) -> bool;

    /// Whether the format is a directory of per-image files (true) or a
    /// single document covering the whole set (false).
    fn per_image(&self) -> bool;

    /// Auxiliary file names the format requires alongside per-image files
    /// (e.g. YOLO's `object.data`).
    fn auxiliary_files(&self) -> &[&'static str] {
        &[]
    }

    /// Decode annotations from file contents.
    ///
    /// `files` maps file names (not paths) to contents. `images` is the
    /// set of currently loaded images used for cross-referencing. The
    /// cancel flag is checked between files for per-image formats.
    fn decode(
        &self,
        files: &BTreeMap<String, String>,
        images: &ImageIndex,
        cancel: &CancelFlag,
    ) -> Result<DecodedBatch, FormatError>;

    /// Encode an annotation set to file contents.
    fn encode(&self, set: &AnnotationSet) -> Result<EncodedBatch, FormatError>;
}
