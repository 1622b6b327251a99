//! Per-image annotations and the whole-set aggregate.

use std::collections::BTreeMap;

use crate::model::category::{Category, CategoryError, CategoryRegistry};
use crate::model::shape::ShapeData;

/// Metadata about a single image in the loaded folder.
///
/// Width and height are always the display dimensions after EXIF
/// orientation correction; all shape coordinates are expressed in that
/// frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageMetaData {
    /// The filename of the image (e.g. "image001.jpg").
    pub file_name: String,
    /// Image width in pixels, post-orientation-correction.
    pub width: u32,
    /// Image height in pixels, post-orientation-correction.
    pub height: u32,
    /// Whether an EXIF orientation correction was applied to the raw
    /// dimensions.
    pub orientation_applied: bool,
}

impl ImageMetaData {
    /// Metadata for an image whose stored dimensions are already correct.
    pub fn new(file_name: &str, width: u32, height: u32) -> Self {
        Self {
            file_name: file_name.to_string(),
            width,
            height,
            orientation_applied: false,
        }
    }

    /// Metadata from raw file dimensions plus an EXIF orientation value.
    ///
    /// Orientations 5-8 imply a 90 or 270 degree rotation, so width and
    /// height are swapped relative to the raw file.
    pub fn from_raw(file_name: &str, raw_width: u32, raw_height: u32, orientation: u32) -> Self {
        let rotated = (5..=8).contains(&orientation);
        let (width, height) = if rotated {
            (raw_height, raw_width)
        } else {
            (raw_width, raw_height)
        };
        Self {
            file_name: file_name.to_string(),
            width,
            height,
            orientation_applied: rotated,
        }
    }

    /// Filename without its extension, used by the YOLO codec to pair
    /// annotation files with images.
    pub fn stem(&self) -> &str {
        self.file_name
            .rsplit_once('.')
            .map(|(base, _)| base)
            .unwrap_or(&self.file_name)
    }
}

/// Read-only index of the currently loaded images, keyed by file name.
///
/// Codecs consult it to validate that parsed entries belong to a loaded
/// image and to resolve YOLO's stem-based file matching. The core never
/// decodes images itself; the caller supplies this index.
#[derive(Debug, Clone, Default)]
pub struct ImageIndex {
    by_name: BTreeMap<String, ImageMetaData>,
}

impl ImageIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, meta: ImageMetaData) {
        self.by_name.insert(meta.file_name.clone(), meta);
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    pub fn contains(&self, file_name: &str) -> bool {
        self.by_name.contains_key(file_name)
    }

    pub fn get(&self, file_name: &str) -> Option<&ImageMetaData> {
        self.by_name.get(file_name)
    }

    /// All loaded images whose filename stem matches, in name order.
    pub fn matches_for_stem(&self, stem: &str) -> Vec<&ImageMetaData> {
        self.by_name.values().filter(|m| m.stem() == stem).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ImageMetaData> {
        self.by_name.values()
    }
}

impl FromIterator<ImageMetaData> for ImageIndex {
    fn from_iter<T: IntoIterator<Item = ImageMetaData>>(iter: T) -> Self {
        let mut index = Self::new();
        for meta in iter {
            index.insert(meta);
        }
        index
    }
}

/// Annotations for one image: metadata plus the top-level shape forest.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageAnnotation {
    pub meta: ImageMetaData,
    pub shapes: Vec<ShapeData>,
}

impl ImageAnnotation {
    pub fn new(meta: ImageMetaData, shapes: Vec<ShapeData>) -> Self {
        Self { meta, shapes }
    }

    /// Total number of shapes including nested parts.
    pub fn shape_count(&self) -> usize {
        self.shapes.iter().map(ShapeData::node_count).sum()
    }
}

/// The full annotation state: a sparse per-image map, the category
/// registry, and per-category shape counts.
///
/// The map is sparse by contract: an image with zero shapes has no entry,
/// so `contains_annotations` is just a key lookup. Counts cover every Box
/// and Polygon node including nested parts and are maintained incrementally
/// by [`insert_image`](Self::insert_image) and friends; only
/// [`recount`](Self::recount) performs a full rescan (used after bulk
/// merges).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationSet {
    annotations: BTreeMap<String, ImageAnnotation>,
    categories: CategoryRegistry,
    shape_counts: BTreeMap<String, usize>,
}

impl AnnotationSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    pub fn categories(&self) -> &CategoryRegistry {
        &self.categories
    }

    pub fn get(&self, file_name: &str) -> Option<&ImageAnnotation> {
        self.annotations.get(file_name)
    }

    /// Whether the image currently has any shapes.
    pub fn contains_annotations(&self, file_name: &str) -> bool {
        self.annotations.contains_key(file_name)
    }

    /// Iterate annotations in file-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ImageAnnotation)> {
        self.annotations.iter()
    }

    /// Number of shapes assigned to a category, nested parts included.
    pub fn shape_count(&self, category: &str) -> usize {
        self.shape_counts.get(category).copied().unwrap_or(0)
    }

    /// Total shape count across the whole set.
    pub fn total_shape_count(&self) -> usize {
        self.shape_counts.values().sum()
    }

    /// Register a category. Returns false if the name is already taken.
    pub fn add_category(&mut self, category: Category) -> bool {
        self.categories.add(category)
    }

    /// Ensure a category exists, creating it with a default color.
    pub fn ensure_category(&mut self, name: &str) {
        self.categories.get_or_create(name);
    }

    /// Replace the whole entry for an image.
    ///
    /// This is the edit-commit contract: the image's previous shape forest
    /// is discarded, counts are adjusted incrementally, and an empty forest
    /// removes the entry (sparse map). Categories referenced by the new
    /// shapes are created on demand.
    pub fn insert_image(&mut self, annotation: ImageAnnotation) {
        if let Some(old) = self.annotations.remove(&annotation.meta.file_name) {
            self.subtract_counts(&old);
        }
        if annotation.shapes.is_empty() {
            return;
        }
        self.add_counts(&annotation);
        for shape in &annotation.shapes {
            shape.visit(&mut |s| {
                self.categories.get_or_create(s.category());
            });
        }
        self.annotations
            .insert(annotation.meta.file_name.clone(), annotation);
    }

    /// Remove an image's annotations entirely.
    pub fn remove_image(&mut self, file_name: &str) -> Option<ImageAnnotation> {
        let removed = self.annotations.remove(file_name);
        if let Some(ann) = &removed {
            self.subtract_counts(ann);
        }
        removed
    }

    /// Rename a category in the registry and in every shape referencing it.
    pub fn rename_category(&mut self, from: &str, to: &str) -> Result<(), CategoryError> {
        self.categories.rename(from, to)?;
        if from == to {
            return Ok(());
        }
        for annotation in self.annotations.values_mut() {
            for shape in &mut annotation.shapes {
                shape.rename_category(from, to);
            }
        }
        if let Some(count) = self.shape_counts.remove(from) {
            *self.shape_counts.entry(to.to_string()).or_insert(0) += count;
        }
        Ok(())
    }

    /// Drop all annotations, categories, and counts.
    pub fn clear(&mut self) {
        self.annotations.clear();
        self.categories.clear();
        self.shape_counts.clear();
    }

    /// Merge a decoded batch into this set.
    ///
    /// Categories reconcile by exact name: an existing category keeps its
    /// color, new ones are appended in batch order. Per-image entries are
    /// replaced wholesale. Counts are rebuilt with a single rescan, the one
    /// place a full recount is allowed.
    pub fn merge(&mut self, categories: Vec<Category>, annotations: Vec<ImageAnnotation>) {
        for category in categories {
            self.categories.add(category);
        }
        for annotation in annotations {
            if annotation.shapes.is_empty() {
                continue;
            }
            for shape in &annotation.shapes {
                shape.visit(&mut |s| {
                    self.categories.get_or_create(s.category());
                });
            }
            self.annotations
                .insert(annotation.meta.file_name.clone(), annotation);
        }
        self.recount();
    }

    /// Rebuild the per-category counts from scratch.
    pub fn recount(&mut self) {
        self.shape_counts.clear();
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for annotation in self.annotations.values() {
            for shape in &annotation.shapes {
                shape.visit(&mut |s| {
                    *counts.entry(s.category().to_string()).or_insert(0) += 1;
                });
            }
        }
        self.shape_counts = counts;
    }

    fn add_counts(&mut self, annotation: &ImageAnnotation) {
        for shape in &annotation.shapes {
            shape.visit(&mut |s| {
                *self
                    .shape_counts
                    .entry(s.category().to_string())
                    .or_insert(0) += 1;
            });
        }
    }

    fn subtract_counts(&mut self, annotation: &ImageAnnotation) {
        for shape in &annotation.shapes {
            shape.visit(&mut |s| {
                if let Some(count) = self.shape_counts.get_mut(s.category()) {
                    *count = count.saturating_sub(1);
                    if *count == 0 {
                        self.shape_counts.remove(s.category());
                    }
                }
            });
        }
    }
}
