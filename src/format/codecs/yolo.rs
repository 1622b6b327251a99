//! YOLO text format implementation.
//!
//! Directory-based: an `object.data` file lists category names (line order
//! defines the category index) and each image gets a `.txt` file with one
//! line per box: `<index> <cx> <cy> <w> <h>`, all four values normalized to
//! the [0,1] range. Annotation files pair with images by filename stem.
//!
//! The format cannot represent polygons or nested parts; the encoder skips
//! those shapes and records an explicit error entry for each one instead of
//! dropping them silently.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::color_utils;
use crate::format::error::FormatError;
use crate::format::traits::{AnnotationCodec, CancelFlag, DecodedBatch, EncodedBatch};
use crate::model::{AnnotationSet, Category, ImageAnnotation, ImageIndex, Rect, ShapeData};

/// Name of the class index file that accompanies the per-image files.
pub const OBJECT_DATA_FILE: &str = "object.data";

/// YOLO text format.
pub struct YoloCodec;

impl AnnotationCodec for YoloCodec {
    fn id(&self) -> &'static str {
        "yolo"
    }

    fn display_name(&self) -> &'static str {
        "YOLO (txt)"
    }

    fn extensions(&self) -> &[&'static str] {
        &["txt"]
    }

    fn supports_polygons(&self) -> bool {
        false
    }

    fn supports_parts(&self) -> bool {
        false
    }

    fn per_image(&self) -> bool {
        true
    }

    fn auxiliary_files(&self) -> &[&'static str] {
        &[OBJECT_DATA_FILE]
    }

    fn decode(
        &self,
        files: &BTreeMap<String, String>,
        images: &ImageIndex,
        cancel: &CancelFlag,
    ) -> Result<DecodedBatch, FormatError> {
        let mut batch = DecodedBatch::new();

        // Without the class list no line can be resolved to a category, so
        // the whole batch fails with a single entry.
        let Some(class_data) = files.get(OBJECT_DATA_FILE) else {
            batch.add_error(OBJECT_DATA_FILE, "Missing required file: object.data");
            return Ok(batch);
        };
        let classes: Vec<&str> = class_data
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        for (index, name) in classes.iter().enumerate() {
            batch.add_category(Category::new(
                name,
                color_utils::default_category_color(index),
            ));
        }

        for (name, content) in files {
            if cancel.is_cancelled() {
                log::info!("YOLO import cancelled after {} files", batch.success_count);
                break;
            }
            if name == OBJECT_DATA_FILE || !name.ends_with(".txt") {
                continue;
            }
            decode_file(name, content, &classes, images, &mut batch);
        }

        log::info!(
            "Imported {} YOLO files ({} errors)",
            batch.success_count,
            batch.errors.len()
        );
        Ok(batch)
    }

    fn encode(&self, set: &AnnotationSet) -> Result<EncodedBatch, FormatError> {
        let mut batch = EncodedBatch::new();

        let mut class_data = String::new();
        for category in set.categories().iter() {
            class_data.push_str(&category.name);
            class_data.push('\n');
        }
        batch.add_file(OBJECT_DATA_FILE, class_data);

        for (file_name, annotation) in set.iter() {
            encode_file(file_name, annotation, set, &mut batch);
        }

        log::info!(
            "Exported {} shapes to {} YOLO files ({} unrepresentable)",
            batch.shapes_encoded,
            batch.files.len().saturating_sub(1),
            batch.errors.len()
        );
        Ok(batch)
    }
}

fn decode_file(
    source: &str,
    content: &str,
    classes: &[&str],
    images: &ImageIndex,
    batch: &mut DecodedBatch,
) {
    let stem = source.strip_suffix(".txt").unwrap_or(source);
    let matches = images.matches_for_stem(stem);
    let meta = match matches.as_slice() {
        [] => {
            batch.add_error(source, "No associated image file.");
            return;
        }
        [meta] => (*meta).clone(),
        _ => {
            batch.add_error(source, "More than one associated image file.");
            return;
        }
    };

    let width = f64::from(meta.width);
    let height = f64::from(meta.height);

    let mut shapes = Vec::new();
    let mut line_count = 0usize;
    for (number, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        line_count += 1;
        match parse_line(line, classes, width, height) {
            Ok(shape) => shapes.push(shape),
            Err(message) => batch.add_error(source, format!("Line {}: {message}", number + 1)),
        }
    }

    // A file with lines but no surviving shape is a failure; an empty file
    // is a valid (if pointless) success.
    if line_count > 0 && shapes.is_empty() {
        return;
    }

    batch.success_count += 1;
    if !shapes.is_empty() {
        batch.annotations.push(ImageAnnotation::new(meta, shapes));
    }
}

/// Parse one `<index> <cx> <cy> <w> <h>` line into a box shape.
fn parse_line(
    line: &str,
    classes: &[&str],
    width: f64,
    height: f64,
) -> Result<ShapeData, String> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() != 5 {
        return Err(format!("expected 5 values, found {}", tokens.len()));
    }

    let index: usize = tokens[0]
        .parse()
        .map_err(|_| format!("invalid category index: {}", tokens[0]))?;
    let Some(category) = classes.get(index) else {
        return Err(format!(
            "category index {index} out of range ({} categories)",
            classes.len()
        ));
    };

    let mut values = [0.0f64; 4];
    for (i, token) in tokens[1..].iter().enumerate() {
        let value: f64 = token
            .parse()
            .map_err(|_| format!("invalid coordinate value: {token}"))?;
        if !(0.0..=1.0).contains(&value) {
            return Err(format!("coordinate out of range [0, 1]: {token}"));
        }
        values[i] = value;
    }

    let bounds = yolo_to_rect(values[0], values[1], values[2], values[3], width, height);
    if !bounds.is_ordered() {
        return Err("inverted bounding box after de-normalization".to_string());
    }

    Ok(ShapeData::new_box(category, bounds))
}

/// De-normalize a center/size tuple into absolute pixel bounds, clamping
/// the tiny excursions outside the frame that six-digit rounding produces.
fn yolo_to_rect(cx: f64, cy: f64, w: f64, h: f64, width: f64, height: f64) -> Rect {
    Rect::new(
        ((cx - w / 2.0) * width).max(0.0),
        ((cy - h / 2.0) * height).max(0.0),
        ((cx + w / 2.0) * width).min(width),
        ((cy + h / 2.0) * height).min(height),
    )
}

fn encode_file(
    file_name: &str,
    annotation: &ImageAnnotation,
    set: &AnnotationSet,
    batch: &mut EncodedBatch,
) {
    let output = format!("{}.txt", annotation.meta.stem());
    if batch.files.contains_key(&output) {
        batch.add_error(
            file_name,
            format!("Annotation file name {output} is already used by another image."),
        );
        return;
    }

    let width = f64::from(annotation.meta.width);
    let height = f64::from(annotation.meta.height);

    let mut lines = String::new();
    let mut encoded = 0usize;
    for shape in &annotation.shapes {
        match shape {
            ShapeData::Box { bounds, .. } => {
                // Registry order defines the class index; the category is
                // guaranteed present because the set creates it on insert.
                let Some(index) = set.categories().index_of(shape.category()) else {
                    batch.add_error(
                        file_name,
                        format!("Unknown category: {}", shape.category()),
                    );
                    continue;
                };
                let cx = (bounds.x_min + bounds.x_max) / 2.0 / width;
                let cy = (bounds.y_min + bounds.y_max) / 2.0 / height;
                let w = bounds.width() / width;
                let h = bounds.height() / height;
                let _ = writeln!(lines, "{index} {cx:.6} {cy:.6} {w:.6} {h:.6}");
                encoded += 1;
            }
            ShapeData::Polygon { .. } => {
                batch.add_error(
                    file_name,
                    format!(
                        "Polygon shape '{}' cannot be represented in YOLO format.",
                        shape.category()
                    ),
                );
            }
        }
        for part in shape.parts() {
            part.visit(&mut |p| {
                batch.add_error(
                    file_name,
                    format!(
                        "Nested part '{}' cannot be represented in YOLO format.",
                        p.category()
                    ),
                );
            });
        }
    }

    batch.shapes_encoded += encoded;
    if encoded > 0 {
        batch.add_file(output, lines);
    }
}
