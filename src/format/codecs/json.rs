//! Custom JSON format implementation.
//!
//! A single document covers the whole set: a top-level array of shape
//! entries, one per top-level shape, in image order then forest order.
//! Nested parts repeat the entry schema without the `fileName` field.
//! `tags` and `parts` are omitted when empty, and the category color
//! travels with each entry as a `#rrggbb` string.
//!
//! Decoding walks `serde_json::Value` by hand so each invalid entry can be
//! reported individually (a serde struct would reject the whole document);
//! encoding uses serde derive, which pins the field order.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::color_utils;
use crate::format::error::FormatError;
use crate::format::traits::{AnnotationCodec, CancelFlag, DecodedBatch, EncodedBatch};
use crate::model::{
    AnnotationSet, Category, ImageAnnotation, ImageIndex, ImageMetaData, MIN_POLYGON_POINTS,
    Point, Rect, ShapeData,
};

/// Default document name used when encoding.
pub const JSON_FILE: &str = "annotations.json";

/// Custom JSON format.
pub struct JsonCodec;

impl AnnotationCodec for JsonCodec {
    fn id(&self) -> &'static str {
        "json"
    }

    fn display_name(&self) -> &'static str {
        "JSON"
    }

    fn extensions(&self) -> &[&'static str] {
        &["json"]
    }

    fn supports_polygons(&self) -> bool {
        true
    }

    fn supports_parts(&self) -> bool {
        true
    }

    fn per_image(&self) -> bool {
        false
    }

    fn decode(
        &self,
        files: &BTreeMap<String, String>,
        images: &ImageIndex,
        _cancel: &CancelFlag,
    ) -> Result<DecodedBatch, FormatError> {
        let mut batch = DecodedBatch::new();
        let Some((document, content)) = files.iter().next() else {
            return Ok(batch);
        };

        let root: Value = match serde_json::from_str(content) {
            Ok(root) => root,
            Err(e) => {
                batch.add_error(document, format!("Corrupt JSON file: {e}"));
                return Ok(batch);
            }
        };
        let Some(entries) = root.as_array() else {
            batch.add_error(document, "Expected a top-level array of annotation entries");
            return Ok(batch);
        };

        // Entries for the same image accumulate into one annotation.
        let mut by_image: BTreeMap<String, (ImageMetaData, Vec<ShapeData>)> = BTreeMap::new();

        for entry in entries {
            match decode_entry(entry, document, images, &mut batch) {
                Ok((meta, shape)) => {
                    batch.success_count += 1;
                    by_image
                        .entry(meta.file_name.clone())
                        .or_insert_with(|| (meta, Vec::new()))
                        .1
                        .push(shape);
                }
                Err((source, message)) => batch.add_error(source, message),
            }
        }

        for (_, (meta, shapes)) in by_image {
            batch.annotations.push(ImageAnnotation::new(meta, shapes));
        }

        log::info!(
            "Imported {} JSON entries ({} errors)",
            batch.success_count,
            batch.errors.len()
        );
        Ok(batch)
    }

    fn encode(&self, set: &AnnotationSet) -> Result<EncodedBatch, FormatError> {
        let mut batch = EncodedBatch::new();

        let mut entries = Vec::new();
        for (file_name, annotation) in set.iter() {
            for shape in &annotation.shapes {
                entries.push(entry_out(shape, Some(file_name.as_str()), set));
                batch.shapes_encoded += shape.node_count();
            }
        }

        let content = serde_json::to_string_pretty(&entries)?;
        batch.add_file(JSON_FILE, content);

        log::info!(
            "Exported {} shapes as {} JSON entries",
            batch.shapes_encoded,
            entries.len()
        );
        Ok(batch)
    }
}

// ============================================================================
// Reading
// ============================================================================

type EntryError = (String, String);

/// Decode one top-level entry. Errors carry the source they should be
/// attributed to: the image file name when known, else the document name.
fn decode_entry(
    entry: &Value,
    document: &str,
    images: &ImageIndex,
    batch: &mut DecodedBatch,
) -> Result<(ImageMetaData, ShapeData), EntryError> {
    let doc_err = |message: &str| (document.to_string(), message.to_string());

    let Some(object) = entry.as_object() else {
        return Err(doc_err("Entry is not a JSON object"));
    };
    let Some(file_name) = object.get("fileName").and_then(Value::as_str) else {
        return Err(doc_err("Missing field: fileName"));
    };
    let Some(meta) = images.get(file_name) else {
        return Err((
            file_name.to_string(),
            format!(
                "Image file {file_name} does not belong to the currently loaded image files."
            ),
        ));
    };

    let width = f64::from(meta.width);
    let height = f64::from(meta.height);
    let shape = parse_shape(object, width, height, batch)
        .map_err(|message| (file_name.to_string(), message))?;

    Ok((meta.clone(), shape))
}

/// Parse one entry object (top-level or nested part) into a shape,
/// registering its category. Any problem in a nested part fails the whole
/// entry.
fn parse_shape(
    object: &serde_json::Map<String, Value>,
    width: f64,
    height: f64,
    batch: &mut DecodedBatch,
) -> Result<ShapeData, String> {
    let Some(category) = object.get("category").and_then(Value::as_str) else {
        return Err("Missing field: category".to_string());
    };

    let color = match object.get("color") {
        Some(Value::String(s)) => color_utils::parse_hex(s)
            .ok_or_else(|| format!("Malformed color value: {s}"))?,
        Some(_) => return Err("Malformed color value".to_string()),
        None => color_utils::default_category_color(batch.categories.len()),
    };

    let tags = match object.get("tags") {
        Some(Value::Array(values)) => values
            .iter()
            .map(|v| v.as_str().map(str::to_string))
            .collect::<Option<Vec<String>>>()
            .ok_or("Invalid tags field")?,
        Some(_) => return Err("Invalid tags field".to_string()),
        None => Vec::new(),
    };

    let mut shape = match (object.get("bndbox"), object.get("polygon")) {
        (Some(_), Some(_)) => {
            return Err("Ambiguous shape: entry has both bndbox and polygon".to_string());
        }
        (Some(bndbox), None) => {
            let bounds = parse_bndbox(bndbox, width, height)?;
            ShapeData::new_box(category, bounds).with_tags(tags)
        }
        (None, Some(polygon)) => {
            let points = parse_polygon(polygon, width, height)?;
            ShapeData::new_polygon(category, points).with_tags(tags)
        }
        (None, None) => return Err("Missing field: bndbox or polygon".to_string()),
    };

    batch.add_category(Category::new(category, color));

    if let Some(parts) = object.get("parts") {
        let Some(parts) = parts.as_array() else {
            return Err("Invalid parts field".to_string());
        };
        for part in parts {
            let Some(part) = part.as_object() else {
                return Err("Entry is not a JSON object".to_string());
            };
            shape
                .parts_mut()
                .push(parse_shape(part, width, height, batch)?);
        }
    }

    Ok(shape)
}

fn parse_bndbox(value: &Value, width: f64, height: f64) -> Result<Rect, String> {
    let Some(object) = value.as_object() else {
        return Err("Invalid bndbox field".to_string());
    };
    let mut values = [0.0f64; 4];
    for (i, field) in ["minX", "minY", "maxX", "maxY"].iter().enumerate() {
        let Some(v) = object.get(*field) else {
            return Err(format!("Missing field: {field}"));
        };
        values[i] = v
            .as_f64()
            .ok_or_else(|| format!("Invalid numeric field: {field}"))?;
    }

    let bounds = Rect::new(values[0], values[1], values[2], values[3]);
    if !bounds.is_ordered() {
        return Err("Invalid bounding-box coordinates (min must be less than max)".to_string());
    }
    for (field, value, limit) in [
        ("minX", bounds.x_min, width),
        ("minY", bounds.y_min, height),
        ("maxX", bounds.x_max, width),
        ("maxY", bounds.y_max, height),
    ] {
        if value < 0.0 || value > limit {
            return Err(format!("Field {field} outside image bounds"));
        }
    }
    Ok(bounds)
}

fn parse_polygon(value: &Value, width: f64, height: f64) -> Result<Vec<Point>, String> {
    let Some(values) = value.as_array() else {
        return Err("Invalid polygon list".to_string());
    };
    if values.len() % 2 != 0 {
        return Err("Invalid polygon list: odd number of coordinates".to_string());
    }
    let coords = values
        .iter()
        .map(Value::as_f64)
        .collect::<Option<Vec<f64>>>()
        .ok_or("Invalid polygon list: non-numeric coordinate")?;

    let points: Vec<Point> = coords
        .chunks(2)
        .map(|pair| Point::new(pair[0], pair[1]))
        .collect();
    if points.len() < MIN_POLYGON_POINTS {
        return Err(format!(
            "A polygon must have at least {MIN_POLYGON_POINTS} points."
        ));
    }
    if let Some(p) = points.iter().find(|p| !p.is_within(width, height)) {
        return Err(format!(
            "Polygon point ({}, {}) outside image bounds",
            p.x, p.y
        ));
    }
    Ok(points)
}

// ============================================================================
// Writing
// ============================================================================

#[derive(Serialize)]
struct EntryOut<'a> {
    #[serde(rename = "fileName", skip_serializing_if = "Option::is_none")]
    file_name: Option<&'a str>,
    category: &'a str,
    color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    bndbox: Option<BndboxOut>,
    #[serde(skip_serializing_if = "Option::is_none")]
    polygon: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tags: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    parts: Vec<EntryOut<'a>>,
}

#[derive(Serialize)]
struct BndboxOut {
    #[serde(rename = "minX")]
    min_x: f64,
    #[serde(rename = "minY")]
    min_y: f64,
    #[serde(rename = "maxX")]
    max_x: f64,
    #[serde(rename = "maxY")]
    max_y: f64,
}

fn entry_out<'a>(shape: &'a ShapeData, file_name: Option<&'a str>, set: &AnnotationSet) -> EntryOut<'a> {
    let color = set
        .categories()
        .get(shape.category())
        .map(|c| color_utils::to_hex(c.color))
        .unwrap_or_else(|| color_utils::to_hex([0, 0, 0]));

    let (bndbox, polygon) = match shape {
        ShapeData::Box { bounds, .. } => (
            Some(BndboxOut {
                min_x: bounds.x_min,
                min_y: bounds.y_min,
                max_x: bounds.x_max,
                max_y: bounds.y_max,
            }),
            None,
        ),
        ShapeData::Polygon { points, .. } => (
            None,
            Some(points.iter().flat_map(|p| [p.x, p.y]).collect()),
        ),
    };

    EntryOut {
        file_name,
        category: shape.category(),
        color,
        bndbox,
        polygon,
        tags: shape.tags().to_vec(),
        parts: shape
            .parts()
            .iter()
            .map(|part| entry_out(part, None, set))
            .collect(),
    }
}
