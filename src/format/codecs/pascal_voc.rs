//! Pascal VOC XML format implementation.
//!
//! One XML document per image. File coordinates follow the VOC convention
//! of 1-based inclusive integers; the reader converts them to the internal
//! 0-based half-open form (`x_min = xmin - 1`, `x_max = xmax`) and the
//! writer applies the inverse, so a write/read cycle is lossless. Polygon
//! points are carried verbatim as absolute pixel values.
//!
//! Nested `<parts><object>...</object></parts>` elements map to the shape's
//! child parts. Shape tags map to the VOC flag elements: `truncated`,
//! `difficult` and `occluded` become 0/1 flags, a `pose: X` tag becomes
//! `<pose>X</pose>`, and remaining tags become repeated `<action>`
//! elements. The writer emits a fixed element order with two-space
//! indentation, so exporting a previously imported file reproduces it byte
//! for byte.

use std::collections::BTreeMap;
use std::io::Write;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::color_utils;
use crate::format::codecs::format_coord;
use crate::format::error::FormatError;
use crate::format::traits::{AnnotationCodec, CancelFlag, DecodedBatch, EncodedBatch};
use crate::model::{
    AnnotationSet, Category, ImageAnnotation, ImageIndex, MIN_POLYGON_POINTS, Point, Rect,
    ShapeData,
};

/// Pascal VOC XML format.
pub struct PascalVocCodec;

impl AnnotationCodec for PascalVocCodec {
    fn id(&self) -> &'static str {
        "voc"
    }

    fn display_name(&self) -> &'static str {
        "Pascal VOC (XML)"
    }

    fn extensions(&self) -> &[&'static str] {
        &["xml"]
    }

    fn supports_polygons(&self) -> bool {
        true
    }

    fn supports_parts(&self) -> bool {
        true
    }

    fn per_image(&self) -> bool {
        true
    }

    fn decode(
        &self,
        files: &BTreeMap<String, String>,
        images: &ImageIndex,
        cancel: &CancelFlag,
    ) -> Result<DecodedBatch, FormatError> {
        let mut batch = DecodedBatch::new();

        for (name, content) in files {
            if cancel.is_cancelled() {
                log::info!("Pascal VOC import cancelled after {} files", batch.success_count);
                break;
            }
            if !name.ends_with(".xml") {
                continue;
            }
            decode_file(name, content, images, &mut batch);
        }

        log::info!(
            "Imported {} Pascal VOC files ({} errors)",
            batch.success_count,
            batch.errors.len()
        );
        Ok(batch)
    }

    fn encode(&self, set: &AnnotationSet) -> Result<EncodedBatch, FormatError> {
        let mut batch = EncodedBatch::new();

        for (file_name, annotation) in set.iter() {
            let output = format!("{}.xml", annotation.meta.stem());
            // Output names are stem-based, so images differing only by
            // extension would overwrite each other.
            if batch.files.contains_key(&output) {
                batch.add_error(
                    file_name,
                    format!("Annotation file name {output} is already used by another image."),
                );
                continue;
            }
            let content = build_xml(annotation, &mut batch)?;
            batch.add_file(output, content);
            log::debug!("Encoded Pascal VOC annotations for {file_name}");
        }

        log::info!(
            "Exported {} shapes to {} Pascal VOC files",
            batch.shapes_encoded,
            batch.files.len()
        );
        Ok(batch)
    }
}

// ============================================================================
// Reading
// ============================================================================

/// Raw per-object fields collected before validation.
#[derive(Default)]
struct RawObject {
    name: Option<String>,
    pose: Option<String>,
    truncated: Option<String>,
    difficult: Option<String>,
    occluded: Option<String>,
    actions: Vec<String>,
    has_bndbox: bool,
    xmin: Option<String>,
    ymin: Option<String>,
    xmax: Option<String>,
    ymax: Option<String>,
    polygon: Option<Vec<(String, String)>>,
    parts: Vec<RawObject>,
}

fn decode_file(source: &str, content: &str, images: &ImageIndex, batch: &mut DecodedBatch) {
    let parsed = match parse_document(content) {
        Ok(parsed) => parsed,
        Err(message) => {
            batch.add_error(source, message);
            return;
        }
    };

    let Some(filename) = parsed.filename.filter(|f| !f.is_empty()) else {
        batch.add_error(source, "Missing element: filename");
        return;
    };

    let Some(meta) = images.get(&filename) else {
        batch.add_error(
            source,
            format!("Image file {filename} does not belong to the currently loaded image files."),
        );
        return;
    };

    // The <size> element is preferred for bounds validation; fall back to
    // the loaded image's dimensions when it is absent.
    let (width, height) = match (parsed.width, parsed.height) {
        (Some(w), Some(h)) if w > 0.0 && h > 0.0 => (w, h),
        (None, None) => (f64::from(meta.width), f64::from(meta.height)),
        _ => {
            batch.add_error(source, "Invalid value for element: size");
            return;
        }
    };

    let mut shapes = Vec::new();
    for raw in parsed.objects {
        if let Some(shape) = convert_object(raw, width, height, source, batch) {
            shapes.push(shape);
        }
    }

    batch.success_count += 1;
    if !shapes.is_empty() {
        batch
            .annotations
            .push(ImageAnnotation::new(meta.clone(), shapes));
    }
}

struct ParsedDocument {
    filename: Option<String>,
    width: Option<f64>,
    height: Option<f64>,
    objects: Vec<RawObject>,
}

/// Parse a whole VOC document. Any structural XML problem aborts the file
/// with a message; element-level validation happens later.
fn parse_document(content: &str) -> Result<ParsedDocument, String> {
    let mut reader = Reader::from_str(content);
    reader.trim_text(true);

    let mut parsed = ParsedDocument {
        filename: None,
        width: None,
        height: None,
        objects: Vec::new(),
    };

    loop {
        match reader.read_event().map_err(|e| format!("Corrupt XML file: {e}"))? {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                match name.as_str() {
                    "annotation" => {}
                    "filename" => parsed.filename = Some(read_leaf_text(&mut reader, "filename")?),
                    "size" => parse_size(&mut reader, &mut parsed)?,
                    "object" => parsed.objects.push(parse_object(&mut reader)?),
                    other => {
                        // folder, segmented, source, ... are leaves we skip.
                        read_leaf_text(&mut reader, other)?;
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(parsed)
}

fn parse_size(reader: &mut Reader<&[u8]>, parsed: &mut ParsedDocument) -> Result<(), String> {
    loop {
        match reader.read_event().map_err(|e| format!("Corrupt XML file: {e}"))? {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                let text = read_leaf_text(reader, &name)?;
                match name.as_str() {
                    "width" => parsed.width = text.parse().ok().or(Some(-1.0)),
                    "height" => parsed.height = text.parse().ok().or(Some(-1.0)),
                    _ => {}
                }
            }
            Event::End(e) if e.name().as_ref() == b"size" => return Ok(()),
            Event::Eof => return Err("Corrupt XML file: unexpected end of document".to_string()),
            _ => {}
        }
    }
}

/// Parse one `<object>` element, recursing into `<parts>`.
fn parse_object(reader: &mut Reader<&[u8]>) -> Result<RawObject, String> {
    let mut raw = RawObject::default();

    loop {
        match reader.read_event().map_err(|e| format!("Corrupt XML file: {e}"))? {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                match name.as_str() {
                    "bndbox" => parse_bndbox(reader, &mut raw)?,
                    "polygon" => raw.polygon = Some(parse_polygon(reader)?),
                    "parts" => parse_parts(reader, &mut raw)?,
                    "name" => raw.name = Some(read_leaf_text(reader, "name")?),
                    "pose" => raw.pose = Some(read_leaf_text(reader, "pose")?),
                    "truncated" => raw.truncated = Some(read_leaf_text(reader, "truncated")?),
                    "difficult" => raw.difficult = Some(read_leaf_text(reader, "difficult")?),
                    "occluded" => raw.occluded = Some(read_leaf_text(reader, "occluded")?),
                    "action" => raw.actions.push(read_leaf_text(reader, "action")?),
                    other => {
                        read_leaf_text(reader, other)?;
                    }
                }
            }
            Event::End(e) if e.name().as_ref() == b"object" => return Ok(raw),
            Event::Eof => return Err("Corrupt XML file: unexpected end of document".to_string()),
            _ => {}
        }
    }
}

fn parse_bndbox(reader: &mut Reader<&[u8]>, raw: &mut RawObject) -> Result<(), String> {
    raw.has_bndbox = true;
    loop {
        match reader.read_event().map_err(|e| format!("Corrupt XML file: {e}"))? {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                let text = read_leaf_text(reader, &name)?;
                match name.as_str() {
                    "xmin" => raw.xmin = Some(text),
                    "ymin" => raw.ymin = Some(text),
                    "xmax" => raw.xmax = Some(text),
                    "ymax" => raw.ymax = Some(text),
                    _ => {}
                }
            }
            Event::End(e) if e.name().as_ref() == b"bndbox" => return Ok(()),
            Event::Eof => return Err("Corrupt XML file: unexpected end of document".to_string()),
            _ => {}
        }
    }
}

/// Collect the `<x_1>/<y_1>/.../<x_n>/<y_n>` children of a `<polygon>` in
/// document order, values kept as raw text.
fn parse_polygon(reader: &mut Reader<&[u8]>) -> Result<Vec<(String, String)>, String> {
    let mut coords = Vec::new();
    loop {
        match reader.read_event().map_err(|e| format!("Corrupt XML file: {e}"))? {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                let text = read_leaf_text(reader, &name)?;
                coords.push((name, text));
            }
            Event::End(e) if e.name().as_ref() == b"polygon" => return Ok(coords),
            Event::Eof => return Err("Corrupt XML file: unexpected end of document".to_string()),
            _ => {}
        }
    }
}

fn parse_parts(reader: &mut Reader<&[u8]>, raw: &mut RawObject) -> Result<(), String> {
    loop {
        match reader.read_event().map_err(|e| format!("Corrupt XML file: {e}"))? {
            Event::Start(e) if e.name().as_ref() == b"object" => {
                raw.parts.push(parse_object(reader)?);
            }
            Event::End(e) if e.name().as_ref() == b"parts" => return Ok(()),
            Event::Eof => return Err("Corrupt XML file: unexpected end of document".to_string()),
            _ => {}
        }
    }
}

/// Read the text content of a leaf element up to its matching end tag.
fn read_leaf_text(reader: &mut Reader<&[u8]>, end: &str) -> Result<String, String> {
    let mut text = String::new();
    loop {
        match reader.read_event().map_err(|e| format!("Corrupt XML file: {e}"))? {
            Event::Text(t) => text = t.unescape().unwrap_or_default().to_string(),
            Event::End(e) if e.name().as_ref() == end.as_bytes() => return Ok(text),
            Event::Eof => return Err("Corrupt XML file: unexpected end of document".to_string()),
            _ => {}
        }
    }
}

/// Validate a raw object and convert it into shape data.
///
/// A missing or invalid critical element drops this object (one error
/// entry) but not its siblings; a dropped part never drops its parent.
fn convert_object(
    raw: RawObject,
    width: f64,
    height: f64,
    source: &str,
    batch: &mut DecodedBatch,
) -> Option<ShapeData> {
    let name = match raw.name.as_deref() {
        Some(n) if !n.is_empty() => n.to_string(),
        _ => {
            batch.add_error(source, "Missing element: name");
            return None;
        }
    };

    let tags = tags_from_flags(&raw);

    let mut shape = if raw.has_bndbox {
        let coords = [
            ("xmin", &raw.xmin),
            ("ymin", &raw.ymin),
            ("xmax", &raw.xmax),
            ("ymax", &raw.ymax),
        ];
        let mut values = [0.0f64; 4];
        for (i, (elem, value)) in coords.iter().enumerate() {
            let Some(text) = value else {
                batch.add_error(source, format!("Missing element: {elem}"));
                return None;
            };
            match text.parse::<f64>() {
                Ok(v) => values[i] = v,
                Err(_) => {
                    batch.add_error(source, format!("Invalid value for element: {elem}"));
                    return None;
                }
            }
        }
        // VOC files are 1-based inclusive; internal form is 0-based half-open.
        let bounds = Rect::new(values[0] - 1.0, values[1] - 1.0, values[2], values[3]);
        ShapeData::new_box(&name, bounds).with_tags(tags)
    } else if let Some(coords) = raw.polygon {
        let points = match polygon_points(&coords) {
            Ok(points) => points,
            Err(message) => {
                batch.add_error(source, message);
                return None;
            }
        };
        ShapeData::new_polygon(&name, points).with_tags(tags)
    } else {
        batch.add_error(source, "Missing element: bndbox");
        return None;
    };

    // Geometry checks apply to this object only; parts validate themselves.
    if let Err(message) = validate_own_geometry(&shape, width, height) {
        batch.add_error(source, message);
        return None;
    }

    register_category(batch, &name);

    for part in raw.parts {
        if let Some(child) = convert_object(part, width, height, source, batch) {
            shape.parts_mut().push(child);
        }
    }

    Some(shape)
}

/// Pair the raw polygon coordinate elements into points.
fn polygon_points(coords: &[(String, String)]) -> Result<Vec<Point>, String> {
    if coords.len() % 2 != 0 {
        return Err("Invalid polygon element: odd number of coordinates".to_string());
    }
    let mut points = Vec::with_capacity(coords.len() / 2);
    for pair in coords.chunks(2) {
        let (x_name, x_text) = &pair[0];
        let (y_name, y_text) = &pair[1];
        if !x_name.starts_with('x') || !y_name.starts_with('y') {
            return Err("Invalid polygon element: expected alternating x/y coordinates".to_string());
        }
        let x: f64 = x_text
            .parse()
            .map_err(|_| format!("Invalid value for element: {x_name}"))?;
        let y: f64 = y_text
            .parse()
            .map_err(|_| format!("Invalid value for element: {y_name}"))?;
        points.push(Point::new(x, y));
    }
    if points.len() < MIN_POLYGON_POINTS {
        return Err(format!(
            "A polygon must have at least {MIN_POLYGON_POINTS} points."
        ));
    }
    Ok(points)
}

/// Validate the geometry of a single shape, ignoring its parts.
fn validate_own_geometry(shape: &ShapeData, width: f64, height: f64) -> Result<(), String> {
    match shape {
        ShapeData::Box { bounds, .. } => {
            if !bounds.is_ordered() {
                return Err(
                    "Invalid bounding-box coordinates (min must be less than max)".to_string()
                );
            }
            if !bounds.is_within(width, height) {
                return Err("Bounding-box coordinates outside image bounds".to_string());
            }
        }
        ShapeData::Polygon { points, .. } => {
            if let Some(p) = points.iter().find(|p| !p.is_within(width, height)) {
                return Err(format!(
                    "Polygon point ({}, {}) outside image bounds",
                    p.x, p.y
                ));
            }
        }
    }
    Ok(())
}

/// Reconstruct canonical tags from VOC flag elements: pose first, then the
/// 0/1 flags, then action tags.
fn tags_from_flags(raw: &RawObject) -> Vec<String> {
    let mut tags = Vec::new();
    if let Some(pose) = raw.pose.as_deref()
        && !pose.is_empty()
        && pose != "Unspecified"
    {
        tags.push(format!("pose: {pose}"));
    }
    for (flag, value) in [
        ("truncated", &raw.truncated),
        ("difficult", &raw.difficult),
        ("occluded", &raw.occluded),
    ] {
        if value.as_deref() == Some("1") {
            tags.push(flag.to_string());
        }
    }
    tags.extend(raw.actions.iter().cloned());
    tags
}

fn register_category(batch: &mut DecodedBatch, name: &str) {
    if !batch.categories.iter().any(|c| c.name == name) {
        let color = color_utils::default_category_color(batch.categories.len());
        batch.categories.push(Category::new(name, color));
    }
}

// ============================================================================
// Writing
// ============================================================================

/// Build the XML document for one image's annotations.
fn build_xml(annotation: &ImageAnnotation, batch: &mut EncodedBatch) -> Result<String, FormatError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", None, None)))
        .map_err(|e| FormatError::Xml(e.into()))?;

    writer
        .write_event(Event::Start(BytesStart::new("annotation")))
        .map_err(|e| FormatError::Xml(e.into()))?;

    write_text_element(&mut writer, "filename", &annotation.meta.file_name)?;

    writer
        .write_event(Event::Start(BytesStart::new("size")))
        .map_err(|e| FormatError::Xml(e.into()))?;
    write_text_element(&mut writer, "width", &annotation.meta.width.to_string())?;
    write_text_element(&mut writer, "height", &annotation.meta.height.to_string())?;
    write_text_element(&mut writer, "depth", "3")?;
    writer
        .write_event(Event::End(BytesEnd::new("size")))
        .map_err(|e| FormatError::Xml(e.into()))?;

    for shape in &annotation.shapes {
        write_object(&mut writer, shape, &annotation.meta.file_name, batch)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("annotation")))
        .map_err(|e| FormatError::Xml(e.into()))?;

    let result = writer.into_inner();
    String::from_utf8(result).map_err(|_| FormatError::invalid_format("Invalid UTF-8 in XML"))
}

/// Write one `<object>` element, recursing into parts.
fn write_object<W: Write>(
    writer: &mut Writer<W>,
    shape: &ShapeData,
    image_name: &str,
    batch: &mut EncodedBatch,
) -> Result<(), FormatError> {
    if let ShapeData::Polygon { points, .. } = shape
        && points.len() < MIN_POLYGON_POINTS
    {
        batch.add_error(
            image_name,
            format!("A polygon must have at least {MIN_POLYGON_POINTS} points."),
        );
        return Ok(());
    }

    writer
        .write_event(Event::Start(BytesStart::new("object")))
        .map_err(|e| FormatError::Xml(e.into()))?;

    write_text_element(writer, "name", shape.category())?;

    let tags = shape.tags();
    let pose = tags
        .iter()
        .find_map(|t| t.strip_prefix("pose: "))
        .unwrap_or("Unspecified");
    write_text_element(writer, "pose", pose)?;
    for flag in ["truncated", "difficult", "occluded"] {
        let value = if tags.iter().any(|t| t == flag) { "1" } else { "0" };
        write_text_element(writer, flag, value)?;
    }
    for tag in tags {
        if tag.starts_with("pose: ") || ["truncated", "difficult", "occluded"].contains(&tag.as_str())
        {
            continue;
        }
        write_text_element(writer, "action", tag)?;
    }

    match shape {
        ShapeData::Box { bounds, .. } => {
            writer
                .write_event(Event::Start(BytesStart::new("bndbox")))
                .map_err(|e| FormatError::Xml(e.into()))?;
            // Inverse of the read-side conversion: back to 1-based inclusive.
            write_text_element(writer, "xmin", &format_coord(bounds.x_min + 1.0))?;
            write_text_element(writer, "ymin", &format_coord(bounds.y_min + 1.0))?;
            write_text_element(writer, "xmax", &format_coord(bounds.x_max))?;
            write_text_element(writer, "ymax", &format_coord(bounds.y_max))?;
            writer
                .write_event(Event::End(BytesEnd::new("bndbox")))
                .map_err(|e| FormatError::Xml(e.into()))?;
        }
        ShapeData::Polygon { points, .. } => {
            writer
                .write_event(Event::Start(BytesStart::new("polygon")))
                .map_err(|e| FormatError::Xml(e.into()))?;
            for (i, point) in points.iter().enumerate() {
                write_text_element(writer, &format!("x_{}", i + 1), &format_coord(point.x))?;
                write_text_element(writer, &format!("y_{}", i + 1), &format_coord(point.y))?;
            }
            writer
                .write_event(Event::End(BytesEnd::new("polygon")))
                .map_err(|e| FormatError::Xml(e.into()))?;
        }
    }

    batch.shapes_encoded += 1;

    if !shape.parts().is_empty() {
        writer
            .write_event(Event::Start(BytesStart::new("parts")))
            .map_err(|e| FormatError::Xml(e.into()))?;
        for part in shape.parts() {
            write_object(writer, part, image_name, batch)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new("parts")))
            .map_err(|e| FormatError::Xml(e.into()))?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("object")))
        .map_err(|e| FormatError::Xml(e.into()))?;

    Ok(())
}

/// Write a simple text element.
fn write_text_element<W: Write>(
    writer: &mut Writer<W>,
    name: &str,
    value: &str,
) -> Result<(), FormatError> {
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .map_err(|e| FormatError::Xml(e.into()))?;
    writer
        .write_event(Event::Text(BytesText::new(value)))
        .map_err(|e| FormatError::Xml(e.into()))?;
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(|e| FormatError::Xml(e.into()))?;
    Ok(())
}
