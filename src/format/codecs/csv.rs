//! CSV format implementation.
//!
//! Single file with the header `image,category,color,xMin,yMin,xMax,yMax`,
//! box shapes only. Export flattens nested parts into top-level rows,
//! depth-first, so the structure is lossy but every box survives; polygons
//! are skipped with an error entry each. Row order is fully deterministic:
//! image name order, then forest order.
//!
//! Records are validated field by field instead of deserialized, so every
//! bad row gets its own line-numbered error entry.

use std::collections::BTreeMap;

use csv::{ReaderBuilder, StringRecord, Writer};

use crate::color_utils;
use crate::format::codecs::format_coord;
use crate::format::error::FormatError;
use crate::format::traits::{AnnotationCodec, CancelFlag, DecodedBatch, EncodedBatch};
use crate::model::{
    AnnotationSet, Category, ImageAnnotation, ImageIndex, ImageMetaData, Rect, ShapeData,
};

/// Default document name used when encoding.
pub const CSV_FILE: &str = "annotations.csv";

const HEADER: [&str; 7] = ["image", "category", "color", "xMin", "yMin", "xMax", "yMax"];

/// CSV format.
pub struct CsvCodec;

impl AnnotationCodec for CsvCodec {
    fn id(&self) -> &'static str {
        "csv"
    }

    fn display_name(&self) -> &'static str {
        "CSV"
    }

    fn extensions(&self) -> &[&'static str] {
        &["csv"]
    }

    fn supports_polygons(&self) -> bool {
        false
    }

    fn supports_parts(&self) -> bool {
        false
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

        let mut reader = ReaderBuilder::new()
            .flexible(true)
            .from_reader(content.as_bytes());

        match reader.headers() {
            Ok(headers) if headers.iter().eq(HEADER) => {}
            Ok(headers) => {
                batch.add_error(
                    document,
                    format!(
                        "Invalid header: expected {}, found {}",
                        HEADER.join(","),
                        headers.iter().collect::<Vec<_>>().join(",")
                    ),
                );
                return Ok(batch);
            }
            Err(e) => {
                batch.add_error(document, format!("Corrupt CSV file: {e}"));
                return Ok(batch);
            }
        }

        let mut by_image: BTreeMap<String, (ImageMetaData, Vec<ShapeData>)> = BTreeMap::new();

        for (index, result) in reader.records().enumerate() {
            // Header is line 1, first record line 2.
            let line = index + 2;
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    batch.add_error(document, format!("Line {line}: {e}"));
                    continue;
                }
            };
            match decode_row(&record, images, &mut batch) {
                Ok((meta, shape)) => {
                    batch.success_count += 1;
                    by_image
                        .entry(meta.file_name.clone())
                        .or_insert_with(|| (meta, Vec::new()))
                        .1
                        .push(shape);
                }
                Err(message) => batch.add_error(document, format!("Line {line}: {message}")),
            }
        }

        for (_, (meta, shapes)) in by_image {
            batch.annotations.push(ImageAnnotation::new(meta, shapes));
        }

        log::info!(
            "Imported {} CSV rows ({} errors)",
            batch.success_count,
            batch.errors.len()
        );
        Ok(batch)
    }

    fn encode(&self, set: &AnnotationSet) -> Result<EncodedBatch, FormatError> {
        let mut batch = EncodedBatch::new();

        let mut writer = Writer::from_writer(Vec::new());
        writer.write_record(HEADER)?;

        for (file_name, annotation) in set.iter() {
            for shape in &annotation.shapes {
                write_shape(&mut writer, shape, file_name, set, &mut batch)?;
            }
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| FormatError::invalid_format(e.to_string()))?;
        let content = String::from_utf8(bytes)
            .map_err(|_| FormatError::invalid_format("Invalid UTF-8 in CSV"))?;
        batch.add_file(CSV_FILE, content);

        log::info!(
            "Exported {} shapes as CSV rows ({} unrepresentable)",
            batch.shapes_encoded,
            batch.errors.len()
        );
        Ok(batch)
    }
}

fn decode_row(
    record: &StringRecord,
    images: &ImageIndex,
    batch: &mut DecodedBatch,
) -> Result<(ImageMetaData, ShapeData), String> {
    if record.len() != HEADER.len() {
        return Err(format!(
            "expected {} columns, found {}",
            HEADER.len(),
            record.len()
        ));
    }

    let image = &record[0];
    let Some(meta) = images.get(image) else {
        return Err(format!(
            "Image file {image} does not belong to the currently loaded image files."
        ));
    };

    let category = record[1].trim();
    if category.is_empty() {
        return Err("missing category".to_string());
    }

    let color_cell = record[2].trim();
    let color = if color_cell.is_empty() {
        color_utils::default_category_color(batch.categories.len())
    } else {
        color_utils::parse_hex(color_cell)
            .ok_or_else(|| format!("malformed color value: {color_cell}"))?
    };

    let mut values = [0.0f64; 4];
    for (i, column) in HEADER[3..].iter().enumerate() {
        let cell = record[i + 3].trim();
        values[i] = cell
            .parse()
            .map_err(|_| format!("invalid numeric value for {column}: {cell}"))?;
    }

    let bounds = Rect::new(values[0], values[1], values[2], values[3]);
    if !bounds.is_ordered() {
        return Err("invalid bounding-box coordinates (min must be less than max)".to_string());
    }
    if !bounds.is_within(f64::from(meta.width), f64::from(meta.height)) {
        return Err("bounding-box coordinates outside image bounds".to_string());
    }

    batch.add_category(Category::new(category, color));
    Ok((meta.clone(), ShapeData::new_box(category, bounds)))
}

/// Write a shape tree as flat rows, parent before parts.
fn write_shape(
    writer: &mut Writer<Vec<u8>>,
    shape: &ShapeData,
    image: &str,
    set: &AnnotationSet,
    batch: &mut EncodedBatch,
) -> Result<(), FormatError> {
    match shape {
        ShapeData::Box { bounds, .. } => {
            let color = set
                .categories()
                .get(shape.category())
                .map(|c| color_utils::to_hex(c.color))
                .unwrap_or_default();
            let coords = [bounds.x_min, bounds.y_min, bounds.x_max, bounds.y_max]
                .map(format_coord);
            writer.write_record([
                image,
                shape.category(),
                color.as_str(),
                coords[0].as_str(),
                coords[1].as_str(),
                coords[2].as_str(),
                coords[3].as_str(),
            ])?;
            batch.shapes_encoded += 1;
        }
        ShapeData::Polygon { .. } => {
            batch.add_error(
                image,
                format!(
                    "Polygon shape '{}' cannot be represented in CSV format.",
                    shape.category()
                ),
            );
        }
    }
    for part in shape.parts() {
        write_shape(writer, part, image, set, batch)?;
    }
    Ok(())
}
