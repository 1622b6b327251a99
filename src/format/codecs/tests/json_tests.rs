//! Tests for the custom JSON format.

use super::{file_map, test_images};
use crate::format::codecs::JsonCodec;
use crate::format::traits::{AnnotationCodec, CancelFlag};
use crate::model::{
    AnnotationSet, ImageAnnotation, ImageMetaData, Point, Rect, ShapeData,
};

fn decode(content: &str) -> crate::format::traits::DecodedBatch {
    let files = file_map(&[("annotations.json", content)]);
    JsonCodec
        .decode(&files, &test_images(), &CancelFlag::new())
        .unwrap()
}

#[test]
fn test_json_format_metadata() {
    let codec = JsonCodec;

    assert_eq!(codec.id(), "json");
    assert!(codec.supports_polygons());
    assert!(codec.supports_parts());
    assert!(!codec.per_image());
}

#[test]
fn test_decode_box_entry() {
    let batch = decode(
        r##"[{
            "fileName": "boat.jpg",
            "category": "boat",
            "color": "#ff0000",
            "bndbox": { "minX": 10.0, "minY": 20.0, "maxX": 200.0, "maxY": 150.0 },
            "tags": ["truncated"]
        }]"##,
    );

    assert!(batch.errors.is_empty(), "{:?}", batch.errors);
    assert_eq!(batch.success_count, 1);
    let shape = &batch.annotations[0].shapes[0];
    assert_eq!(shape.category(), "boat");
    assert_eq!(shape.tags(), ["truncated"]);
    assert_eq!(batch.categories[0].color, [255, 0, 0]);
}

#[test]
fn test_decode_empty_array_is_success_without_annotations() {
    let batch = decode("[]");

    assert_eq!(batch.success_count, 0);
    assert!(batch.annotations.is_empty());
    assert!(batch.errors.is_empty());
    assert!(batch.is_empty());
}

#[test]
fn test_decode_corrupt_document_reports_position() {
    let batch = decode("[ { \"fileName\": ");

    assert!(batch.annotations.is_empty());
    assert_eq!(batch.errors.len(), 1);
    assert_eq!(batch.errors[0].source, "annotations.json");
    assert!(batch.errors[0].description.starts_with("Corrupt JSON file:"));
    assert!(batch.errors[0].description.contains("line"));
}

#[test]
fn test_decode_three_entries_one_bad_field() {
    let batch = decode(
        r##"[
            { "fileName": "boat.jpg", "category": "boat", "color": "#ff0000",
              "bndbox": { "minX": 10, "minY": 20, "maxX": 200, "maxY": 150 } },
            { "fileName": "boat.jpg", "category": "sail", "color": "#00ff00",
              "bndbox": { "minX": 20, "minY": 30, "maxX": "oops", "maxY": 100 } },
            { "fileName": "buoy.jpg", "category": "buoy", "color": "#0000ff",
              "bndbox": { "minX": 1, "minY": 1, "maxX": 50, "maxY": 50 } }
        ]"##,
    );

    assert_eq!(batch.success_count, 2);
    assert_eq!(batch.errors.len(), 1);
    assert_eq!(batch.errors[0].source, "boat.jpg");
    assert_eq!(batch.errors[0].description, "Invalid numeric field: maxX");
}

#[test]
fn test_decode_entry_errors_name_the_right_source() {
    let batch = decode(
        r##"[
            { "category": "boat", "bndbox": { "minX": 1, "minY": 1, "maxX": 5, "maxY": 5 } },
            { "fileName": "ghost.jpg", "category": "boat",
              "bndbox": { "minX": 1, "minY": 1, "maxX": 5, "maxY": 5 } },
            { "fileName": "boat.jpg",
              "bndbox": { "minX": 1, "minY": 1, "maxX": 5, "maxY": 5 } }
        ]"##,
    );

    assert_eq!(batch.success_count, 0);
    // Document-level source when the file name is unusable, image name
    // afterwards.
    assert_eq!(batch.errors[0].source, "annotations.json");
    assert_eq!(batch.errors[0].description, "Missing field: fileName");
    assert_eq!(batch.errors[1].source, "ghost.jpg");
    assert_eq!(batch.errors[2].source, "boat.jpg");
    assert_eq!(batch.errors[2].description, "Missing field: category");
}

#[test]
fn test_decode_rejects_malformed_color_and_tags() {
    let batch = decode(
        r##"[
            { "fileName": "boat.jpg", "category": "boat", "color": "red",
              "bndbox": { "minX": 1, "minY": 1, "maxX": 5, "maxY": 5 } },
            { "fileName": "boat.jpg", "category": "boat", "tags": [1, 2],
              "bndbox": { "minX": 1, "minY": 1, "maxX": 5, "maxY": 5 } }
        ]"##,
    );

    assert_eq!(batch.success_count, 0);
    assert_eq!(batch.errors[0].description, "Malformed color value: red");
    assert_eq!(batch.errors[1].description, "Invalid tags field");
}

#[test]
fn test_decode_shapeless_entry() {
    let batch = decode(r#"[{ "fileName": "boat.jpg", "category": "boat" }]"#);

    assert_eq!(batch.errors[0].description, "Missing field: bndbox or polygon");
}

#[test]
fn test_decode_rejects_entry_with_both_shapes() {
    let batch = decode(
        r##"[{ "fileName": "boat.jpg", "category": "boat",
              "bndbox": { "minX": 1, "minY": 1, "maxX": 5, "maxY": 5 },
              "polygon": [10, 20, 100, 20, 55, 90] }]"##,
    );

    assert_eq!(batch.success_count, 0);
    assert!(batch.annotations.is_empty());
    assert_eq!(
        batch.errors[0].description,
        "Ambiguous shape: entry has both bndbox and polygon"
    );
}

#[test]
fn test_decode_polygon_validation() {
    let batch = decode(
        r##"[
            { "fileName": "boat.jpg", "category": "sail",
              "polygon": [10, 20, 100, 20, 55] },
            { "fileName": "boat.jpg", "category": "sail",
              "polygon": [10, 20, 100, 20] },
            { "fileName": "boat.jpg", "category": "sail",
              "polygon": [10, 20, 100, 20, 55, 9999] }
        ]"##,
    );

    assert_eq!(batch.success_count, 0);
    assert_eq!(
        batch.errors[0].description,
        "Invalid polygon list: odd number of coordinates"
    );
    assert!(batch.errors[1].description.contains("at least 3 points"));
    assert!(batch.errors[2].description.contains("outside image bounds"));
}

#[test]
fn test_decode_out_of_range_field_is_named() {
    let batch = decode(
        r##"[{ "fileName": "boat.jpg", "category": "boat",
              "bndbox": { "minX": 1, "minY": 1, "maxX": 9000, "maxY": 50 } }]"##,
    );

    assert_eq!(
        batch.errors[0].description,
        "Field maxX outside image bounds"
    );
}

#[test]
fn test_decode_invalid_part_drops_whole_entry() {
    let batch = decode(
        r##"[{
            "fileName": "boat.jpg", "category": "boat", "color": "#ff0000",
            "bndbox": { "minX": 10, "minY": 10, "maxX": 200, "maxY": 150 },
            "parts": [
                { "category": "sail",
                  "bndbox": { "minX": 20, "minY": 20, "maxX": "bad", "maxY": 100 } }
            ]
        }]"##,
    );

    assert_eq!(batch.success_count, 0);
    assert!(batch.annotations.is_empty());
    assert_eq!(batch.errors.len(), 1);
}

#[test]
fn test_decode_groups_entries_per_image() {
    let batch = decode(
        r##"[
            { "fileName": "boat.jpg", "category": "boat",
              "bndbox": { "minX": 1, "minY": 1, "maxX": 5, "maxY": 5 } },
            { "fileName": "boat.jpg", "category": "sail",
              "bndbox": { "minX": 6, "minY": 6, "maxX": 9, "maxY": 9 } }
        ]"##,
    );

    assert_eq!(batch.success_count, 2);
    assert_eq!(batch.annotations.len(), 1);
    assert_eq!(batch.annotations[0].shapes.len(), 2);
}

#[test]
fn test_encode_schema_and_omissions() {
    let mut set = AnnotationSet::new();
    set.insert_image(ImageAnnotation::new(
        ImageMetaData::new("boat.jpg", 640, 480),
        vec![
            ShapeData::new_box("boat", Rect::new(10.0, 20.0, 200.0, 150.0)).with_parts(vec![
                ShapeData::new_polygon(
                    "sail",
                    vec![
                        Point::new(20.0, 20.0),
                        Point::new(60.0, 20.0),
                        Point::new(40.0, 100.0),
                    ],
                ),
            ]),
        ],
    ));

    let batch = JsonCodec.encode(&set).unwrap();
    let content = batch.files.get("annotations.json").unwrap();
    let value: serde_json::Value = serde_json::from_str(content).unwrap();

    let entry = &value.as_array().unwrap()[0];
    assert_eq!(entry["fileName"], "boat.jpg");
    assert_eq!(entry["category"], "boat");
    assert!(entry["color"].as_str().unwrap().starts_with('#'));
    // Empty tags are omitted entirely.
    assert!(entry.get("tags").is_none());

    let part = &entry["parts"][0];
    assert!(part.get("fileName").is_none());
    assert_eq!(part["polygon"].as_array().unwrap().len(), 6);
    assert!(part.get("parts").is_none());

    assert_eq!(batch.shapes_encoded, 2);
}
