//! Round-trip tests across formats.

use super::test_images;
use crate::format::codecs::{JsonCodec, PascalVocCodec, YoloCodec};
use crate::format::traits::{AnnotationCodec, CancelFlag};
use crate::model::{
    AnnotationSet, Category, ImageAnnotation, ImageMetaData, Point, Rect, ShapeData,
};

fn rich_set() -> AnnotationSet {
    let mut set = AnnotationSet::new();
    set.add_category(Category::new("boat", [255, 0, 0]));
    set.add_category(Category::new("sail", [0, 255, 0]));
    set.insert_image(ImageAnnotation::new(
        ImageMetaData::new("boat.jpg", 640, 480),
        vec![
            ShapeData::new_box("boat", Rect::new(10.0, 20.0, 200.0, 150.0))
                .with_tags(vec!["pose: Frontal".to_string(), "difficult".to_string()])
                .with_parts(vec![ShapeData::new_box(
                    "sail",
                    Rect::new(20.0, 30.0, 60.0, 100.0),
                )]),
            ShapeData::new_polygon(
                "sail",
                vec![
                    Point::new(300.5, 100.0),
                    Point::new(400.0, 100.0),
                    Point::new(380.0, 200.0),
                    Point::new(340.0, 220.0),
                    Point::new(310.0, 180.0),
                ],
            ),
        ],
    ));
    set.insert_image(ImageAnnotation::new(
        ImageMetaData::new("buoy.jpg", 800, 600),
        vec![ShapeData::new_box("boat", Rect::new(5.0, 5.0, 120.0, 90.0))],
    ));
    set
}

/// Decode a codec's own output and re-encode it.
fn re_encode(codec: &dyn AnnotationCodec, set: &AnnotationSet) -> (AnnotationSet, Vec<u8>) {
    let first = codec.encode(set).unwrap();
    let batch = codec
        .decode(&first.files, &test_images(), &CancelFlag::new())
        .unwrap();
    assert!(batch.errors.is_empty(), "{:?}", batch.errors);

    let mut decoded = AnnotationSet::new();
    decoded.merge(batch.categories, batch.annotations);
    let second = codec.encode(&decoded).unwrap();

    let mut first_bytes = Vec::new();
    let mut second_bytes = Vec::new();
    for content in first.files.values() {
        first_bytes.extend_from_slice(content.as_bytes());
    }
    for content in second.files.values() {
        second_bytes.extend_from_slice(content.as_bytes());
    }
    assert_eq!(first_bytes, second_bytes, "writer output is not stable");
    (decoded, second_bytes)
}

#[test]
fn test_voc_round_trip_is_byte_exact() {
    let set = rich_set();
    let (decoded, _) = re_encode(&PascalVocCodec, &set);

    assert_eq!(decoded.get("boat.jpg"), set.get("boat.jpg"));
    assert_eq!(decoded.get("buoy.jpg"), set.get("buoy.jpg"));
    assert_eq!(decoded.total_shape_count(), set.total_shape_count());
}

#[test]
fn test_json_round_trip_is_byte_exact() {
    let set = rich_set();
    let (decoded, _) = re_encode(&JsonCodec, &set);

    assert_eq!(decoded.get("boat.jpg"), set.get("boat.jpg"));
    // Colors travel inside the document, so the registry survives too.
    assert_eq!(decoded.categories().get("boat").unwrap().color, [255, 0, 0]);
}

#[test]
fn test_json_five_point_polygon_survives_round_trip() {
    let set = rich_set();
    let (decoded, _) = re_encode(&JsonCodec, &set);

    let shapes = &decoded.get("boat.jpg").unwrap().shapes;
    let polygon = shapes.iter().find(|s| s.is_polygon()).unwrap();
    let ShapeData::Polygon { points, .. } = polygon else {
        unreachable!();
    };
    assert_eq!(points.len(), 5);
    assert_eq!(points[0], Point::new(300.5, 100.0));
}

#[test]
fn test_yolo_round_trip_within_one_pixel() {
    // Awkward values that do not survive six-decimal normalization exactly.
    let mut set = AnnotationSet::new();
    set.insert_image(ImageAnnotation::new(
        ImageMetaData::new("boat.jpg", 640, 480),
        vec![
            ShapeData::new_box("boat", Rect::new(13.7, 29.3, 201.1, 157.9)),
            ShapeData::new_box("boat", Rect::new(0.0, 0.0, 639.0, 479.0)),
        ],
    ));

    let encoded = YoloCodec.encode(&set).unwrap();
    let batch = YoloCodec
        .decode(&encoded.files, &test_images(), &CancelFlag::new())
        .unwrap();
    assert!(batch.errors.is_empty(), "{:?}", batch.errors);

    let original = &set.get("boat.jpg").unwrap().shapes;
    let decoded = &batch.annotations[0].shapes;
    assert_eq!(decoded.len(), original.len());
    for (a, b) in original.iter().zip(decoded) {
        let (ShapeData::Box { bounds: r1, .. }, ShapeData::Box { bounds: r2, .. }) = (a, b) else {
            panic!("expected boxes");
        };
        for (v1, v2) in [
            (r1.x_min, r2.x_min),
            (r1.y_min, r2.y_min),
            (r1.x_max, r2.x_max),
            (r1.y_max, r2.y_max),
        ] {
            assert!((v1 - v2).abs() < 1.0, "{v1} vs {v2}");
        }
    }
}

#[test]
fn test_category_reconciliation_is_idempotent() {
    let set = rich_set();
    let encoded = JsonCodec.encode(&set).unwrap();

    let mut merged = set.clone();
    for _ in 0..3 {
        let batch = JsonCodec
            .decode(&encoded.files, &test_images(), &CancelFlag::new())
            .unwrap();
        merged.merge(batch.categories, batch.annotations);
    }

    assert_eq!(merged.categories().len(), set.categories().len());
    assert_eq!(merged.total_shape_count(), set.total_shape_count());
    assert_eq!(merged, set);
}
