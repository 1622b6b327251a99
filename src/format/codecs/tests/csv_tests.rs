//! Tests for the CSV format.

use super::{file_map, test_images};
use crate::format::codecs::CsvCodec;
use crate::format::traits::{AnnotationCodec, CancelFlag};
use crate::model::{
    AnnotationSet, Category, ImageAnnotation, ImageMetaData, Point, Rect, ShapeData,
};

fn decode(content: &str) -> crate::format::traits::DecodedBatch {
    let files = file_map(&[("annotations.csv", content)]);
    CsvCodec
        .decode(&files, &test_images(), &CancelFlag::new())
        .unwrap()
}

const HEADER: &str = "image,category,color,xMin,yMin,xMax,yMax\n";

#[test]
fn test_csv_format_metadata() {
    let codec = CsvCodec;

    assert_eq!(codec.id(), "csv");
    assert!(!codec.supports_polygons());
    assert!(!codec.supports_parts());
    assert!(!codec.per_image());
}

#[test]
fn test_decode_rows() {
    let content = format!(
        "{HEADER}boat.jpg,boat,#ff0000,10,20,200,150\nbuoy.jpg,buoy,#00ff00,1,1,50,50\n"
    );
    let batch = decode(&content);

    assert!(batch.errors.is_empty(), "{:?}", batch.errors);
    assert_eq!(batch.success_count, 2);
    assert_eq!(batch.annotations.len(), 2);
    let ShapeData::Box { bounds, .. } = &batch.annotations[0].shapes[0] else {
        panic!("expected a box");
    };
    assert_eq!(*bounds, Rect::new(10.0, 20.0, 200.0, 150.0));
    assert_eq!(batch.categories[0].color, [255, 0, 0]);
}

#[test]
fn test_decode_rejects_wrong_header() {
    let batch = decode("image,label,color,x1,y1,x2,y2\nboat.jpg,boat,#ff0000,1,1,5,5\n");

    assert_eq!(batch.success_count, 0);
    assert_eq!(batch.errors.len(), 1);
    assert!(batch.errors[0].description.starts_with("Invalid header:"));
}

#[test]
fn test_decode_row_errors_name_the_line() {
    let content = format!(
        "{HEADER}\
         boat.jpg,boat,#ff0000,10,20,200\n\
         ghost.jpg,boat,#ff0000,10,20,200,150\n\
         boat.jpg,,#ff0000,10,20,200,150\n\
         boat.jpg,boat,red,10,20,200,150\n\
         boat.jpg,boat,#ff0000,10,20,abc,150\n\
         boat.jpg,boat,#ff0000,200,20,10,150\n\
         boat.jpg,boat,#ff0000,10,20,9000,150\n\
         boat.jpg,boat,#ff0000,10,20,200,150\n"
    );
    let batch = decode(&content);

    assert_eq!(batch.success_count, 1);
    let descriptions: Vec<&str> = batch.errors.iter().map(|e| e.description.as_str()).collect();
    assert_eq!(descriptions[0], "Line 2: expected 7 columns, found 6");
    assert!(descriptions[1].starts_with("Line 3: Image file ghost.jpg"));
    assert_eq!(descriptions[2], "Line 4: missing category");
    assert_eq!(descriptions[3], "Line 5: malformed color value: red");
    assert_eq!(descriptions[4], "Line 6: invalid numeric value for xMax: abc");
    assert!(descriptions[5].contains("min must be less than max"));
    assert!(descriptions[6].contains("outside image bounds"));
    assert!(batch.errors.iter().all(|e| e.source == "annotations.csv"));
}

#[test]
fn test_decode_empty_color_gets_generated_default() {
    let content = format!("{HEADER}boat.jpg,boat,,10,20,200,150\n");
    let batch = decode(&content);

    assert!(batch.errors.is_empty());
    assert_eq!(batch.categories.len(), 1);
    // Any deterministic non-empty color will do.
    assert_ne!(batch.categories[0].color, [0, 0, 0]);
}

#[test]
fn test_encode_flattens_parts_depth_first() {
    let mut set = AnnotationSet::new();
    set.add_category(Category::new("boat", [255, 0, 0]));
    set.add_category(Category::new("sail", [0, 255, 0]));
    for image in ["boat.jpg", "buoy.jpg"] {
        set.insert_image(ImageAnnotation::new(
            ImageMetaData::new(image, 640, 480),
            vec![
                ShapeData::new_box("boat", Rect::new(10.0, 10.0, 200.0, 150.0)).with_parts(vec![
                    ShapeData::new_box("sail", Rect::new(20.0, 20.0, 60.0, 100.0)),
                    ShapeData::new_box("sail", Rect::new(70.0, 20.0, 110.0, 100.0)),
                    ShapeData::new_box("sail", Rect::new(120.0, 20.0, 160.0, 100.0)),
                ]),
            ],
        ));
    }

    let batch = CsvCodec.encode(&set).unwrap();
    let content = batch.files.get("annotations.csv").unwrap();
    let lines: Vec<&str> = content.lines().collect();

    // 2 boats + 6 sails flatten to 8 data rows after the header.
    assert_eq!(lines.len(), 9);
    assert_eq!(lines[0], "image,category,color,xMin,yMin,xMax,yMax");
    assert_eq!(lines[1], "boat.jpg,boat,#ff0000,10,10,200,150");
    assert_eq!(lines[2], "boat.jpg,sail,#00ff00,20,20,60,100");
    assert_eq!(lines[5], "buoy.jpg,boat,#ff0000,10,10,200,150");
    assert_eq!(batch.shapes_encoded, 8);
}

#[test]
fn test_encode_skips_polygons_with_error() {
    let mut set = AnnotationSet::new();
    set.insert_image(ImageAnnotation::new(
        ImageMetaData::new("boat.jpg", 640, 480),
        vec![
            ShapeData::new_polygon(
                "sail",
                vec![
                    Point::new(0.0, 0.0),
                    Point::new(10.0, 0.0),
                    Point::new(5.0, 10.0),
                ],
            ),
            ShapeData::new_box("boat", Rect::new(10.0, 10.0, 200.0, 150.0)),
        ],
    ));

    let batch = CsvCodec.encode(&set).unwrap();

    assert_eq!(batch.shapes_encoded, 1);
    assert_eq!(batch.errors.len(), 1);
    assert_eq!(batch.errors[0].source, "boat.jpg");
    assert!(batch.errors[0].description.contains("Polygon shape 'sail'"));
}
