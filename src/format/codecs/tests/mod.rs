//! Unit tests for annotation format implementations.
//!
//! These tests verify parsing, validation, error reporting, and round-trip
//! behavior for each codec against in-memory file maps.

mod csv_tests;
mod json_tests;
mod roundtrip_tests;

use std::collections::BTreeMap;

use crate::model::{ImageIndex, ImageMetaData};

/// Image index shared by the codec tests.
pub(crate) fn test_images() -> ImageIndex {
    [
        ImageMetaData::new("boat.jpg", 640, 480),
        ImageMetaData::new("buoy.jpg", 800, 600),
    ]
    .into_iter()
    .collect()
}

/// Build a file map from (name, content) pairs.
pub(crate) fn file_map(files: &[(&str, &str)]) -> BTreeMap<String, String> {
    files
        .iter()
        .map(|(name, content)| (name.to_string(), content.to_string()))
        .collect()
}
