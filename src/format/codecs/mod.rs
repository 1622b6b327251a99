//! Format implementations.

pub mod csv;
pub mod json;
pub mod pascal_voc;
pub mod yolo;

#[cfg(test)]
mod tests;

pub use csv::CsvCodec;
pub use json::JsonCodec;
pub use pascal_voc::PascalVocCodec;
pub use yolo::YoloCodec;

/// Render a coordinate the way annotation files conventionally carry them:
/// whole values without a fractional part, everything else as the shortest
/// exact decimal.
pub(crate) fn format_coord(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}
