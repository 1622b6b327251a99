//! Color utility functions shared across the crate.
//!
//! Category colors are stored as RGB triples and serialized as lowercase
//! `#rrggbb` strings in the JSON and CSV formats. Categories created during
//! import without an explicit color get a deterministic default from the
//! golden-angle palette.

/// Convert HSV to RGB.
///
/// # Arguments
/// * `h` - Hue in degrees (0-360)
/// * `s` - Saturation (0.0-1.0)
/// * `v` - Value/brightness (0.0-1.0)
///
/// # Returns
/// RGB tuple with values in range 0.0-1.0
pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> (f32, f32, f32) {
    let c = v * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;

    let (r, g, b) = if h < 60.0 {
        (c, x, 0.0)
    } else if h < 120.0 {
        (x, c, 0.0)
    } else if h < 180.0 {
        (0.0, c, x)
    } else if h < 240.0 {
        (0.0, x, c)
    } else if h < 300.0 {
        (x, 0.0, c)
    } else {
        (c, 0.0, x)
    };

    (r + m, g + m, b + m)
}

/// Deterministic default color for the n-th category created without one.
///
/// Uses the golden angle to spread hues so consecutive categories stay
/// visually distinct.
pub fn default_category_color(index: usize) -> [u8; 3] {
    let hue = (index as f32 * 137.508) % 360.0;
    let (r, g, b) = hsv_to_rgb(hue, 0.7, 0.9);
    [(r * 255.0) as u8, (g * 255.0) as u8, (b * 255.0) as u8]
}

/// Format an RGB triple as a lowercase `#rrggbb` string.
pub fn to_hex(color: [u8; 3]) -> String {
    format!("#{:02x}{:02x}{:02x}", color[0], color[1], color[2])
}

/// Parse a `#rrggbb` string into an RGB triple.
///
/// Returns None for anything that is not exactly `#` followed by six hex
/// digits. Uppercase digits are accepted.
pub fn parse_hex(s: &str) -> Option<[u8; 3]> {
    let rest = s.strip_prefix('#')?;
    if rest.len() != 6 || !rest.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&rest[0..2], 16).ok()?;
    let g = u8::from_str_radix(&rest[2..4], 16).ok()?;
    let b = u8::from_str_radix(&rest[4..6], 16).ok()?;
    Some([r, g, b])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hsv_to_rgb_red() {
        let (r, g, b) = hsv_to_rgb(0.0, 1.0, 1.0);
        assert!((r - 1.0).abs() < 0.01);
        assert!(g.abs() < 0.01);
        assert!(b.abs() < 0.01);
    }

    #[test]
    fn test_hsv_to_rgb_green() {
        let (r, g, b) = hsv_to_rgb(120.0, 1.0, 1.0);
        assert!(r.abs() < 0.01);
        assert!((g - 1.0).abs() < 0.01);
        assert!(b.abs() < 0.01);
    }

    #[test]
    fn test_hex_roundtrip() {
        let color = [128, 64, 192];
        assert_eq!(to_hex(color), "#8040c0");
        assert_eq!(parse_hex("#8040c0"), Some(color));
        assert_eq!(parse_hex("#8040C0"), Some(color));
    }

    #[test]
    fn test_parse_hex_rejects_malformed() {
        assert_eq!(parse_hex("8040c0"), None);
        assert_eq!(parse_hex("#8040c"), None);
        assert_eq!(parse_hex("#8040c0ff"), None);
        assert_eq!(parse_hex("#80g0c0"), None);
        assert_eq!(parse_hex(""), None);
    }

    #[test]
    fn test_default_colors_distinct() {
        let a = default_category_color(0);
        let b = default_category_color(1);
        let c = default_category_color(2);
        assert_ne!(a, b);
        assert_ne!(b, c);
        // Same index always yields the same color.
        assert_eq!(a, default_category_color(0));
    }
}
