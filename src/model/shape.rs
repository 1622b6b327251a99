//! Shape data: the persisted representation of a drawn box or polygon.

use crate::model::geometry::{Point, Rect};

/// Minimum number of points required for a valid polygon.
pub const MIN_POLYGON_POINTS: usize = 3;

/// A bounding shape with its category, tags, and nested child shapes.
///
/// `parts` holds sub-object shapes (e.g. a sail as part of a boat). Parts
/// are owned by value, so the structure is always a forest; cycles cannot
/// be constructed. A part's category may differ from its parent's.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeData {
    /// Axis-aligned bounding box.
    Box {
        category: String,
        bounds: Rect,
        tags: Vec<String>,
        parts: Vec<ShapeData>,
    },
    /// Closed polygon with at least [`MIN_POLYGON_POINTS`] points.
    Polygon {
        category: String,
        points: Vec<Point>,
        tags: Vec<String>,
        parts: Vec<ShapeData>,
    },
}

impl ShapeData {
    /// Create a box shape with no tags or parts.
    pub fn new_box(category: &str, bounds: Rect) -> Self {
        ShapeData::Box {
            category: category.to_string(),
            bounds,
            tags: Vec::new(),
            parts: Vec::new(),
        }
    }

    /// Create a polygon shape with no tags or parts.
    pub fn new_polygon(category: &str, points: Vec<Point>) -> Self {
        ShapeData::Polygon {
            category: category.to_string(),
            points,
            tags: Vec::new(),
            parts: Vec::new(),
        }
    }

    /// Attach tags, builder style.
    pub fn with_tags(mut self, new_tags: Vec<String>) -> Self {
        match &mut self {
            ShapeData::Box { tags, .. } | ShapeData::Polygon { tags, .. } => *tags = new_tags,
        }
        self
    }

    /// Attach child parts, builder style.
    pub fn with_parts(mut self, new_parts: Vec<ShapeData>) -> Self {
        match &mut self {
            ShapeData::Box { parts, .. } | ShapeData::Polygon { parts, .. } => *parts = new_parts,
        }
        self
    }

    pub fn category(&self) -> &str {
        match self {
            ShapeData::Box { category, .. } | ShapeData::Polygon { category, .. } => category,
        }
    }

    pub fn set_category(&mut self, name: &str) {
        match self {
            ShapeData::Box { category, .. } | ShapeData::Polygon { category, .. } => {
                *category = name.to_string();
            }
        }
    }

    pub fn tags(&self) -> &[String] {
        match self {
            ShapeData::Box { tags, .. } | ShapeData::Polygon { tags, .. } => tags,
        }
    }

    pub fn parts(&self) -> &[ShapeData] {
        match self {
            ShapeData::Box { parts, .. } | ShapeData::Polygon { parts, .. } => parts,
        }
    }

    pub fn parts_mut(&mut self) -> &mut Vec<ShapeData> {
        match self {
            ShapeData::Box { parts, .. } | ShapeData::Polygon { parts, .. } => parts,
        }
    }

    pub fn is_box(&self) -> bool {
        matches!(self, ShapeData::Box { .. })
    }

    pub fn is_polygon(&self) -> bool {
        matches!(self, ShapeData::Polygon { .. })
    }

    /// Visit this shape and all nested parts, depth-first, parent before
    /// children.
    pub fn visit(&self, f: &mut impl FnMut(&ShapeData)) {
        f(self);
        for part in self.parts() {
            part.visit(f);
        }
    }

    /// Total number of shapes in this tree, including `self`.
    pub fn node_count(&self) -> usize {
        1 + self.parts().iter().map(ShapeData::node_count).sum::<usize>()
    }

    /// Rename every occurrence of a category in this tree.
    pub fn rename_category(&mut self, from: &str, to: &str) {
        if self.category() == from {
            self.set_category(to);
        }
        for part in self.parts_mut() {
            part.rename_category(from, to);
        }
    }

    /// Validate geometry against the image dimensions.
    ///
    /// Boxes must be ordered and lie entirely inside the image; polygons
    /// need at least [`MIN_POLYGON_POINTS`] points, each inside the image.
    /// Returns a descriptive message for the first violation found; nested
    /// parts are checked too.
    pub fn validate(&self, width: f64, height: f64) -> Result<(), String> {
        match self {
            ShapeData::Box { bounds, .. } => {
                if !bounds.is_ordered() {
                    return Err("invalid bounding-box coordinates (min must be less than max)"
                        .to_string());
                }
                if !bounds.is_within(width, height) {
                    return Err("bounding-box coordinates outside image bounds".to_string());
                }
            }
            ShapeData::Polygon { points, .. } => {
                if points.len() < MIN_POLYGON_POINTS {
                    return Err(format!(
                        "a polygon must have at least {MIN_POLYGON_POINTS} points"
                    ));
                }
                if let Some(p) = points.iter().find(|p| !p.is_within(width, height)) {
                    return Err(format!(
                        "polygon point ({}, {}) outside image bounds",
                        p.x, p.y
                    ));
                }
            }
        }
        for part in self.parts() {
            part.validate(width, height)?;
        }
        Ok(())
    }
}
