//! Category data model for annotation categories.

use thiserror::Error;

use crate::color_utils;

/// An annotation category with a name and color.
///
/// Category identity is the name: two categories with the same name are the
/// same category, regardless of color.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    /// Display name of the category, unique within a registry.
    pub name: String,
    /// RGB color for the category.
    pub color: [u8; 3],
}

impl Category {
    /// Create a new category with the given name and color.
    pub fn new(name: &str, color: [u8; 3]) -> Self {
        Self {
            name: name.to_string(),
            color,
        }
    }
}

/// Errors from category registry operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CategoryError {
    #[error("category '{0}' does not exist")]
    NotFound(String),

    #[error("category name '{0}' is already in use")]
    NameTaken(String),
}

/// Insertion-ordered set of categories, unique by name.
///
/// The order is significant: YOLO's `object.data` derives its class indices
/// from it, and default colors are assigned by position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryRegistry {
    categories: Vec<Category>,
}

impl CategoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Category> {
        self.categories.iter()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.categories.iter().any(|c| c.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.name == name)
    }

    /// Position of a category in insertion order (YOLO class index).
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.categories.iter().position(|c| c.name == name)
    }

    /// Category at the given insertion-order position.
    pub fn by_index(&self, index: usize) -> Option<&Category> {
        self.categories.get(index)
    }

    /// Add a category. Returns false (and changes nothing) if a category
    /// with the same name already exists.
    pub fn add(&mut self, category: Category) -> bool {
        if self.contains(&category.name) {
            return false;
        }
        self.categories.push(category);
        true
    }

    /// Look up a category by name, creating it with a generated default
    /// color if absent. Returns a reference to the (possibly new) category.
    pub fn get_or_create(&mut self, name: &str) -> &Category {
        if let Some(pos) = self.categories.iter().position(|c| c.name == name) {
            return &self.categories[pos];
        }
        let color = color_utils::default_category_color(self.categories.len());
        self.categories.push(Category::new(name, color));
        self.categories.last().expect("just pushed")
    }

    /// Rename a category.
    ///
    /// Fails if `from` does not exist, or if `to` is already taken by a
    /// different category. Renaming a category to its own name is a no-op.
    pub fn rename(&mut self, from: &str, to: &str) -> Result<(), CategoryError> {
        if from == to {
            return match self.contains(from) {
                true => Ok(()),
                false => Err(CategoryError::NotFound(from.to_string())),
            };
        }
        if self.contains(to) {
            return Err(CategoryError::NameTaken(to.to_string()));
        }
        let category = self
            .categories
            .iter_mut()
            .find(|c| c.name == from)
            .ok_or_else(|| CategoryError::NotFound(from.to_string()))?;
        category.name = to.to_string();
        Ok(())
    }

    /// Remove all categories.
    pub fn clear(&mut self) {
        self.categories.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_rejects_duplicate_name() {
        let mut registry = CategoryRegistry::new();
        assert!(registry.add(Category::new("boat", [255, 0, 0])));
        assert!(!registry.add(Category::new("boat", [0, 255, 0])));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("boat").unwrap().color, [255, 0, 0]);
    }

    #[test]
    fn test_get_or_create_assigns_default_color() {
        let mut registry = CategoryRegistry::new();
        let color = registry.get_or_create("sail").color;
        assert_eq!(color, crate::color_utils::default_category_color(0));

        // Existing category is returned untouched.
        let again = registry.get_or_create("sail").color;
        assert_eq!(color, again);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_insertion_order_defines_indices() {
        let mut registry = CategoryRegistry::new();
        registry.add(Category::new("boat", [255, 0, 0]));
        registry.add(Category::new("sail", [0, 255, 0]));
        registry.add(Category::new("buoy", [0, 0, 255]));

        assert_eq!(registry.index_of("boat"), Some(0));
        assert_eq!(registry.index_of("buoy"), Some(2));
        assert_eq!(registry.by_index(1).unwrap().name, "sail");
    }

    #[test]
    fn test_rename() {
        let mut registry = CategoryRegistry::new();
        registry.add(Category::new("boat", [255, 0, 0]));
        registry.add(Category::new("sail", [0, 255, 0]));

        assert_eq!(registry.rename("boat", "ship"), Ok(()));
        assert!(registry.contains("ship"));
        assert!(!registry.contains("boat"));

        // Collision with a different category fails.
        assert_eq!(
            registry.rename("ship", "sail"),
            Err(CategoryError::NameTaken("sail".to_string()))
        );

        // Renaming to the same name is fine.
        assert_eq!(registry.rename("ship", "ship"), Ok(()));

        assert_eq!(
            registry.rename("missing", "x"),
            Err(CategoryError::NotFound("missing".to_string()))
        );
    }
}
