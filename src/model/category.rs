//! Category taxonomies.
//!
//! A dataset is labelled against up to three independent taxonomies: the
//! primary categories plus optional second- and third-level attributes. Each
//! taxonomy keeps its entries in load order and can be looked up by name or
//! by id.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::SUPERCATEGORY_ALL;

/// One entry of a category file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryEntry {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub supercategory: String,
}

impl CategoryEntry {
    pub fn new(id: u32, name: impl Into<String>, supercategory: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            supercategory: supercategory.into(),
        }
    }
}

/// Which of the three taxonomies an operation addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CategoryLevel {
    Primary,
    Second,
    Third,
}

impl CategoryLevel {
    pub fn name(&self) -> &'static str {
        match self {
            CategoryLevel::Primary => "category",
            CategoryLevel::Second => "second category",
            CategoryLevel::Third => "third category",
        }
    }

    pub fn all() -> &'static [CategoryLevel] {
        &[
            CategoryLevel::Primary,
            CategoryLevel::Second,
            CategoryLevel::Third,
        ]
    }
}

impl fmt::Display for CategoryLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An ordered collection of categories with name and id lookups.
#[derive(Debug, Clone, Default)]
pub struct Taxonomy {
    entries: Vec<CategoryEntry>,
    by_name: HashMap<String, usize>,
    id_to_name: HashMap<u32, String>,
}

impl Taxonomy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from entries in load order. Later entries reusing a name are
    /// skipped.
    pub fn from_entries(entries: impl IntoIterator<Item = CategoryEntry>) -> Self {
        let mut taxonomy = Self::new();
        for entry in entries {
            taxonomy.push(entry);
        }
        taxonomy
    }

    /// Append an entry. Returns `false` if the name is already present.
    pub fn push(&mut self, entry: CategoryEntry) -> bool {
        if self.by_name.contains_key(&entry.name) {
            log::debug!("Skipping duplicate category '{}'", entry.name);
            return false;
        }
        self.by_name.insert(entry.name.clone(), self.entries.len());
        self.id_to_name.insert(entry.id, entry.name.clone());
        self.entries.push(entry);
        true
    }

    pub fn get(&self, name: &str) -> Option<&CategoryEntry> {
        self.by_name.get(name).map(|&i| &self.entries[i])
    }

    pub fn name_of(&self, id: u32) -> Option<&str> {
        self.id_to_name.get(&id).map(String::as_str)
    }

    pub fn id_of(&self, name: &str) -> Option<u32> {
        self.get(name).map(|entry| entry.id)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn entries(&self) -> &[CategoryEntry] {
        &self.entries
    }

    /// Category names in load order.
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.by_name.clear();
        self.id_to_name.clear();
    }

    /// Default entry of this (second or third level) taxonomy for a shape
    /// whose primary category is `primary`.
    ///
    /// The first entry in load order whose supercategory is `"all"`, the
    /// primary's name or the primary's supercategory wins; otherwise the
    /// first entry. `None` only when the taxonomy is empty.
    pub fn default_for(&self, primary: &CategoryEntry) -> Option<&CategoryEntry> {
        self.entries
            .iter()
            .find(|entry| {
                entry.supercategory == SUPERCATEGORY_ALL
                    || entry.supercategory == primary.name
                    || entry.supercategory == primary.supercategory
            })
            .or_else(|| self.entries.first())
    }
}

/// The three taxonomies of a dataset plus the category-set name.
#[derive(Debug, Clone, Default)]
pub struct CategorySet {
    /// Name of the category set; selects the annotation subdirectory.
    pub name: Option<String>,
    pub primary: Taxonomy,
    pub second: Taxonomy,
    pub third: Taxonomy,
}

impl CategorySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(&self, level: CategoryLevel) -> &Taxonomy {
        match level {
            CategoryLevel::Primary => &self.primary,
            CategoryLevel::Second => &self.second,
            CategoryLevel::Third => &self.third,
        }
    }

    pub fn level_mut(&mut self, level: CategoryLevel) -> &mut Taxonomy {
        match level {
            CategoryLevel::Primary => &mut self.primary,
            CategoryLevel::Second => &mut self.second,
            CategoryLevel::Third => &mut self.third,
        }
    }

    /// Replace one taxonomy wholesale.
    ///
    /// Loading the primary level always renames the set; the other levels
    /// only name it if it has no name yet.
    pub fn replace(&mut self, level: CategoryLevel, name: &str, taxonomy: Taxonomy) {
        if level == CategoryLevel::Primary || self.name.is_none() {
            self.name = Some(name.to_string());
        }
        *self.level_mut(level) = taxonomy;
    }

    /// Drop every taxonomy and the set name.
    pub fn clear(&mut self) {
        self.name = None;
        for level in CategoryLevel::all() {
            self.level_mut(*level).clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vehicles() -> Taxonomy {
        Taxonomy::from_entries([
            CategoryEntry::new(1, "car", "vehicle"),
            CategoryEntry::new(2, "person", "human"),
        ])
    }

    #[test]
    fn test_lookups() {
        let t = vehicles();
        assert_eq!(t.id_of("car"), Some(1));
        assert_eq!(t.name_of(2), Some("person"));
        assert!(t.get("truck").is_none());
        assert_eq!(t.names(), vec!["car".to_string(), "person".to_string()]);
    }

    #[test]
    fn test_duplicate_names_skipped() {
        let t = Taxonomy::from_entries([
            CategoryEntry::new(1, "car", "vehicle"),
            CategoryEntry::new(7, "car", "other"),
        ]);
        assert_eq!(t.len(), 1);
        assert_eq!(t.id_of("car"), Some(1));
        assert_eq!(t.name_of(7), None);
    }

    #[test]
    fn test_default_for_prefers_first_match_in_load_order() {
        let second = Taxonomy::from_entries([
            CategoryEntry::new(1, "walking", "human"),
            CategoryEntry::new(2, "parked", "vehicle"),
            CategoryEntry::new(3, "unknown", "all"),
        ]);
        let car = CategoryEntry::new(1, "car", "vehicle");
        assert_eq!(second.default_for(&car).unwrap().name, "parked");
    }

    #[test]
    fn test_default_for_matches_primary_name() {
        let second = Taxonomy::from_entries([
            CategoryEntry::new(1, "walking", "human"),
            CategoryEntry::new(2, "sedan", "car"),
        ]);
        let car = CategoryEntry::new(1, "car", "vehicle");
        assert_eq!(second.default_for(&car).unwrap().name, "sedan");
    }

    #[test]
    fn test_default_for_all() {
        let second = Taxonomy::from_entries([
            CategoryEntry::new(1, "walking", "human"),
            CategoryEntry::new(2, "occluded", "all"),
        ]);
        let car = CategoryEntry::new(1, "car", "vehicle");
        assert_eq!(second.default_for(&car).unwrap().name, "occluded");
    }

    #[test]
    fn test_default_for_falls_back_to_first() {
        let second = Taxonomy::from_entries([
            CategoryEntry::new(1, "walking", "human"),
            CategoryEntry::new(2, "running", "human"),
        ]);
        let car = CategoryEntry::new(1, "car", "vehicle");
        assert_eq!(second.default_for(&car).unwrap().name, "walking");
        assert!(Taxonomy::new().default_for(&car).is_none());
    }

    #[test]
    fn test_set_name_rules() {
        let mut set = CategorySet::new();
        set.replace(CategoryLevel::Second, "attrs", Taxonomy::new());
        assert_eq!(set.name.as_deref(), Some("attrs"));

        set.replace(CategoryLevel::Primary, "road", vehicles());
        assert_eq!(set.name.as_deref(), Some("road"));

        set.replace(CategoryLevel::Third, "other", Taxonomy::new());
        assert_eq!(set.name.as_deref(), Some("road"));
        assert_eq!(set.primary.len(), 2);

        set.clear();
        assert!(set.name.is_none());
        assert!(set.primary.is_empty());
    }
}
