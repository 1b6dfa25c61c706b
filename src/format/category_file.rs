//! Category files: `{"name": <set name>, "category": [{id, name, supercategory}]}`.

use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::format::error::FormatError;
use crate::model::CategoryEntry;

/// A parsed category file.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryFile {
    /// Category-set name.
    pub name: String,
    /// Entries in file order, duplicates included.
    pub category: Vec<CategoryEntry>,
}

impl CategoryFile {
    /// Validate and convert a parsed JSON document.
    pub fn from_value(value: &Value) -> Result<Self, FormatError> {
        let object = value
            .as_object()
            .ok_or_else(|| FormatError::invalid_category_file("expected a JSON object"))?;

        let entries = object
            .get("category")
            .and_then(Value::as_array)
            .ok_or_else(|| FormatError::invalid_category_file("missing 'category' list"))?;

        let name = object
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| FormatError::invalid_category_file("missing 'name'"))?
            .to_string();

        let category = entries
            .iter()
            .map(|entry| {
                CategoryEntry::deserialize(entry).map_err(|e| {
                    FormatError::invalid_category_file(format!("bad category entry: {}", e))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { name, category })
    }

    /// Read and validate a category file from disk.
    pub fn read(path: &Path) -> Result<Self, FormatError> {
        let contents = std::fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&contents)?;
        let file = Self::from_value(&value)?;
        log::info!(
            "Read category set '{}' ({} entries) from {:?}",
            file.name,
            file.category.len(),
            path
        );
        Ok(file)
    }
}
