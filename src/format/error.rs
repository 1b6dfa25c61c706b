//! Error types for dataset and annotation file operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading or writing dataset files.
#[derive(Error, Debug)]
pub enum FormatError {
    /// I/O error during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing or serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// File parsed but its structure is wrong
    #[error("Invalid file {path:?}: {message}")]
    InvalidFile {
        /// File that was rejected
        path: PathBuf,
        /// What is wrong with it
        message: String,
    },

    /// Required field is missing
    #[error("Missing required field: {field}")]
    MissingField {
        /// Name of the missing field
        field: String,
    },

    /// Category file without a `category` list
    #[error("Invalid category file: {message}")]
    InvalidCategoryFile {
        /// Description of the problem
        message: String,
    },

    /// A file or directory the dataset refers to does not exist
    #[error("Missing resource: {path:?}")]
    MissingResource {
        /// Path that was expected
        path: PathBuf,
    },

    /// Category referenced by id or name but not defined
    #[error("Category not found: {0}")]
    CategoryNotFound(String),

    /// Image header could not be read
    #[error("Image decode error for {path:?}: {source}")]
    ImageDecode {
        /// Image that failed to decode
        path: PathBuf,
        /// Decoder error
        #[source]
        source: image::ImageError,
    },
}

impl FormatError {
    /// Create an invalid file error.
    pub fn invalid_file(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::InvalidFile {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a missing field error.
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Create an invalid category file error.
    pub fn invalid_category_file(message: impl Into<String>) -> Self {
        Self::InvalidCategoryFile {
            message: message.into(),
        }
    }

    /// Create a missing resource error.
    pub fn missing_resource(path: impl Into<PathBuf>) -> Self {
        Self::MissingResource { path: path.into() }
    }

    /// Create a category not found error for an id or a name.
    pub fn category_not_found(category: impl ToString) -> Self {
        Self::CategoryNotFound(category.to_string())
    }
}
