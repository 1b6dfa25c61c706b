//! Dataset manifest file.
//!
//! The manifest lists the images of a dataset relative to `info.root_dir`,
//! optionally grouped into videos. Keys the tool does not know about are
//! kept and written back unchanged.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::format::error::FormatError;

/// `info` block of the manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub root_dir: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A video grouping images.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub id: i64,
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One image of the dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: i64,
    /// Path relative to the dataset root.
    pub file_name: String,
    /// Whether the image has been annotated.
    #[serde(default)]
    pub has_gt: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_id: Option<i64>,
    /// Position in the list of images present on disk. Never written.
    #[serde(skip)]
    pub index: usize,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ImageRecord {
    pub fn new(id: i64, file_name: impl Into<String>) -> Self {
        Self {
            id,
            file_name: file_name.into(),
            has_gt: false,
            video_id: None,
            index: 0,
            extra: Map::new(),
        }
    }

    /// File name without directory and extension.
    pub fn stem(&self) -> String {
        Path::new(&self.file_name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// The whole manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetManifest {
    pub info: DatasetInfo,
    pub images: Vec<ImageRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub videos: Option<Vec<VideoRecord>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DatasetManifest {
    /// Validate and convert a parsed manifest.
    ///
    /// `info.root_dir` and `images` are required.
    pub fn from_value(path: &Path, value: Value) -> Result<Self, FormatError> {
        let has_root_dir = value
            .get("info")
            .and_then(|info| info.get("root_dir"))
            .is_some_and(Value::is_string);
        if !has_root_dir {
            return Err(FormatError::invalid_file(path, "missing info.root_dir"));
        }
        if !value.get("images").is_some_and(Value::is_array) {
            return Err(FormatError::invalid_file(path, "missing images"));
        }

        let mut manifest: DatasetManifest = serde_json::from_value(value)?;
        // Runtime-only key left behind by older tools
        for image in &mut manifest.images {
            image.extra.remove("index");
        }
        Ok(manifest)
    }

    pub fn read(path: &Path) -> Result<Self, FormatError> {
        let contents = std::fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&contents)?;
        Self::from_value(path, value)
    }

    /// Write the manifest, creating parent directories as needed.
    pub fn write(&self, path: &Path) -> Result<(), FormatError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Name of the video with the given id.
    pub fn video_name(&self, video_id: i64) -> Option<&str> {
        self.videos
            .as_ref()?
            .iter()
            .find(|v| v.id == video_id)
            .map(|v| v.name.as_str())
    }
}
