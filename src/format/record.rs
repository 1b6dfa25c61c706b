//! Per-image annotation files.
//!
//! Each image has one JSON file holding a list of COCO-like records. Boxes
//! are stored as `{x, y, w, h}` with inclusive pixel extents, so a box whose
//! corners are `(10, 10)` and `(50, 40)` has `w = 41` and `h = 31`.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::format::error::FormatError;
use crate::model::{BoundingBox, Point};

fn unassigned() -> i64 {
    -1
}

fn default_trackable() -> bool {
    true
}

/// Axis-aligned box as written to disk.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBoxRecord {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl BBoxRecord {
    pub fn from_bounding_box(bbox: &BoundingBox) -> Self {
        Self {
            x: bbox.min_x,
            y: bbox.min_y,
            w: bbox.width(),
            h: bbox.height(),
        }
    }

    /// Corner points clockwise from the top-left.
    pub fn corners(&self) -> [Point; 4] {
        let x_max = self.x + self.w - 1.0;
        let y_max = self.y + self.h - 1.0;
        [
            Point::new(self.x, self.y),
            Point::new(x_max, self.y),
            Point::new(x_max, y_max),
            Point::new(self.x, y_max),
        ]
    }
}

/// One annotation of an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    #[serde(default = "unassigned")]
    pub id: i64,
    /// Missing in malformed files; such files are rejected on load.
    pub bbox: Option<BBoxRecord>,
    pub category_id: u32,
    #[serde(default)]
    pub second_category_id: Option<u32>,
    #[serde(default)]
    pub third_category_id: Option<u32>,
    #[serde(default)]
    pub track_id: Option<i64>,
    /// Legacy name of `track_id`; wins when both are present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_ins_id: Option<i64>,
    #[serde(default = "default_trackable")]
    pub trackable: bool,
    #[serde(default)]
    pub image_id: i64,
    #[serde(default)]
    pub iscrowd: u8,
    #[serde(default)]
    pub area: f64,
    #[serde(default = "empty_segmentation")]
    pub segmentation: Value,
}

fn empty_segmentation() -> Value {
    Value::Array(Vec::new())
}

impl AnnotationRecord {
    /// New record with the fixed defaults for fields the tool does not use.
    pub fn new(id: i64, bbox: BBoxRecord, category_id: u32, image_id: i64) -> Self {
        Self {
            id,
            bbox: Some(bbox),
            category_id,
            second_category_id: None,
            third_category_id: None,
            track_id: Some(-1),
            video_ins_id: None,
            trackable: true,
            image_id,
            iscrowd: 0,
            area: 0.0,
            segmentation: empty_segmentation(),
        }
    }

    /// Track id, honoring the legacy key.
    pub fn resolved_track_id(&self) -> i64 {
        self.video_ins_id.or(self.track_id).unwrap_or(-1)
    }
}

/// Parse the contents of an annotation file.
///
/// Accepts a list of records or an object whose values are records (taken
/// in key order).
pub fn parse_annotation_records(
    path: &Path,
    value: Value,
) -> Result<Vec<AnnotationRecord>, FormatError> {
    let rows = match value {
        Value::Array(rows) => rows,
        Value::Object(map) => map.into_iter().map(|(_, row)| row).collect(),
        _ => {
            return Err(FormatError::invalid_file(
                path,
                "expected a list or an object of annotations",
            ));
        }
    };
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(FormatError::from))
        .collect()
}

/// Read an annotation file. A missing file yields no records.
pub fn read_annotation_file(path: &Path) -> Result<Vec<AnnotationRecord>, FormatError> {
    if !path.exists() {
        log::debug!("No annotation file at {:?}", path);
        return Ok(Vec::new());
    }
    let contents = std::fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&contents)?;
    let records = parse_annotation_records(path, value)?;
    log::debug!("Read {} annotations from {:?}", records.len(), path);
    Ok(records)
}

/// Write an annotation file, creating parent directories as needed.
pub fn write_annotation_file(path: &Path, records: &[AnnotationRecord]) -> Result<(), FormatError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string(records)?;
    std::fs::write(path, json)?;
    log::info!("Saved {} annotations to {:?}", records.len(), path);
    Ok(())
}
