//! Tests for the dataset manifest.

use std::path::Path;

use serde_json::json;
use tempfile::TempDir;

use crate::format::{DatasetManifest, FormatError, ImageRecord};

fn sample() -> serde_json::Value {
    json!({
        "info": {"root_dir": "/data/set", "description": "street scenes"},
        "images": [
            {"id": 1, "file_name": "video1/0001.jpg", "has_gt": true, "video_id": 10, "width": 640},
            {"id": 2, "file_name": "0002.png", "has_gt": false, "index": 4}
        ],
        "videos": [{"id": 10, "name": "video1"}],
        "licenses": []
    })
}

#[test]
fn test_parse_manifest() {
    let manifest = DatasetManifest::from_value(Path::new("m.json"), sample()).unwrap();
    assert_eq!(manifest.info.root_dir, "/data/set");
    assert_eq!(manifest.images.len(), 2);
    assert!(manifest.images[0].has_gt);
    assert_eq!(manifest.images[0].video_id, Some(10));
    assert_eq!(manifest.video_name(10), Some("video1"));
    assert_eq!(manifest.video_name(11), None);
    assert_eq!(manifest.images[0].stem(), "0001");
}

#[test]
fn test_unknown_keys_survive_and_index_is_dropped() {
    let manifest = DatasetManifest::from_value(Path::new("m.json"), sample()).unwrap();
    let value = serde_json::to_value(&manifest).unwrap();

    assert_eq!(value["info"]["description"], "street scenes");
    assert_eq!(value["images"][0]["width"], 640);
    assert_eq!(value["licenses"], json!([]));
    assert!(value["images"][1].get("index").is_none());
    assert!(value["images"][1].get("video_id").is_none());
}

#[test]
fn test_missing_root_dir() {
    let err = DatasetManifest::from_value(
        Path::new("m.json"),
        json!({"info": {}, "images": []}),
    )
    .unwrap_err();
    assert!(matches!(err, FormatError::InvalidFile { .. }));
}

#[test]
fn test_missing_images() {
    let err = DatasetManifest::from_value(
        Path::new("m.json"),
        json!({"info": {"root_dir": "/data"}}),
    )
    .unwrap_err();
    assert!(matches!(err, FormatError::InvalidFile { .. }));
}

#[test]
fn test_write_and_read_back() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("lists/set.json");
    let mut manifest = DatasetManifest::from_value(&path, sample()).unwrap();
    manifest.images.push(ImageRecord::new(3, "0003.jpg"));
    manifest.write(&path).unwrap();

    let read = DatasetManifest::read(&path).unwrap();
    assert_eq!(read.images.len(), 3);
    assert_eq!(read.images[2].file_name, "0003.jpg");
}
