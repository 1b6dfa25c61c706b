//! Dataset state: the manifest plus the images found on disk.

use std::path::{Path, PathBuf};

use crate::constants::ANNOTATIONS_DIR;
use crate::format::{DatasetManifest, FormatError, ImageRecord};

/// Normalize a directory string for comparison with `info.root_dir`.
fn normalize_dir(dir: &str) -> String {
    let dir = dir.replace('\\', "/");
    if dir.len() > 1 {
        dir.trim_end_matches('/').to_string()
    } else {
        dir
    }
}

/// An open dataset.
///
/// The manifest is expected one directory below the dataset root, e.g.
/// `<root>/lists/train.json`. Only images whose files exist are listed.
#[derive(Clone, Debug)]
pub struct Dataset {
    /// Where the manifest is written back to
    manifest_path: PathBuf,
    /// Manifest without its image list
    manifest: DatasetManifest,
    /// Dataset root directory
    root: PathBuf,
    /// Images present on disk, `index` matching their position
    images: Vec<ImageRecord>,
}

impl Dataset {
    /// Open a manifest.
    ///
    /// The actual root is the manifest's grandparent directory; if the
    /// recorded `root_dir` differs, it is corrected in the manifest file.
    pub fn open(manifest_path: &Path) -> Result<Self, FormatError> {
        if !manifest_path.is_file() {
            return Err(FormatError::missing_resource(manifest_path));
        }
        let manifest_path = std::fs::canonicalize(manifest_path)?;
        let mut manifest = DatasetManifest::read(&manifest_path)?;

        let root = manifest_path
            .parent()
            .and_then(Path::parent)
            .ok_or_else(|| FormatError::missing_resource(&manifest_path))?
            .to_path_buf();
        if !root.is_dir() {
            return Err(FormatError::missing_resource(root));
        }

        let root_dir = normalize_dir(&root.to_string_lossy());
        if normalize_dir(&manifest.info.root_dir) != root_dir {
            log::info!(
                "Dataset moved: root_dir {:?} rewritten to {:?}",
                manifest.info.root_dir,
                root_dir
            );
            manifest.info.root_dir = root_dir;
            manifest.write(&manifest_path)?;
        }

        let listed = std::mem::take(&mut manifest.images);
        let total = listed.len();
        let mut images = Vec::with_capacity(total);
        for mut image in listed {
            if !root.join(&image.file_name).is_file() {
                log::debug!("Skipping missing image {}", image.file_name);
                continue;
            }
            image.index = images.len();
            images.push(image);
        }

        log::info!(
            "Opened dataset {:?}: {} of {} images present",
            manifest_path,
            images.len(),
            total
        );

        Ok(Self {
            manifest_path,
            manifest,
            root,
            images,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    pub fn manifest(&self) -> &DatasetManifest {
        &self.manifest
    }

    pub fn images(&self) -> &[ImageRecord] {
        &self.images
    }

    pub fn image(&self, index: usize) -> Option<&ImageRecord> {
        self.images.get(index)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Absolute path of an image file.
    pub fn image_path(&self, image: &ImageRecord) -> PathBuf {
        self.root.join(&image.file_name)
    }

    pub fn video_name(&self, image: &ImageRecord) -> Option<&str> {
        image
            .video_id
            .and_then(|video_id| self.manifest.video_name(video_id))
    }

    /// `<root>/Annotations/<set>/<video name?>/<image stem>.json`
    pub fn annotation_path(&self, set_name: &str, image: &ImageRecord) -> PathBuf {
        let mut path = self.root.join(ANNOTATIONS_DIR).join(set_name);
        if let Some(video) = self.video_name(image) {
            path.push(video);
        }
        path.push(format!("{}.json", image.stem()));
        path
    }

    /// Set the ground-truth flag of an image. Returns `false` for a bad index.
    pub fn set_has_gt(&mut self, index: usize, has_gt: bool) -> bool {
        match self.images.get_mut(index) {
            Some(image) => {
                image.has_gt = has_gt;
                true
            }
            None => false,
        }
    }

    /// Write the manifest with the present images and their `has_gt` flags.
    pub fn save(&self) -> Result<(), FormatError> {
        let mut manifest = self.manifest.clone();
        manifest.images = self.images.clone();
        manifest.write(&self.manifest_path)?;
        log::info!(
            "Saved dataset ({} images) to {:?}",
            self.images.len(),
            self.manifest_path
        );
        Ok(())
    }

    /// Keep only the images directly inside `dir`.
    ///
    /// The manifest is retargeted to `<manifest dir>/<dir name>.json` so the
    /// subset is saved next to the full list. Returns the number of images
    /// kept.
    pub fn filter_by_directory(&mut self, dir: &Path) -> usize {
        let dir = std::fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf());
        let root = &self.root;
        self.images
            .retain(|image| root.join(&image.file_name).parent() == Some(dir.as_path()));
        for (index, image) in self.images.iter_mut().enumerate() {
            image.index = index;
        }

        if let Some(name) = dir.file_name() {
            let file_name = format!("{}.json", name.to_string_lossy());
            self.manifest_path = match self.manifest_path.parent() {
                Some(parent) => parent.join(file_name),
                None => PathBuf::from(file_name),
            };
        }
        log::info!(
            "Filtered dataset to {:?}: {} images, manifest {:?}",
            dir,
            self.images.len(),
            self.manifest_path
        );
        self.images.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use tempfile::TempDir;

    /// `<tmp>/set/{lists/set.json, video1/0001.jpg, video1/0002.jpg, 0003.jpg}`
    fn layout(root_dir: &str) -> (TempDir, PathBuf) {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("set");
        std::fs::create_dir_all(root.join("lists")).unwrap();
        std::fs::create_dir_all(root.join("video1")).unwrap();
        std::fs::write(root.join("video1/0001.jpg"), b"").unwrap();
        std::fs::write(root.join("video1/0002.jpg"), b"").unwrap();
        std::fs::write(root.join("0003.jpg"), b"").unwrap();

        let manifest = json!({
            "info": {"root_dir": root_dir},
            "images": [
                {"id": 1, "file_name": "video1/0001.jpg", "has_gt": false, "video_id": 5},
                {"id": 2, "file_name": "missing.jpg", "has_gt": false},
                {"id": 3, "file_name": "video1/0002.jpg", "has_gt": true, "video_id": 5},
                {"id": 4, "file_name": "0003.jpg", "has_gt": false}
            ],
            "videos": [{"id": 5, "name": "video1"}]
        });
        let path = root.join("lists/set.json");
        std::fs::write(&path, manifest.to_string()).unwrap();
        (tmp, path)
    }

    fn read_json(path: &Path) -> Value {
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn test_root_dir_rewritten_when_moved() {
        let (tmp, path) = layout("/somewhere/else");
        let dataset = Dataset::open(&path).unwrap();

        let expected = std::fs::canonicalize(tmp.path().join("set")).unwrap();
        assert_eq!(dataset.root(), expected.as_path());
        let on_disk = read_json(&path);
        assert_eq!(
            on_disk["info"]["root_dir"],
            normalize_dir(&expected.to_string_lossy())
        );
        // Images are still all listed in the rewritten file
        assert_eq!(on_disk["images"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn test_root_dir_untouched_when_correct() {
        let tmp = TempDir::new().unwrap();
        let root = std::fs::canonicalize(tmp.path()).unwrap().join("set");
        std::fs::create_dir_all(root.join("lists")).unwrap();
        let path = root.join("lists/set.json");
        let text = json!({
            "info": {"root_dir": root.to_string_lossy()},
            "images": []
        })
        .to_string();
        std::fs::write(&path, &text).unwrap();

        let dataset = Dataset::open(&path).unwrap();
        assert!(dataset.is_empty());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), text);
    }

    #[test]
    fn test_missing_images_skipped_and_indexed() {
        let (_tmp, path) = layout("/x");
        let dataset = Dataset::open(&path).unwrap();
        let ids: Vec<i64> = dataset.images().iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![1, 3, 4]);
        let indices: Vec<usize> = dataset.images().iter().map(|i| i.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_annotation_path() {
        let (_tmp, path) = layout("/x");
        let dataset = Dataset::open(&path).unwrap();
        let root = dataset.root().to_path_buf();

        let in_video = dataset.image(0).unwrap();
        assert_eq!(
            dataset.annotation_path("road", in_video),
            root.join("Annotations/road/video1/0001.json")
        );
        let loose = dataset.image(2).unwrap();
        assert_eq!(
            dataset.annotation_path("road", loose),
            root.join("Annotations/road/0003.json")
        );
    }

    #[test]
    fn test_save_writes_has_gt_without_index() {
        let (_tmp, path) = layout("/x");
        let mut dataset = Dataset::open(&path).unwrap();
        assert!(dataset.set_has_gt(0, true));
        assert!(!dataset.set_has_gt(10, true));
        dataset.save().unwrap();

        let on_disk = read_json(&path);
        let images = on_disk["images"].as_array().unwrap();
        assert_eq!(images.len(), 3);
        assert_eq!(images[0]["has_gt"], true);
        assert!(images.iter().all(|i| i.get("index").is_none()));
        assert_eq!(on_disk["videos"][0]["name"], "video1");
    }

    #[test]
    fn test_filter_by_directory() {
        let (_tmp, path) = layout("/x");
        let mut dataset = Dataset::open(&path).unwrap();
        let video_dir = dataset.root().join("video1");

        assert_eq!(dataset.filter_by_directory(&video_dir), 2);
        assert_eq!(dataset.image(1).unwrap().id, 3);
        assert_eq!(dataset.image(1).unwrap().index, 1);
        assert_eq!(
            dataset.manifest_path(),
            dataset.root().join("lists/video1.json").as_path()
        );

        dataset.save().unwrap();
        let subset = read_json(&dataset.root().join("lists/video1.json"));
        assert_eq!(subset["images"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_missing_manifest() {
        let tmp = TempDir::new().unwrap();
        let err = Dataset::open(&tmp.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, FormatError::MissingResource { .. }));
    }

    #[test]
    fn test_invalid_manifest() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("lists")).unwrap();
        let path = tmp.path().join("lists/bad.json");
        std::fs::write(&path, r#"{"images": []}"#).unwrap();
        let err = Dataset::open(&path).unwrap_err();
        assert!(matches!(err, FormatError::InvalidFile { .. }));
    }
}
