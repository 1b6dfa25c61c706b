//! Dataset file formats.
//!
//! Three kinds of JSON files make up a dataset on disk:
//!
//! - **Manifest**: the list of images (and videos) relative to a root
//!   directory, with a per-image `has_gt` flag.
//! - **Category files**: one per taxonomy level, `{name, category: [...]}`.
//! - **Annotation files**: one per image under
//!   `<root>/Annotations/<category set>/<video>/<image stem>.json`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use voai::format::{DatasetManifest, read_annotation_file};
//!
//! let manifest = DatasetManifest::read(path)?;
//! let records = read_annotation_file(&annotation_path)?;
//! ```

mod auto_save;
mod category_file;
mod error;
mod manifest;
mod record;

#[cfg(test)]
mod tests;

pub use auto_save::{AutoSaveManager, PendingChanges};
pub use category_file::CategoryFile;
pub use error::FormatError;
pub use manifest::{DatasetInfo, DatasetManifest, ImageRecord, VideoRecord};
pub use record::{
    AnnotationRecord, BBoxRecord, parse_annotation_records, read_annotation_file,
    write_annotation_file,
};
