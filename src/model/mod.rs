//! Data models: shapes, category taxonomies and the label table.

mod category;
mod label;
mod shape;

pub use category::{CategoryEntry, CategoryLevel, CategorySet, Taxonomy};
pub use label::{AcceptAll, EditValidator, LabelEdit, LabelError, LabelRow, LabelTable};
pub use shape::{BoundingBox, MIN_POLYGON_VERTICES, Point, Shape, ShapeId};
