//! VOAI - Video Object Annotation
//!
//! Library behind a video object annotation tool: polygon and box shapes
//! drawn on dataset images, labelled against up to three category
//! taxonomies and saved as COCO-like JSON records per image.
//!
//! The crate is toolkit independent. A front end feeds pointer events into a
//! [`Session`], draws [`Canvas::paint_list`] and answers the session's
//! questions through a [`Prompter`].

pub mod annotation;
pub mod canvas;
pub mod color_utils;
pub mod config;
pub mod constants;
pub mod format;
pub mod model;
pub mod prompt;
pub mod session;
pub mod state;
pub mod zoom_math;

pub use annotation::{AnnotationModel, LabelAssignment};
pub use canvas::{Canvas, CanvasError, CanvasEvent, CanvasMode, PointerEvent};
pub use config::{AppConfig, ConfigError, LogLevel};
pub use format::FormatError;
pub use model::{CategoryLevel, LabelEdit, LabelError, Point, Shape, ShapeId};
pub use prompt::{NonInteractive, Prompter};
pub use session::{Session, SessionError, SessionSettings};
pub use state::Dataset;
