//! Global constants for the annotation tool.

use crate::color_utils::Color;

/// Number of vertices a new shape collects before it closes.
pub const DEFAULT_VERTICES_PER_SHAPE: usize = 4;

/// Hit radius for grabbing a vertex, in screen pixels.
pub const HANDLE_HIT_RADIUS: f32 = 8.0;

/// Offset applied to a duplicated shape so it does not cover the original.
pub const COPY_OFFSET: f32 = 2.0;

/// Default zoom level in percent.
pub const DEFAULT_ZOOM_PERCENT: f32 = 100.0;

/// Smallest allowed zoom level in percent.
pub const MIN_ZOOM_PERCENT: f32 = 1.0;

/// Largest allowed zoom level in percent.
pub const MAX_ZOOM_PERCENT: f32 = 2500.0;

/// Margin subtracted from the viewport when fitting the image, so no
/// scrollbars are needed.
pub const FIT_MARGIN: f32 = 2.0;

/// Category value in a second/third taxonomy that applies to every primary
/// category.
pub const SUPERCATEGORY_ALL: &str = "all";

/// Directory under the dataset root that holds annotation files.
pub const ANNOTATIONS_DIR: &str = "Annotations";

/// Default shape outline color.
pub const DEFAULT_LINE_COLOR: Color = Color::new(0, 255, 0, 128);

/// Default shape fill color.
pub const DEFAULT_FILL_COLOR: Color = Color::new(255, 0, 0, 128);

/// Outline color of selected shapes.
pub const DEFAULT_SELECT_LINE_COLOR: Color = Color::new(255, 255, 255, 255);

/// Fill color of selected shapes.
pub const DEFAULT_SELECT_FILL_COLOR: Color = Color::new(0, 128, 255, 155);

/// Fill color of regular vertex handles.
pub const DEFAULT_VERTEX_FILL_COLOR: Color = Color::new(0, 255, 0, 255);

/// Fill color of the vertex under the pointer.
pub const DEFAULT_HVERTEX_FILL_COLOR: Color = Color::new(255, 0, 0, 255);

/// Default outline thickness in screen pixels.
pub const DEFAULT_LINE_THICKNESS: u32 = 1;

/// Default label font size in points.
pub const DEFAULT_FONT_SIZE: u32 = 10;
