//! Toolkit-independent render list for the canvas.
//!
//! The canvas does not draw anything itself. `paint_list` turns the shapes
//! and the in-progress drawing into screen-space [`ShapePaint`] items that a
//! front end can draw in order (first item at the bottom).

use crate::color_utils::Color;
use crate::constants::{
    DEFAULT_HVERTEX_FILL_COLOR, DEFAULT_SELECT_FILL_COLOR, DEFAULT_SELECT_LINE_COLOR,
    DEFAULT_VERTEX_FILL_COLOR,
};
use crate::model::{Point, Shape, ShapeId};
use crate::zoom_math::ViewTransform;

/// One shape to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapePaint {
    /// `None` for the drawing preview.
    pub shape_id: Option<ShapeId>,
    /// Vertices in screen coordinates.
    pub points: Vec<Point>,
    pub closed: bool,
    pub line_color: Color,
    /// `None` when the shape is not filled.
    pub fill_color: Option<Color>,
    pub line_width: u32,
    pub vertex_color: Color,
    /// Vertex under the pointer, drawn with `highlight_color`.
    pub highlighted_vertex: Option<usize>,
    pub highlight_color: Color,
    /// Category text and font size, when labels are painted.
    pub label: Option<(String, u32)>,
}

/// Style settings shared by every item.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PaintStyle {
    pub line_width: u32,
    pub font_size: u32,
    pub drawing_color: Color,
    pub drawing_fill: Color,
}

/// Build the render list from the canvas contents.
pub(crate) fn build_paint_list(
    shapes: &[Shape],
    hover: Option<(ShapeId, usize)>,
    preview: Option<(&Shape, Option<Point>)>,
    view: &ViewTransform,
    style: PaintStyle,
) -> Vec<ShapePaint> {
    let mut items: Vec<ShapePaint> = shapes
        .iter()
        .filter(|s| s.visible)
        .map(|shape| {
            let (line_color, fill_color) = if shape.selected {
                (DEFAULT_SELECT_LINE_COLOR, Some(DEFAULT_SELECT_FILL_COLOR))
            } else {
                (shape.line_color, Some(shape.fill_color))
            };
            let highlighted_vertex = hover
                .filter(|(id, _)| *id == shape.id())
                .map(|(_, vertex)| vertex);
            let label = (shape.paint_label && !shape.category.is_empty())
                .then(|| (shape.category.clone(), style.font_size));

            ShapePaint {
                shape_id: Some(shape.id()),
                points: shape.points().iter().map(|p| view.to_screen(*p)).collect(),
                closed: shape.is_closed(),
                line_color,
                fill_color,
                line_width: style.line_width,
                vertex_color: DEFAULT_VERTEX_FILL_COLOR,
                highlighted_vertex,
                highlight_color: DEFAULT_HVERTEX_FILL_COLOR,
                label,
            }
        })
        .collect();

    // Drawing preview on top, open, with a rubber band to the cursor
    if let Some((shape, cursor)) = preview {
        let mut points: Vec<Point> = shape.points().iter().map(|p| view.to_screen(*p)).collect();
        if !shape.is_closed() && !points.is_empty() {
            if let Some(cursor) = cursor {
                points.push(view.to_screen(cursor));
            }
        }
        if !points.is_empty() {
            items.push(ShapePaint {
                shape_id: None,
                points,
                closed: shape.is_closed(),
                line_color: style.drawing_color,
                // Filled once closed, while waiting for its category
                fill_color: shape.is_closed().then_some(style.drawing_fill),
                line_width: style.line_width,
                vertex_color: style.drawing_color,
                highlighted_vertex: None,
                highlight_color: DEFAULT_HVERTEX_FILL_COLOR,
                label: None,
            });
        }
    }

    items
}
