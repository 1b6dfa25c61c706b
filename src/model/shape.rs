//! Shape geometry: points, bounding boxes and annotated polygons.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::color_utils::Color;
use crate::constants::{DEFAULT_FILL_COLOR, DEFAULT_LINE_COLOR};

/// Minimum number of vertices for a shape to enclose an area.
pub const MIN_POLYGON_VERTICES: usize = 3;

/// A 2D point in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Clamp into `[0, max_x] x [0, max_y]`.
    pub fn clamped(&self, max_x: f32, max_y: f32) -> Point {
        Point::new(self.x.clamp(0.0, max_x), self.y.clamp(0.0, max_y))
    }
}

/// Min/max extents of a set of points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl BoundingBox {
    /// Extents of `points`, or `None` when there are none.
    pub fn from_points(points: &[Point]) -> Option<Self> {
        let first = points.first()?;
        let mut bbox = BoundingBox {
            min_x: first.x,
            min_y: first.y,
            max_x: first.x,
            max_y: first.y,
        };
        for p in &points[1..] {
            bbox.min_x = bbox.min_x.min(p.x);
            bbox.min_y = bbox.min_y.min(p.y);
            bbox.max_x = bbox.max_x.max(p.x);
            bbox.max_y = bbox.max_y.max(p.y);
        }
        Some(bbox)
    }

    /// Inclusive pixel width (`max_x - min_x + 1`).
    pub fn width(&self) -> f32 {
        self.max_x - self.min_x + 1.0
    }

    /// Inclusive pixel height (`max_y - min_y + 1`).
    pub fn height(&self) -> f32 {
        self.max_y - self.min_y + 1.0
    }

    /// The four corners, clockwise from the top-left.
    pub fn corners(&self) -> [Point; 4] {
        [
            Point::new(self.min_x, self.min_y),
            Point::new(self.max_x, self.min_y),
            Point::new(self.max_x, self.max_y),
            Point::new(self.min_x, self.max_y),
        ]
    }
}

/// Stable identifier of a shape, independent of where the shape lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShapeId(Uuid);

impl ShapeId {
    /// Create a new, process-unique id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ShapeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

/// A polygon drawn over an image, with its label attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    id: ShapeId,
    points: Vec<Point>,
    closed: bool,
    /// Primary category name.
    pub category: String,
    /// Track identifier across frames, -1 when untracked.
    pub track_id: i64,
    pub trackable: bool,
    pub line_color: Color,
    pub fill_color: Color,
    pub visible: bool,
    pub selected: bool,
    /// Whether the category text is drawn next to the shape.
    pub paint_label: bool,
}

impl Shape {
    /// Create an empty, open shape with a fresh id.
    pub fn new() -> Self {
        Self {
            id: ShapeId::new(),
            points: Vec::new(),
            closed: false,
            category: String::new(),
            track_id: -1,
            trackable: true,
            line_color: DEFAULT_LINE_COLOR,
            fill_color: DEFAULT_FILL_COLOR,
            visible: true,
            selected: false,
            paint_label: false,
        }
    }

    /// Create a closed shape from the given vertices.
    pub fn from_points(points: impl IntoIterator<Item = Point>) -> Self {
        let mut shape = Self::new();
        shape.points.extend(points);
        shape.close();
        shape
    }

    /// Set the primary category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn id(&self) -> ShapeId {
        self.id
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Append a vertex. Returns `false` once the shape is closed.
    pub fn add_point(&mut self, point: Point) -> bool {
        if self.closed {
            return false;
        }
        self.points.push(point);
        true
    }

    /// Mark the polygon complete. No-op on a shape without points.
    pub fn close(&mut self) {
        if self.points.is_empty() {
            return;
        }
        self.closed = true;
    }

    /// Even-odd point-in-polygon test (ray casting).
    pub fn contains_point(&self, point: &Point) -> bool {
        if self.points.len() < MIN_POLYGON_VERTICES {
            return false;
        }

        let mut inside = false;
        let mut j = self.points.len() - 1;
        for i in 0..self.points.len() {
            let vi = &self.points[i];
            let vj = &self.points[j];
            if ((vi.y > point.y) != (vj.y > point.y))
                && (point.x < (vj.x - vi.x) * (point.y - vi.y) / (vj.y - vi.y) + vi.x)
            {
                inside = !inside;
            }
            j = i;
        }
        inside
    }

    /// Index of the closest vertex within `radius` of `point`.
    ///
    /// Ties resolve to the lowest index.
    pub fn nearest_vertex(&self, point: &Point, radius: f32) -> Option<usize> {
        let mut best: Option<(usize, f32)> = None;
        for (i, p) in self.points.iter().enumerate() {
            let d = p.distance_to(point);
            if d > radius {
                continue;
            }
            if best.is_none_or(|(_, best_d)| d < best_d) {
                best = Some((i, d));
            }
        }
        best.map(|(i, _)| i)
    }

    /// Move every vertex by `(dx, dy)`.
    pub fn translate(&mut self, dx: f32, dy: f32) {
        for p in &mut self.points {
            p.x += dx;
            p.y += dy;
        }
    }

    /// Move a single vertex. Returns `false` for an out-of-range index.
    pub fn move_vertex(&mut self, index: usize, to: Point) -> bool {
        match self.points.get_mut(index) {
            Some(p) => {
                *p = to;
                true
            }
            None => false,
        }
    }

    /// Recompute the four corners of a quadrilateral so that it becomes a
    /// square with corner `anchor` fixed and the opposite corner in the
    /// direction of `cursor`.
    ///
    /// The side length is the larger of the two cursor offsets. Vertex
    /// winding is preserved. Returns `false` for non-quadrilaterals.
    pub fn resize_to_square(&mut self, anchor: usize, cursor: Point) -> bool {
        if self.points.len() != 4 || anchor >= 4 {
            return false;
        }

        let a = self.points[anchor];
        let dx = cursor.x - a.x;
        let dy = cursor.y - a.y;
        let side = dx.abs().max(dy.abs());
        let opposite = Point::new(a.x + side.copysign(dx), a.y + side.copysign(dy));

        let horizontal = Point::new(opposite.x, a.y);
        let vertical = Point::new(a.x, opposite.y);
        let (next, prev) = if anchor % 2 == 0 {
            (horizontal, vertical)
        } else {
            (vertical, horizontal)
        };

        self.points[(anchor + 1) % 4] = next;
        self.points[(anchor + 2) % 4] = opposite;
        self.points[(anchor + 3) % 4] = prev;
        true
    }

    /// Min/max extents of the vertices.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(&self.points)
    }

    /// Whether this is an axis-aligned quadrilateral, i.e. fully described
    /// by its bounding box.
    pub fn is_rectangle(&self) -> bool {
        let Some(bbox) = self.bounding_box() else {
            return false;
        };
        if self.points.len() != 4 {
            return false;
        }
        bbox.corners()
            .iter()
            .all(|corner| self.points.iter().any(|p| p == corner))
    }

    /// Copy of this shape under a new id, deselected.
    pub fn duplicate(&self) -> Shape {
        Shape {
            id: ShapeId::new(),
            selected: false,
            ..self.clone()
        }
    }
}

impl Default for Shape {
    fn default() -> Self {
        Self::new()
    }
}
