//! Canvas controller.
//!
//! Owns the shapes of the open image and turns pointer input into drawing,
//! selection and editing. Pointer positions arrive in screen coordinates and
//! are mapped into image space through the current [`ViewTransform`]; every
//! point that lands in a shape is clamped to the image extents.
//!
//! The controller never draws. Front ends call [`Canvas::paint_list`] and
//! react to the [`CanvasEvent`]s returned by [`Canvas::handle_pointer`].

mod paint;
mod state;

pub use paint::ShapePaint;
pub use state::{
    CanvasError, CanvasEvent, CanvasMode, PointerButton, PointerEvent, PointerEventKind,
};

use paint::{PaintStyle, build_paint_list};
use state::{EditState, Interaction};

use crate::color_utils::Color;
use crate::constants::{
    COPY_OFFSET, DEFAULT_FILL_COLOR, DEFAULT_FONT_SIZE, DEFAULT_LINE_COLOR, DEFAULT_LINE_THICKNESS,
    DEFAULT_VERTICES_PER_SHAPE, HANDLE_HIT_RADIUS,
};
use crate::model::{BoundingBox, MIN_POLYGON_VERTICES, Point, Shape, ShapeId};
use crate::zoom_math::{ViewTransform, fit_width_percent, fit_window_percent};

/// Largest valid pixel coordinate per axis, `None` without an image.
type Extent = Option<(f32, f32)>;

fn clamp_to(point: Point, extent: Extent) -> Point {
    match extent {
        Some((max_x, max_y)) => point.clamped(max_x, max_y),
        None => point,
    }
}

/// Opposite corner of a square anchored at `anchor` and grown toward
/// `cursor`, shrunk so the square stays inside the image.
fn square_corner(anchor: Point, cursor: Point, extent: Extent) -> Point {
    let cursor = clamp_to(cursor, extent);
    let dx = cursor.x - anchor.x;
    let dy = cursor.y - anchor.y;
    let mut side = dx.abs().max(dy.abs());
    if let Some((max_x, max_y)) = extent {
        let room_x = if dx.is_sign_negative() { anchor.x } else { max_x - anchor.x };
        let room_y = if dy.is_sign_negative() { anchor.y } else { max_y - anchor.y };
        side = side.min(room_x.max(0.0)).min(room_y.max(0.0));
    }
    Point::new(anchor.x + side.copysign(dx), anchor.y + side.copysign(dy))
}

/// Limit a translation so a box stays inside the image.
fn bounded_delta(bbox: &BoundingBox, dx: f32, dy: f32, extent: Extent) -> (f32, f32) {
    let Some((max_x, max_y)) = extent else {
        return (dx, dy);
    };
    let dx = dx.clamp((-bbox.min_x).min(0.0), (max_x - bbox.max_x).max(0.0));
    let dy = dy.clamp((-bbox.min_y).min(0.0), (max_y - bbox.max_y).max(0.0));
    (dx, dy)
}

/// Interactive annotation surface for a single image.
#[derive(Debug, Clone)]
pub struct Canvas {
    image_size: Option<(u32, u32)>,
    /// Shapes in paint order; the last one is on top.
    shapes: Vec<Shape>,
    /// Selected shapes, primary first.
    selection: Vec<ShapeId>,
    interaction: Interaction,
    /// Last pointer position while drawing, in image space.
    cursor: Option<Point>,
    /// Vertex under the pointer.
    hover: Option<(ShapeId, usize)>,
    view: ViewTransform,
    vertices_per_shape: usize,
    /// Draw and resize shapes as squares.
    pub draw_square: bool,
    pub line_thickness: u32,
    pub font_size: u32,
    /// Outline color of the shape being drawn.
    pub drawing_color: Color,
    /// Fill of a drawn shape waiting for its category.
    pub drawing_fill: Color,
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new()
    }
}

impl Canvas {
    pub fn new() -> Self {
        Self {
            image_size: None,
            shapes: Vec::new(),
            selection: Vec::new(),
            interaction: Interaction::Idle,
            cursor: None,
            hover: None,
            view: ViewTransform::identity(),
            vertices_per_shape: DEFAULT_VERTICES_PER_SHAPE,
            draw_square: false,
            line_thickness: DEFAULT_LINE_THICKNESS,
            font_size: DEFAULT_FONT_SIZE,
            drawing_color: DEFAULT_LINE_COLOR,
            drawing_fill: DEFAULT_FILL_COLOR,
        }
    }

    // ----- image / contents -----

    /// Start over on a new image of the given size. Drops every shape.
    pub fn load_image(&mut self, width: u32, height: u32) {
        self.reset();
        self.image_size = Some((width, height));
        log::debug!("Canvas loaded image {}x{}", width, height);
    }

    /// Drop the image and everything on it.
    pub fn unload_image(&mut self) {
        self.reset();
        self.image_size = None;
    }

    /// Drop all shapes and return to idle. Keeps the image and the view.
    pub fn reset(&mut self) {
        self.shapes.clear();
        self.selection.clear();
        self.interaction = Interaction::Idle;
        self.cursor = None;
        self.hover = None;
    }

    pub fn has_image(&self) -> bool {
        self.image_size.is_some()
    }

    pub fn image_size(&self) -> Option<(u32, u32)> {
        self.image_size
    }

    /// Replace the shapes (e.g. with annotations read from disk).
    pub fn load_shapes(&mut self, shapes: Vec<Shape>) {
        self.reset();
        self.shapes = shapes;
        for shape in &mut self.shapes {
            shape.selected = false;
        }
        log::debug!("Canvas holds {} shapes", self.shapes.len());
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn shape(&self, id: ShapeId) -> Option<&Shape> {
        self.shapes.iter().find(|s| s.id() == id)
    }

    pub fn shape_mut(&mut self, id: ShapeId) -> Option<&mut Shape> {
        self.shapes.iter_mut().find(|s| s.id() == id)
    }

    pub fn mode(&self) -> CanvasMode {
        self.interaction.mode()
    }

    pub fn vertices_per_shape(&self) -> usize {
        self.vertices_per_shape
    }

    /// Number of clicks that close a new shape (at least three).
    pub fn set_vertices_per_shape(&mut self, count: usize) {
        self.vertices_per_shape = count.max(MIN_POLYGON_VERTICES);
    }

    fn extent(&self) -> Extent {
        self.image_size.map(|(w, h)| {
            (
                w.saturating_sub(1) as f32,
                h.saturating_sub(1) as f32,
            )
        })
    }

    fn hit_radius(&self) -> f32 {
        self.view.to_image_distance(HANDLE_HIT_RADIUS)
    }

    // ----- selection -----

    /// Selected shape ids, primary first.
    pub fn selected_ids(&self) -> &[ShapeId] {
        &self.selection
    }

    /// The primary selected shape.
    pub fn selected_shape(&self) -> Option<&Shape> {
        self.selection.first().and_then(|id| self.shape(*id))
    }

    fn apply_selection(&mut self, ids: Vec<ShapeId>) {
        for shape in &mut self.shapes {
            shape.selected = ids.contains(&shape.id());
        }
        self.selection = ids;
        if matches!(self.interaction, Interaction::Idle | Interaction::Editing(_)) {
            self.interaction = if self.selection.is_empty() {
                Interaction::Idle
            } else {
                Interaction::Editing(EditState::Selected)
            };
        }
    }

    /// Select a single shape from outside the canvas (e.g. the label table).
    ///
    /// Refused while drawing and for hidden or unknown shapes.
    pub fn select_shape(&mut self, id: ShapeId) -> bool {
        if self.mode() == CanvasMode::Drawing {
            return false;
        }
        if !self.shape(id).is_some_and(|s| s.visible) {
            return false;
        }
        self.apply_selection(vec![id]);
        true
    }

    pub fn deselect_all(&mut self) {
        self.apply_selection(Vec::new());
    }

    // ----- drawing -----

    /// Begin a new shape. Clears the selection.
    pub fn start_drawing(&mut self) -> Result<(), CanvasError> {
        if self.image_size.is_none() {
            return Err(CanvasError::NoImageLoaded);
        }
        if self.pending_shape().is_some() {
            return Err(CanvasError::PendingShape);
        }
        self.deselect_all();
        self.interaction = Interaction::Drawing(Shape::new());
        self.cursor = None;
        self.hover = None;
        log::debug!("Drawing started");
        Ok(())
    }

    /// Abandon the shape being drawn. Returns `false` if nothing was drawn.
    pub fn cancel_drawing(&mut self) -> bool {
        if matches!(self.interaction, Interaction::Drawing(_)) {
            self.interaction = Interaction::Idle;
            self.cursor = None;
            log::debug!("Drawing cancelled");
            return true;
        }
        false
    }

    /// The closed shape waiting for a category, if any.
    pub fn pending_shape(&self) -> Option<&Shape> {
        match &self.interaction {
            Interaction::AwaitingCategory(shape) => Some(shape),
            _ => None,
        }
    }

    /// Commit the pending shape with its category and colors.
    ///
    /// The new shape ends up on top and selected.
    pub fn commit_pending(
        &mut self,
        category: &str,
        line_color: Color,
        fill_color: Color,
    ) -> Result<ShapeId, CanvasError> {
        match std::mem::take(&mut self.interaction) {
            Interaction::AwaitingCategory(mut shape) => {
                shape.category = category.to_string();
                shape.line_color = line_color;
                shape.fill_color = fill_color;
                let id = shape.id();
                self.shapes.push(shape);
                self.apply_selection(vec![id]);
                log::debug!("Committed shape {} as '{}'", id, category);
                Ok(id)
            }
            other => {
                self.interaction = other;
                Err(CanvasError::NoPendingShape)
            }
        }
    }

    /// Drop the pending shape (category prompt cancelled).
    pub fn discard_pending(&mut self) -> Result<(), CanvasError> {
        if self.pending_shape().is_none() {
            return Err(CanvasError::NoPendingShape);
        }
        self.interaction = Interaction::Idle;
        log::debug!("Pending shape discarded");
        Ok(())
    }

    // ----- pointer input -----

    /// Feed one pointer event. Ignored without an image.
    pub fn handle_pointer(&mut self, event: PointerEvent) -> Option<CanvasEvent> {
        self.image_size?;
        log::trace!("Pointer {:?} at {:?}", event.kind, event.position);

        if matches!(self.interaction, Interaction::Panning { .. }) {
            self.handle_pan(event);
            return None;
        }
        if event.button == PointerButton::Middle {
            if event.kind == PointerEventKind::Press {
                let resume = std::mem::take(&mut self.interaction);
                self.interaction = Interaction::Panning {
                    last: event.position,
                    resume: Box::new(resume),
                };
            }
            return None;
        }

        match self.interaction {
            Interaction::Drawing(_) => self.handle_drawing(event),
            Interaction::AwaitingCategory(_) => None,
            _ => self.handle_editing(event),
        }
    }

    fn handle_pan(&mut self, event: PointerEvent) {
        match event.kind {
            PointerEventKind::Press => {}
            PointerEventKind::Move => {
                if let Interaction::Panning { last, .. } = &mut self.interaction {
                    let dx = event.position.x - last.x;
                    let dy = event.position.y - last.y;
                    *last = event.position;
                    self.view = self.view.pan_by(dx, dy);
                }
            }
            PointerEventKind::Release => {
                if event.button != PointerButton::Middle {
                    return;
                }
                if let Interaction::Panning { resume, .. } = std::mem::take(&mut self.interaction)
                {
                    self.interaction = *resume;
                }
            }
        }
    }

    fn handle_drawing(&mut self, event: PointerEvent) -> Option<CanvasEvent> {
        let extent = self.extent();
        let point = clamp_to(self.view.to_image(event.position), extent);

        match event.kind {
            PointerEventKind::Move => {
                self.cursor = Some(point);
                None
            }
            PointerEventKind::Release => None,
            PointerEventKind::Press => {
                let draw_square = self.draw_square;
                let target = self.vertices_per_shape;
                let Interaction::Drawing(shape) = &mut self.interaction else {
                    return None;
                };

                let complete = if draw_square {
                    match shape.points().first().copied() {
                        None => {
                            shape.add_point(point);
                            false
                        }
                        Some(anchor) => {
                            let corner = square_corner(anchor, point, extent);
                            // Zero-size square
                            if corner == anchor {
                                return None;
                            }
                            for _ in 1..4 {
                                shape.add_point(anchor);
                            }
                            shape.resize_to_square(0, corner)
                        }
                    }
                } else {
                    shape.add_point(point);
                    shape.len() >= target
                };

                if !complete {
                    return None;
                }
                if let Interaction::Drawing(mut shape) = std::mem::take(&mut self.interaction) {
                    shape.close();
                    log::debug!("Shape closed with {} vertices", shape.len());
                    self.interaction = Interaction::AwaitingCategory(shape);
                }
                self.cursor = None;
                Some(CanvasEvent::ShapeClosed)
            }
        }
    }

    fn handle_editing(&mut self, event: PointerEvent) -> Option<CanvasEvent> {
        let point = clamp_to(self.view.to_image(event.position), self.extent());
        match event.kind {
            PointerEventKind::Press => self.press_select(point, event.additive),
            PointerEventKind::Move => {
                self.drag_to(point);
                None
            }
            PointerEventKind::Release => self.finish_drag(),
        }
    }

    /// Pointer down: grab a vertex of the primary selection, or (re)select
    /// the topmost shape under the pointer and arm a body drag.
    fn press_select(&mut self, point: Point, additive: bool) -> Option<CanvasEvent> {
        let radius = self.hit_radius();

        if !additive {
            let grabbed = self
                .selected_shape()
                .filter(|s| s.visible)
                .and_then(|s| s.nearest_vertex(&point, radius).map(|v| (s.id(), v)));
            if let Some((shape_id, vertex)) = grabbed {
                log::debug!("Grabbed vertex {} of shape {}", vertex, shape_id);
                self.interaction = Interaction::Editing(EditState::VertexDrag {
                    shape_id,
                    vertex,
                    moved: false,
                });
                return None;
            }
        }

        let before = self.selection.clone();
        let hit = self
            .shapes
            .iter()
            .rev()
            .find(|s| s.visible && s.contains_point(&point))
            .map(Shape::id);

        match hit {
            Some(id) => {
                let mut selection = self.selection.clone();
                let existing = selection.iter().position(|s| *s == id);
                match (additive, existing) {
                    (true, Some(pos)) => {
                        selection.remove(pos);
                    }
                    (true, None) => selection.insert(0, id),
                    // Keep the group so it can be dragged, hit shape first
                    (false, Some(pos)) => {
                        selection.remove(pos);
                        selection.insert(0, id);
                    }
                    (false, None) => selection = vec![id],
                }
                self.apply_selection(selection);
                if self.selection.contains(&id) {
                    self.interaction = Interaction::Editing(EditState::BodyDrag {
                        last: point,
                        moved: false,
                    });
                }
            }
            None if !additive => self.apply_selection(Vec::new()),
            None => {}
        }

        if self.selection != before {
            log::debug!("Selection: {} shape(s)", self.selection.len());
            Some(CanvasEvent::SelectionChanged(self.selection.clone()))
        } else {
            None
        }
    }

    fn drag_to(&mut self, point: Point) {
        match self.interaction {
            Interaction::Editing(EditState::VertexDrag {
                shape_id, vertex, ..
            }) => {
                let extent = self.extent();
                let square = self.draw_square;
                if let Some(shape) = self.shape_mut(shape_id) {
                    let anchor = (vertex + 2) % 4;
                    let squared = square
                        && shape.len() == 4
                        && shape.resize_to_square(
                            anchor,
                            square_corner(shape.points()[anchor], point, extent),
                        );
                    if !squared {
                        shape.move_vertex(vertex, point);
                    }
                }
                self.mark_moved();
            }
            Interaction::Editing(EditState::BodyDrag { last, .. }) => {
                let applied = self.translate_selection(point.x - last.x, point.y - last.y);
                if let Interaction::Editing(EditState::BodyDrag { last, .. }) =
                    &mut self.interaction
                {
                    *last = point;
                }
                if applied {
                    self.mark_moved();
                }
            }
            _ => self.update_hover(point),
        }
    }

    fn mark_moved(&mut self) {
        if let Interaction::Editing(
            EditState::VertexDrag { moved, .. } | EditState::BodyDrag { moved, .. },
        ) = &mut self.interaction
        {
            *moved = true;
        }
    }

    /// Move every selected shape, bounded so no vertex leaves the image.
    fn translate_selection(&mut self, dx: f32, dy: f32) -> bool {
        let points: Vec<Point> = self
            .shapes
            .iter()
            .filter(|s| s.selected)
            .flat_map(|s| s.points().iter().copied())
            .collect();
        let Some(bbox) = BoundingBox::from_points(&points) else {
            return false;
        };
        let (dx, dy) = bounded_delta(&bbox, dx, dy, self.extent());
        if dx == 0.0 && dy == 0.0 {
            return false;
        }
        for shape in self.shapes.iter_mut().filter(|s| s.selected) {
            shape.translate(dx, dy);
        }
        true
    }

    fn update_hover(&mut self, point: Point) {
        let radius = self.hit_radius();
        self.hover = self
            .shapes
            .iter()
            .rev()
            .filter(|s| s.visible)
            .find_map(|s| s.nearest_vertex(&point, radius).map(|v| (s.id(), v)));
    }

    fn finish_drag(&mut self) -> Option<CanvasEvent> {
        let event = match std::mem::take(&mut self.interaction) {
            Interaction::Editing(EditState::VertexDrag {
                shape_id,
                moved: true,
                ..
            }) => Some(CanvasEvent::VertexMoved(shape_id)),
            Interaction::Editing(EditState::BodyDrag { moved: true, .. }) => {
                Some(CanvasEvent::ShapesMoved(self.selection.clone()))
            }
            _ => None,
        };
        self.interaction = if self.selection.is_empty() {
            Interaction::Idle
        } else {
            Interaction::Editing(EditState::Selected)
        };
        if let Some(event) = &event {
            log::debug!("Drag finished: {:?}", event);
        }
        event
    }

    // ----- shape operations -----

    /// Remove and return the selected shapes.
    pub fn delete_selected(&mut self) -> Vec<Shape> {
        let ids = std::mem::take(&mut self.selection);
        let (removed, kept): (Vec<Shape>, Vec<Shape>) = std::mem::take(&mut self.shapes)
            .into_iter()
            .partition(|s| ids.contains(&s.id()));
        self.shapes = kept;
        self.hover = None;
        self.apply_selection(Vec::new());
        if !removed.is_empty() {
            log::debug!("Deleted {} shape(s)", removed.len());
        }
        removed
    }

    /// Remove one shape by id.
    pub fn remove_shape(&mut self, id: ShapeId) -> Option<Shape> {
        let index = self.shapes.iter().position(|s| s.id() == id)?;
        let shape = self.shapes.remove(index);
        let selection: Vec<ShapeId> = self.selection.iter().copied().filter(|s| *s != id).collect();
        self.apply_selection(selection);
        if self.hover.is_some_and(|(h, _)| h == id) {
            self.hover = None;
        }
        Some(shape)
    }

    /// Duplicate the primary selected shape, offset by a few pixels and kept
    /// inside the image, and select the copy.
    pub fn copy_selected(&mut self) -> Option<ShapeId> {
        let mut copy = self.selected_shape()?.duplicate();
        if let Some(bbox) = copy.bounding_box() {
            let (dx, dy) = bounded_delta(&bbox, COPY_OFFSET, COPY_OFFSET, self.extent());
            copy.translate(dx, dy);
        }
        let id = copy.id();
        self.shapes.push(copy);
        self.apply_selection(vec![id]);
        log::debug!("Copied shape as {}", id);
        Some(id)
    }

    pub fn bring_to_front(&mut self, id: ShapeId) -> bool {
        let Some(index) = self.shapes.iter().position(|s| s.id() == id) else {
            return false;
        };
        let shape = self.shapes.remove(index);
        self.shapes.push(shape);
        true
    }

    pub fn send_to_back(&mut self, id: ShapeId) -> bool {
        let Some(index) = self.shapes.iter().position(|s| s.id() == id) else {
            return false;
        };
        let shape = self.shapes.remove(index);
        self.shapes.insert(0, shape);
        true
    }

    /// Show or hide a shape. Hidden shapes drop out of the selection.
    pub fn set_shape_visible(&mut self, id: ShapeId, visible: bool) -> bool {
        let Some(shape) = self.shape_mut(id) else {
            return false;
        };
        shape.visible = visible;
        if !visible {
            let selection: Vec<ShapeId> =
                self.selection.iter().copied().filter(|s| *s != id).collect();
            if selection.len() != self.selection.len() {
                self.apply_selection(selection);
            }
        }
        true
    }

    pub fn set_all_visible(&mut self, visible: bool) {
        let ids: Vec<ShapeId> = self.shapes.iter().map(Shape::id).collect();
        for id in ids {
            self.set_shape_visible(id, visible);
        }
    }

    // ----- view -----

    pub fn view(&self) -> &ViewTransform {
        &self.view
    }

    pub fn zoom_percent(&self) -> f32 {
        self.view.zoom_percent
    }

    pub fn set_zoom(&mut self, percent: f32) {
        self.view = self.view.with_zoom(percent);
    }

    pub fn add_zoom(&mut self, delta: f32) {
        self.set_zoom(self.view.zoom_percent + delta);
    }

    /// Zoom keeping the image point under `cursor` (screen space) fixed.
    pub fn zoom_at(&mut self, percent: f32, cursor: Point) {
        self.view = self.view.zoom_to_cursor(percent, cursor);
    }

    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.view = self.view.pan_by(dx, dy);
    }

    /// Fit the whole image into a viewport. Returns `false` without an image
    /// or for a degenerate viewport.
    pub fn fit_window(&mut self, viewport: (f32, f32)) -> bool {
        let Some(percent) = self.image_size.and_then(|size| fit_window_percent(viewport, size))
        else {
            return false;
        };
        self.view = ViewTransform::new(percent, 0.0, 0.0);
        true
    }

    /// Fit the image width into a viewport.
    pub fn fit_width(&mut self, viewport_width: f32) -> bool {
        let Some(percent) = self
            .image_size
            .and_then(|(w, _)| fit_width_percent(viewport_width, w))
        else {
            return false;
        };
        self.view = ViewTransform::new(percent, 0.0, 0.0);
        true
    }

    // ----- rendering -----

    fn drawing_shape(&self) -> Option<&Shape> {
        let interaction = match &self.interaction {
            Interaction::Panning { resume, .. } => resume.as_ref(),
            other => other,
        };
        match interaction {
            Interaction::Drawing(shape) | Interaction::AwaitingCategory(shape) => Some(shape),
            _ => None,
        }
    }

    /// Everything to draw, bottom to top, in screen coordinates.
    pub fn paint_list(&self) -> Vec<ShapePaint> {
        let style = PaintStyle {
            line_width: self.line_thickness,
            font_size: self.font_size,
            drawing_color: self.drawing_color,
            drawing_fill: self.drawing_fill,
        };
        let preview = self.drawing_shape().map(|shape| (shape, self.cursor));
        build_paint_list(&self.shapes, self.hover, preview, &self.view, style)
    }
}
