//! Canvas interaction state and pointer event types.

use thiserror::Error;

use crate::model::{Point, Shape, ShapeId};

/// Errors from canvas entry points.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CanvasError {
    /// Drawing and editing need an open image.
    #[error("No image loaded")]
    NoImageLoaded,

    /// `commit_pending` / `discard_pending` without a closed shape.
    #[error("No drawn shape is waiting for a category")]
    NoPendingShape,

    /// A drawn shape must be committed or discarded first.
    #[error("A drawn shape is still waiting for its category")]
    PendingShape,
}

/// Public interaction mode of the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanvasMode {
    Idle,
    /// Collecting points for a new shape, or waiting for its category.
    Drawing,
    /// One or more shapes selected.
    Editing,
    Panning,
}

/// Mouse button of a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerButton {
    #[default]
    Primary,
    /// Pans the view.
    Middle,
}

/// Kind of pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEventKind {
    Press,
    Move,
    Release,
}

/// A pointer event in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub kind: PointerEventKind,
    pub button: PointerButton,
    pub position: Point,
    /// Add to / toggle in the current selection instead of replacing it.
    pub additive: bool,
}

impl PointerEvent {
    fn new(kind: PointerEventKind, x: f32, y: f32) -> Self {
        Self {
            kind,
            button: PointerButton::Primary,
            position: Point::new(x, y),
            additive: false,
        }
    }

    pub fn press(x: f32, y: f32) -> Self {
        Self::new(PointerEventKind::Press, x, y)
    }

    pub fn moved(x: f32, y: f32) -> Self {
        Self::new(PointerEventKind::Move, x, y)
    }

    pub fn release(x: f32, y: f32) -> Self {
        Self::new(PointerEventKind::Release, x, y)
    }

    pub fn with_button(mut self, button: PointerButton) -> Self {
        self.button = button;
        self
    }

    pub fn additive(mut self) -> Self {
        self.additive = true;
        self
    }
}

/// Something the owner of the canvas has to react to.
#[derive(Debug, Clone, PartialEq)]
pub enum CanvasEvent {
    /// A drawn shape is complete and needs a category
    /// (see `Canvas::commit_pending` / `Canvas::discard_pending`).
    ShapeClosed,
    /// The selection changed; primary shape first.
    SelectionChanged(Vec<ShapeId>),
    /// Whole shapes were dragged.
    ShapesMoved(Vec<ShapeId>),
    /// A single vertex was dragged (or the shape was squared).
    VertexMoved(ShapeId),
}

impl CanvasEvent {
    /// Whether the event reflects a change to shape geometry.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            CanvasEvent::ShapesMoved(_) | CanvasEvent::VertexMoved(_)
        )
    }
}

/// Drag armed while shapes are selected.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum EditState {
    /// Selection shown, nothing armed.
    Selected,
    VertexDrag {
        shape_id: ShapeId,
        vertex: usize,
        moved: bool,
    },
    BodyDrag {
        /// Last pointer position in image space.
        last: Point,
        moved: bool,
    },
}

/// Internal interaction state machine.
#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) enum Interaction {
    #[default]
    Idle,
    Drawing(Shape),
    AwaitingCategory(Shape),
    Editing(EditState),
    Panning {
        /// Last pointer position in screen space.
        last: Point,
        resume: Box<Interaction>,
    },
}

impl Interaction {
    pub(crate) fn mode(&self) -> CanvasMode {
        match self {
            Interaction::Idle => CanvasMode::Idle,
            Interaction::Drawing(_) | Interaction::AwaitingCategory(_) => CanvasMode::Drawing,
            Interaction::Editing(_) => CanvasMode::Editing,
            Interaction::Panning { .. } => CanvasMode::Panning,
        }
    }
}
