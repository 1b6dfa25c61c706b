//! Annotation session.
//!
//! [`Session`] is the application state of the tool: the open dataset, the
//! current image on the canvas, the category model and the unsaved-changes
//! bookkeeping. Anything that needs the user goes through a [`Prompter`].

use std::path::Path;

use thiserror::Error;

use crate::annotation::{AnnotationModel, LabelAssignment};
use crate::canvas::{Canvas, CanvasError, CanvasEvent, PointerEvent};
use crate::color_utils::Color;
use crate::config::{ConfigError, UserPreferences};
use crate::format::{
    AutoSaveManager, CategoryFile, FormatError, ImageRecord, PendingChanges,
    read_annotation_file, write_annotation_file,
};
use crate::model::{CategoryLevel, LabelEdit, LabelError, LabelRow, ShapeId};
use crate::prompt::Prompter;
use crate::state::Dataset;

/// Errors surfaced by session operations. Each failing operation leaves the
/// session as it was.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Label(#[from] LabelError),

    #[error(transparent)]
    Canvas(#[from] CanvasError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("No categories loaded")]
    NoCategories,

    #[error("No dataset open")]
    NoDataset,

    #[error("No image open")]
    NoImage,

    #[error("Image index {index} out of range ({len} images)")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Behaviour switches of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub auto_save: bool,
    /// Reuse the last chosen category instead of prompting.
    pub single_class: bool,
    pub draw_square: bool,
    pub paint_label: bool,
    pub vertices_per_shape: usize,
    pub line_thickness: u32,
    pub font_size: u32,
    pub line_color: Color,
    pub fill_color: Color,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from(&UserPreferences::default())
    }
}

impl From<&UserPreferences> for SessionSettings {
    fn from(prefs: &UserPreferences) -> Self {
        Self {
            auto_save: prefs.auto_save,
            single_class: prefs.single_class,
            draw_square: prefs.draw_square,
            paint_label: prefs.paint_label,
            vertices_per_shape: prefs.vertices_per_shape,
            line_thickness: prefs.line_thickness,
            font_size: prefs.font_size,
            line_color: prefs.line_color,
            fill_color: prefs.fill_color,
        }
    }
}

/// One annotation session.
pub struct Session<P: Prompter> {
    model: AnnotationModel,
    canvas: Canvas,
    dataset: Option<Dataset>,
    /// Index of the image on the canvas.
    current: Option<usize>,
    auto_save: AutoSaveManager,
    settings: SessionSettings,
    prompter: P,
}

impl<P: Prompter> Session<P> {
    pub fn new(settings: SessionSettings, prompter: P) -> Self {
        let mut session = Self {
            model: AnnotationModel::new(),
            canvas: Canvas::new(),
            dataset: None,
            current: None,
            auto_save: AutoSaveManager::new(settings.auto_save),
            settings: settings.clone(),
            prompter,
        };
        session.set_settings(settings);
        session
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Apply new settings to the canvas and the save policy.
    pub fn set_settings(&mut self, settings: SessionSettings) {
        self.canvas.draw_square = settings.draw_square;
        self.canvas.set_vertices_per_shape(settings.vertices_per_shape);
        self.canvas.line_thickness = settings.line_thickness;
        self.canvas.font_size = settings.font_size;
        self.canvas.drawing_color = settings.line_color;
        self.canvas.drawing_fill = settings.fill_color;
        if settings.paint_label != self.settings.paint_label {
            let ids: Vec<ShapeId> = self.canvas.shapes().iter().map(|s| s.id()).collect();
            for id in ids {
                if let Some(shape) = self.canvas.shape_mut(id) {
                    shape.paint_label = settings.paint_label;
                }
            }
        }
        if settings.auto_save != self.auto_save.is_enabled() {
            self.auto_save.set_enabled(settings.auto_save);
        }
        self.settings = settings;
    }

    pub fn model(&self) -> &AnnotationModel {
        &self.model
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    /// Canvas access for view changes (zoom, pan, fit).
    pub fn canvas_mut(&mut self) -> &mut Canvas {
        &mut self.canvas
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.dataset.as_ref()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current_image(&self) -> Option<&ImageRecord> {
        let index = self.current?;
        self.dataset.as_ref()?.image(index)
    }

    /// Whether the current image has unsaved changes.
    pub fn is_dirty(&self) -> bool {
        self.auto_save.is_dirty()
    }

    pub fn prompter(&self) -> &P {
        &self.prompter
    }

    pub fn prompter_mut(&mut self) -> &mut P {
        &mut self.prompter
    }

    /// Settle unsaved changes before the current image goes away.
    ///
    /// Returns `false` when the user chose to keep them.
    fn leave_current(&mut self) -> Result<bool, SessionError> {
        match self.auto_save.pending_changes() {
            PendingChanges::Clean => Ok(true),
            PendingChanges::Save => {
                self.save_annotations()?;
                Ok(true)
            }
            PendingChanges::Confirm => {
                if self.prompter.confirm_discard() {
                    log::info!("Unsaved annotations discarded");
                    self.auto_save.mark_clean();
                    Ok(true)
                } else {
                    log::debug!("Kept unsaved annotations");
                    Ok(false)
                }
            }
        }
    }

    // ----- dataset and images -----

    /// Open a dataset manifest and show its first image.
    ///
    /// Returns `false` if unsaved work was kept and nothing changed.
    pub fn open_dataset(&mut self, manifest_path: &Path) -> Result<bool, SessionError> {
        if !self.leave_current()? {
            return Ok(false);
        }
        let dataset = Dataset::open(manifest_path)?;
        if dataset.is_empty() {
            self.close_image();
            self.dataset = Some(dataset);
            log::warn!("Dataset {:?} has no images on disk", manifest_path);
            return Ok(true);
        }
        // The previous dataset stays open if the first image cannot be shown
        let previous = self.dataset.replace(dataset);
        if let Err(e) = self.load_image(0) {
            self.dataset = previous;
            return Err(e);
        }
        Ok(true)
    }

    /// Replace one taxonomy from a category file.
    ///
    /// The labels of the current image are rebuilt against the new
    /// taxonomy. Returns `false` if unsaved work was kept.
    pub fn load_category_file(
        &mut self,
        level: CategoryLevel,
        path: &Path,
    ) -> Result<bool, SessionError> {
        let file = CategoryFile::read(path)?;
        if !self.leave_current()? {
            return Ok(false);
        }
        let Some(index) = self.current else {
            self.model.apply_category_file(level, file);
            return Ok(true);
        };
        // Keep the old taxonomy if the current labels do not fit the new one
        let previous = self.model.clone();
        self.model.apply_category_file(level, file);
        if let Err(e) = self.load_image(index) {
            self.model = previous;
            return Err(e);
        }
        Ok(true)
    }

    /// Show the image at `index` with its saved annotations.
    pub fn open_image(&mut self, index: usize) -> Result<bool, SessionError> {
        let dataset = self.dataset.as_ref().ok_or(SessionError::NoDataset)?;
        if index >= dataset.len() {
            return Err(SessionError::IndexOutOfRange {
                index,
                len: dataset.len(),
            });
        }
        if !self.leave_current()? {
            return Ok(false);
        }
        self.load_image(index)?;
        Ok(true)
    }

    /// Step to the next image. `Ok(false)` at the end of the list.
    pub fn open_next_image(&mut self) -> Result<bool, SessionError> {
        let dataset = self.dataset.as_ref().ok_or(SessionError::NoDataset)?;
        let next = self.current.map_or(0, |i| i + 1);
        if next >= dataset.len() {
            log::debug!("Already at the last image");
            return Ok(false);
        }
        self.open_image(next)
    }

    /// Step to the previous image. `Ok(false)` at the start of the list.
    pub fn open_previous_image(&mut self) -> Result<bool, SessionError> {
        if self.dataset.is_none() {
            return Err(SessionError::NoDataset);
        }
        match self.current {
            Some(index) if index > 0 => self.open_image(index - 1),
            _ => {
                log::debug!("Already at the first image");
                Ok(false)
            }
        }
    }

    /// Read the image and its annotations, then swap them in.
    fn load_image(&mut self, index: usize) -> Result<(), SessionError> {
        let dataset = self.dataset.as_ref().ok_or(SessionError::NoDataset)?;
        let image = dataset.image(index).ok_or(SessionError::IndexOutOfRange {
            index,
            len: dataset.len(),
        })?;

        let path = dataset.image_path(image);
        if !path.is_file() {
            return Err(FormatError::missing_resource(path).into());
        }
        let (width, height) = image::image_dimensions(&path)
            .map_err(|source| FormatError::ImageDecode {
                path: path.clone(),
                source,
            })?;

        let records = match self.model.category_set_name() {
            Some(set_name) => read_annotation_file(&dataset.annotation_path(set_name, image))?,
            None => Vec::new(),
        };
        let mut shapes = self.model.load_records(&records)?;
        for shape in &mut shapes {
            shape.paint_label = self.settings.paint_label;
        }

        self.canvas.load_image(width, height);
        self.canvas.load_shapes(shapes);
        self.current = Some(index);
        self.auto_save.mark_clean();
        log::info!(
            "Opened image {} ({}x{}) with {} annotations",
            image.file_name,
            width,
            height,
            records.len()
        );
        Ok(())
    }

    fn close_image(&mut self) {
        self.model.clear_labels();
        self.canvas.unload_image();
        self.current = None;
        self.auto_save.mark_clean();
    }

    /// Write the annotations of the current image.
    pub fn save_annotations(&mut self) -> Result<(), SessionError> {
        let set_name = self
            .model
            .category_set_name()
            .ok_or(SessionError::NoCategories)?;
        let dataset = self.dataset.as_ref().ok_or(SessionError::NoDataset)?;
        let image = self
            .current
            .and_then(|index| dataset.image(index))
            .ok_or(SessionError::NoImage)?;

        let records = self.model.serialize(self.canvas.shapes(), image)?;
        write_annotation_file(&dataset.annotation_path(set_name, image), &records)?;
        self.auto_save.mark_saved();
        Ok(())
    }

    /// Write the dataset manifest.
    pub fn save_dataset(&self) -> Result<(), SessionError> {
        let dataset = self.dataset.as_ref().ok_or(SessionError::NoDataset)?;
        dataset.save()?;
        Ok(())
    }

    /// Flag an image as having ground truth. With auto-save on, the manifest
    /// is written right away.
    pub fn set_has_gt(&mut self, index: usize, has_gt: bool) -> Result<(), SessionError> {
        let dataset = self.dataset.as_mut().ok_or(SessionError::NoDataset)?;
        if !dataset.set_has_gt(index, has_gt) {
            return Err(SessionError::IndexOutOfRange {
                index,
                len: dataset.len(),
            });
        }
        if self.auto_save.is_enabled() {
            dataset.save()?;
        }
        Ok(())
    }

    // ----- drawing and editing -----

    /// Begin drawing a new shape.
    pub fn start_drawing(&mut self) -> Result<(), SessionError> {
        if self.model.categories().primary.is_empty() {
            return Err(SessionError::NoCategories);
        }
        self.canvas.start_drawing()?;
        Ok(())
    }

    /// Feed a pointer event to the canvas and react to what it reports.
    pub fn handle_pointer(
        &mut self,
        event: PointerEvent,
    ) -> Result<Option<CanvasEvent>, SessionError> {
        let canvas_event = self.canvas.handle_pointer(event);
        match &canvas_event {
            Some(CanvasEvent::ShapeClosed) => self.label_pending_shape()?,
            Some(CanvasEvent::SelectionChanged(ids)) => {
                self.model.set_current(ids.first().copied());
            }
            Some(e) if e.is_mutation() => self.auto_save.mark_dirty(),
            _ => {}
        }
        Ok(canvas_event)
    }

    /// Ask for the category of the closed shape, then commit or drop it.
    fn label_pending_shape(&mut self) -> Result<(), SessionError> {
        let reuse = self
            .model
            .last_category()
            .filter(|name| self.settings.single_class && self.model.categories().primary.contains(name))
            .map(str::to_string);
        let choice = match reuse {
            Some(name) => Some(name),
            None => {
                let names = self.model.categories().primary.names();
                self.prompter
                    .choose_category(&names, self.model.last_category())
            }
        };

        let Some(category) = choice else {
            self.canvas.discard_pending()?;
            return Ok(());
        };
        if !self.model.categories().primary.contains(&category) {
            log::warn!("Unknown category '{}'; shape dropped", category);
            self.canvas.discard_pending()?;
            return Ok(());
        }

        let color = self.model.color_for(&category);
        let id = self.canvas.commit_pending(&category, color, color)?;
        let Some(shape) = self.canvas.shape_mut(id) else {
            return Err(CanvasError::NoPendingShape.into());
        };
        shape.paint_label = self.settings.paint_label;
        if let Err(e) = self
            .model
            .assign_label(shape, LabelAssignment::new(category.as_str()))
        {
            self.canvas.remove_shape(id);
            return Err(e.into());
        }
        self.model.remember_category(&category);
        self.model.set_current(Some(id));
        self.auto_save.mark_dirty();
        log::info!("Labelled new shape as '{}'", category);
        Ok(())
    }

    /// Delete the selected shapes together with their labels.
    pub fn delete_selected(&mut self) -> Vec<ShapeId> {
        let removed: Vec<ShapeId> = self
            .canvas
            .delete_selected()
            .iter()
            .map(|s| s.id())
            .collect();
        for id in &removed {
            if let Err(e) = self.model.remove_label(*id) {
                log::debug!("{}", e);
            }
        }
        if !removed.is_empty() {
            self.model.set_current(None);
            self.auto_save.mark_dirty();
        }
        removed
    }

    /// Duplicate the primary selected shape under the same category.
    pub fn copy_selected(&mut self) -> Result<Option<ShapeId>, SessionError> {
        let Some(source) = self.canvas.selected_shape().map(|s| s.id()) else {
            return Ok(None);
        };
        let assignment = match self.model.labels().get(source) {
            Some(row) => LabelAssignment::from(row),
            None => return Ok(None),
        };
        let Some(id) = self.canvas.copy_selected() else {
            return Ok(None);
        };
        let Some(shape) = self.canvas.shape_mut(id) else {
            return Ok(None);
        };
        if let Err(e) = self.model.assign_label(shape, assignment) {
            self.canvas.remove_shape(id);
            return Err(e.into());
        }
        self.model.set_current(Some(id));
        self.auto_save.mark_dirty();
        Ok(Some(id))
    }

    /// Edit one cell of a label row and carry the change over to its shape.
    ///
    /// Edits of rows that no longer exist are ignored.
    pub fn edit_label(&mut self, shape_id: ShapeId, edit: LabelEdit) -> Result<(), SessionError> {
        match self.model.apply_edit(shape_id, edit.clone()) {
            Ok(_) => {}
            Err(LabelError::UnknownReference(id)) => {
                log::debug!("Ignoring edit of missing label {}", id);
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }

        match edit {
            LabelEdit::Visible(visible) => {
                self.canvas.set_shape_visible(shape_id, visible);
                return Ok(());
            }
            LabelEdit::Category(name) => {
                let color = self.model.color_for(&name);
                if let Some(shape) = self.canvas.shape_mut(shape_id) {
                    shape.category = name;
                    shape.line_color = color;
                    shape.fill_color = color;
                }
            }
            LabelEdit::TrackId(track_id) => {
                if let Some(shape) = self.canvas.shape_mut(shape_id) {
                    shape.track_id = track_id;
                }
            }
            LabelEdit::Trackable(trackable) => {
                if let Some(shape) = self.canvas.shape_mut(shape_id) {
                    shape.trackable = trackable;
                }
            }
            LabelEdit::Id(_) | LabelEdit::SecondCategory(_) | LabelEdit::ThirdCategory(_) => {}
        }
        self.auto_save.mark_dirty();
        Ok(())
    }

    /// Select the shape of a label row. `false` if it cannot be selected.
    pub fn select_label_row(&mut self, shape_id: ShapeId) -> bool {
        if !self.canvas.select_shape(shape_id) {
            return false;
        }
        self.model.set_current(Some(shape_id));
        true
    }

    /// Label row of a shape.
    pub fn label(&self, shape_id: ShapeId) -> Option<&LabelRow> {
        self.model.labels().get(shape_id)
    }

    /// Show or hide every shape.
    pub fn set_all_visible(&mut self, visible: bool) {
        self.model.set_all_visible(visible);
        self.canvas.set_all_visible(visible);
    }

    /// Close everything: dataset, image, labels and taxonomies.
    ///
    /// Returns `false` if unsaved work was kept.
    pub fn reset_all(&mut self) -> Result<bool, SessionError> {
        if !self.leave_current()? {
            return Ok(false);
        }
        self.close_image();
        self.model.reset();
        self.dataset = None;
        log::info!("Session reset");
        Ok(true)
    }
}
