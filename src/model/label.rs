//! The label table: one row of label attributes per shape.
//!
//! Rows are keyed by [`ShapeId`] and kept in insertion order, which is also
//! the order annotations are written in. Edits are validated before they are
//! applied.

use thiserror::Error;

use crate::model::category::{CategoryLevel, CategorySet};
use crate::model::shape::ShapeId;

/// Errors raised by label table operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LabelError {
    /// No row exists for this shape (stale selection).
    #[error("No label for shape {0}")]
    UnknownReference(ShapeId),

    /// An edited value was rejected by validation.
    #[error("Invalid {column}: '{value}'")]
    InvalidValue {
        /// Column that was edited
        column: &'static str,
        /// The rejected value
        value: String,
    },
}

/// Label attributes of a single shape.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelRow {
    pub shape_id: ShapeId,
    /// Primary category name.
    pub category: String,
    /// Annotation id written to disk, -1 when unassigned.
    pub id: i64,
    pub track_id: i64,
    pub trackable: bool,
    pub second_category: Option<String>,
    pub third_category: Option<String>,
    pub visible: bool,
}

impl LabelRow {
    pub fn new(shape_id: ShapeId, category: impl Into<String>) -> Self {
        Self {
            shape_id,
            category: category.into(),
            id: -1,
            track_id: -1,
            trackable: true,
            second_category: None,
            third_category: None,
            visible: true,
        }
    }
}

/// A single-cell edit of a row.
#[derive(Debug, Clone, PartialEq)]
pub enum LabelEdit {
    Visible(bool),
    Id(i64),
    TrackId(i64),
    Trackable(bool),
    Category(String),
    SecondCategory(String),
    ThirdCategory(String),
}

impl LabelEdit {
    /// Column header of the edited cell.
    pub fn column(&self) -> &'static str {
        match self {
            LabelEdit::Visible(_) => "visible",
            LabelEdit::Id(_) => "id",
            LabelEdit::TrackId(_) => "track id",
            LabelEdit::Trackable(_) => "trackable",
            LabelEdit::Category(_) => "category",
            LabelEdit::SecondCategory(_) => "second category",
            LabelEdit::ThirdCategory(_) => "third category",
        }
    }
}

/// Validation hook invoked before an edit is applied.
pub trait EditValidator {
    fn validate(&self, row: &LabelRow, edit: &LabelEdit) -> Result<(), LabelError>;
}

/// Accepts every edit.
pub struct AcceptAll;

impl EditValidator for AcceptAll {
    fn validate(&self, _row: &LabelRow, _edit: &LabelEdit) -> Result<(), LabelError> {
        Ok(())
    }
}

/// Category edits must name an entry of the matching taxonomy.
impl EditValidator for CategorySet {
    fn validate(&self, _row: &LabelRow, edit: &LabelEdit) -> Result<(), LabelError> {
        let (level, name) = match edit {
            LabelEdit::Category(name) => (CategoryLevel::Primary, name),
            LabelEdit::SecondCategory(name) => (CategoryLevel::Second, name),
            LabelEdit::ThirdCategory(name) => (CategoryLevel::Third, name),
            _ => return Ok(()),
        };
        if self.level(level).contains(name) {
            Ok(())
        } else {
            Err(LabelError::InvalidValue {
                column: edit.column(),
                value: name.clone(),
            })
        }
    }
}

/// Ordered label rows with an optional highlighted row.
#[derive(Debug, Clone, Default)]
pub struct LabelTable {
    rows: Vec<LabelRow>,
    current: Option<ShapeId>,
}

impl LabelTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, row: LabelRow) {
        log::debug!("Label row added for shape {} ({})", row.shape_id, row.category);
        self.rows.push(row);
    }

    /// Remove the row of a shape.
    pub fn remove(&mut self, shape_id: ShapeId) -> Result<LabelRow, LabelError> {
        let index = self
            .row_of(shape_id)
            .ok_or(LabelError::UnknownReference(shape_id))?;
        if self.current == Some(shape_id) {
            self.current = None;
        }
        Ok(self.rows.remove(index))
    }

    pub fn row_of(&self, shape_id: ShapeId) -> Option<usize> {
        self.rows.iter().position(|r| r.shape_id == shape_id)
    }

    pub fn get(&self, shape_id: ShapeId) -> Option<&LabelRow> {
        self.rows.iter().find(|r| r.shape_id == shape_id)
    }

    pub fn rows(&self) -> &[LabelRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn clear(&mut self) {
        self.rows.clear();
        self.current = None;
    }

    /// Highlight the row of a shape (or none).
    pub fn set_current(&mut self, shape_id: Option<ShapeId>) {
        self.current = shape_id.filter(|id| self.row_of(*id).is_some());
    }

    pub fn current(&self) -> Option<ShapeId> {
        self.current
    }

    /// Validate and apply a single-cell edit.
    pub fn apply_edit(
        &mut self,
        shape_id: ShapeId,
        edit: LabelEdit,
        validator: &dyn EditValidator,
    ) -> Result<&LabelRow, LabelError> {
        let index = self
            .row_of(shape_id)
            .ok_or(LabelError::UnknownReference(shape_id))?;
        validator.validate(&self.rows[index], &edit)?;

        let row = &mut self.rows[index];
        match edit {
            LabelEdit::Visible(visible) => row.visible = visible,
            LabelEdit::Id(id) => row.id = id,
            LabelEdit::TrackId(track_id) => row.track_id = track_id,
            LabelEdit::Trackable(trackable) => row.trackable = trackable,
            LabelEdit::Category(name) => row.category = name,
            LabelEdit::SecondCategory(name) => row.second_category = Some(name),
            LabelEdit::ThirdCategory(name) => row.third_category = Some(name),
        }
        Ok(&self.rows[index])
    }

    /// Show or hide every row.
    pub fn set_all_visible(&mut self, visible: bool) {
        for row in &mut self.rows {
            row.visible = visible;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::category::{CategoryEntry, Taxonomy};

    fn table_with(n: usize) -> (LabelTable, Vec<ShapeId>) {
        let mut table = LabelTable::new();
        let ids: Vec<ShapeId> = (0..n).map(|_| ShapeId::new()).collect();
        for id in &ids {
            table.append(LabelRow::new(*id, "car"));
        }
        (table, ids)
    }

    #[test]
    fn test_row_defaults() {
        let row = LabelRow::new(ShapeId::new(), "car");
        assert_eq!(row.id, -1);
        assert_eq!(row.track_id, -1);
        assert!(row.trackable);
        assert!(row.visible);
        assert!(row.second_category.is_none());
    }

    #[test]
    fn test_remove_keeps_order() {
        let (mut table, ids) = table_with(3);
        table.remove(ids[1]).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.row_of(ids[2]), Some(1));
        assert!(table.get(ids[1]).is_none());
    }

    #[test]
    fn test_remove_unknown() {
        let (mut table, _) = table_with(1);
        let stray = ShapeId::new();
        assert_eq!(
            table.remove(stray),
            Err(LabelError::UnknownReference(stray))
        );
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_remove_clears_current() {
        let (mut table, ids) = table_with(2);
        table.set_current(Some(ids[0]));
        assert_eq!(table.current(), Some(ids[0]));
        table.remove(ids[0]).unwrap();
        assert_eq!(table.current(), None);
    }

    #[test]
    fn test_set_current_ignores_unknown() {
        let (mut table, _) = table_with(1);
        table.set_current(Some(ShapeId::new()));
        assert_eq!(table.current(), None);
    }

    #[test]
    fn test_apply_edit_plain_fields() {
        let (mut table, ids) = table_with(1);
        table.apply_edit(ids[0], LabelEdit::TrackId(7), &AcceptAll).unwrap();
        table.apply_edit(ids[0], LabelEdit::Trackable(false), &AcceptAll).unwrap();
        let row = table.apply_edit(ids[0], LabelEdit::Id(3), &AcceptAll).unwrap();
        assert_eq!(row.track_id, 7);
        assert!(!row.trackable);
        assert_eq!(row.id, 3);
    }

    #[test]
    fn test_category_validation() {
        let mut set = CategorySet::new();
        set.replace(
            CategoryLevel::Primary,
            "road",
            Taxonomy::from_entries([CategoryEntry::new(1, "car", "vehicle")]),
        );
        let (mut table, ids) = table_with(1);

        let err = table
            .apply_edit(ids[0], LabelEdit::Category("boat".into()), &set)
            .unwrap_err();
        assert!(matches!(err, LabelError::InvalidValue { column: "category", .. }));
        assert_eq!(table.get(ids[0]).unwrap().category, "car");

        let err = table
            .apply_edit(ids[0], LabelEdit::SecondCategory("x".into()), &set)
            .unwrap_err();
        assert!(matches!(err, LabelError::InvalidValue { .. }));

        assert!(table
            .apply_edit(ids[0], LabelEdit::TrackId(2), &set)
            .is_ok());
    }

    #[test]
    fn test_set_all_visible() {
        let (mut table, _) = table_with(3);
        table.set_all_visible(false);
        assert!(table.rows().iter().all(|r| !r.visible));
    }
}
