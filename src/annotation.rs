//! Annotation model.
//!
//! Ties the category taxonomies, the label table and shape colors together:
//! - labelling a shape (`assign_label`) with the default second/third
//!   category rule
//! - converting labelled shapes to annotation records and back
//! - validated label edits

use serde_json::Value;

use crate::color_utils::{Color, Palette, generate_color_by_text};
use crate::format::{AnnotationRecord, BBoxRecord, CategoryFile, FormatError, ImageRecord};
use crate::model::{
    CategoryEntry, CategoryLevel, CategorySet, LabelEdit, LabelError, LabelRow, LabelTable, Shape,
    ShapeId, Taxonomy,
};

/// Label attributes for a newly labelled shape.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelAssignment {
    pub category: String,
    pub id: i64,
    pub track_id: i64,
    pub trackable: bool,
    /// `None` picks the default entry of the second taxonomy.
    pub second_category: Option<String>,
    /// `None` picks the default entry of the third taxonomy.
    pub third_category: Option<String>,
}

impl LabelAssignment {
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            id: -1,
            track_id: -1,
            trackable: true,
            second_category: None,
            third_category: None,
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = id;
        self
    }

    pub fn with_track(mut self, track_id: i64, trackable: bool) -> Self {
        self.track_id = track_id;
        self.trackable = trackable;
        self
    }

    pub fn with_second_category(mut self, name: impl Into<String>) -> Self {
        self.second_category = Some(name.into());
        self
    }

    pub fn with_third_category(mut self, name: impl Into<String>) -> Self {
        self.third_category = Some(name.into());
        self
    }
}

impl From<&LabelRow> for LabelAssignment {
    fn from(row: &LabelRow) -> Self {
        Self {
            category: row.category.clone(),
            id: row.id,
            track_id: row.track_id,
            trackable: row.trackable,
            second_category: row.second_category.clone(),
            third_category: row.third_category.clone(),
        }
    }
}

/// Categories and labels of the open dataset.
#[derive(Debug, Clone, Default)]
pub struct AnnotationModel {
    categories: CategorySet,
    labels: LabelTable,
    palette: Palette,
    /// Category chosen last; offered first on the next prompt.
    last_category: Option<String>,
}

impl AnnotationModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn categories(&self) -> &CategorySet {
        &self.categories
    }

    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    /// Name of the category set, once any taxonomy is loaded.
    pub fn category_set_name(&self) -> Option<&str> {
        self.categories.name.as_deref()
    }

    pub fn last_category(&self) -> Option<&str> {
        self.last_category.as_deref()
    }

    pub fn remember_category(&mut self, category: &str) {
        self.last_category = Some(category.to_string());
    }

    /// Replace one taxonomy from a parsed category file.
    ///
    /// Rejects payloads without a `category` list and keeps the previous
    /// taxonomy in that case.
    pub fn load_categories(&mut self, level: CategoryLevel, data: &Value) -> Result<(), FormatError> {
        let file = CategoryFile::from_value(data)?;
        self.apply_category_file(level, file);
        Ok(())
    }

    /// Replace one taxonomy from an already validated category file.
    pub fn apply_category_file(&mut self, level: CategoryLevel, file: CategoryFile) {
        let taxonomy = Taxonomy::from_entries(file.category);
        log::info!(
            "Loaded {} '{}' with {} entries",
            level,
            file.name,
            taxonomy.len()
        );
        self.categories.replace(level, &file.name, taxonomy);
        if level == CategoryLevel::Primary {
            self.last_category = None;
        }
    }

    /// Display color of a category: the palette color for its id, otherwise
    /// a color derived from the name.
    pub fn color_for(&self, category: &str) -> Color {
        self.categories
            .primary
            .id_of(category)
            .and_then(|id| self.palette.get(id))
            .unwrap_or_else(|| generate_color_by_text(category))
    }

    /// Bind a shape to a new label row.
    ///
    /// Updates the shape's category, track attributes and colors. Unset
    /// second/third categories take the default entry for the primary
    /// category. A shape that already has a row is relabelled.
    pub fn assign_label(
        &mut self,
        shape: &mut Shape,
        label: LabelAssignment,
    ) -> Result<&LabelRow, LabelError> {
        let entry = self
            .categories
            .primary
            .get(&label.category)
            .cloned()
            .ok_or_else(|| LabelError::InvalidValue {
                column: CategoryLevel::Primary.name(),
                value: label.category.clone(),
            })?;
        Ok(self.bind_label(shape, &entry, label))
    }

    fn bind_label(
        &mut self,
        shape: &mut Shape,
        entry: &CategoryEntry,
        label: LabelAssignment,
    ) -> &LabelRow {
        if self.labels.remove(shape.id()).is_ok() {
            log::debug!("Relabelling shape {}", shape.id());
        }

        let second_category = label.second_category.or_else(|| {
            self.categories
                .second
                .default_for(entry)
                .map(|e| e.name.clone())
        });
        let third_category = label.third_category.or_else(|| {
            self.categories
                .third
                .default_for(entry)
                .map(|e| e.name.clone())
        });

        let color = self.color_for(&entry.name);
        shape.category = entry.name.clone();
        shape.track_id = label.track_id;
        shape.trackable = label.trackable;
        shape.line_color = color;
        shape.fill_color = color;

        let row = LabelRow {
            id: label.id,
            track_id: label.track_id,
            trackable: label.trackable,
            second_category,
            third_category,
            ..LabelRow::new(shape.id(), entry.name.clone())
        };
        self.labels.append(row);
        let index = self.labels.len() - 1;
        &self.labels.rows()[index]
    }

    /// Remove the label row of a shape.
    pub fn remove_label(&mut self, shape_id: ShapeId) -> Result<LabelRow, LabelError> {
        self.labels.remove(shape_id)
    }

    /// Validate and apply a label edit; category names are checked against
    /// the loaded taxonomies.
    pub fn apply_edit(&mut self, shape_id: ShapeId, edit: LabelEdit) -> Result<&LabelRow, LabelError> {
        self.labels.apply_edit(shape_id, edit, &self.categories)
    }

    pub fn set_current(&mut self, shape_id: Option<ShapeId>) {
        self.labels.set_current(shape_id);
    }

    pub fn set_all_visible(&mut self, visible: bool) {
        self.labels.set_all_visible(visible);
    }

    /// Drop every label row (new image).
    pub fn clear_labels(&mut self) {
        self.labels.clear();
    }

    /// Drop labels and taxonomies (new dataset).
    pub fn reset(&mut self) {
        self.labels.clear();
        self.categories.clear();
        self.last_category = None;
    }

    /// Annotation records of the labelled shapes, in label table order.
    pub fn serialize(
        &self,
        shapes: &[Shape],
        image: &ImageRecord,
    ) -> Result<Vec<AnnotationRecord>, FormatError> {
        let mut records = Vec::with_capacity(self.labels.len());
        for row in self.labels.rows() {
            let Some(shape) = shapes.iter().find(|s| s.id() == row.shape_id) else {
                log::warn!("Skipping label of missing shape {}", row.shape_id);
                continue;
            };
            let Some(bbox) = shape.bounding_box() else {
                log::warn!("Skipping shape {} without points", row.shape_id);
                continue;
            };
            if !shape.is_rectangle() {
                log::warn!(
                    "Shape {} is not a rectangle; only its bounding box is saved",
                    row.shape_id
                );
            }

            let category_id = self
                .categories
                .primary
                .id_of(&row.category)
                .ok_or_else(|| FormatError::category_not_found(&row.category))?;
            let second_category_id =
                Self::optional_id(&self.categories.second, row.second_category.as_deref())?;
            let third_category_id =
                Self::optional_id(&self.categories.third, row.third_category.as_deref())?;

            let mut record = AnnotationRecord::new(
                row.id,
                BBoxRecord::from_bounding_box(&bbox),
                category_id,
                image.id,
            );
            record.second_category_id = second_category_id;
            record.third_category_id = third_category_id;
            record.track_id = Some(row.track_id);
            record.trackable = row.trackable;
            records.push(record);
        }
        Ok(records)
    }

    fn optional_id(taxonomy: &Taxonomy, name: Option<&str>) -> Result<Option<u32>, FormatError> {
        name.map(|name| {
            taxonomy
                .id_of(name)
                .ok_or_else(|| FormatError::category_not_found(name))
        })
        .transpose()
    }

    fn optional_name(taxonomy: &Taxonomy, level: CategoryLevel, id: Option<u32>) -> Option<String> {
        let id = id?;
        if taxonomy.is_empty() {
            return None;
        }
        let name = taxonomy.name_of(id).map(str::to_string);
        if name.is_none() {
            log::warn!("Unknown {} id {}", level, id);
        }
        name
    }

    /// Check every record against the taxonomies before anything is bound.
    fn resolve_records(
        &self,
        records: &[AnnotationRecord],
    ) -> Result<Vec<(BBoxRecord, CategoryEntry, LabelAssignment)>, FormatError> {
        let mut resolved = Vec::with_capacity(records.len());
        for record in records {
            let bbox = record.bbox.ok_or_else(|| FormatError::missing_field("bbox"))?;
            let entry = self
                .categories
                .primary
                .name_of(record.category_id)
                .and_then(|name| self.categories.primary.get(name))
                .cloned()
                .ok_or_else(|| FormatError::category_not_found(record.category_id))?;

            let mut label = LabelAssignment::new(entry.name.clone())
                .with_id(record.id)
                .with_track(record.resolved_track_id(), record.trackable);
            label.second_category = Self::optional_name(
                &self.categories.second,
                CategoryLevel::Second,
                record.second_category_id,
            );
            label.third_category = Self::optional_name(
                &self.categories.third,
                CategoryLevel::Third,
                record.third_category_id,
            );
            resolved.push((bbox, entry, label));
        }
        Ok(resolved)
    }

    fn bind_records(
        &mut self,
        resolved: Vec<(BBoxRecord, CategoryEntry, LabelAssignment)>,
    ) -> Vec<Shape> {
        let mut shapes = Vec::with_capacity(resolved.len());
        for (bbox, entry, label) in resolved {
            let mut shape = Shape::from_points(bbox.corners());
            self.bind_label(&mut shape, &entry, label);
            shapes.push(shape);
        }
        log::debug!("Rebuilt {} shapes from annotations", shapes.len());
        shapes
    }

    /// Rebuild labelled shapes from annotation records, appending their rows.
    ///
    /// A bad record leaves the label table untouched. Each record becomes a
    /// closed four-point shape.
    pub fn deserialize(&mut self, records: &[AnnotationRecord]) -> Result<Vec<Shape>, FormatError> {
        let resolved = self.resolve_records(records)?;
        Ok(self.bind_records(resolved))
    }

    /// Like [`deserialize`](Self::deserialize), but the rows replace the
    /// current label table. On error the table is kept as it was.
    pub fn load_records(&mut self, records: &[AnnotationRecord]) -> Result<Vec<Shape>, FormatError> {
        let resolved = self.resolve_records(records)?;
        self.labels.clear();
        Ok(self.bind_records(resolved))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color_utils::PALETTE_ALPHA;
    use crate::model::Point;
    use serde_json::json;

    fn model() -> AnnotationModel {
        let mut model = AnnotationModel::new();
        model
            .load_categories(
                CategoryLevel::Primary,
                &json!({
                    "name": "road",
                    "category": [
                        {"id": 1, "name": "car", "supercategory": "vehicle"},
                        {"id": 20, "name": "person", "supercategory": "human"}
                    ]
                }),
            )
            .unwrap();
        model
    }

    fn with_second(mut model: AnnotationModel) -> AnnotationModel {
        model
            .load_categories(
                CategoryLevel::Second,
                &json!({
                    "name": "attributes",
                    "category": [
                        {"id": 1, "name": "walking", "supercategory": "human"},
                        {"id": 2, "name": "parked", "supercategory": "vehicle"},
                        {"id": 3, "name": "unknown", "supercategory": "all"}
                    ]
                }),
            )
            .unwrap();
        model
    }

    fn quad() -> Shape {
        Shape::from_points([
            Point::new(10.0, 10.0),
            Point::new(50.0, 10.0),
            Point::new(50.0, 40.0),
            Point::new(10.0, 40.0),
        ])
    }

    #[test]
    fn test_end_to_end_car_record() {
        let mut model = model();
        let mut shape = quad();
        model
            .assign_label(&mut shape, LabelAssignment::new("car"))
            .unwrap();

        let image = ImageRecord::new(7, "0001.jpg");
        let records = model.serialize(&[shape], &image).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].bbox,
            Some(BBoxRecord {
                x: 10.0,
                y: 10.0,
                w: 41.0,
                h: 31.0
            })
        );
        assert_eq!(records[0].category_id, 1);
        assert_eq!(records[0].image_id, 7);
        assert_eq!(records[0].id, -1);
    }

    #[test]
    fn test_assign_label_updates_shape() {
        let mut model = model();
        let mut shape = quad();
        let row = model
            .assign_label(&mut shape, LabelAssignment::new("person").with_track(5, false))
            .unwrap()
            .clone();
        assert_eq!(row.category, "person");
        assert_eq!(row.track_id, 5);
        assert_eq!(shape.category, "person");
        assert_eq!(shape.track_id, 5);
        assert!(!shape.trackable);
        assert_eq!(shape.line_color, model.color_for("person"));
    }

    #[test]
    fn test_assign_unknown_category() {
        let mut model = model();
        let mut shape = quad();
        let err = model
            .assign_label(&mut shape, LabelAssignment::new("boat"))
            .unwrap_err();
        assert!(matches!(err, LabelError::InvalidValue { .. }));
        assert!(model.labels().is_empty());
    }

    #[test]
    fn test_default_second_category() {
        let mut model = with_second(model());
        let mut shape = quad();
        let row = model
            .assign_label(&mut shape, LabelAssignment::new("car"))
            .unwrap();
        assert_eq!(row.second_category.as_deref(), Some("parked"));
        // Third taxonomy is empty
        assert_eq!(row.third_category, None);

        let mut shape = quad();
        let row = model
            .assign_label(
                &mut shape,
                LabelAssignment::new("car").with_second_category("unknown"),
            )
            .unwrap();
        assert_eq!(row.second_category.as_deref(), Some("unknown"));
    }

    #[test]
    fn test_relabel_replaces_row() {
        let mut model = model();
        let mut shape = quad();
        model
            .assign_label(&mut shape, LabelAssignment::new("car"))
            .unwrap();
        model
            .assign_label(&mut shape, LabelAssignment::new("person"))
            .unwrap();
        assert_eq!(model.labels().len(), 1);
        assert_eq!(model.labels().rows()[0].category, "person");
    }

    #[test]
    fn test_remove_label() {
        let mut model = model();
        let mut shape = quad();
        model
            .assign_label(&mut shape, LabelAssignment::new("car"))
            .unwrap();
        model.remove_label(shape.id()).unwrap();
        assert!(model.labels().get(shape.id()).is_none());
        assert_eq!(
            model.remove_label(shape.id()),
            Err(LabelError::UnknownReference(shape.id()))
        );
    }

    #[test]
    fn test_invalid_category_file_keeps_taxonomy() {
        let mut model = model();
        let err = model
            .load_categories(CategoryLevel::Primary, &json!({"name": "other"}))
            .unwrap_err();
        assert!(matches!(err, FormatError::InvalidCategoryFile { .. }));
        assert_eq!(model.categories().primary.len(), 2);
        assert_eq!(model.category_set_name(), Some("road"));
    }

    #[test]
    fn test_loading_primary_clears_last_category() {
        let mut model = model();
        model.remember_category("car");
        assert_eq!(model.last_category(), Some("car"));
        model
            .load_categories(
                CategoryLevel::Primary,
                &json!({"name": "road", "category": []}),
            )
            .unwrap();
        assert_eq!(model.last_category(), None);
    }

    #[test]
    fn test_color_for_palette_and_hash() {
        let model = model();
        assert_eq!(model.color_for("car"), Color::new(0, 0, 255, PALETTE_ALPHA));
        // Id 20 has no palette entry
        assert_eq!(model.color_for("person"), generate_color_by_text("person"));
        assert_eq!(model.color_for("boat"), generate_color_by_text("boat"));
    }

    #[test]
    fn test_serialize_skips_stale_rows() {
        let mut model = model();
        let mut kept = quad();
        let mut gone = quad();
        model
            .assign_label(&mut kept, LabelAssignment::new("car"))
            .unwrap();
        model
            .assign_label(&mut gone, LabelAssignment::new("person"))
            .unwrap();

        let records = model
            .serialize(&[kept], &ImageRecord::new(1, "a.jpg"))
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].category_id, 1);
    }

    #[test]
    fn test_serialize_non_rectangle_uses_bounding_box() {
        let mut model = model();
        let mut triangle = Shape::from_points([
            Point::new(0.0, 0.0),
            Point::new(20.0, 0.0),
            Point::new(10.0, 9.0),
        ]);
        model
            .assign_label(&mut triangle, LabelAssignment::new("car"))
            .unwrap();
        let records = model
            .serialize(&[triangle], &ImageRecord::new(1, "a.jpg"))
            .unwrap();
        assert_eq!(
            records[0].bbox,
            Some(BBoxRecord {
                x: 0.0,
                y: 0.0,
                w: 21.0,
                h: 10.0
            })
        );
    }

    #[test]
    fn test_round_trip_keeps_bounding_box_and_labels() {
        let mut model = with_second(model());
        let mut shape = quad();
        model
            .assign_label(
                &mut shape,
                LabelAssignment::new("car")
                    .with_id(4)
                    .with_track(9, true)
                    .with_second_category("unknown"),
            )
            .unwrap();
        let records = model
            .serialize(std::slice::from_ref(&shape), &ImageRecord::new(1, "a.jpg"))
            .unwrap();

        model.clear_labels();
        let shapes = model.deserialize(&records).unwrap();
        assert_eq!(shapes.len(), 1);
        assert_eq!(shapes[0].bounding_box(), shape.bounding_box());
        assert!(shapes[0].is_closed());
        assert_eq!(shapes[0].len(), 4);

        let row = model.labels().get(shapes[0].id()).unwrap();
        assert_eq!(row.id, 4);
        assert_eq!(row.track_id, 9);
        assert_eq!(row.second_category.as_deref(), Some("unknown"));
    }

    #[test]
    fn test_deserialize_fails_closed_on_missing_bbox() {
        let mut model = model();
        let records = crate::format::parse_annotation_records(
            std::path::Path::new("a.json"),
            json!([
                {"id": 1, "bbox": {"x": 0, "y": 0, "w": 5, "h": 5}, "category_id": 1},
                {"id": 2, "category_id": 1}
            ]),
        )
        .unwrap();
        let err = model.deserialize(&records).unwrap_err();
        assert!(matches!(err, FormatError::MissingField { .. }));
        assert!(model.labels().is_empty());
    }

    #[test]
    fn test_load_records_replaces_or_keeps_table() {
        let mut model = model();
        let mut shape = quad();
        model
            .assign_label(&mut shape, LabelAssignment::new("car"))
            .unwrap();

        let bad = AnnotationRecord::new(
            1,
            BBoxRecord {
                x: 0.0,
                y: 0.0,
                w: 5.0,
                h: 5.0,
            },
            99,
            1,
        );
        assert!(model.load_records(std::slice::from_ref(&bad)).is_err());
        assert!(model.labels().get(shape.id()).is_some());

        let good = AnnotationRecord {
            category_id: 20,
            ..bad
        };
        let shapes = model.load_records(&[good]).unwrap();
        assert_eq!(model.labels().len(), 1);
        assert_eq!(model.labels().rows()[0].shape_id, shapes[0].id());
    }

    #[test]
    fn test_deserialize_unknown_category_id() {
        let mut model = model();
        let record = AnnotationRecord::new(
            1,
            BBoxRecord {
                x: 0.0,
                y: 0.0,
                w: 5.0,
                h: 5.0,
            },
            99,
            1,
        );
        let err = model.deserialize(&[record]).unwrap_err();
        assert!(matches!(err, FormatError::CategoryNotFound(_)));
    }

    #[test]
    fn test_deserialize_unknown_second_id_uses_default() {
        let mut model = with_second(model());
        let mut record = AnnotationRecord::new(
            1,
            BBoxRecord {
                x: 0.0,
                y: 0.0,
                w: 5.0,
                h: 5.0,
            },
            20,
            1,
        );
        record.second_category_id = Some(42);
        let shapes = model.deserialize(&[record]).unwrap();
        let row = model.labels().get(shapes[0].id()).unwrap();
        assert_eq!(row.second_category.as_deref(), Some("walking"));
        assert_eq!(shapes[0].category, "person");
    }

    #[test]
    fn test_apply_edit_is_validated() {
        let mut model = model();
        let mut shape = quad();
        model
            .assign_label(&mut shape, LabelAssignment::new("car"))
            .unwrap();
        assert!(model
            .apply_edit(shape.id(), LabelEdit::Category("boat".into()))
            .is_err());
        let row = model
            .apply_edit(shape.id(), LabelEdit::Category("person".into()))
            .unwrap();
        assert_eq!(row.category, "person");
    }

    #[test]
    fn test_reset() {
        let mut model = model();
        let mut shape = quad();
        model
            .assign_label(&mut shape, LabelAssignment::new("car"))
            .unwrap();
        model.reset();
        assert!(model.labels().is_empty());
        assert!(model.categories().primary.is_empty());
        assert_eq!(model.category_set_name(), None);
    }
}
