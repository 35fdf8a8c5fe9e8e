//! ESRI Shapefile format implementation.
//!
//! Each displayed mask becomes one polygon shape with attribute columns
//! `polygon_id, group_id, label, seed_pnt_x, seed_pnt_y, red, green, blue,
//! alpha`. Vertices go through the image's georeferencing transform when one
//! is available; otherwise Y is negated so the outline has conventional
//! Cartesian orientation.

use std::path::Path;

use shapefile::dbase::{self, FieldName, FieldValue, Record, TableWriterBuilder};
use shapefile::{Point as ShpPoint, Polygon as ShpPolygon, PolygonRing, Reader, Shape, Writer};

use crate::format::error::FormatError;
use crate::format::project::ProjectData;
use crate::format::traits::{
    AnnotationFormat, ExportOptions, ExportResult, FormatWarning, ImportOptions,
};
use crate::georef::AffineTransform;
use crate::model::{ExportRecord, Rgba};

/// Attribute columns every imported file must carry.
pub const REQUIRED_COLUMNS: [&str; 9] = [
    "polygon_id",
    "group_id",
    "label",
    "seed_pnt_x",
    "seed_pnt_y",
    "red",
    "green",
    "blue",
    "alpha",
];

/// Shapefile format.
pub struct ShapefileFormat;

impl AnnotationFormat for ShapefileFormat {
    fn id(&self) -> &'static str {
        "shp"
    }

    fn display_name(&self) -> &'static str {
        "ESRI Shapefile"
    }

    fn extensions(&self) -> &[&'static str] {
        &["shp"]
    }

    fn supports_import(&self) -> bool {
        true
    }

    fn export(
        &self,
        data: &ProjectData,
        path: &Path,
        options: &ExportOptions,
    ) -> Result<ExportResult, FormatError> {
        log::info!("Exporting shapefile to {:?}", path);

        let mut result = ExportResult::new();
        let mut writer = Writer::from_path(path, table_builder()?)?;

        for record in &data.records {
            if record.points.len() < 3 {
                result.add_warning(
                    FormatWarning::warning(format!(
                        "'{}' has {} vertices, skipped",
                        record.name,
                        record.points.len()
                    ))
                    .with_annotation(&record.name),
                );
                continue;
            }

            let mut ring: Vec<ShpPoint> = record
                .points
                .iter()
                .map(|&(x, y)| to_map(options.georef.as_ref(), f64::from(x), f64::from(y)))
                .map(|(x, y)| ShpPoint { x, y })
                .collect();
            if signed_area(&ring) > 0.0 {
                ring.reverse();
            }

            let shape = ShpPolygon::new(PolygonRing::Outer(ring));
            writer.write_shape_and_record(&shape, &attributes(record))?;
            result.annotations_exported += 1;
        }

        result.files_created = ["shp", "shx", "dbf"]
            .iter()
            .map(|ext| path.with_extension(ext))
            .collect();

        log::info!(
            "Exported {} polygons ({} skipped)",
            result.annotations_exported,
            result.warnings.len()
        );
        Ok(result)
    }

    fn import(&self, path: &Path, options: &ImportOptions) -> Result<ProjectData, FormatError> {
        log::info!("Importing shapefile from {:?}", path);

        let inverse = match options.georef {
            Some(transform) => Some(transform.inverse().ok_or_else(|| {
                FormatError::invalid_format("georeferencing transform is not invertible")
            })?),
            None => None,
        };

        // Reject the whole file on its schema before reading any shape.
        check_columns(path)?;

        let mut reader = Reader::from_path(path)?;
        let mut rows = Vec::new();
        for item in reader.iter_shapes_and_records() {
            rows.push(item?);
        }

        let mut records = Vec::with_capacity(rows.len());
        for (shape, record) in rows.into_iter().rev() {
            let polygon = match shape {
                Shape::Polygon(polygon) => polygon,
                other => {
                    log::warn!("Skipping non-polygon shape {}", other.shapetype());
                    continue;
                }
            };
            let Some(outer) = polygon.rings().first() else {
                continue;
            };

            let mut coords = outer.points().to_vec();
            if coords.len() > 1 && coords.first() == coords.last() {
                coords.pop();
            }
            let points = coords
                .iter()
                .map(|p| {
                    let (x, y) = from_map(inverse.as_ref(), p.x, p.y);
                    (x as f32, y as f32)
                })
                .collect();

            records.push(ExportRecord {
                polygon_id: number(&record, "polygon_id").max(0.0) as u64,
                name: String::new(),
                display_name: text(&record, "label"),
                group_id: text(&record, "group_id"),
                mask_color: Rgba::new(
                    channel(&record, "red"),
                    channel(&record, "green"),
                    channel(&record, "blue"),
                    channel(&record, "alpha"),
                ),
                points,
                seed_point: (
                    number(&record, "seed_pnt_x") as f32,
                    number(&record, "seed_pnt_y") as f32,
                ),
                mask: None,
            });
        }

        log::info!("Imported {} polygons", records.len());
        Ok(ProjectData::new().with_records(records))
    }
}

/// Fail with the list of required columns absent from the `.dbf` header.
fn check_columns(path: &Path) -> Result<(), FormatError> {
    let table = dbase::Reader::from_path(path.with_extension("dbf")).map_err(|e| {
        FormatError::invalid_format(format!("cannot read attribute table: {e}"))
    })?;
    let present: Vec<&str> = table.fields().iter().map(|f| f.name()).collect();
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|column| !present.contains(column))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(FormatError::missing_columns(missing))
    }
}

fn to_map(transform: Option<&AffineTransform>, x: f64, y: f64) -> (f64, f64) {
    match transform {
        Some(t) => t.apply(x, y),
        None => (x, -y),
    }
}

fn from_map(inverse: Option<&AffineTransform>, x: f64, y: f64) -> (f64, f64) {
    match inverse {
        Some(t) => t.apply(x, y),
        None => (x, -y),
    }
}

/// Shoelace sum; positive for counter-clockwise rings.
fn signed_area(ring: &[ShpPoint]) -> f64 {
    let n = ring.len();
    (0..n)
        .map(|i| {
            let (a, b) = (&ring[i], &ring[(i + 1) % n]);
            a.x * b.y - b.x * a.y
        })
        .sum::<f64>()
        / 2.0
}

fn field(name: &str) -> Result<FieldName, FormatError> {
    FieldName::try_from(name)
        .map_err(|_| FormatError::invalid_format(format!("invalid field name '{name}'")))
}

fn table_builder() -> Result<TableWriterBuilder, FormatError> {
    Ok(TableWriterBuilder::new()
        .add_numeric_field(field("polygon_id")?, 18, 0)
        .add_character_field(field("group_id")?, 64)
        .add_character_field(field("label")?, 64)
        .add_numeric_field(field("seed_pnt_x")?, 18, 5)
        .add_numeric_field(field("seed_pnt_y")?, 18, 5)
        .add_numeric_field(field("red")?, 3, 0)
        .add_numeric_field(field("green")?, 3, 0)
        .add_numeric_field(field("blue")?, 3, 0)
        .add_numeric_field(field("alpha")?, 3, 0))
}

fn attributes(record: &ExportRecord) -> Record {
    let color = record.mask_color;
    let mut r = Record::default();
    r.insert("polygon_id".to_string(), FieldValue::Numeric(Some(record.polygon_id as f64)));
    r.insert("group_id".to_string(), FieldValue::Character(Some(record.group_id.clone())));
    r.insert("label".to_string(), FieldValue::Character(Some(record.display_name.clone())));
    r.insert("seed_pnt_x".to_string(), FieldValue::Numeric(Some(f64::from(record.seed_point.0))));
    r.insert("seed_pnt_y".to_string(), FieldValue::Numeric(Some(f64::from(record.seed_point.1))));
    r.insert("red".to_string(), FieldValue::Numeric(Some(f64::from(color.r))));
    r.insert("green".to_string(), FieldValue::Numeric(Some(f64::from(color.g))));
    r.insert("blue".to_string(), FieldValue::Numeric(Some(f64::from(color.b))));
    r.insert("alpha".to_string(), FieldValue::Numeric(Some(f64::from(color.a))));
    r
}

fn number(record: &Record, column: &str) -> f64 {
    match record.get(column) {
        Some(FieldValue::Numeric(Some(v))) => *v,
        Some(FieldValue::Float(Some(v))) => f64::from(*v),
        Some(FieldValue::Double(v)) => *v,
        Some(FieldValue::Integer(v)) => f64::from(*v),
        _ => 0.0,
    }
}

fn text(record: &Record, column: &str) -> String {
    match record.get(column) {
        Some(FieldValue::Character(Some(s))) => s.trim().to_string(),
        Some(FieldValue::Memo(s)) => s.trim().to_string(),
        _ => String::new(),
    }
}

fn channel(record: &Record, column: &str) -> u8 {
    number(record, column).round().clamp(0.0, 255.0) as u8
}
