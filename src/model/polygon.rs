//! Polygon records: one version of one annotation.

use serde::{Deserialize, Serialize};

use super::color::Rgba;
use super::geometry::{ClickPoint, Point, polygon_contains};
use super::mask::MaskBitmap;
use crate::constants::{DEFAULT_GROUP, SELECTED_DARKEN_FACTOR};
use crate::contour::ContourTracer;
use crate::viewport::CoordinateMapper;

/// Unique identifier for a polygon version.
pub type PolygonId = u64;

/// Unique identifier for a polygon manager (one annotation).
pub type ManagerId = u64;

/// One drawn version of an annotation.
///
/// Geometry is fixed once set; only color, label and group are edited
/// afterwards. Chain position lives in the owning
/// [`PolygonManager`](crate::history::PolygonManager), not here.
#[derive(Debug, Clone)]
pub struct Polygon {
    id: PolygonId,
    /// Id written to exports; differs from `id` for imported polygons.
    export_id: PolygonId,
    owner: ManagerId,
    name: String,
    label: String,
    group_id: String,
    color: Rgba,
    mask: Option<MaskBitmap>,
    vertices: Vec<Point>,
    click: Option<ClickPoint>,
    seed_point: Point,
    selected: bool,
}

impl Polygon {
    /// Create a polygon without geometry.
    ///
    /// `click` is the input that produced this version; `seed_point` is the
    /// scene position of the click that started the annotation.
    pub fn new(
        id: PolygonId,
        owner: ManagerId,
        name: impl Into<String>,
        color: Rgba,
        click: ClickPoint,
        seed_point: Point,
        group_id: Option<String>,
    ) -> Self {
        let name = name.into();
        Self {
            id,
            export_id: id,
            owner,
            label: name.clone(),
            name,
            group_id: group_id.unwrap_or_else(|| DEFAULT_GROUP.to_string()),
            color,
            mask: None,
            vertices: Vec::new(),
            click: Some(click),
            seed_point,
            selected: false,
        }
    }

    /// The zero-alpha placeholder heading every version chain.
    pub(crate) fn root_sentinel(id: PolygonId, owner: ManagerId, name: &str) -> Self {
        Self {
            id,
            export_id: id,
            owner,
            name: name.to_string(),
            label: name.to_string(),
            group_id: DEFAULT_GROUP.to_string(),
            color: Rgba::TRANSPARENT,
            mask: None,
            vertices: Vec::new(),
            click: None,
            seed_point: Point::default(),
            selected: false,
        }
    }

    /// Trace the outline of `mask` and map it into scene space.
    ///
    /// An empty mask leaves the vertices empty; the mask is kept either way.
    pub fn set_geometry_from_mask(
        &mut self,
        mask: MaskBitmap,
        tracer: &dyn ContourTracer,
        mapper: &dyn CoordinateMapper,
    ) {
        match tracer.trace(&mask) {
            Some(contour) => {
                self.vertices = contour.into_iter().map(|p| mapper.map_to_scene(p)).collect();
            }
            None => {
                log::debug!("Mask for polygon {} has no contour", self.id);
                self.vertices.clear();
            }
        }
        self.mask = Some(mask);
    }

    /// Set vertices directly, bypassing the model.
    pub fn set_geometry_from_points(&mut self, points: Vec<Point>) {
        self.vertices = points;
    }

    pub fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    /// Color to paint with, darkened while selected.
    pub fn display_color(&self) -> Rgba {
        if self.selected {
            self.color.darker(SELECTED_DARKEN_FACTOR)
        } else {
            self.color
        }
    }

    /// Arena key.
    pub fn id(&self) -> PolygonId {
        self.id
    }

    /// Identifier used in exported files. Imported polygons keep the id they
    /// were read with.
    pub fn export_id(&self) -> PolygonId {
        self.export_id
    }

    /// Manager owning the chain this polygon belongs to.
    pub fn owner(&self) -> ManagerId {
        self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    pub fn set_group_id(&mut self, group_id: impl Into<String>) {
        self.group_id = group_id.into();
    }

    pub fn color(&self) -> Rgba {
        self.color
    }

    pub fn set_color(&mut self, color: Rgba) {
        self.color = color;
    }

    pub fn mask(&self) -> Option<&MaskBitmap> {
        self.mask.as_ref()
    }

    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    /// The click that produced this version (`None` for the root placeholder).
    pub fn click(&self) -> Option<ClickPoint> {
        self.click
    }

    pub fn seed_point(&self) -> Point {
        self.seed_point
    }

    pub fn is_root_sentinel(&self) -> bool {
        self.click.is_none()
    }

    pub fn contains(&self, point: &Point) -> bool {
        polygon_contains(&self.vertices, point)
    }

    /// Serialization view, independent of chain position.
    pub fn to_export_record(&self) -> ExportRecord {
        ExportRecord {
            polygon_id: self.export_id,
            name: self.name.clone(),
            display_name: self.label.clone(),
            group_id: self.group_id.clone(),
            mask_color: self.color,
            points: self.vertices.iter().map(|p| (p.x, p.y)).collect(),
            seed_point: (self.seed_point.x, self.seed_point.y),
            mask: self.mask.clone(),
        }
    }

    /// Rebuild a single-version polygon from a persisted record.
    pub fn from_export_record(id: PolygonId, owner: ManagerId, record: &ExportRecord) -> Self {
        let seed = Point::new(record.seed_point.0, record.seed_point.1);
        let mut polygon = Self::new(
            id,
            owner,
            record.name.clone(),
            record.mask_color,
            ClickPoint::positive(seed.x, seed.y),
            seed,
            Some(record.group_id.clone()),
        );
        polygon.set_label(record.display_name.clone());
        polygon.set_geometry_from_points(record.points.iter().copied().map(Point::from).collect());
        polygon.mask = record.mask.clone();
        if record.polygon_id != 0 {
            polygon.export_id = record.polygon_id;
        }
        polygon
    }
}

/// Persisted form of a displayed polygon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRecord {
    /// Identifier of the exported version.
    #[serde(default)]
    pub polygon_id: PolygonId,
    /// Name of the owning annotation (`maskN`).
    pub name: String,
    /// User-facing label.
    pub display_name: String,
    /// Group tag.
    #[serde(default = "default_group")]
    pub group_id: String,
    pub mask_color: Rgba,
    /// Closed outline in scene coordinates.
    pub points: Vec<(f32, f32)>,
    /// Scene position of the click that started the annotation.
    #[serde(default)]
    pub seed_point: (f32, f32),
    /// Source raster, when the record came from a live session.
    #[serde(skip)]
    pub mask: Option<MaskBitmap>,
}

fn default_group() -> String {
    DEFAULT_GROUP.to_string()
}
