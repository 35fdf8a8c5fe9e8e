//! Viewport port: device/scene coordinate mapping and the drawn scene.
//!
//! [`SceneViewport`] is a headless implementation keeping a pan/zoom
//! transform, the loaded image and a z-ordered list of drawn polygons.

use image::{RgbImage, RgbaImage};

use crate::constants::{MAX_ZOOM, MIN_ZOOM};
use crate::model::{ManagerId, Point, Polygon, PolygonId, Rgba, polygon_contains};

/// Maps input-device coordinates into scene (image) coordinates.
pub trait CoordinateMapper {
    fn map_to_scene(&self, device: Point) -> Point;
}

/// Mapper for masks already in scene coordinates.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityMapper;

impl CoordinateMapper for IdentityMapper {
    fn map_to_scene(&self, device: Point) -> Point {
        device
    }
}

/// Something placed in the scene, as reported by hit-testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneItem {
    Polygon { id: PolygonId, owner: ManagerId },
    Image,
}

impl SceneItem {
    /// Manager owning this item, if it is a polygon.
    pub fn polygon_owner(&self) -> Option<ManagerId> {
        match self {
            SceneItem::Polygon { owner, .. } => Some(*owner),
            SceneItem::Image => None,
        }
    }
}

/// The drawing surface the canvas coordinates with.
pub trait Viewport: CoordinateMapper {
    fn add_polygon(&mut self, polygon: &Polygon);
    fn remove_polygon(&mut self, id: PolygonId);
    /// Update color and geometry of an already added polygon.
    fn refresh_polygon(&mut self, polygon: &Polygon);
    fn clear_polygons(&mut self);
    /// Items under a scene point, top-most first.
    fn items_at(&self, scene: Point) -> Vec<SceneItem>;
    fn contains_polygon(&self, id: PolygonId) -> bool;

    fn set_image(&mut self, image: RgbaImage);
    fn clear_image(&mut self);
    fn image(&self) -> Option<&RgbaImage>;
    fn image_size(&self) -> Option<(u32, u32)> {
        self.image().map(|img| img.dimensions())
    }

    /// Raster currently visible on screen, in device coordinates.
    fn capture_visible(&self) -> Option<RgbImage>;

    /// Changes whenever the visible raster may have changed.
    fn revision(&self) -> u64;
    /// Force the visible raster to count as changed.
    fn mark_moved(&mut self);
}

/// Pan/zoom state. `pan` is measured from the view centre in device pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    pub zoom: f32,
    pub pan_x: f32,
    pub pan_y: f32,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan_x: 0.0,
            pan_y: 0.0,
        }
    }
}

impl ViewTransform {
    /// Zoom keeping the point under the cursor fixed.
    ///
    /// `cursor_rel_*` is the cursor position relative to the view centre.
    pub fn zoom_to_cursor(&self, new_zoom: f32, cursor_rel_x: f32, cursor_rel_y: f32) -> Self {
        let img_x = (cursor_rel_x - self.pan_x) / self.zoom;
        let img_y = (cursor_rel_y - self.pan_y) / self.zoom;
        Self {
            zoom: new_zoom,
            pan_x: cursor_rel_x - img_x * new_zoom,
            pan_y: cursor_rel_y - img_y * new_zoom,
        }
    }
}

#[derive(Debug, Clone)]
struct SceneEntry {
    id: PolygonId,
    owner: ManagerId,
    vertices: Vec<Point>,
    color: Rgba,
}

/// Headless viewport.
#[derive(Debug, Clone)]
pub struct SceneViewport {
    view_width: u32,
    view_height: u32,
    transform: ViewTransform,
    image: Option<RgbaImage>,
    entries: Vec<SceneEntry>,
    revision: u64,
}

impl SceneViewport {
    pub fn new(view_width: u32, view_height: u32) -> Self {
        Self {
            view_width,
            view_height,
            transform: ViewTransform::default(),
            image: None,
            entries: Vec::new(),
            revision: 0,
        }
    }

    pub fn view_size(&self) -> (u32, u32) {
        (self.view_width, self.view_height)
    }

    pub fn transform(&self) -> ViewTransform {
        self.transform
    }

    pub fn resize(&mut self, view_width: u32, view_height: u32) {
        self.view_width = view_width;
        self.view_height = view_height;
        self.bump();
    }

    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.transform.pan_x += dx;
        self.transform.pan_y += dy;
        self.bump();
    }

    /// Multiply zoom by `factor` around a device point.
    pub fn zoom_at(&mut self, factor: f32, device: Point) {
        let new_zoom = (self.transform.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        let (cx, cy) = self.view_center();
        self.transform = self.transform.zoom_to_cursor(new_zoom, device.x - cx, device.y - cy);
        log::trace!("Zoom {:.3} at ({:.1}, {:.1})", new_zoom, device.x, device.y);
        self.bump();
    }

    /// Reset pan and scale the image to fit the view.
    pub fn fit_in_view(&mut self) {
        let zoom = match self.image_size() {
            Some((w, h)) if w > 0 && h > 0 => (self.view_width as f32 / w as f32)
                .min(self.view_height as f32 / h as f32)
                .clamp(MIN_ZOOM, MAX_ZOOM),
            _ => 1.0,
        };
        self.transform = ViewTransform {
            zoom,
            pan_x: 0.0,
            pan_y: 0.0,
        };
        self.bump();
    }

    /// Inverse of [`CoordinateMapper::map_to_scene`].
    pub fn map_from_scene(&self, scene: Point) -> Point {
        let (icx, icy) = self.image_center();
        let (vcx, vcy) = self.view_center();
        Point::new(
            (scene.x - icx) * self.transform.zoom + self.transform.pan_x + vcx,
            (scene.y - icy) * self.transform.zoom + self.transform.pan_y + vcy,
        )
    }

    /// Ids of drawn polygons, bottom to top.
    pub fn polygon_ids(&self) -> Vec<PolygonId> {
        self.entries.iter().map(|e| e.id).collect()
    }

    /// Display color of a drawn polygon.
    pub fn polygon_color(&self, id: PolygonId) -> Option<Rgba> {
        self.entries.iter().find(|e| e.id == id).map(|e| e.color)
    }

    fn view_center(&self) -> (f32, f32) {
        (self.view_width as f32 / 2.0, self.view_height as f32 / 2.0)
    }

    fn image_center(&self) -> (f32, f32) {
        self.image_size()
            .map(|(w, h)| (w as f32 / 2.0, h as f32 / 2.0))
            .unwrap_or((0.0, 0.0))
    }

    fn bump(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    fn entry(polygon: &Polygon) -> SceneEntry {
        SceneEntry {
            id: polygon.id(),
            owner: polygon.owner(),
            vertices: polygon.vertices().to_vec(),
            color: polygon.display_color(),
        }
    }
}

impl CoordinateMapper for SceneViewport {
    fn map_to_scene(&self, device: Point) -> Point {
        let (icx, icy) = self.image_center();
        let (vcx, vcy) = self.view_center();
        Point::new(
            (device.x - vcx - self.transform.pan_x) / self.transform.zoom + icx,
            (device.y - vcy - self.transform.pan_y) / self.transform.zoom + icy,
        )
    }
}

impl Viewport for SceneViewport {
    fn add_polygon(&mut self, polygon: &Polygon) {
        if self.contains_polygon(polygon.id()) {
            self.refresh_polygon(polygon);
            return;
        }
        self.entries.push(Self::entry(polygon));
    }

    fn remove_polygon(&mut self, id: PolygonId) {
        self.entries.retain(|e| e.id != id);
    }

    fn refresh_polygon(&mut self, polygon: &Polygon) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.id == polygon.id()) {
            *entry = Self::entry(polygon);
        }
    }

    fn clear_polygons(&mut self) {
        self.entries.clear();
    }

    fn items_at(&self, scene: Point) -> Vec<SceneItem> {
        let mut items: Vec<SceneItem> = self
            .entries
            .iter()
            .rev()
            .filter(|e| polygon_contains(&e.vertices, &scene))
            .map(|e| SceneItem::Polygon {
                id: e.id,
                owner: e.owner,
            })
            .collect();
        if let Some((w, h)) = self.image_size() {
            if scene.x >= 0.0 && scene.y >= 0.0 && scene.x < w as f32 && scene.y < h as f32 {
                items.push(SceneItem::Image);
            }
        }
        items
    }

    fn contains_polygon(&self, id: PolygonId) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    fn set_image(&mut self, image: RgbaImage) {
        self.image = Some(image);
        self.fit_in_view();
    }

    fn clear_image(&mut self) {
        self.image = None;
        self.bump();
    }

    fn image(&self) -> Option<&RgbaImage> {
        self.image.as_ref()
    }

    fn capture_visible(&self) -> Option<RgbImage> {
        let image = self.image.as_ref()?;
        let (w, h) = image.dimensions();
        Some(RgbImage::from_fn(self.view_width, self.view_height, |x, y| {
            let scene = self.map_to_scene(Point::new(x as f32, y as f32));
            if scene.x < 0.0 || scene.y < 0.0 {
                return image::Rgb([0, 0, 0]);
            }
            let (sx, sy) = (scene.x as u32, scene.y as u32);
            if sx >= w || sy >= h {
                return image::Rgb([0, 0, 0]);
            }
            let p = image.get_pixel(sx, sy);
            image::Rgb([p[0], p[1], p[2]])
        }))
    }

    fn revision(&self) -> u64 {
        self.revision
    }

    fn mark_moved(&mut self) {
        self.bump();
    }
}
