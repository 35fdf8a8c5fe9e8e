//! Data models for masks, polygons and clicks.

mod color;
mod geometry;
mod mask;
mod polygon;
mod strength;
mod tool;

pub use color::{Rgba, hsv_to_rgb};
pub use geometry::{Bounds, ClickPoint, Point, Polarity, polygon_area, polygon_bounds, polygon_contains};
pub use mask::MaskBitmap;
pub use polygon::{ExportRecord, ManagerId, Polygon, PolygonId};
pub use strength::MaskStrength;
pub use tool::ToolMode;
