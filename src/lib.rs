//! segpaint - point-prompted segmentation annotation engine
//!
//! A headless core for interactive mask annotation: clicks become model
//! queries, model masks become polygons, and every annotation keeps its own
//! undoable version history. Results export to project bundles, COCO JSON,
//! shapefiles, and flattened images.

pub mod canvas;
pub mod config;
pub mod constants;
pub mod contour;
pub mod events;
pub mod format;
pub mod georef;
pub mod history;
pub mod jobs;
pub mod model;
pub mod segment;
pub mod session;
pub mod viewport;

pub use canvas::{Canvas, CanvasError, ClickOutcome, IgnoreReason, Modifiers, MouseButton, PointerEvent};
pub use config::AppConfig;
pub use events::SessionEvent;
pub use history::{PolygonArena, PolygonManager};
pub use model::{
    ClickPoint, ExportRecord, ManagerId, MaskBitmap, MaskStrength, Point, Polarity, Polygon,
    PolygonId, Rgba, ToolMode,
};
pub use segment::{MaskCandidate, SegmentError, Segmenter};
pub use session::AnnotationSession;
pub use viewport::{CoordinateMapper, SceneItem, SceneViewport, Viewport};
