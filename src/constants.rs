//! Application-wide constants.

use crate::model::Rgba;

/// Brush color used for new masks until the user picks another.
pub const DEFAULT_MASK_COLOR: Rgba = Rgba::new(30, 144, 255, 75);

/// Factor passed to [`Rgba::darker`] for the selected mask.
pub const SELECTED_DARKEN_FACTOR: u32 = 150;

/// Group assigned to masks when no group is chosen.
pub const DEFAULT_GROUP: &str = "none";

/// Label offered when no label list is configured.
pub const DEFAULT_LABEL: &str = "coral";

/// Prefix of generated mask names (`mask1`, `mask2`, ...).
pub const MASK_NAME_PREFIX: &str = "mask";

/// Per-notch zoom multiplier for wheel zooming.
pub const DEFAULT_ZOOM_FACTOR_BASE: f32 = 1.1;

/// Zoom limits for the scene viewport.
pub const MIN_ZOOM: f32 = 0.05;
pub const MAX_ZOOM: f32 = 40.0;
