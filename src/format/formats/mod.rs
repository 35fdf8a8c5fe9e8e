//! Annotation format implementations.

mod coco;
mod flat_image;
mod sgmt;
mod shp;

#[cfg(test)]
mod tests;

pub use coco::{CocoAnnotation, CocoCategory, CocoDataset, CocoFormat, CocoImage, CocoInfo, CocoRle};
pub use flat_image::{FlatImageFormat, composite, paint_overlay, rasterize_outline};
pub use sgmt::SgmtFormat;
pub use shp::{REQUIRED_COLUMNS, ShapefileFormat};
