//! Segmentation model port.
//!
//! The model itself is external. The canvas talks to it through [`Segmenter`]
//! and picks one of the returned candidates with a [`MaskStrength`].

use image::RgbImage;
use thiserror::Error;

use crate::model::{ClickPoint, MaskBitmap, MaskStrength};

/// One proposed mask with its confidence score.
#[derive(Debug, Clone)]
pub struct MaskCandidate {
    pub mask: MaskBitmap,
    pub score: f32,
}

impl MaskCandidate {
    pub fn new(mask: MaskBitmap, score: f32) -> Self {
        Self { mask, score }
    }
}

/// Errors reported by a segmentation backend.
#[derive(Debug, Error)]
pub enum SegmentError {
    #[error("Segmentation model error: {0}")]
    Model(String),

    #[error("No mask candidate for strength '{}'", .strength.label())]
    NoCandidate { strength: MaskStrength },
}

/// Stateful per-image mask proposal interface.
pub trait Segmenter {
    /// Compute the image embedding. Must be called before proposing masks
    /// and again whenever the visible raster changes.
    fn set_image(&mut self, image: &RgbImage) -> Result<(), SegmentError>;

    /// Propose masks for a list of signed points, best candidate first.
    fn propose_from_points(
        &mut self,
        points: &[ClickPoint],
    ) -> Result<Vec<MaskCandidate>, SegmentError>;

    /// Propose masks for a single positive point.
    fn propose_from_point(&mut self, x: f32, y: f32) -> Result<Vec<MaskCandidate>, SegmentError> {
        self.propose_from_points(&[ClickPoint::positive(x, y)])
    }
}

/// Pick the candidate to commit for `strength`.
pub fn select_candidate(
    mut candidates: Vec<MaskCandidate>,
    strength: MaskStrength,
) -> Result<MaskCandidate, SegmentError> {
    let scores: Vec<f32> = candidates.iter().map(|c| c.score).collect();
    match strength.select_index(&scores) {
        Some(index) => Ok(candidates.swap_remove(index)),
        None => Err(SegmentError::NoCandidate { strength }),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Deterministic segmenter for tests: every query returns a square
    //! around the last point, plus smaller and larger variants.

    use super::*;

    #[derive(Debug, Default)]
    pub struct BoxSegmenter {
        pub image_size: Option<(u32, u32)>,
        pub set_image_calls: usize,
        pub queries: Vec<Vec<ClickPoint>>,
        pub fail: bool,
        pub empty: bool,
        /// Half-extent of the best candidate.
        pub radius: u32,
    }

    impl BoxSegmenter {
        pub fn new(radius: u32) -> Self {
            Self {
                radius,
                ..Self::default()
            }
        }

        fn square(&self, cx: f32, cy: f32, radius: u32) -> MaskBitmap {
            let (w, h) = self.image_size.unwrap_or((0, 0));
            let r = radius as f32;
            MaskBitmap::from_fn(w, h, |x, y| {
                !self.empty && (x as f32 - cx).abs() <= r && (y as f32 - cy).abs() <= r
            })
        }
    }

    impl Segmenter for BoxSegmenter {
        fn set_image(&mut self, image: &RgbImage) -> Result<(), SegmentError> {
            self.image_size = Some(image.dimensions());
            self.set_image_calls += 1;
            Ok(())
        }

        fn propose_from_points(
            &mut self,
            points: &[ClickPoint],
        ) -> Result<Vec<MaskCandidate>, SegmentError> {
            if self.fail {
                return Err(SegmentError::Model("backend offline".to_string()));
            }
            if self.image_size.is_none() {
                return Err(SegmentError::Model("no image set".to_string()));
            }
            self.queries.push(points.to_vec());
            let last = points.last().copied().unwrap_or(ClickPoint::positive(0.0, 0.0));
            let grow = (points.len() as u32).saturating_sub(1);
            Ok(vec![
                MaskCandidate::new(self.square(last.x, last.y, self.radius + grow), 0.9),
                MaskCandidate::new(self.square(last.x, last.y, self.radius + grow + 1), 0.7),
                MaskCandidate::new(self.square(last.x, last.y, (self.radius + grow).saturating_sub(1)), 0.5),
            ])
        }
    }
}
