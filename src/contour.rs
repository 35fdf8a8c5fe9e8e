//! Contour extraction: turn a boolean mask into an ordered outline.

use image::{GrayImage, Luma};
use imageproc::contours::{BorderType, Contour, find_contours};

use crate::model::{MaskBitmap, Point, polygon_area};

/// Strategy for extracting a polygon outline from a mask.
pub trait ContourTracer {
    /// Ordered outline vertices in mask pixel coordinates, or `None` when the
    /// mask has no contour.
    fn trace(&self, mask: &MaskBitmap) -> Option<Vec<Point>>;
}

/// Keeps the outer border with the largest enclosed area
/// (Suzuki-Abe border following via `imageproc`).
///
/// The outline is returned clockwise on screen (y grows downward).
#[derive(Debug, Clone, Copy, Default)]
pub struct LargestContourTracer;

impl ContourTracer for LargestContourTracer {
    fn trace(&self, mask: &MaskBitmap) -> Option<Vec<Point>> {
        if mask.is_empty() {
            return None;
        }

        let contours: Vec<Contour<u32>> = find_contours(&to_gray(mask));
        let mut best: Option<(f32, Vec<Point>)> = None;
        for contour in contours
            .into_iter()
            .filter(|c| c.border_type == BorderType::Outer)
        {
            let points: Vec<Point> = contour
                .points
                .iter()
                .map(|p| Point::new(p.x as f32, p.y as f32))
                .collect();
            let area = polygon_area(&points);
            // First of equal areas wins.
            if best.as_ref().is_none_or(|(best_area, _)| area > *best_area) {
                best = Some((area, points));
            }
        }

        best.map(|(_, mut points)| {
            if signed_area(&points) < 0.0 {
                points.reverse();
            }
            points
        })
    }
}

fn to_gray(mask: &MaskBitmap) -> GrayImage {
    GrayImage::from_fn(mask.width(), mask.height(), |x, y| {
        if mask.get(i64::from(x), i64::from(y)) {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

/// Shoelace sum, positive for clockwise outlines in image coordinates.
fn signed_area(points: &[Point]) -> f32 {
    let n = points.len();
    (0..n)
        .map(|i| {
            let j = (i + 1) % n;
            points[i].x * points[j].y - points[j].x * points[i].y
        })
        .sum::<f32>()
        / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trace(mask: &MaskBitmap) -> Option<Vec<(f32, f32)>> {
        LargestContourTracer
            .trace(mask)
            .map(|points| points.into_iter().map(|p| (p.x, p.y)).collect())
    }

    fn sorted(mut points: Vec<(f32, f32)>) -> Vec<(f32, f32)> {
        points.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.total_cmp(&b.0)));
        points
    }

    #[test]
    fn test_empty_mask_has_no_contour() {
        assert!(trace(&MaskBitmap::new(5, 5)).is_none());
        assert!(trace(&MaskBitmap::new(0, 0)).is_none());
    }

    #[test]
    fn test_single_pixel() {
        let mask = MaskBitmap::from_fn(3, 3, |x, y| x == 1 && y == 1);
        assert_eq!(trace(&mask), Some(vec![(1.0, 1.0)]));
    }

    #[test]
    fn test_square_outline_is_clockwise() {
        let mask = MaskBitmap::from_fn(5, 5, |x, y| (1..=3).contains(&x) && (1..=3).contains(&y));
        let contour = trace(&mask).unwrap();
        assert_eq!(
            sorted(contour.clone()),
            vec![
                (1.0, 1.0),
                (2.0, 1.0),
                (3.0, 1.0),
                (1.0, 2.0),
                (3.0, 2.0),
                (1.0, 3.0),
                (2.0, 3.0),
                (3.0, 3.0),
            ]
        );
        let points: Vec<Point> = contour.iter().map(|&(x, y)| Point::new(x, y)).collect();
        assert!(signed_area(&points) > 0.0);
    }

    #[test]
    fn test_largest_component_wins() {
        let mask = MaskBitmap::from_fn(10, 10, |x, y| {
            (x == 0 && y == 0) || ((5..=8).contains(&x) && (5..=8).contains(&y))
        });
        let contour = trace(&mask).unwrap();
        assert!(contour.iter().all(|&(x, y)| x >= 5.0 && y >= 5.0));
        assert_eq!(contour.len(), 12);
    }

    #[test]
    fn test_hole_does_not_replace_outer_border() {
        // 7x7 ring with a 3x3 hole.
        let mask = MaskBitmap::from_fn(9, 9, |x, y| {
            let ring = (1..=7).contains(&x) && (1..=7).contains(&y);
            let hole = (3..=5).contains(&x) && (3..=5).contains(&y);
            ring && !hole
        });
        let contour = trace(&mask).unwrap();
        assert!(contour.iter().any(|&(x, y)| x == 1.0 && y == 1.0));
        assert!(contour.iter().any(|&(x, y)| x == 7.0 && y == 7.0));
    }

    #[test]
    fn test_touches_image_border() {
        let mask = MaskBitmap::from_fn(2, 2, |_, _| true);
        let contour = trace(&mask).unwrap();
        assert_eq!(
            sorted(contour),
            vec![(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)]
        );
    }
}
