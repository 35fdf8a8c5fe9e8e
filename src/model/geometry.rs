//! Core geometry types: points, clicks and polygon helpers.

use serde::{Deserialize, Serialize};

/// A 2D point, in scene (image) or device coordinates depending on context.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Calculate distance to another point.
    pub fn distance_to(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

impl From<(f32, f32)> for Point {
    fn from((x, y): (f32, f32)) -> Self {
        Self { x, y }
    }
}

/// Whether a click asks the model to include or exclude the region under it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Polarity {
    /// Exclude (label 0)
    Negative,
    /// Include (label 1)
    Positive,
}

impl Polarity {
    /// Numeric label as fed to the model.
    pub fn label(self) -> u8 {
        match self {
            Polarity::Negative => 0,
            Polarity::Positive => 1,
        }
    }

    pub fn from_label(label: u8) -> Self {
        if label == 0 {
            Polarity::Negative
        } else {
            Polarity::Positive
        }
    }
}

/// A signed click: position plus polarity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClickPoint {
    pub x: f32,
    pub y: f32,
    pub polarity: Polarity,
}

impl ClickPoint {
    pub const fn new(x: f32, y: f32, polarity: Polarity) -> Self {
        Self { x, y, polarity }
    }

    pub const fn positive(x: f32, y: f32) -> Self {
        Self::new(x, y, Polarity::Positive)
    }

    pub const fn negative(x: f32, y: f32) -> Self {
        Self::new(x, y, Polarity::Negative)
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// An axis-aligned box given by its top-left corner and size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub fn contains(&self, point: &Point) -> bool {
        point.x >= self.x
            && point.x <= self.x + self.width
            && point.y >= self.y
            && point.y <= self.y + self.height
    }
}

/// Check if a point is inside a closed polygon (ray casting).
pub fn polygon_contains(vertices: &[Point], point: &Point) -> bool {
    if vertices.len() < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = vertices.len() - 1;
    for i in 0..vertices.len() {
        let vi = &vertices[i];
        let vj = &vertices[j];
        if ((vi.y > point.y) != (vj.y > point.y))
            && (point.x < (vj.x - vi.x) * (point.y - vi.y) / (vj.y - vi.y) + vi.x)
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Area of a polygon using the shoelace formula.
pub fn polygon_area(vertices: &[Point]) -> f32 {
    if vertices.len() < 3 {
        return 0.0;
    }

    let n = vertices.len();
    let mut area = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        area += vertices[i].x * vertices[j].y;
        area -= vertices[j].x * vertices[i].y;
    }
    (area / 2.0).abs()
}

/// Bounding box of a vertex list, `None` when empty.
pub fn polygon_bounds(vertices: &[Point]) -> Option<Bounds> {
    let first = vertices.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in &vertices[1..] {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    Some(Bounds {
        x: min_x,
        y: min_y,
        width: max_x - min_x,
        height: max_y - min_y,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ]
    }

    #[test]
    fn test_polygon_contains() {
        let sq = square();
        assert!(polygon_contains(&sq, &Point::new(5.0, 5.0)));
        assert!(!polygon_contains(&sq, &Point::new(15.0, 5.0)));
        assert!(!polygon_contains(&sq[..2], &Point::new(5.0, 0.0)));
    }

    #[test]
    fn test_polygon_area() {
        assert!((polygon_area(&square()) - 100.0).abs() < 0.001);
        let triangle = vec![Point::new(0.0, 0.0), Point::new(2.0, 0.0), Point::new(1.0, 2.0)];
        assert!((polygon_area(&triangle) - 2.0).abs() < 0.001);
    }

    #[test]
    fn test_polygon_bounds() {
        let b = polygon_bounds(&square()).unwrap();
        assert_eq!((b.x, b.y, b.width, b.height), (0.0, 0.0, 10.0, 10.0));
        assert!(polygon_bounds(&[]).is_none());
    }

    #[test]
    fn test_polarity_labels() {
        assert_eq!(Polarity::Positive.label(), 1);
        assert_eq!(Polarity::Negative.label(), 0);
        assert_eq!(Polarity::from_label(0), Polarity::Negative);
        assert_eq!(Polarity::from_label(1), Polarity::Positive);
    }
}
