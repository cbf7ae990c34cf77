/// Core geometry types for the cutout pipeline.
///
/// Everything here is 2-D and axis-aligned: the input is a set of pad
/// rectangles and the output is a sequence of XY waypoints.
use serde::{Deserialize, Serialize};

/// Shortest segment worth emitting. Twice the 1e-5 resolution of
/// five-decimal coordinates, so its two ends never print the same.
pub const MIN_SEGMENT: f64 = 2e-5;

// ── Points ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ORIGIN: Self = Self { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
    pub fn dist(a: Self, b: Self) -> f64 {
        Self::dist_sq(a, b).sqrt()
    }
    pub fn dist_sq(a: Self, b: Self) -> f64 {
        (a.x - b.x).powi(2) + (a.y - b.y).powi(2)
    }
}

// ── Rectangles ───────────────────────────────────────────────────────

/// An axis-aligned rectangle given by its minimum corner and extents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle spanning two opposite corners, in any order.
    pub fn from_corners(a: Vec2, b: Vec2) -> Self {
        let min = Vec2::new(a.x.min(b.x), a.y.min(b.y));
        Self::new(min.x, min.y, (a.x - b.x).abs(), (a.y - b.y).abs())
    }

    pub fn min(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
    pub fn max(&self) -> Vec2 {
        Vec2::new(self.x + self.width, self.y + self.height)
    }
    pub fn centroid(&self) -> Vec2 {
        Vec2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
    pub fn short_side(&self) -> f64 {
        self.width.min(self.height)
    }

    /// Both extents strictly positive and finite.
    pub fn is_valid(&self) -> bool {
        [self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite())
            && self.width > 0.0
            && self.height > 0.0
    }

    /// Point containment with a tolerance on every edge.
    pub fn contains(&self, p: Vec2, tol: f64) -> bool {
        let max = self.max();
        p.x >= self.x - tol && p.x <= max.x + tol && p.y >= self.y - tol && p.y <= max.y + tol
    }
}

// ── Bounds ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox2 {
    pub min: Vec2,
    pub max: Vec2,
}

impl BoundingBox2 {
    pub fn from_points(pts: &[Vec2]) -> Option<Self> {
        if pts.is_empty() {
            return None;
        }
        let mut min = Vec2::new(f64::MAX, f64::MAX);
        let mut max = Vec2::new(f64::MIN, f64::MIN);
        for p in pts {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
        Some(Self { min, max })
    }

    /// Overall extents of a set of rectangles.
    pub fn from_rects(rects: &[Rect]) -> Option<Self> {
        let corners: Vec<Vec2> = rects.iter().flat_map(|r| [r.min(), r.max()]).collect();
        Self::from_points(&corners)
    }

    /// True when `p` lies on the perimeter (within `tol`).
    pub fn on_perimeter(&self, p: Vec2, tol: f64) -> bool {
        let inside = p.x >= self.min.x - tol
            && p.x <= self.max.x + tol
            && p.y >= self.min.y - tol
            && p.y <= self.max.y + tol;
        let on_edge = (p.x - self.min.x).abs() <= tol
            || (p.x - self.max.x).abs() <= tol
            || (p.y - self.min.y).abs() <= tol
            || (p.y - self.max.y).abs() <= tol;
        inside && on_edge
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_corners_and_centroid() {
        let r = Rect::new(1.0, 2.0, 4.0, 2.0);
        assert_eq!(r.max(), Vec2::new(5.0, 4.0));
        assert_eq!(r.centroid(), Vec2::new(3.0, 3.0));
        assert!((r.short_side() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_from_corners_any_order() {
        let r = Rect::from_corners(Vec2::new(3.0, 1.0), Vec2::new(1.0, 4.0));
        assert_eq!(r, Rect::new(1.0, 1.0, 2.0, 3.0));
    }

    #[test]
    fn test_rect_validity() {
        assert!(Rect::new(0.0, 0.0, 1.0, 1.0).is_valid());
        assert!(!Rect::new(0.0, 0.0, 0.0, 1.0).is_valid());
        assert!(!Rect::new(0.0, 0.0, 1.0, -1.0).is_valid());
        assert!(!Rect::new(f64::NAN, 0.0, 1.0, 1.0).is_valid());
    }

    #[test]
    fn test_bounds_from_rects() {
        let rects = [Rect::new(0.0, 0.0, 1.0, 1.0), Rect::new(2.0, -1.0, 1.0, 1.0)];
        let b = BoundingBox2::from_rects(&rects).unwrap();
        assert_eq!(b.min, Vec2::new(0.0, -1.0));
        assert_eq!(b.max, Vec2::new(3.0, 1.0));
        assert!(BoundingBox2::from_rects(&[]).is_none());
    }

    #[test]
    fn test_on_perimeter() {
        let b = BoundingBox2::from_points(&[Vec2::new(0.0, 0.0), Vec2::new(2.0, 1.0)]).unwrap();
        assert!(b.on_perimeter(Vec2::new(1.0, 0.0), 1e-9));
        assert!(b.on_perimeter(Vec2::new(2.0, 1.0), 1e-9));
        assert!(!b.on_perimeter(Vec2::new(1.0, 0.5), 1e-9));
        assert!(!b.on_perimeter(Vec2::new(3.0, 0.0), 1e-9));
    }
}
