//! Geometric primitives shared by the score snapshot and the curve engine
//!
//! Drawing coordinates are `f64` with y growing upwards, so the top of a box
//! is numerically larger than its bottom.

use serde::{Deserialize, Serialize};

/// A point in drawing space
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Rotate this point by `angle` radians around `center`
    pub fn rotated(self, angle: f64, center: Point) -> Point {
        let (s, c) = angle.sin_cos();
        let dx = self.x - center.x;
        let dy = self.y - center.y;
        Point {
            x: dx * c - dy * s + center.x,
            y: dx * s + dy * c + center.y,
        }
    }

    /// Euclidean distance to another point
    pub fn distance(self, other: Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Linear interpolation between `self` and `other`
    pub fn lerp(self, other: Point, t: f64) -> Point {
        Point {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }

    /// Whether both coordinates are within `tolerance` of the other point
    pub fn is_close(self, other: Point, tolerance: f64) -> bool {
        (self.x - other.x).abs() <= tolerance && (self.y - other.y).abs() <= tolerance
    }
}

/// Slope of the line through `p1` and `p2`
///
/// Horizontal and vertical lines both report a slope of zero.
pub fn slope(p1: Point, p2: Point) -> f64 {
    if p1.y == p2.y || p1.x == p2.x {
        return 0.0;
    }
    (p2.y - p1.y) / (p2.x - p1.x)
}

/// Axis-aligned bounding box in drawing space
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
pub struct BoundingBox {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

impl BoundingBox {
    pub fn new(left: f64, right: f64, top: f64, bottom: f64) -> Self {
        Self {
            left,
            right,
            top,
            bottom,
        }
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        (self.top - self.bottom).abs()
    }

    pub fn center_x(&self) -> f64 {
        (self.left + self.right) / 2.0
    }

    pub fn center_y(&self) -> f64 {
        (self.top + self.bottom) / 2.0
    }

    /// A box is degenerate when it has no horizontal or vertical extent
    pub fn is_degenerate(&self) -> bool {
        self.right <= self.left || self.top < self.bottom
    }

    /// Whether the horizontal extent intersects `[x_min, x_max]`
    pub fn overlaps_horizontally(&self, x_min: f64, x_max: f64) -> bool {
        self.right >= x_min && self.left <= x_max
    }

    /// Smallest box containing all points
    pub fn from_points(points: &[Point]) -> Option<Self> {
        let first = points.first()?;
        let mut bbox = BoundingBox::new(first.x, first.x, first.y, first.y);
        for p in &points[1..] {
            bbox.left = bbox.left.min(p.x);
            bbox.right = bbox.right.max(p.x);
            bbox.top = bbox.top.max(p.y);
            bbox.bottom = bbox.bottom.min(p.y);
        }
        Some(bbox)
    }
}
