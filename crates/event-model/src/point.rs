//! Planar point type.
//!
//! Coordinates are meters in a projected coordinate system, so Euclidean
//! distance is meaningful.

use serde::{Deserialize, Serialize};

/// A 2D planar point (meters).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: &Point2D) -> f64 {
        self.distance_squared_to(other).sqrt()
    }

    /// Squared Euclidean distance, for comparisons without the square root.
    pub fn distance_squared_to(&self, other: &Point2D) -> f64 {
        (self.x - other.x).powi(2) + (self.y - other.y).powi(2)
    }

    /// Whether this point lies inside the closed disc of `radius` around `center`.
    pub fn within(&self, center: &Point2D, radius: f64) -> bool {
        self.distance_to(center) <= radius
    }

    /// Unweighted arithmetic mean of the given points.
    ///
    /// Returns `None` for an empty input.
    pub fn centroid<'a>(points: impl IntoIterator<Item = &'a Point2D>) -> Option<Point2D> {
        let mut count = 0usize;
        let mut sum_x = 0.0;
        let mut sum_y = 0.0;
        for p in points {
            count += 1;
            sum_x += p.x;
            sum_y += p.y;
        }
        if count == 0 {
            return None;
        }
        let n = count as f64;
        Some(Point2D::new(sum_x / n, sum_y / n))
    }
}
