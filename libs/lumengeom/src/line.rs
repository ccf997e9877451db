//! Infinite lines in homogeneous form and their intersections.

use serde::{Deserialize, Serialize};

use crate::Point;

/// Determinants smaller than this are treated as parallel lines.
pub const PARALLEL_TOLERANCE: f64 = 1e-13;

/// The line `a*x + b*y = c`.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl Line {
    /// The line through two points.
    pub fn through(p1: Point, p2: Point) -> Self {
        let a = p1.y - p2.y;
        let b = p2.x - p1.x;
        let c = -(p1.x * p2.y - p2.x * p1.y);
        Self { a, b, c }
    }

    /// The line through `p` heading in direction `angle` degrees.
    pub fn from_ray(p: Point, angle: f64) -> Self {
        Self::through(p, p + Point::unit(angle))
    }

    /// The determinant of the two-line system; zero for parallel lines.
    #[inline]
    pub fn det(&self, other: &Line) -> f64 {
        self.a * other.b - self.b * other.a
    }

    /// The point where two lines cross, or `None` if they are (nearly) parallel.
    pub fn intersection(&self, other: &Line) -> Option<Point> {
        let d = self.det(other);
        if d.abs() <= PARALLEL_TOLERANCE {
            return None;
        }
        let dx = self.c * other.b - self.b * other.c;
        let dy = self.a * other.c - self.c * other.a;
        Some(Point::new(dx / d, dy / d))
    }
}

/// Homogeneous coefficients of the line through `p1` and `p2`.
pub fn line(p1: Point, p2: Point) -> Line {
    Line::through(p1, p2)
}

/// Intersection of two lines, `None` when parallel.
pub fn intersection(l1: &Line, l2: &Line) -> Option<Point> {
    l1.intersection(l2)
}

/// Tolerance on the cross product used by [`collinear`].
pub const COLLINEAR_TOLERANCE: f64 = 1e-8;

/// Returns `true` if `p2` lies on the closed segment from `p0` to `p1`.
///
/// A zero-length segment contains nothing.
pub fn collinear(p0: Point, p1: Point, p2: Point) -> bool {
    let d1 = p1 - p0;
    let d2 = p2 - p0;
    let len2 = d1.dot(d1);
    if len2 == 0. {
        return false;
    }
    if d1.cross(d2).abs() >= COLLINEAR_TOLERANCE {
        return false;
    }
    let t = d1.dot(d2) / len2;
    (0. ..=1.).contains(&t)
}

/// The proper intersection point of two segments, if any.
pub fn segment_intersection(a0: Point, a1: Point, b0: Point, b1: Point) -> Option<Point> {
    let da = a1 - a0;
    let db = b1 - b0;
    let denom = da.cross(db);
    if denom.abs() <= PARALLEL_TOLERANCE {
        return None;
    }
    let t = (b0 - a0).cross(db) / denom;
    let u = (b0 - a0).cross(da) / denom;
    if (0. ..=1.).contains(&t) && (0. ..=1.).contains(&u) {
        Some(a0 + da * t)
    } else {
        None
    }
}
