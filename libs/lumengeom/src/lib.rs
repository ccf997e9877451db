//! Core geometric types and their operations/attributes.
//!
//! All coordinates are `f64` micrometers; angles are in degrees unless a
//! function name says otherwise.

use std::fmt::Display;

use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use self::bbox::{Bbox, BoundBox};
use self::polyline::Polyline;
use self::transform::{Transform, Transformation, Translate};

pub mod bbox;
pub mod curvature;
pub mod line;
pub mod orientation;
pub mod polyline;
pub mod round;
pub mod transform;

/// Absolute tolerance used when comparing coordinates.
pub const EPSILON: f64 = 1e-9;

/// An error produced by a geometric operation.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GeometryError {
    #[error("shape requires at least {min} points, but has {got}")]
    TooFewPoints { min: usize, got: usize },
    #[error("non-finite coordinate in point {index}: {point}")]
    NonFinite { index: usize, point: Point },
}

/// A point in two-dimensional layout-space.
#[derive(Debug, Copy, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// Creates a new [`Point`] from (x,y) coordinates.
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Returns the origin, (0, 0).
    #[inline]
    pub const fn zero() -> Self {
        Self { x: 0., y: 0. }
    }

    /// Creates a unit-length direction vector pointing at `angle` degrees.
    pub fn unit(angle: f64) -> Self {
        let rad = angle.to_radians();
        Self::new(rad.cos(), rad.sin())
    }

    /// Returns a copy of this point moved by `distance` in the direction of `angle` degrees.
    pub fn move_polar(&self, distance: f64, angle: f64) -> Self {
        *self + Self::unit(angle) * distance
    }

    /// Euclidean distance to `other`.
    #[inline]
    pub fn distance(&self, other: Point) -> f64 {
        (*self - other).norm()
    }

    /// Euclidean length of this point interpreted as a vector.
    #[inline]
    pub fn norm(&self) -> f64 {
        self.x.hypot(self.y)
    }

    #[inline]
    pub fn dot(&self, other: Point) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// The z-component of the cross product of two planar vectors.
    #[inline]
    pub fn cross(&self, other: Point) -> f64 {
        self.x * other.y - self.y * other.x
    }

    /// The angle in degrees of the vector from this point to `other`, in `[0, 360)`.
    pub fn angle_to(&self, other: Point) -> f64 {
        let d = other - *self;
        orientation::wrap_angle(d.y.atan2(d.x).to_degrees())
    }

    /// Rotates this point by `angle` degrees around `center`.
    pub fn rotated(&self, angle: f64, center: Point) -> Self {
        let (sin, cos) = angle.to_radians().sin_cos();
        let d = *self - center;
        center + Point::new(d.x * cos - d.y * sin, d.x * sin + d.y * cos)
    }

    /// Returns `true` if both coordinates are within `tol` of those of `other`.
    #[inline]
    pub fn approx_eq(&self, other: Point, tol: f64) -> bool {
        (self.x - other.x).abs() <= tol && (self.y - other.y).abs() <= tol
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl std::ops::Add<Point> for Point {
    type Output = Self;
    fn add(self, rhs: Point) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::AddAssign<Point> for Point {
    fn add_assign(&mut self, rhs: Point) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl std::ops::Sub<Point> for Point {
    type Output = Self;
    fn sub(self, rhs: Point) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::SubAssign<Point> for Point {
    fn sub_assign(&mut self, rhs: Point) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl std::ops::Mul<f64> for Point {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self::Output {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl std::ops::Neg for Point {
    type Output = Self;
    fn neg(self) -> Self::Output {
        Self::new(-self.x, -self.y)
    }
}

impl From<(f64, f64)> for Point {
    fn from(value: (f64, f64)) -> Self {
        Self::new(value.0, value.1)
    }
}

impl From<Point> for (f64, f64) {
    fn from(value: Point) -> Self {
        (value.x, value.y)
    }
}

/// An open-ended geometric path with non-zero width.
///
/// Primarily consists of a series of ordered [`Point`]s.
#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq)]
pub struct Path {
    pub points: Vec<Point>,
    pub width: f64,
}

impl Path {
    pub fn new(points: impl Into<Vec<Point>>, width: f64) -> Self {
        Self {
            points: points.into(),
            width,
        }
    }
}

impl Translate for Path {
    fn translate(&mut self, p: Point) {
        for pt in self.points.iter_mut() {
            pt.translate(p);
        }
    }
}

/// A closed n-sided polygon with arbitrary number of vertices.
///
/// Closure from the last point back to the first is implied;
/// the initial point need not be repeated at the end.
#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq)]
pub struct Polygon {
    pub points: Vec<Point>,
}

impl Translate for Polygon {
    fn translate(&mut self, p: Point) {
        for pt in self.points.iter_mut() {
            pt.translate(p);
        }
    }
}

/// An axis-aligned rectangle, specified by lower-left and upper-right corners.
#[derive(Debug, Default, Copy, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rect {
    /// The lower-left corner.
    pub p0: Point,
    /// The upper-right corner.
    pub p1: Point,
}

impl Rect {
    /// Creates a rectangle from two opposite corners.
    pub fn new(p0: Point, p1: Point) -> Self {
        Self {
            p0: Point::new(p0.x.min(p1.x), p0.y.min(p1.y)),
            p1: Point::new(p0.x.max(p1.x), p0.y.max(p1.y)),
        }
    }

    /// Creates a rectangle of the given size centered on `center`.
    pub fn from_center(center: Point, width: f64, height: f64) -> Self {
        let half = Point::new(width / 2., height / 2.);
        Self::new(center - half, center + half)
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.p1.x - self.p0.x
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.p1.y - self.p0.y
    }

    #[inline]
    pub fn center(&self) -> Point {
        Point::new((self.p0.x + self.p1.x) / 2., (self.p0.y + self.p1.y) / 2.)
    }
}

impl Translate for Rect {
    fn translate(&mut self, p: Point) {
        self.p0.translate(p);
        self.p1.translate(p);
    }
}

impl From<Bbox> for Rect {
    fn from(b: Bbox) -> Self {
        Self { p0: b.p0, p1: b.p1 }
    }
}

/// The primary geometric primitive comprising raw layout.
#[enum_dispatch(ShapeTrait)]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Shape {
    Rect(Rect),
    Polygon(Polygon),
    Path(Path),
}

impl Transform for Shape {
    fn transform(&self, trans: Transformation) -> Self {
        match self {
            Self::Rect(s) => {
                if trans.is_rectilinear() {
                    Self::Rect(s.transform(trans))
                } else {
                    Self::Polygon(s.to_poly().transform(trans))
                }
            }
            Self::Polygon(s) => Self::Polygon(s.transform(trans)),
            Self::Path(s) => Self::Path(s.transform(trans)),
        }
    }
}

impl Translate for Shape {
    fn translate(&mut self, p: Point) {
        match self {
            Self::Rect(s) => s.translate(p),
            Self::Polygon(s) => s.translate(p),
            Self::Path(s) => s.translate(p),
        }
    }
}

/// Common shape operations, dispatched from the [`Shape`] enum to its variants by [mod@enum_dispatch].
#[enum_dispatch]
pub trait ShapeTrait {
    /// Returns our "origin", an arbitrary [`Point`] on the shape.
    fn point0(&self) -> Point;
    /// Converts the shape to a [`Polygon`], the most general of shapes.
    fn to_poly(&self) -> Polygon;
}

impl ShapeTrait for Rect {
    fn point0(&self) -> Point {
        self.p0
    }
    fn to_poly(&self) -> Polygon {
        Polygon {
            points: vec![
                self.p0,
                Point::new(self.p1.x, self.p0.y),
                self.p1,
                Point::new(self.p0.x, self.p1.y),
            ],
        }
    }
}

impl ShapeTrait for Polygon {
    fn point0(&self) -> Point {
        self.points.first().copied().unwrap_or_default()
    }
    fn to_poly(&self) -> Polygon {
        self.clone()
    }
}

impl ShapeTrait for Path {
    fn point0(&self) -> Point {
        self.points.first().copied().unwrap_or_default()
    }
    /// Outlines the path by offsetting its centerline by half the width on either side.
    fn to_poly(&self) -> Polygon {
        let center = Polyline::new(self.points.clone());
        let hw = self.width / 2.;
        let mut points = center.offset(hw).points;
        points.extend(center.offset(-hw).points.into_iter().rev());
        Polygon { points }
    }
}

impl BoundBox for Path {
    fn bbox(&self) -> Bbox {
        let mut bbox = self.points.bbox();
        if !bbox.is_empty() {
            bbox.expand(self.width / 2.);
        }
        bbox
    }
}

impl BoundBox for Polygon {
    fn bbox(&self) -> Bbox {
        self.points.bbox()
    }
}

#[cfg(test)]
mod tests {
    use float_eq::assert_float_eq;

    use super::*;

    #[test]
    fn move_polar_follows_angle() {
        let p = Point::new(1., 1.).move_polar(2., 90.);
        assert_float_eq!(p.x, 1., abs <= 1e-12);
        assert_float_eq!(p.y, 3., abs <= 1e-12);
    }

    #[test]
    fn angle_to_is_wrapped() {
        let a = Point::zero().angle_to(Point::new(0., -1.));
        assert_float_eq!(a, 270., abs <= 1e-12);
    }

    #[test]
    fn path_outline_has_both_sides() {
        let path = Path::new(vec![Point::zero(), Point::new(10., 0.)], 2.);
        let poly = path.to_poly();
        assert_eq!(poly.points.len(), 4);
        assert!(poly.points[0].approx_eq(Point::new(0., 1.), 1e-12));
        assert!(poly.points[3].approx_eq(Point::new(0., -1.), 1e-12));
        let bbox = path.bbox();
        assert_float_eq!(bbox.height(), 2., abs <= 1e-12);
    }
}
