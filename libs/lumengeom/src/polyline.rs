//! Open polylines: the centerlines of routed elements.

use serde::{Deserialize, Serialize};

use crate::bbox::{Bbox, BoundBox};
use crate::line::Line;
use crate::orientation::{angle_diff, wrap_angle};
use crate::transform::{Transform, Transformation, Translate};
use crate::{GeometryError, Point, EPSILON};

/// An ordered sequence of points describing an open centerline.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline {
    pub points: Vec<Point>,
}

impl Polyline {
    pub fn new(points: impl Into<Vec<Point>>) -> Self {
        Self {
            points: points.into(),
        }
    }

    /// A two-point straight line.
    pub fn straight(start: Point, end: Point) -> Self {
        Self::new(vec![start, end])
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<Point> {
        self.points.first().copied()
    }

    pub fn last(&self) -> Option<Point> {
        self.points.last().copied()
    }

    /// Checks that the polyline has at least `min` points, all finite.
    pub fn validate(&self, min: usize) -> Result<(), GeometryError> {
        if self.points.len() < min {
            return Err(GeometryError::TooFewPoints {
                min,
                got: self.points.len(),
            });
        }
        for (index, point) in self.points.iter().enumerate() {
            if !point.is_finite() {
                return Err(GeometryError::NonFinite {
                    index,
                    point: *point,
                });
            }
        }
        Ok(())
    }

    /// Lengths of each segment; one entry per consecutive point pair.
    pub fn distances(&self) -> Vec<f64> {
        self.points
            .windows(2)
            .map(|w| w[0].distance(w[1]))
            .collect()
    }

    /// Heading of each segment in degrees, in `[0, 360)`.
    pub fn angles_deg(&self) -> Vec<f64> {
        self.points
            .windows(2)
            .map(|w| w[0].angle_to(w[1]))
            .collect()
    }

    /// Signed turn at each interior vertex in degrees, in `(-180, 180]`.
    ///
    /// Positive values turn counter-clockwise.
    pub fn turns_deg(&self) -> Vec<f64> {
        self.angles_deg()
            .windows(2)
            .map(|w| angle_diff(w[0], w[1]))
            .collect()
    }

    /// Total length along the centerline.
    pub fn length(&self) -> f64 {
        self.distances().iter().sum()
    }

    /// Cumulative length at each point, starting at zero.
    pub fn cumulative_lengths(&self) -> Vec<f64> {
        let mut acc = 0.;
        let mut out = Vec::with_capacity(self.points.len());
        out.push(0.);
        for d in self.distances() {
            acc += d;
            out.push(acc);
        }
        out.truncate(self.points.len());
        out
    }

    /// Returns the polyline traversed in the opposite direction.
    pub fn reversed(&self) -> Self {
        let mut points = self.points.clone();
        points.reverse();
        Self { points }
    }

    /// Removes consecutive points closer than [`EPSILON`].
    pub fn remove_identicals(&self) -> Self {
        let mut points: Vec<Point> = Vec::with_capacity(self.points.len());
        for p in self.points.iter() {
            if points.last().map_or(true, |q| !q.approx_eq(*p, EPSILON)) {
                points.push(*p);
            }
        }
        Self { points }
    }

    /// Removes interior vertices at which the centerline does not turn.
    pub fn remove_straight_angles(&self) -> Self {
        let pts = self.remove_identicals().points;
        if pts.len() < 3 {
            return Self { points: pts };
        }
        let mut points = vec![pts[0]];
        for i in 1..pts.len() - 1 {
            let prev = *points.last().unwrap_or(&pts[0]);
            let turn = angle_diff(prev.angle_to(pts[i]), pts[i].angle_to(pts[i + 1]));
            if turn.abs() > 1e-9 {
                points.push(pts[i]);
            }
        }
        points.push(pts[pts.len() - 1]);
        Self { points }
    }

    /// Offsets the polyline laterally by `offset`; positive values move to the left
    /// of the direction of travel.
    ///
    /// Interior vertices are mitered.
    pub fn offset(&self, offset: f64) -> Self {
        let pts = self.remove_identicals().points;
        if pts.len() < 2 || offset == 0. {
            return Self { points: pts };
        }
        let headings: Vec<f64> = pts.windows(2).map(|w| w[0].angle_to(w[1])).collect();
        let mut points = Vec::with_capacity(pts.len());
        points.push(pts[0].move_polar(offset, headings[0] + 90.));
        for i in 1..pts.len() - 1 {
            let (h0, h1) = (headings[i - 1], headings[i]);
            let l0 = Line::from_ray(pts[i].move_polar(offset, h0 + 90.), h0);
            let l1 = Line::from_ray(pts[i].move_polar(offset, h1 + 90.), h1);
            let p = l0
                .intersection(&l1)
                .unwrap_or_else(|| pts[i].move_polar(offset, h0 + 90.));
            points.push(p);
        }
        let h_last = headings[headings.len() - 1];
        points.push(pts[pts.len() - 1].move_polar(offset, h_last + 90.));
        Self { points }
    }

    /// Offsets each point laterally by its own amount, producing a polygon outline
    /// between `left` and `right` offsets.
    ///
    /// `left` and `right` must have one entry per point.
    pub fn outline_variable(&self, left: &[f64], right: &[f64]) -> Vec<Point> {
        let n = self.points.len();
        debug_assert_eq!(left.len(), n);
        debug_assert_eq!(right.len(), n);
        if n < 2 {
            return self.points.clone();
        }
        let headings: Vec<f64> = self.angles_deg();
        let normal = |i: usize| -> f64 {
            let h = if i == 0 {
                headings[0]
            } else if i == n - 1 {
                headings[n - 2]
            } else {
                headings[i - 1] + angle_diff(headings[i - 1], headings[i]) / 2.
            };
            wrap_angle(h + 90.)
        };
        let mut out = Vec::with_capacity(2 * n);
        for i in 0..n {
            out.push(self.points[i].move_polar(left[i], normal(i)));
        }
        for i in (0..n).rev() {
            out.push(self.points[i].move_polar(-right[i], normal(i)));
        }
        out
    }

    /// Appends `other`, skipping its first point if it coincides with our last.
    pub fn extend_with(&mut self, other: &Polyline) {
        let mut iter = other.points.iter().peekable();
        if let (Some(last), Some(first)) = (self.last(), iter.peek()) {
            if last.approx_eq(**first, EPSILON) {
                iter.next();
            }
        }
        self.points.extend(iter);
    }
}

impl From<Vec<Point>> for Polyline {
    fn from(points: Vec<Point>) -> Self {
        Self { points }
    }
}

impl BoundBox for Polyline {
    fn bbox(&self) -> Bbox {
        self.points.bbox()
    }
}

impl Transform for Polyline {
    fn transform(&self, trans: Transformation) -> Self {
        Self {
            points: self.points.iter().map(|p| p.transform(trans)).collect(),
        }
    }
}

impl Translate for Polyline {
    fn translate(&mut self, p: Point) {
        for pt in self.points.iter_mut() {
            pt.translate(p);
        }
    }
}
