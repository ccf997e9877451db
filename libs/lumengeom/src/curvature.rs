//! Curvature of sampled centerlines.
//!
//! The centerline is interpolated with a natural cubic spline in each coordinate,
//! parameterized by cumulative chord length.

use crate::polyline::Polyline;
use crate::{Point, EPSILON};

/// Curvature magnitude at every point of `shape`.
///
/// Shapes with fewer than three distinct points have zero curvature everywhere.
/// Coincident consecutive points share the curvature of their first occurrence.
pub fn curvature(shape: &Polyline) -> Vec<f64> {
    let n = shape.points.len();
    let (distinct, index) = dedup_with_index(&shape.points);
    if distinct.len() < 3 {
        return vec![0.; n];
    }

    let mut t = Vec::with_capacity(distinct.len());
    t.push(0.);
    for w in distinct.windows(2) {
        t.push(t[t.len() - 1] + w[0].distance(w[1]));
    }

    let xs: Vec<f64> = distinct.iter().map(|p| p.x).collect();
    let ys: Vec<f64> = distinct.iter().map(|p| p.y).collect();
    let (dx, ddx) = spline_derivatives(&t, &xs);
    let (dy, ddy) = spline_derivatives(&t, &ys);

    let kappa: Vec<f64> = (0..distinct.len())
        .map(|i| {
            let speed2 = dx[i] * dx[i] + dy[i] * dy[i];
            if speed2 <= 0. {
                return 0.;
            }
            (dx[i] * ddy[i] - ddx[i] * dy[i]).abs() / speed2.powf(1.5)
        })
        .collect();

    index.into_iter().map(|i| kappa[i]).collect()
}

/// Maximum curvature along `shape`, or zero for straight or degenerate shapes.
pub fn max_curvature(shape: &Polyline) -> f64 {
    curvature(shape).into_iter().fold(0., f64::max)
}

fn dedup_with_index(points: &[Point]) -> (Vec<Point>, Vec<usize>) {
    let mut distinct: Vec<Point> = Vec::with_capacity(points.len());
    let mut index = Vec::with_capacity(points.len());
    for p in points {
        if distinct.last().map_or(true, |q| !q.approx_eq(*p, EPSILON)) {
            distinct.push(*p);
        }
        index.push(distinct.len() - 1);
    }
    (distinct, index)
}

/// First and second derivatives at the knots of the natural cubic spline through `(t, v)`.
///
/// `t` must be strictly increasing with at least three knots.
fn spline_derivatives(t: &[f64], v: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let n = t.len();
    let h: Vec<f64> = t.windows(2).map(|w| w[1] - w[0]).collect();

    // Second derivatives `m` solve a tridiagonal system with m[0] = m[n-1] = 0.
    let mut m = vec![0.; n];
    let inner = n - 2;
    let mut diag = vec![0.; inner];
    let mut rhs = vec![0.; inner];
    for k in 0..inner {
        let i = k + 1;
        diag[k] = 2. * (h[i - 1] + h[i]);
        rhs[k] = 6. * ((v[i + 1] - v[i]) / h[i] - (v[i] - v[i - 1]) / h[i - 1]);
    }
    // Thomas algorithm; the off-diagonals are `h[i]`.
    for k in 1..inner {
        let w = h[k] / diag[k - 1];
        diag[k] -= w * h[k];
        rhs[k] -= w * rhs[k - 1];
    }
    for k in (0..inner).rev() {
        let upper = if k + 1 < inner { h[k + 1] * m[k + 2] } else { 0. };
        m[k + 1] = (rhs[k] - upper) / diag[k];
    }

    let mut d1 = vec![0.; n];
    for i in 0..n - 1 {
        d1[i] = (v[i + 1] - v[i]) / h[i] - h[i] * (2. * m[i] + m[i + 1]) / 6.;
    }
    let last = n - 2;
    d1[n - 1] = (v[n - 1] - v[last]) / h[last] + h[last] * (m[last] + 2. * m[n - 1]) / 6.;

    (d1, m)
}

#[cfg(test)]
mod tests {
    use float_eq::assert_float_eq;

    use super::*;
    use crate::round::{Rounding, RoundingAlgorithm};

    #[test]
    fn straight_lines_have_no_curvature() {
        let line = Polyline::new(vec![
            Point::new(0., 0.),
            Point::new(5., 0.),
            Point::new(10., 0.),
        ]);
        assert_eq!(curvature(&line), vec![0., 0., 0.]);
        let short = Polyline::new(vec![Point::new(0., 0.), Point::new(5., 0.)]);
        assert_eq!(curvature(&short), vec![0., 0.]);
    }

    #[test]
    fn circular_arc_has_inverse_radius_curvature() {
        let radius = 10.;
        let arc = Polyline::new(
            (0..=90)
                .map(|k| Point::zero().move_polar(radius, k as f64))
                .collect::<Vec<_>>(),
        );
        let kappa = curvature(&arc);
        // Natural end conditions distort the ends; the interior follows the circle.
        assert_float_eq!(kappa[45], 1. / radius, rmax <= 1e-3);
    }

    #[test]
    fn duplicate_points_keep_output_length() {
        let shape = Polyline::new(vec![
            Point::new(0., 0.),
            Point::new(1., 0.),
            Point::new(1., 0.),
            Point::new(2., 1.),
        ]);
        let kappa = curvature(&shape);
        assert_eq!(kappa.len(), 4);
        assert_eq!(kappa[1], kappa[2]);
    }

    #[test]
    fn rounded_bend_curvature_matches_radius() {
        let shape = Polyline::new(vec![
            Point::new(0., 0.),
            Point::new(50., 0.),
            Point::new(50., 50.),
        ]);
        let rounded = Rounding::default().round_with_bends(&shape, 10.);
        let bend = rounded.bends[0];
        let kappa = curvature(&rounded.polyline);
        assert_float_eq!(kappa[(bend.start + bend.end) / 2], 0.1, rmax <= 1e-2);
        assert!(max_curvature(&rounded.polyline) > 0.);
    }
}
