//! Bend rounding algorithms.
//!
//! A rounding algorithm replaces every interior corner of a [`Polyline`] with a
//! discretized bend of a given radius. The straight length a bend consumes on either
//! side of its corner is linear in the radius, which the routing code relies on.

use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};

use crate::polyline::Polyline;
use crate::{Point, EPSILON};

/// Default arc discretization step in degrees.
pub const DEFAULT_ANGLE_STEP: f64 = 1.0;

/// Turns at or beyond this magnitude (degrees) cannot be rounded at a single vertex.
pub const MAX_ROUNDABLE_TURN: f64 = 179.999;

/// Turns below this magnitude (degrees) are treated as straight.
const MIN_TURN: f64 = 1e-9;

/// Sub-intervals of Simpson integration per emitted point.
const SIMPSON_STEPS: usize = 8;

/// A bend produced by rounding a corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BendSpan {
    /// Index of the first point of the bend in the rounded polyline.
    pub start: usize,
    /// Index of the last point of the bend in the rounded polyline.
    pub end: usize,
    /// Signed turn angle in degrees; positive is counter-clockwise.
    pub turn: f64,
    /// The sharp corner the bend replaces.
    pub corner: Point,
}

/// A rounded polyline together with the location of each bend.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundedPolyline {
    pub polyline: Polyline,
    pub bends: Vec<BendSpan>,
}

/// Common rounding operations, dispatched from [`Rounding`] to its variants.
#[enum_dispatch]
pub trait RoundingAlgorithm {
    /// Samples a single left-turning bend of `turn` degrees (positive) and radius `radius`,
    /// starting at the origin and heading along the positive x-axis.
    fn bend_profile(&self, turn: f64, radius: f64) -> Vec<Point>;

    /// Rounds each interior corner of `shape`, reporting where every bend landed.
    fn round_with_bends(&self, shape: &Polyline, radius: f64) -> RoundedPolyline {
        round_corners(self, shape, radius)
    }

    /// Rounds each interior corner of `shape`.
    fn round(&self, shape: &Polyline, radius: f64) -> Polyline {
        self.round_with_bends(shape, radius).polyline
    }
}

/// Circular arcs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CircularRounding {
    pub angle_step: f64,
}

impl Default for CircularRounding {
    fn default() -> Self {
        Self {
            angle_step: DEFAULT_ANGLE_STEP,
        }
    }
}

/// Circular arcs entered and left through linear-curvature transitions.
///
/// Each transition sweeps `adiabatic_angle` degrees while its curvature ramps between
/// zero and `1/radius`. An adiabatic angle of zero degenerates to [`CircularRounding`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdiabaticSpline {
    pub adiabatic_angle: f64,
    pub angle_step: f64,
}

impl AdiabaticSpline {
    pub fn new(adiabatic_angle: f64) -> Self {
        Self {
            adiabatic_angle,
            angle_step: DEFAULT_ANGLE_STEP,
        }
    }
}

/// The available rounding algorithms.
#[enum_dispatch(RoundingAlgorithm)]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Rounding {
    Circular(CircularRounding),
    AdiabaticSpline(AdiabaticSpline),
}

impl Rounding {
    /// Circular rounding for zero adiabatic angle, spline blending otherwise.
    pub fn from_adiabatic_angle(adiabatic_angle: f64) -> Self {
        if adiabatic_angle > 0. {
            Self::AdiabaticSpline(AdiabaticSpline::new(adiabatic_angle))
        } else {
            Self::Circular(CircularRounding::default())
        }
    }
}

impl Default for Rounding {
    fn default() -> Self {
        Self::Circular(CircularRounding::default())
    }
}

impl RoundingAlgorithm for CircularRounding {
    fn bend_profile(&self, turn: f64, radius: f64) -> Vec<Point> {
        let steps = step_count(turn, self.angle_step);
        let theta = turn.to_radians();
        (0..=steps)
            .map(|k| {
                let phi = theta * k as f64 / steps as f64;
                Point::new(radius * phi.sin(), radius * (1. - phi.cos()))
            })
            .collect()
    }
}

impl RoundingAlgorithm for AdiabaticSpline {
    fn bend_profile(&self, turn: f64, radius: f64) -> Vec<Point> {
        let alpha = self.adiabatic_angle.clamp(0., turn / 2.);
        if alpha <= 0. {
            return CircularRounding {
                angle_step: self.angle_step,
            }
            .bend_profile(turn, radius);
        }
        let theta = turn.to_radians();
        let a = alpha.to_radians();
        let lt = 2. * a * radius;
        let lc = (theta - 2. * a) * radius;
        let total = 2. * lt + lc;

        let heading = |s: f64| -> f64 {
            if s <= lt {
                s * s / (2. * lt * radius)
            } else if s <= lt + lc {
                a + (s - lt) / radius
            } else {
                let r = total - s;
                theta - r * r / (2. * lt * radius)
            }
        };

        let steps = step_count(turn, self.angle_step) + 2 * step_count(alpha, self.angle_step);
        let ds = total / steps as f64;
        let mut points = Vec::with_capacity(steps + 1);
        let mut pos = Point::zero();
        points.push(pos);
        for k in 0..steps {
            let s0 = k as f64 * ds;
            pos += simpson(&heading, s0, s0 + ds);
            points.push(pos);
        }
        points
    }
}

/// Number of arc segments used to discretize `angle` degrees.
fn step_count(angle: f64, step: f64) -> usize {
    let step = if step > 0. { step } else { DEFAULT_ANGLE_STEP };
    ((angle / step).ceil() as usize).max(1)
}

/// Integrates the unit tangent over `[s0, s1]`.
fn simpson(heading: &impl Fn(f64) -> f64, s0: f64, s1: f64) -> Point {
    let n = SIMPSON_STEPS;
    let h = (s1 - s0) / n as f64;
    let mut acc = Point::zero();
    for i in 0..=n {
        let w = if i == 0 || i == n {
            1.
        } else if i % 2 == 1 {
            4.
        } else {
            2.
        };
        let phi = heading(s0 + i as f64 * h);
        acc += Point::new(phi.cos(), phi.sin()) * w;
    }
    acc * (h / 3.)
}

/// Tangent length of a sampled bend: the distance from its start to the corner it replaces.
fn tangent_length(profile: &[Point], turn: f64) -> f64 {
    let end = profile.last().copied().unwrap_or_default();
    let (sin, cos) = turn.to_radians().sin_cos();
    // The corner lies on the x-axis at distance l; the end sits l further along the exit heading.
    let l2 = end.y / sin;
    end.x - l2 * cos
}

fn push_dedup(points: &mut Vec<Point>, p: Point) {
    if points.last().map_or(true, |q| !q.approx_eq(p, EPSILON)) {
        points.push(p);
    }
}

fn round_corners<R>(algo: &R, shape: &Polyline, radius: f64) -> RoundedPolyline
where
    R: RoundingAlgorithm + ?Sized,
{
    let pts = shape.remove_identicals().points;
    if pts.len() < 3 || radius <= 0. || !radius.is_finite() {
        return RoundedPolyline {
            polyline: Polyline::new(pts),
            bends: Vec::new(),
        };
    }

    let mut points = vec![pts[0]];
    let mut bends = Vec::new();
    for i in 1..pts.len() - 1 {
        let h_in = pts[i - 1].angle_to(pts[i]);
        let h_out = pts[i].angle_to(pts[i + 1]);
        let turn = crate::orientation::angle_diff(h_in, h_out);
        let mag = turn.abs();
        // U-turns at a single vertex stay sharp; callers split them into two bends.
        if !(MIN_TURN..MAX_ROUNDABLE_TURN).contains(&mag) {
            push_dedup(&mut points, pts[i]);
            continue;
        }

        let profile = algo.bend_profile(mag, radius);
        let l = tangent_length(&profile, mag);
        let sign = turn.signum();
        let placed: Vec<Point> = profile
            .iter()
            .map(|p| pts[i] + Point::new(p.x - l, sign * p.y).rotated(h_in, Point::zero()))
            .collect();
        // A bend starting where the previous one ended shares that point.
        let start = match (points.last(), placed.first()) {
            (Some(q), Some(p)) if q.approx_eq(*p, EPSILON) => points.len() - 1,
            _ => points.len(),
        };
        for p in placed {
            push_dedup(&mut points, p);
        }
        bends.push(BendSpan {
            start: start.min(points.len() - 1),
            end: points.len() - 1,
            turn,
            corner: pts[i],
        });
    }
    push_dedup(&mut points, pts[pts.len() - 1]);

    RoundedPolyline {
        polyline: Polyline::new(points),
        bends,
    }
}

/// Returns the straight lengths `(after, before)` consumed by a bend of `angle` degrees,
/// measured from the corner to the end and to the start of the bend respectively.
///
/// Builds the three-point shape `(-100R, 0), (0, 0), 100R*(cos a, sin a)`, rounds it and
/// measures the distance of the second-to-last and second points from the corner.
pub fn get_bend_size(algo: &impl RoundingAlgorithm, bend_radius: f64, angle: f64) -> (f64, f64) {
    if angle.abs() < MIN_TURN || bend_radius <= 0. || !bend_radius.is_finite() {
        return (0., 0.);
    }
    let far = 100. * bend_radius;
    let shape = Polyline::new(vec![
        Point::new(-far, 0.),
        Point::zero(),
        Point::zero().move_polar(far, angle),
    ]);
    let s = algo.round(&shape, bend_radius).points;
    if s.len() < 3 {
        return (0., 0.);
    }
    (s[s.len() - 2].norm(), s[1].norm())
}

/// Probe radius used by [`get_max_bend_radius`].
pub const PROBE_RADIUS: f64 = 100.;

/// The largest bend radius that fits a bend of `angle` degrees into straight length `dist`.
///
/// Scales a reference computation at [`PROBE_RADIUS`] linearly and keeps a 1% margin.
/// Returns `f64::INFINITY` when the bend consumes no length, i.e. for a straight.
pub fn get_max_bend_radius(algo: &impl RoundingAlgorithm, dist: f64, angle: f64) -> f64 {
    let (a, b) = get_bend_size(algo, PROBE_RADIUS, angle);
    let coef = a.min(b) / PROBE_RADIUS;
    if coef <= 0. {
        return f64::INFINITY;
    }
    dist / coef * 0.99
}

#[cfg(test)]
mod tests {
    use float_eq::assert_float_eq;

    use super::*;

    #[test]
    fn circular_bend_size_is_radius_for_right_angle() {
        let algo = Rounding::default();
        let (a, b) = get_bend_size(&algo, 10., 90.);
        assert_float_eq!(a, 10., abs <= 1e-9);
        assert_float_eq!(b, 10., abs <= 1e-9);
    }

    #[test]
    fn bend_size_of_zero_turn_is_zero() {
        let algo = Rounding::default();
        assert_eq!(get_bend_size(&algo, 10., 0.), (0., 0.));
        assert!(get_max_bend_radius(&algo, 10., 0.).is_infinite());
    }

    #[test]
    fn bend_size_is_linear_in_radius() {
        let algo = Rounding::from_adiabatic_angle(15.);
        let (a1, _) = get_bend_size(&algo, 10., 60.);
        let (a2, _) = get_bend_size(&algo, 20., 60.);
        assert_float_eq!(a2, 2. * a1, rmax <= 1e-6);
    }

    #[test]
    fn adiabatic_bends_are_larger_than_circular() {
        let circ = get_bend_size(&Rounding::default(), 10., 90.).0;
        let adia = get_bend_size(&Rounding::from_adiabatic_angle(30.), 10., 90.).0;
        assert!(adia > circ);
    }

    #[test]
    fn max_bend_radius_inverts_bend_size() {
        let algo = Rounding::default();
        let r = get_max_bend_radius(&algo, 50., 90.);
        assert_float_eq!(r, 49.5, abs <= 1e-6);
    }

    #[test]
    fn adiabatic_profile_ends_at_turn_heading() {
        let algo = AdiabaticSpline::new(20.);
        let profile = algo.bend_profile(90., 5.);
        let n = profile.len();
        let heading = profile[n - 2].angle_to(profile[n - 1]);
        assert_float_eq!(heading, 90., abs <= 0.5);
    }

    #[test]
    fn rounded_ell_keeps_endpoints_and_reports_bend() {
        let shape = Polyline::new(vec![
            Point::new(0., 0.),
            Point::new(20., 0.),
            Point::new(20., 20.),
        ]);
        let rounded = Rounding::default().round_with_bends(&shape, 5.);
        let pts = &rounded.polyline.points;
        assert_eq!(pts[0], Point::new(0., 0.));
        assert!(pts[pts.len() - 1].approx_eq(Point::new(20., 20.), 1e-9));
        assert_eq!(rounded.bends.len(), 1);
        let bend = rounded.bends[0];
        assert!(pts[bend.start].approx_eq(Point::new(15., 0.), 1e-9));
        assert!(pts[bend.end].approx_eq(Point::new(20., 5.), 1e-9));
        assert_float_eq!(bend.turn, 90., abs <= 1e-9);
    }

    #[test]
    fn bend_at_route_start_begins_at_first_point() {
        let shape = Polyline::new(vec![
            Point::new(0., 0.),
            Point::new(10., 0.),
            Point::new(10., 50.),
        ]);
        let rounded = Rounding::default().round_with_bends(&shape, 10.);
        assert_eq!(rounded.bends[0].start, 0);
    }

    #[test]
    fn abutting_bends_share_a_point() {
        let shape = Polyline::new(vec![
            Point::new(0., 0.),
            Point::new(50., 0.),
            Point::new(50., 40.),
            Point::new(100., 40.),
        ]);
        let rounded = Rounding::default().round_with_bends(&shape, 20.);
        let pts = &rounded.polyline.points;
        let [first, second] = [rounded.bends[0], rounded.bends[1]];
        assert!(pts[first.start].approx_eq(Point::new(30., 0.), 1e-9));
        assert_eq!(second.start, first.end);
        assert!(pts[second.start].approx_eq(Point::new(50., 20.), 1e-9));
        assert!(pts[second.end].approx_eq(Point::new(70., 40.), 1e-9));
    }
}
