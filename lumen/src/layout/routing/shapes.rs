//! Route and shape builders for curved connectors.
//!
//! `route_*` functions return the corner polyline of a route. The other functions
//! round a route and report the curvature of its tightest bend.

use lumengeom::curvature::max_curvature;
use lumengeom::line::{Line, PARALLEL_TOLERANCE};
use lumengeom::orientation::angles_match;
use lumengeom::polyline::Polyline;
use lumengeom::round::{
    get_bend_size, get_max_bend_radius, AdiabaticSpline, CircularRounding, Rounding,
    RoundingAlgorithm,
};
use lumengeom::EPSILON;

use super::error::{Result, RouteError};
use crate::layout::port::Port;
use crate::log::{info, warn};

/// Step used to probe the length of a fixed-radius U-bend.
const UBEND_LENGTH_PROBE: f64 = 0.01;

/// Allowed deviation of a fixed-length U-bend from the requested length.
const UBEND_LENGTH_TOLERANCE: f64 = 0.01;

/// Search interval, in degrees, of the adiabatic angle of fixed-length bends.
const FIXED_LENGTH_ADIABATIC_RANGE: (f64, f64) = (0., 45.);

/// A rounded centerline.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundedShape {
    pub points: Polyline,
    /// Inverse of the bend radius used for rounding; zero for straight lines.
    pub curvature: f64,
}

impl RoundedShape {
    fn straight(start: &Port, end: &Port) -> Self {
        Self {
            points: route_line(start, end),
            curvature: 0.,
        }
    }

    fn rounded(route: &Polyline, rounding: &Rounding, radius: f64) -> Self {
        Self {
            points: rounding.round(route, radius),
            curvature: 1. / radius,
        }
    }

    /// The bend radius, or `None` for straight lines.
    pub fn radius(&self) -> Option<f64> {
        (self.curvature > 0.).then(|| 1. / self.curvature)
    }

    pub fn length(&self) -> f64 {
        self.points.length()
    }
}

/// The rounding algorithm for `adiabatic_angle`, discretizing arcs with `angle_step` degrees.
pub fn rounding(adiabatic_angle: f64, angle_step: f64) -> Rounding {
    if adiabatic_angle > 0. {
        Rounding::AdiabaticSpline(AdiabaticSpline {
            adiabatic_angle,
            angle_step,
        })
    } else {
        Rounding::Circular(CircularRounding { angle_step })
    }
}

pub fn route_line(start: &Port, end: &Port) -> Polyline {
    Polyline::straight(start.position(), end.position())
}

/// Straight out of `start`, straight into `end`, with `bend_radius` long stubs.
pub fn route_sbend(start: &Port, end: &Port, bend_radius: f64) -> Polyline {
    Polyline::new(vec![
        start.position(),
        start.position().move_polar(bend_radius, start.angle()),
        end.position().move_polar(bend_radius, end.angle()),
        end.position(),
    ])
}

/// Projects both ports forward and joins the tips.
///
/// `dists` defaults to half the port distance on either side.
pub fn route_u(start: &Port, end: &Port, dists: Option<[f64; 2]>) -> Polyline {
    let [d1, d2] = dists.unwrap_or_else(|| {
        let half = start.position().distance(end.position()) / 2.;
        [half, half]
    });
    Polyline::new(vec![
        start.position(),
        start.position().move_polar(d1, start.angle()),
        end.position().move_polar(d2, end.angle()),
        end.position(),
    ])
}

/// A single corner where the rays out of both ports intersect.
///
/// Falls back to [`route_line`] when the rays are parallel.
pub fn route_bend(start: &Port, end: &Port) -> Polyline {
    let l1 = Line::from_ray(start.position(), start.angle());
    let l2 = Line::from_ray(end.position(), end.angle());
    match l1.intersection(&l2) {
        Some(corner) => Polyline::new(vec![start.position(), corner, end.position()]),
        None => route_line(start, end),
    }
}

fn ports_det(start: &Port, end: &Port) -> f64 {
    Line::from_ray(start.position(), start.angle()).det(&Line::from_ray(end.position(), end.angle()))
}

pub(crate) fn warn_min_radius(
    kind: &str,
    start: &Port,
    end: &Port,
    shape: &RoundedShape,
    min: Option<f64>,
) {
    if let Some(min) = min {
        // Adiabatic bends are tighter than their nominal radius somewhere along the curve.
        let curvature = shape.curvature.max(max_curvature(&shape.points));
        if 1. / min < curvature {
            warn!(
                "the {kind} between {} and {} has a bend radius of {:.3}, below the minimum of {min}",
                start.position(),
                end.position(),
                1. / curvature
            );
        }
    }
}

/// An S-bend with the largest bend radius that fits between two facing ports.
///
/// Ports on a common axis produce a straight line.
pub fn bezier_sbend_max_radius(
    start: &Port,
    end: &Port,
    rounding: &Rounding,
    min_bend_radius: Option<f64>,
) -> Result<RoundedShape> {
    if !angles_match(end.angle(), start.angle() + 180., 1e-8) {
        return Err(RouteError::AnglesMismatch {
            expected: start.angle() + 180.,
            found: end.angle(),
        });
    }

    let local = end
        .position()
        .rotated(-start.angle(), start.position())
        - start.position();
    let (length, height) = (local.x, local.y.abs());
    if height <= EPSILON {
        return Ok(RoundedShape::straight(start, end));
    }
    if length <= EPSILON {
        return Err(RouteError::NotFacing);
    }

    let theta = 2. * (height / length).atan();
    let d = height / (2. * theta.sin());
    let route = Polyline::new(vec![
        start.position(),
        start.position().move_polar(d, start.angle()),
        end.position().move_polar(d, end.angle()),
        end.position(),
    ]);
    let turn = route.turns_deg()[0];
    let radius = get_max_bend_radius(rounding, d, turn);
    let shape = RoundedShape::rounded(&route, rounding, radius);
    warn_min_radius("S-bend", start, end, &shape, min_bend_radius);
    Ok(shape)
}

/// Route of a single-corner bend and the length available to round its corner.
fn bend_route(start: &Port, end: &Port) -> Option<(Polyline, f64, f64)> {
    if ports_det(start, end).abs() <= PARALLEL_TOLERANCE {
        return None;
    }
    let route = route_bend(start, end);
    let dists = route.distances();
    let dist = dists[0].min(dists[1]);
    let turn = route.turns_deg()[0];
    Some((route, dist, turn))
}

/// A single-corner bend with the largest radius that fits both legs.
pub fn bezier_bend_max_radius(
    start: &Port,
    end: &Port,
    rounding: &Rounding,
    min_bend_radius: Option<f64>,
) -> RoundedShape {
    let Some((route, dist, turn)) = bend_route(start, end) else {
        return RoundedShape::straight(start, end);
    };
    let radius = get_max_bend_radius(rounding, dist, turn);
    let shape = RoundedShape::rounded(&route, rounding, radius);
    warn_min_radius("bend", start, end, &shape, min_bend_radius);
    shape
}

/// A single-corner bend rounded with `bend_radius`.
pub fn bezier_bend_fixed_radius(
    start: &Port,
    end: &Port,
    rounding: &Rounding,
    bend_radius: f64,
) -> RoundedShape {
    let Some((route, dist, turn)) = bend_route(start, end) else {
        return RoundedShape::straight(start, end);
    };
    let max_radius = get_max_bend_radius(rounding, dist, turn);
    if max_radius < bend_radius {
        warn!(
            "the bend between {} and {} fits a bend radius of at most {max_radius:.3}, below the requested {bend_radius}",
            start.position(),
            end.position()
        );
    }
    RoundedShape::rounded(&route, rounding, bend_radius)
}

/// A single-corner bend whose length is tuned to `length` through the adiabatic angle.
///
/// Lengths outside the range reachable with adiabatic angles between 0° and 45°
/// produce a straight line.
pub fn bezier_bend_fixed_length(
    start: &Port,
    end: &Port,
    length: f64,
    angle_step: f64,
) -> RoundedShape {
    let shape_at = |adiabatic_angle: f64| {
        bezier_bend_max_radius(start, end, &rounding(adiabatic_angle, angle_step), None)
    };
    let (lo, hi) = FIXED_LENGTH_ADIABATIC_RANGE;
    let (l0, l1) = (shape_at(lo).length(), shape_at(hi).length());
    let (min_length, max_length) = (l0.min(l1), l0.max(l1));
    if !(min_length..=max_length).contains(&length) {
        warn!(
            "cannot make a bend between {} and {} with length {length}: reachable lengths are [{min_length:.3}, {max_length:.3}]; using a straight",
            start.position(),
            end.position()
        );
        return RoundedShape::straight(start, end);
    }

    let best = golden_section_min(|a| (shape_at(a).length() - length).abs(), lo, hi, 1e-4);
    let shape = shape_at(best);
    info!(
        "bend between {} and {}: requested length {length}, achieved {:.4} with adiabatic angle {best:.3}",
        start.position(),
        end.position(),
        shape.length()
    );
    shape
}

/// Minimizes a unimodal function on `[lo, hi]`.
fn golden_section_min(f: impl Fn(f64) -> f64, mut lo: f64, mut hi: f64, tol: f64) -> f64 {
    let inv_phi = (5f64.sqrt() - 1.) / 2.;
    let mut c = hi - inv_phi * (hi - lo);
    let mut d = lo + inv_phi * (hi - lo);
    let (mut fc, mut fd) = (f(c), f(d));
    while hi - lo > tol {
        if fc < fd {
            hi = d;
            d = c;
            fd = fc;
            c = hi - inv_phi * (hi - lo);
            fc = f(c);
        } else {
            lo = c;
            c = d;
            fc = fd;
            d = lo + inv_phi * (hi - lo);
            fd = f(d);
        }
    }
    (lo + hi) / 2.
}

/// Straight lengths consumed by the two bends of a fixed-radius U-bend.
pub fn ubend_min_bend_sizes(
    start: &Port,
    end: &Port,
    rounding: &Rounding,
    bend_radius: f64,
) -> [f64; 2] {
    let probe = route_u(start, end, Some([1., 1.]));
    let turns = probe.turns_deg();
    let size = |turn: f64| {
        let (a, b) = get_bend_size(rounding, bend_radius, turn.abs());
        a.max(b)
    };
    [size(turns[0]), size(turns[1])]
}

/// The corner route of a fixed-radius U-bend whose legs extend `extra` beyond
/// the minimum bend size.
pub fn route_ubend_fixed_radius(
    start: &Port,
    end: &Port,
    rounding: &Rounding,
    bend_radius: f64,
    extra: f64,
) -> Polyline {
    let min = ubend_min_bend_sizes(start, end, rounding, bend_radius);
    let d = min[0].max(min[1]) + extra;
    let route = route_u(start, end, Some([d, d]));
    if route.distances()[1] < 2. * min[0] {
        warn!(
            "not enough space for a U-bend of radius {bend_radius} between {} and {}; using a straight",
            start.position(),
            end.position()
        );
        return route_line(start, end);
    }
    route
}

pub fn ubend_fixed_radius(
    start: &Port,
    end: &Port,
    rounding: &Rounding,
    bend_radius: f64,
    extra: f64,
) -> RoundedShape {
    let route = route_ubend_fixed_radius(start, end, rounding, bend_radius, extra);
    if route.len() == 2 {
        return RoundedShape {
            points: route,
            curvature: 0.,
        };
    }
    RoundedShape::rounded(&route, rounding, bend_radius)
}

/// A fixed-radius U-bend stretched to a total length of `length`.
///
/// The leg extension is interpolated linearly from two probe lengths. If the
/// result misses `length`, a straight line is returned instead.
pub fn ubend_fixed_radius_fixed_length(
    start: &Port,
    end: &Port,
    rounding: &Rounding,
    bend_radius: f64,
    length: f64,
) -> RoundedShape {
    let l1 = ubend_fixed_radius(start, end, rounding, bend_radius, 0.).length();
    let l2 = ubend_fixed_radius(start, end, rounding, bend_radius, UBEND_LENGTH_PROBE).length();
    let slope = l2 - l1;
    if slope.abs() > EPSILON {
        let extra = UBEND_LENGTH_PROBE * (length - l1) / slope;
        let shape = ubend_fixed_radius(start, end, rounding, bend_radius, extra);
        if (shape.length() - length).abs() <= UBEND_LENGTH_TOLERANCE {
            return shape;
        }
    }
    warn!(
        "cannot make a U-bend between {} and {} with length {length}; using a straight",
        start.position(),
        end.position()
    );
    RoundedShape::straight(start, end)
}

/// A U-bend with the largest radius that fits between two ports facing the same way.
pub fn ubend_max_radius(
    start: &Port,
    end: &Port,
    rounding: &Rounding,
    min_bend_radius: Option<f64>,
) -> Result<RoundedShape> {
    let dist = start.position().distance(end.position());
    if dist <= EPSILON {
        return Err(RouteError::Degenerate(format!(
            "U-bend ports coincide at {}",
            start.position()
        )));
    }
    let route = route_u(start, end, None);
    let radius = get_max_bend_radius(rounding, dist / 2., 90.);
    let shape = RoundedShape::rounded(&route, rounding, radius);
    warn_min_radius("U-bend", start, end, &shape, min_bend_radius);
    Ok(shape)
}

#[cfg(test)]
mod tests {
    use float_eq::assert_float_eq;
    use lumengeom::Point;

    use super::*;
    use crate::layout::trace::TraceTemplate;

    fn port(x: f64, y: f64, angle: f64) -> Port {
        Port::optical("p", (x, y), angle, TraceTemplate::default())
    }

    #[test]
    fn sbend_route_has_radius_stubs() {
        let route = route_sbend(&port(0., 0., 0.), &port(10., 10., 180.), 5.);
        assert_eq!(
            route.points,
            vec![
                Point::new(0., 0.),
                Point::new(5., 0.),
                Point::new(5., 10.),
                Point::new(10., 10.),
            ]
        );
    }

    #[test]
    fn collinear_sbend_is_straight() {
        let start = port(0., 0., 0.);
        let end = port(40., 0., 180.);
        let shape = bezier_sbend_max_radius(&start, &end, &rounding(15., 1.), Some(5.)).unwrap();
        assert_eq!(shape.points.len(), 2);
        assert_eq!(shape.curvature, 0.);
        let bend = bezier_bend_max_radius(&start, &end, &rounding(15., 1.), None);
        assert_eq!(bend.points.len(), 2);
        assert_eq!(bend.curvature, 0.);
    }

    #[test]
    fn sbend_requires_opposite_angles() {
        let err = bezier_sbend_max_radius(
            &port(0., 0., 0.),
            &port(40., 10., 90.),
            &rounding(0., 1.),
            None,
        )
        .expect_err("angles do not match");
        assert!(matches!(err, RouteError::AnglesMismatch { .. }));
    }

    #[test]
    fn sbend_keeps_endpoints() {
        let start = port(0., 0., 0.);
        let end = port(60., 20., 180.);
        let shape = bezier_sbend_max_radius(&start, &end, &rounding(0., 1.), None).unwrap();
        assert_eq!(shape.points.first(), Some(start.position()));
        assert!(shape
            .points
            .last()
            .unwrap()
            .approx_eq(end.position(), 1e-9));
        assert!(shape.curvature > 0.);
    }

    #[test]
    fn right_angle_bend_uses_shorter_leg() {
        let start = port(0., 0., 0.);
        let end = port(30., 20., 270.);
        let shape = bezier_bend_max_radius(&start, &end, &rounding(0., 1.), None);
        assert_float_eq!(shape.radius().unwrap(), 19.8, abs <= 1e-6);
    }

    #[test]
    fn ubend_legs_fit_bend_sizes() {
        let start = port(0., 0., 0.);
        let end = port(0., 50., 0.);
        let algo = rounding(0., 1.);
        let sizes = ubend_min_bend_sizes(&start, &end, &algo, 10.);
        assert_float_eq!(sizes[0], 10., abs <= 1e-9);
        let route = route_ubend_fixed_radius(&start, &end, &algo, 10., 5.);
        assert_eq!(route.points[1], Point::new(15., 0.));
        let tight = route_ubend_fixed_radius(&start, &port(0., 15., 0.), &algo, 10., 0.);
        assert_eq!(tight.len(), 2);
    }

    #[test]
    fn fixed_length_ubend_hits_length() {
        let start = port(0., 0., 0.);
        let end = port(0., 50., 0.);
        let algo = rounding(0., 1.);
        let shape = ubend_fixed_radius_fixed_length(&start, &end, &algo, 10., 150.);
        assert_float_eq!(shape.length(), 150., abs <= UBEND_LENGTH_TOLERANCE);
        let short = ubend_fixed_radius_fixed_length(&start, &end, &algo, 10., 1.);
        assert_eq!(short.points.len(), 2);
    }

    #[test]
    fn fixed_length_bend_hits_reachable_lengths() {
        let start = port(0., 0., 0.);
        let end = port(50., 50., 270.);
        let (lo, hi) = FIXED_LENGTH_ADIABATIC_RANGE;
        let length_at =
            |a: f64| bezier_bend_max_radius(&start, &end, &rounding(a, 1.), None).length();
        let target = (length_at(lo) + length_at(hi)) / 2.;
        let shape = bezier_bend_fixed_length(&start, &end, target, 1.);
        assert_float_eq!(shape.length(), target, abs <= 0.05);
        assert!(shape.curvature > 0.);
        assert_eq!(shape.points.first(), Some(start.position()));
    }

    #[test]
    fn unreachable_fixed_length_bend_is_straight() {
        let start = port(0., 0., 0.);
        let end = port(50., 50., 270.);
        for length in [1e4, 10.] {
            let shape = bezier_bend_fixed_length(&start, &end, length, 1.);
            assert_eq!(shape.points.len(), 2);
            assert_eq!(shape.curvature, 0.);
        }
    }

    #[test]
    fn golden_section_finds_parabola_minimum() {
        let x = golden_section_min(|x| (x - 12.5).powi(2), 0., 45., 1e-6);
        assert_float_eq!(x, 12.5, abs <= 1e-4);
    }
}
