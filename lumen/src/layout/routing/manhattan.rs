//! Axis-aligned routing through optional control points.
//!
//! The route is split into legs: start port to the first control point, between
//! consecutive control points, and from the last control point to the end port.
//! Each leg is a run of up to [`MAX_LEG_SEGMENTS`] alternating horizontal and
//! vertical segments whose corners sit on a small set of candidate levels.
//! Legs are combined in order of preference, fewest segments first and then
//! shortest, and the first combination whose segments leave room for every
//! bend is returned.

use derive_builder::Builder;
use itertools::Itertools;
use lumengeom::orientation::wrap_angle;
use lumengeom::polyline::Polyline;
use lumengeom::round::{get_bend_size, Rounding};
use lumengeom::{Point, EPSILON};
use serde::{Deserialize, Serialize};

use super::error::{Result, RouteError};
use crate::layout::port::Port;
use crate::log::trace;

pub const MAX_LEG_SEGMENTS: usize = 5;

/// Candidate routes kept per leg.
const MAX_LEG_CANDIDATES: usize = 64;

/// Leg combinations evaluated before giving up.
const SEARCH_BUDGET: usize = 20_000;

/// Tolerance in degrees for recognizing axis-aligned port angles.
const ANGLE_TOLERANCE: f64 = 1e-6;

/// Parameters of a Manhattan route.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Builder)]
#[serde(default)]
pub struct ManhattanParams {
    /// Bend radius; the technology default is used if omitted.
    #[builder(default, setter(strip_option))]
    pub bend_radius: Option<f64>,
    /// Points the route must pass through, in order.
    #[builder(default, setter(into))]
    pub control_points: Vec<Point>,
    /// Adiabatic angle of the bends; zero gives circular bends.
    #[builder(default)]
    pub adiabatic_angle: f64,
    /// Straight length required after the start port, before the first bend.
    #[builder(default)]
    pub start_straight: f64,
    /// Straight length required before the end port, after the last bend.
    #[builder(default)]
    pub end_straight: f64,
    /// Straight length required between consecutive bends.
    #[builder(default)]
    pub min_straight: f64,
}

impl ManhattanParams {
    #[inline]
    pub fn builder() -> ManhattanParamsBuilder {
        ManhattanParamsBuilder::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dir {
    East,
    North,
    West,
    South,
}

impl Dir {
    fn from_angle(angle: f64) -> Result<Self> {
        let a = wrap_angle(angle);
        let k = (a / 90.).round();
        if (a - 90. * k).abs() > ANGLE_TOLERANCE {
            return Err(RouteError::NonManhattanAngle(angle));
        }
        Ok(match k as i64 % 4 {
            0 => Self::East,
            1 => Self::North,
            2 => Self::West,
            _ => Self::South,
        })
    }

    /// Direction of an axis-aligned segment, or `None` for zero-length segments.
    fn of(from: Point, to: Point) -> Option<Self> {
        let d = to - from;
        if d.x.abs() > EPSILON {
            Some(if d.x > 0. { Self::East } else { Self::West })
        } else if d.y.abs() > EPSILON {
            Some(if d.y > 0. { Self::North } else { Self::South })
        } else {
            None
        }
    }

    fn opposite(self) -> Self {
        match self {
            Self::East => Self::West,
            Self::North => Self::South,
            Self::West => Self::East,
            Self::South => Self::North,
        }
    }

    fn is_horizontal(self) -> bool {
        matches!(self, Self::East | Self::West)
    }
}

/// Straight lengths the finished route must provide.
#[derive(Debug, Clone, Copy)]
struct Requirements {
    bend_size: f64,
    start_straight: f64,
    end_straight: f64,
    min_straight: f64,
}

impl Requirements {
    /// The length segment `i` of an `n`-segment route needs.
    fn segment(&self, i: usize, n: usize) -> f64 {
        let head = if i == 0 {
            self.start_straight
        } else {
            self.bend_size
        };
        let tail = if i + 1 == n {
            self.end_straight
        } else {
            self.bend_size
        };
        let interior = if i > 0 && i + 1 < n {
            self.min_straight
        } else {
            0.
        };
        head + tail + interior
    }

    fn interior(&self) -> f64 {
        2. * self.bend_size + self.min_straight
    }

    /// Returns the first segment that is too short.
    fn check(&self, route: &Polyline) -> Option<RouteError> {
        let dists = route.distances();
        let n = dists.len();
        dists.iter().enumerate().find_map(|(i, &available)| {
            let required = self.segment(i, n);
            (available + EPSILON < required).then_some(RouteError::Infeasible {
                segment: i,
                required,
                available,
            })
        })
    }
}

/// One leg of the route, between two consecutive waypoints.
#[derive(Debug, Clone, Copy)]
struct Leg {
    from: Point,
    to: Point,
    /// Required direction of the first segment.
    first: Option<Dir>,
    /// Required direction of the last segment.
    last: Option<Dir>,
    /// Minimum length of the first segment.
    first_min: f64,
    /// Minimum length of the last segment.
    last_min: f64,
}

impl Leg {
    fn levels(&self, horizontal: bool, req: &Requirements) -> Vec<f64> {
        let (p, q) = if horizontal {
            (self.from.x, self.to.x)
        } else {
            (self.from.y, self.to.y)
        };
        let a = self.first_min.max(req.bend_size);
        let c = self.last_min.max(req.bend_size);
        let li = req.interior();
        let mut levels = vec![
            (p + q) / 2.,
            p + a,
            p - a,
            p + li,
            p - li,
            q + c,
            q - c,
            q + li,
            q - li,
        ];
        // Keeps the first occurrence so that ties prefer the midpoint.
        let mut out: Vec<f64> = Vec::with_capacity(levels.len());
        for level in levels.drain(..) {
            if out.iter().all(|l| (l - level).abs() > EPSILON) {
                out.push(level);
            }
        }
        out
    }

    /// All valid alternating routes for this leg, most preferred first.
    fn candidates(&self, req: &Requirements) -> Vec<Vec<Point>> {
        let mut out: Vec<(usize, f64, Vec<Point>)> = Vec::new();
        let levels = [self.levels(true, req), self.levels(false, req)];
        for horizontal_first in [true, false] {
            for k in 1..=MAX_LEG_SEGMENTS {
                // Whether segment `j` runs horizontally.
                let axis = |j: usize| horizontal_first == (j % 2 == 0);
                let free: Vec<&[f64]> = (0..k.saturating_sub(2))
                    .map(|j| levels[if axis(j) { 0 } else { 1 }].as_slice())
                    .collect();
                for choice in level_choices(&free) {
                    let mut points = vec![self.from];
                    let mut cur = self.from;
                    for j in 0..k {
                        let target = if j + 2 >= k {
                            if axis(j) {
                                self.to.x
                            } else {
                                self.to.y
                            }
                        } else {
                            choice[j]
                        };
                        cur = if axis(j) {
                            Point::new(target, cur.y)
                        } else {
                            Point::new(cur.x, target)
                        };
                        points.push(cur);
                    }
                    if !cur.approx_eq(self.to, EPSILON) {
                        continue;
                    }
                    if let Some(last) = points.last_mut() {
                        *last = self.to;
                    }
                    if let Some(length) = self.validate(&points, req) {
                        out.push((k, length, points));
                    }
                }
            }
        }
        out.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.total_cmp(&b.1)));
        out.dedup_by(|a, b| {
            a.2.len() == b.2.len() && a.2.iter().zip(&b.2).all(|(p, q)| p.approx_eq(*q, EPSILON))
        });
        out.truncate(MAX_LEG_CANDIDATES);
        out.into_iter().map(|(_, _, points)| points).collect()
    }

    /// Returns the length of `points` if it is a valid route for this leg.
    fn validate(&self, points: &[Point], req: &Requirements) -> Option<f64> {
        let n = points.len() - 1;
        let mut length = 0.;
        let mut prev: Option<Dir> = None;
        for (j, (a, b)) in points.iter().tuple_windows().enumerate() {
            let dir = Dir::of(*a, *b)?;
            if let Some(prev) = prev {
                if prev.is_horizontal() == dir.is_horizontal() {
                    return None;
                }
            }
            let d = a.distance(*b);
            if j == 0 && self.first.map_or(false, |f| f != dir) {
                return None;
            }
            if j + 1 == n && self.last.map_or(false, |l| l != dir) {
                return None;
            }
            let min = if n == 1 {
                0.
            } else if j == 0 {
                self.first_min
            } else if j + 1 == n {
                self.last_min
            } else {
                req.interior()
            };
            if d + EPSILON < min {
                return None;
            }
            prev = Some(dir);
            length += d;
        }
        Some(length)
    }
}

/// Every combination of one level from each list.
fn level_choices(lists: &[&[f64]]) -> Vec<Vec<f64>> {
    if lists.is_empty() {
        return vec![Vec::new()];
    }
    lists
        .iter()
        .map(|l| l.iter().copied())
        .multi_cartesian_product()
        .collect()
}

struct Search<'a> {
    legs: &'a [Vec<Vec<Point>>],
    req: Requirements,
    budget: usize,
    first_failure: Option<RouteError>,
}

impl Search<'_> {
    fn run(&mut self, idx: usize, prev: Option<Dir>, acc: &mut Vec<Point>) -> Option<Polyline> {
        if idx == self.legs.len() {
            self.budget = self.budget.saturating_sub(1);
            let route = Polyline::new(acc.clone()).remove_straight_angles();
            return match self.req.check(&route) {
                None => Some(route),
                Some(err) => {
                    self.first_failure.get_or_insert(err);
                    None
                }
            };
        }
        for cand in self.legs[idx].iter() {
            if self.budget == 0 {
                return None;
            }
            let first = Dir::of(cand[0], cand[1]);
            if let (Some(prev), Some(first)) = (prev, first) {
                if first == prev.opposite() {
                    continue;
                }
            }
            let mark = acc.len();
            acc.extend_from_slice(&cand[1..]);
            let last = Dir::of(cand[cand.len() - 2], cand[cand.len() - 1]);
            if let Some(route) = self.run(idx + 1, last, acc) {
                return Some(route);
            }
            acc.truncate(mark);
        }
        None
    }
}

/// Routes an axis-aligned corner polyline from `start` to `end`.
///
/// The route leaves `start` along its angle and enters `end` against its angle.
/// Every interior corner turns by exactly 90 degrees and every segment leaves
/// room for the bends at its ends, as sized by `rounding` at `bend_radius`.
pub fn route_manhattan(
    start: &Port,
    end: &Port,
    params: &ManhattanParams,
    bend_radius: f64,
    rounding: &Rounding,
) -> Result<Polyline> {
    let start_dir = Dir::from_angle(start.angle())?;
    let end_dir = Dir::from_angle(end.angle() + 180.)?;
    let (a, b) = get_bend_size(rounding, bend_radius, 90.);
    let req = Requirements {
        bend_size: a.max(b),
        start_straight: params.start_straight,
        end_straight: params.end_straight,
        min_straight: params.min_straight,
    };

    let waypoints: Vec<Point> = std::iter::once(start.position())
        .chain(params.control_points.iter().copied())
        .chain(std::iter::once(end.position()))
        .collect();
    let n_legs = waypoints.len() - 1;
    let legs: Vec<Vec<Vec<Point>>> = waypoints
        .iter()
        .tuple_windows()
        .enumerate()
        .map(|(i, (from, to))| {
            let first_leg = i == 0;
            let last_leg = i + 1 == n_legs;
            Leg {
                from: *from,
                to: *to,
                first: first_leg.then_some(start_dir),
                last: last_leg.then_some(end_dir),
                first_min: if first_leg {
                    req.start_straight + req.bend_size
                } else {
                    0.
                },
                last_min: if last_leg {
                    req.end_straight + req.bend_size
                } else {
                    0.
                },
            }
            .candidates(&req)
        })
        .collect();

    if let Some(i) = legs.iter().position(|c| c.is_empty()) {
        return Err(RouteError::Degenerate(format!(
            "no axis-aligned route from {} to {}",
            waypoints[i],
            waypoints[i + 1]
        )));
    }

    let mut search = Search {
        legs: &legs,
        req,
        budget: SEARCH_BUDGET,
        first_failure: None,
    };
    let mut acc = vec![start.position()];
    match search.run(0, None, &mut acc) {
        Some(route) => {
            trace!(
                "manhattan route from {} to {} with {} corners",
                start.position(),
                end.position(),
                route.len().saturating_sub(2)
            );
            Ok(route)
        }
        None => Err(search.first_failure.unwrap_or_else(|| {
            RouteError::Degenerate(format!(
                "no axis-aligned route from {} to {}",
                start.position(),
                end.position()
            ))
        })),
    }
}
