//! Splitting routed waveguides around waveguide crossings.
//!
//! A crossing placed on a waveguide's centerline replaces the part of the
//! waveguide between its two facing ports. The waveguide is cut at those ports
//! and each remaining piece becomes its own cell.

use std::sync::Arc;

use indexmap::IndexMap;
use itertools::Itertools;
use lumengeom::line::{collinear, segment_intersection};
use lumengeom::polyline::Polyline;
use lumengeom::{Point, EPSILON};

use super::waveguide::{Centerline, Waveguide};
use crate::data::LumenCtx;
use crate::deps::arcstr::ArcStr;
use crate::error::{ErrorSource, Result};
use crate::layout::cell::{Cell, Instance};
use crate::log::warn;

/// Port pairs of a crossing, each pair facing each other across one arm.
pub const CROSSING_ARMS: [(&str, &str); 2] = [("in1", "out1"), ("in2", "out2")];

/// The pieces of a centerline left after removing the crossings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CutResult {
    pub segments: Vec<Polyline>,
    /// Ports of crossings that only partly lie on the centerline.
    pub error_points: Vec<Point>,
}

/// Cuts `line` at every port pair lying on one of its segments.
///
/// The part of a segment between the two points of a pair is removed. A pair
/// with only one point on a segment cannot be connected to; both of its points
/// are reported in [`CutResult::error_points`].
pub fn cut_polyline(line: &Polyline, pairs: &[(Point, Point)]) -> CutResult {
    let mut result = CutResult::default();
    let mut used = vec![false; pairs.len()];
    let mut current: Vec<Point> = Vec::new();

    for (a, b) in line.points.iter().copied().tuple_windows() {
        current.push(a);

        let mut on_segment = Vec::new();
        for (i, (p, q)) in pairs.iter().copied().enumerate() {
            if used[i] {
                continue;
            }
            match (collinear(a, b, p), collinear(a, b, q)) {
                (true, true) => {
                    used[i] = true;
                    let (near, far) = if a.distance(p) <= a.distance(q) {
                        (p, q)
                    } else {
                        (q, p)
                    };
                    on_segment.push((near, far));
                }
                (true, false) | (false, true) => {
                    warn!(
                        "there is a crossing between {p} and {q} that cannot be connected to; \
                         there is likely not enough space"
                    );
                    result.error_points.extend([p, q]);
                }
                (false, false) => {}
            }
        }
        on_segment.sort_by(|x, y| a.distance(x.0).total_cmp(&a.distance(y.0)));

        for (near, far) in on_segment {
            current.push(near);
            result.segments.push(Polyline::new(std::mem::take(&mut current)));
            current.push(far);
        }
    }
    if let Some(last) = line.last() {
        current.push(last);
    }
    result.segments.push(Polyline::new(current));

    result.segments = result
        .segments
        .into_iter()
        .map(|s| s.remove_identicals())
        .filter(|s| s.len() >= 2 && s.length() > EPSILON)
        .collect();
    result
}

/// All points where two different centerlines intersect.
pub fn crossing_points(lines: &[Polyline]) -> Vec<Point> {
    let mut out = Vec::new();
    for (l1, l2) in lines.iter().tuple_combinations() {
        for (a0, a1) in l1.points.iter().copied().tuple_windows() {
            for (b0, b1) in l2.points.iter().copied().tuple_windows() {
                if let Some(p) = segment_intersection(a0, a1, b0, b1) {
                    out.push(p);
                }
            }
        }
    }
    out
}

/// The port pairs of every arm of the given crossing instances.
pub fn crossing_port_pairs(crossings: &[Instance]) -> Result<Vec<(Point, Point)>> {
    let mut pairs = Vec::with_capacity(2 * crossings.len());
    for inst in crossings {
        for (p, q) in CROSSING_ARMS {
            pairs.push((inst.port(p)?.position(), inst.port(q)?.position()));
        }
    }
    Ok(pairs)
}

/// A waveguide split around crossings.
#[derive(Debug, Clone, Default)]
pub struct SplitWaveguide {
    /// One cell per remaining piece, keyed by cell name.
    pub segments: IndexMap<ArcStr, Arc<Cell>>,
    pub error_points: Vec<Point>,
}

/// Splits the waveguide drawn in `original` around `crossings`.
///
/// The pieces are named `{name}_SEG_{n}` after the original cell and drawn
/// with its trace template.
pub fn split_waveguide(
    ctx: &LumenCtx,
    original: &Cell,
    crossings: &[Instance],
) -> Result<SplitWaveguide> {
    let centerline = original.get_metadata::<Centerline>().ok_or_else(|| {
        ErrorSource::InvalidArgs(format!(
            "cell {} does not record the centerline of a waveguide",
            original.name()
        ))
    })?;
    let pairs = crossing_port_pairs(crossings)?;
    let cut = cut_polyline(&centerline.points, &pairs);

    let mut segments = IndexMap::new();
    for (cnt, segment) in cut.segments.into_iter().enumerate() {
        let name = arcstr::format!("{}_SEG_{}", original.name(), cnt);
        let cell = Waveguide::new(segment, centerline.template.clone()).build(ctx, &name)?;
        segments.insert(name, cell);
    }
    if segments.is_empty() {
        warn!("splitting {} left no waveguide segments", original.name());
    }
    Ok(SplitWaveguide {
        segments,
        error_points: cut.error_points,
    })
}
