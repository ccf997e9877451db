//! Connectors along axis-aligned routes.

use std::sync::Arc;

use lumengeom::orientation::Orientation;
use lumengeom::polyline::Polyline;
use lumengeom::round::{RoundedPolyline, RoundingAlgorithm};
use lumengeom::transform::{Transform, Transformation};
use lumengeom::{Point, EPSILON};
use serde::{Deserialize, Serialize};

use super::{assemble, prepare, Connect};
use crate::data::LumenCtx;
use crate::layout::cell::{Cell, Instance};
use crate::layout::port::Port;
use crate::layout::routing::error::{Result, RouteError};
use crate::layout::routing::manhattan::{route_manhattan, ManhattanParams};
use crate::layout::routing::shapes::rounding;
use crate::layout::routing::waveguide::{expand_straights, Waveguide, IN_PORT, OUT_PORT};
use crate::layout::trace::TraceTemplate;
use crate::log::debug;

/// Maximum distance between a fixed bend's input and the route for a placement to be accepted.
const BEND_PLACEMENT_TOLERANCE: f64 = 0.1;

/// Tolerance in degrees for recognizing right-angle turns.
const TURN_TOLERANCE: f64 = 1e-6;

fn bend_radius(ctx: &LumenCtx, params: &ManhattanParams) -> f64 {
    params.bend_radius.unwrap_or(ctx.config().bend_radius)
}

/// A rounded waveguide along an axis-aligned route.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manhattan {
    pub params: ManhattanParams,
}

impl Manhattan {
    pub fn new(params: ManhattanParams) -> Self {
        Self { params }
    }
}

impl Connect for Manhattan {
    fn connect(&self, ctx: &LumenCtx, start: &Port, end: &Port, name: &str) -> Result<Arc<Cell>> {
        let template = prepare(ctx, start, end)?;
        let radius = bend_radius(ctx, &self.params);
        let algo = rounding(self.params.adiabatic_angle, ctx.config().angle_step);
        let route = route_manhattan(start, end, &self.params, radius, &algo)?;
        Waveguide::rounded(&route, template, &algo, radius)
            .facing(start, end)
            .build(ctx, name)
    }
}

/// A Manhattan waveguide whose bends are shifted sideways to reduce bend loss.
///
/// Counter-clockwise bends shift their core by `+offset`, clockwise bends by
/// `-offset`. Straight sections keep the plain template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManhattanOffset {
    pub params: ManhattanParams,
    pub offset: f64,
}

impl Default for ManhattanOffset {
    fn default() -> Self {
        Self {
            params: ManhattanParams::default(),
            offset: 0.2,
        }
    }
}

/// Splits a rounded route into alternating straight and bend sections.
///
/// Each section is paired with the turn of its bend, or `None` for straights.
/// Sections of zero length are dropped.
fn sections(rounded: &RoundedPolyline) -> Vec<(Polyline, Option<f64>)> {
    let pts = &rounded.polyline.points;
    let mut out = Vec::new();
    let mut push = |from: usize, to: usize, turn: Option<f64>| {
        let section = Polyline::new(pts[from..=to].to_vec());
        if section.length() > EPSILON {
            out.push((section, turn));
        }
    };
    let mut prev = 0;
    for bend in rounded.bends.iter() {
        if bend.start > prev {
            push(prev, bend.start, None);
        }
        push(bend.start, bend.end, Some(bend.turn));
        prev = bend.end;
    }
    if prev + 1 < pts.len() {
        push(prev, pts.len() - 1, None);
    }
    out
}

impl Connect for ManhattanOffset {
    fn connect(&self, ctx: &LumenCtx, start: &Port, end: &Port, name: &str) -> Result<Arc<Cell>> {
        let template = prepare(ctx, start, end)?;
        let radius = bend_radius(ctx, &self.params);
        let algo = rounding(self.params.adiabatic_angle, ctx.config().angle_step);
        let route = route_manhattan(start, end, &self.params, radius, &algo)?;
        let rounded = algo.round_with_bends(&route, radius);

        let mut parts = Vec::new();
        for (cnt, (section, turn)) in sections(&rounded).into_iter().enumerate() {
            let section_template = match turn {
                Some(turn) if turn < 0. => template.offset(-self.offset),
                Some(_) => template.offset(self.offset),
                None => template.clone(),
            };
            let cell = Waveguide::new(section, section_template).build(ctx, &format!("{name}_{cnt}"))?;
            parts.push(Instance::new(cell).with_name(format!("section{cnt}")));
        }
        assemble(ctx, name, parts, &template, start, end, rounded.polyline)
    }
}

/// A Manhattan waveguide whose long straights are widened.
///
/// Straights longer than twice `taper_length` taper up to `width_wide`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WideManhattan {
    pub params: ManhattanParams,
    pub taper_length: f64,
    pub width_wide: f64,
}

impl Default for WideManhattan {
    fn default() -> Self {
        Self {
            params: ManhattanParams::default(),
            taper_length: 10.,
            width_wide: 3.,
        }
    }
}

impl Connect for WideManhattan {
    fn connect(&self, ctx: &LumenCtx, start: &Port, end: &Port, name: &str) -> Result<Arc<Cell>> {
        let template = prepare(ctx, start, end)?;
        let radius = bend_radius(ctx, &self.params);
        let algo = rounding(self.params.adiabatic_angle, ctx.config().angle_step);
        let route = route_manhattan(start, end, &self.params, radius, &algo)?;
        let rounded = algo.round_with_bends(&route, radius);
        let (line, widths) = expand_straights(
            &rounded,
            template.core_width,
            self.width_wide,
            self.taper_length,
        );
        Waveguide::with_widths(line, template, widths)
            .facing(start, end)
            .build(ctx, name)
    }
}

/// A prebuilt right-angle bend.
///
/// The cell must have an `in` and an `out` port, 90 degrees apart, each
/// `bend_radius` away from the corner it replaces.
#[derive(Debug, Clone)]
pub struct FixedBend {
    pub cell: Arc<Cell>,
    pub bend_radius: f64,
}

impl FixedBend {
    /// A circular bend of radius 5 drawn with `template`.
    pub fn circular(ctx: &LumenCtx, template: TraceTemplate, name: &str) -> Result<Self> {
        let radius = 5.;
        let shape = Polyline::new(vec![
            Point::new(0., 0.),
            Point::new(radius, 0.),
            Point::new(radius, radius),
        ]);
        let cell = Waveguide::rounded(&shape, template, &rounding(0., ctx.config().angle_step), radius)
            .build(ctx, name)?;
        Ok(Self {
            cell,
            bend_radius: radius,
        })
    }

    /// Places the bend so that its output leaves `pos_out` along `heading`.
    ///
    /// The mirrored placement is used when the unmirrored one does not put the
    /// input on `pos_in`.
    fn place(&self, pos_out: Point, heading: f64, pos_in: Point) -> Result<Instance> {
        let p_in = self.cell.port(IN_PORT)?;
        let p_out = self.cell.port(OUT_PORT)?;

        let placement = |reflect: bool| {
            let local_angle = if reflect { -p_out.angle() } else { p_out.angle() };
            let orientation = Orientation::new(reflect, heading - local_angle);
            let rotated = p_out
                .position()
                .transform(Transformation::with_loc_and_orientation(Point::zero(), orientation));
            let mut inst = Instance::new(self.cell.clone());
            inst.set_orientation(orientation);
            inst.set_loc(pos_out - rotated);
            inst
        };

        let inst = placement(false);
        let landed = p_in.position().transform(inst.transformation());
        if landed.distance(pos_in) < BEND_PLACEMENT_TOLERANCE {
            return Ok(inst);
        }
        debug!("mirroring the fixed bend at {pos_out}");
        Ok(placement(true))
    }
}

/// A Manhattan route with a prebuilt bend at every corner.
///
/// The bends are joined by straights widened to `width_wide` with
/// `taper_length` tapers. Without a `bend`, a circular bend of radius 5 is
/// generated under the name `{name}_bend`.
#[derive(Debug, Clone)]
pub struct ManhattanFixedBend {
    pub params: ManhattanParams,
    pub bend: Option<FixedBend>,
    pub taper_length: f64,
    pub width_wide: f64,
}

impl Default for ManhattanFixedBend {
    fn default() -> Self {
        Self {
            params: ManhattanParams::default(),
            bend: None,
            taper_length: 10.,
            width_wide: 3.,
        }
    }
}

impl ManhattanFixedBend {
    fn straight(
        &self,
        ctx: &LumenCtx,
        template: &TraceTemplate,
        from: Point,
        to: Point,
        name: &str,
    ) -> Result<Arc<Cell>> {
        let rounded = RoundedPolyline {
            polyline: Polyline::straight(from, to),
            bends: Vec::new(),
        };
        let (line, widths) = expand_straights(
            &rounded,
            template.core_width,
            self.width_wide,
            self.taper_length,
        );
        Waveguide::with_widths(line, template.clone(), widths).build(ctx, name)
    }
}

impl Connect for ManhattanFixedBend {
    fn connect(&self, ctx: &LumenCtx, start: &Port, end: &Port, name: &str) -> Result<Arc<Cell>> {
        let template = prepare(ctx, start, end)?;
        let bend = match &self.bend {
            Some(bend) => bend.clone(),
            None => FixedBend::circular(ctx, template.clone(), &format!("{name}_bend"))?,
        };
        let algo = rounding(0., ctx.config().angle_step);
        let route = route_manhattan(start, end, &self.params, bend.bend_radius, &algo)?;

        let headings = route.angles_deg();
        let turns = route.turns_deg();
        let mut parts = Vec::new();
        let mut centerline = Polyline::new(vec![start.position()]);
        let mut last_point = start.position();
        let mut cnt = 1;

        for (i, turn) in turns.iter().copied().enumerate() {
            if (turn.abs() - 90.).abs() > TURN_TOLERANCE {
                continue;
            }
            let vertex = route.points[i + 1];
            let heading = headings[i + 1];
            let pos_out = vertex.move_polar(bend.bend_radius, heading);
            let pos_in = vertex.move_polar(bend.bend_radius, heading - turn + 180.);
            let inst = bend.place(pos_out, heading, pos_in)?.with_name(format!("W{}", cnt + 1));
            let bend_in = inst.port(IN_PORT)?;
            let bend_out = inst.port(OUT_PORT)?;

            if last_point.distance(bend_in.position()) > EPSILON {
                let wg_name = format!("{name}_W{cnt}");
                let cell = self.straight(ctx, &template, last_point, bend_in.position(), &wg_name)?;
                parts.push(Instance::new(cell).with_name(format!("_W{cnt}")));
            }
            centerline.extend_with(&Polyline::new(vec![
                bend_in.position(),
                vertex,
                bend_out.position(),
            ]));
            parts.push(inst);
            last_point = bend_out.position();
            cnt += 2;
        }

        if last_point.distance(end.position()) > EPSILON {
            let wg_name = format!("{name}_W{cnt}");
            let cell = self.straight(ctx, &template, last_point, end.position(), &wg_name)?;
            parts.push(Instance::new(cell).with_name(format!("_W{cnt}")));
        }
        centerline.extend_with(&Polyline::new(vec![end.position()]));

        if parts.is_empty() {
            return Err(RouteError::Degenerate(format!(
                "the ports of {name} coincide at {}",
                start.position()
            )));
        }
        assemble(ctx, name, parts, &template, start, end, centerline)
    }
}

#[cfg(test)]
mod tests {
    use float_eq::assert_float_eq;

    use super::*;
    use crate::layout::routing::waveguide::Centerline;

    fn port(x: f64, y: f64, angle: f64) -> Port {
        Port::optical("p", (x, y), angle, TraceTemplate::default())
    }

    fn child_names(cell: &Cell) -> Vec<String> {
        cell.insts().map(|inst| inst.name().to_string()).collect()
    }

    #[test]
    fn manhattan_ports_coincide_with_joined_ports() {
        let ctx = LumenCtx::default();
        let start = port(0., 0., 0.);
        let end = port(200., 100., 180.);
        let cell = Manhattan::default().connect(&ctx, &start, &end, "conn").unwrap();
        let p_in = cell.port(IN_PORT).unwrap();
        let p_out = cell.port(OUT_PORT).unwrap();
        assert!(p_in.position().approx_eq(start.position(), 1e-9));
        assert!(p_out.position().approx_eq(end.position(), 1e-9));
        assert_float_eq!(p_in.angle(), 180., abs <= 1e-9);
        assert_float_eq!(p_out.angle(), 0., abs <= 1e-9);
    }

    #[test]
    fn offset_bends_are_separate_sections() {
        let ctx = LumenCtx::default();
        let cell = ManhattanOffset::default()
            .connect(&ctx, &port(0., 0., 0.), &port(200., 100., 180.), "off")
            .unwrap();
        // Straight, bend, straight, bend, straight.
        assert_eq!(cell.insts().count(), 5);
        let offsets: Vec<f64> = cell
            .insts()
            .map(|inst| {
                inst.cell()
                    .get_metadata::<Centerline>()
                    .unwrap()
                    .template
                    .core_offset
            })
            .collect();
        assert_eq!(offsets, vec![0., 0.2, 0., -0.2, 0.]);
    }

    #[test]
    fn wide_manhattan_widens_long_straights() {
        let ctx = LumenCtx::default();
        let start = port(0., 0., 0.);
        let end = port(300., 0., 180.);
        let cell = WideManhattan::default().connect(&ctx, &start, &end, "wide").unwrap();
        let line = &cell.get_metadata::<Centerline>().unwrap().points;
        assert_eq!(line.len(), 4);
        assert!(line.points[1].approx_eq(Point::new(10., 0.), 1e-9));
    }

    #[test]
    fn fixed_bends_sit_on_every_corner() {
        let ctx = LumenCtx::default();
        let start = port(0., 0., 0.);
        let end = port(100., 60., 180.);
        let cell = ManhattanFixedBend::default()
            .connect(&ctx, &start, &end, "fb")
            .unwrap();
        assert_eq!(
            child_names(&cell),
            vec!["_W1", "W2", "_W3", "W4", "_W5"]
        );

        let bends: Vec<&Instance> = cell.insts().filter(|i| i.name().starts_with('W')).collect();
        // The first corner turns left, the second right, so only the second is mirrored.
        assert!(!bends[0].orientation().reflect_vert);
        assert!(bends[1].orientation().reflect_vert);
        let out = cell.port(OUT_PORT).unwrap();
        assert!(out.position().approx_eq(end.position(), 1e-9));
    }

    #[test]
    fn sections_skip_empty_straights() {
        let route = Polyline::new(vec![
            Point::new(0., 0.),
            Point::new(10., 0.),
            Point::new(10., 10.),
        ]);
        let rounded = rounding(0., 1.).round_with_bends(&route, 10.);
        let parts = sections(&rounded);
        assert_eq!(parts.len(), 1);
        assert_float_eq!(parts[0].1.unwrap(), 90., abs <= 1e-9);
    }

    #[test]
    fn abutting_bends_are_separate_sections() {
        let route = Polyline::new(vec![
            Point::new(0., 0.),
            Point::new(50., 0.),
            Point::new(50., 40.),
            Point::new(100., 40.),
        ]);
        let rounded = rounding(0., 1.).round_with_bends(&route, 20.);
        let parts = sections(&rounded);
        let turns: Vec<Option<f64>> = parts.iter().map(|(_, turn)| turn.map(f64::round)).collect();
        assert_eq!(turns, vec![None, Some(90.), Some(-90.), None]);
        assert_float_eq!(parts[0].0.length(), 30., abs <= 1e-9);
        assert_float_eq!(parts[3].0.length(), 30., abs <= 1e-9);
    }
}
