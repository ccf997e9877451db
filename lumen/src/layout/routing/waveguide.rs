//! Waveguide cells drawn along a centerline.

use std::sync::Arc;

use lumengeom::polyline::Polyline;
use lumengeom::round::{RoundedPolyline, Rounding, RoundingAlgorithm, MAX_ROUNDABLE_TURN};
use serde::{Deserialize, Serialize};

use super::error::{Result, RouteError};
use crate::data::LumenCtx;
use crate::error::Result as LumenResult;
use crate::layout::cell::Cell;
use crate::layout::context::LayoutCtx;
use crate::layout::port::Port;
use crate::layout::trace::TraceTemplate;
use crate::log::warn;

/// Name of the port at the start of every waveguide and connector.
pub const IN_PORT: &str = "in";
/// Name of the port at the end of every waveguide and connector.
pub const OUT_PORT: &str = "out";

/// Cell metadata recording the centerline a waveguide was drawn along.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Centerline {
    pub points: Polyline,
    pub template: TraceTemplate,
}

/// How the core width varies along a waveguide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WidthProfile {
    /// The template's core width everywhere.
    Uniform,
    /// Linear interpolation by length between two widths.
    Tapered { start: f64, end: f64 },
    /// One width per centerline point.
    Widths(Vec<f64>),
}

/// A waveguide to be drawn as its own cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Waveguide {
    pub centerline: Polyline,
    pub template: TraceTemplate,
    pub profile: WidthProfile,
    in_angle: Option<f64>,
    out_angle: Option<f64>,
}

impl Waveguide {
    pub fn new(centerline: Polyline, template: TraceTemplate) -> Self {
        Self {
            centerline: centerline.remove_identicals(),
            template,
            profile: WidthProfile::Uniform,
            in_angle: None,
            out_angle: None,
        }
    }

    /// Rounds the corners of `route` with `radius` and draws the result.
    ///
    /// The ports follow the first and last segments of `route`, which the
    /// rounding keeps as tangents. Turns of 180 degrees or more at a single
    /// vertex stay sharp.
    pub fn rounded(
        route: &Polyline,
        template: TraceTemplate,
        rounding: &Rounding,
        radius: f64,
    ) -> Self {
        warn_sharp_turns(route);
        let headings = route.angles_deg();
        Self {
            in_angle: headings.first().map(|a| a + 180.),
            out_angle: headings.last().copied(),
            ..Self::new(rounding.round(route, radius), template)
        }
    }

    /// A waveguide whose core width changes linearly from `start` to `end`.
    pub fn tapered(centerline: Polyline, template: TraceTemplate, start: f64, end: f64) -> Self {
        Self {
            profile: WidthProfile::Tapered { start, end },
            ..Self::new(centerline, template)
        }
    }

    /// A waveguide with an explicit core width at every centerline point.
    pub fn with_widths(centerline: Polyline, template: TraceTemplate, widths: Vec<f64>) -> Self {
        Self {
            centerline,
            template,
            profile: WidthProfile::Widths(widths),
            in_angle: None,
            out_angle: None,
        }
    }

    /// Orients the ports to face `start` and `end` instead of following the centerline.
    pub fn facing(mut self, start: &Port, end: &Port) -> Self {
        self.in_angle = Some(start.angle() + 180.);
        self.out_angle = Some(end.angle() + 180.);
        self
    }

    pub fn length(&self) -> f64 {
        self.centerline.length()
    }

    fn widths(&self) -> Option<Vec<f64>> {
        match &self.profile {
            WidthProfile::Uniform => None,
            WidthProfile::Tapered { start, end } => {
                let cum = self.centerline.cumulative_lengths();
                let total = cum.last().copied().unwrap_or(0.);
                Some(
                    cum.iter()
                        .map(|s| {
                            let t = if total > 0. { s / total } else { 0. };
                            start + (end - start) * t
                        })
                        .collect(),
                )
            }
            WidthProfile::Widths(widths) => Some(widths.clone()),
        }
    }

    fn ports(&self) -> (Port, Port) {
        let headings = self.centerline.angles_deg();
        let first = headings.first().copied().unwrap_or(0.);
        let last = headings.last().copied().unwrap_or(0.);
        let (w_in, w_out) = match self.widths() {
            Some(w) => (
                w.first().copied().unwrap_or(self.template.core_width),
                w.last().copied().unwrap_or(self.template.core_width),
            ),
            None => (self.template.core_width, self.template.core_width),
        };
        let p_in = Port::optical(
            IN_PORT,
            self.centerline.first().unwrap_or_default(),
            self.in_angle.unwrap_or(first + 180.),
            self.template.with_core_width(w_in),
        );
        let p_out = Port::optical(
            OUT_PORT,
            self.centerline.last().unwrap_or_default(),
            self.out_angle.unwrap_or(last),
            self.template.with_core_width(w_out),
        );
        (p_in, p_out)
    }

    /// Draws the waveguide into the cell being generated.
    pub fn draw(&self, ctx: &mut LayoutCtx) -> LumenResult<()> {
        self.centerline.validate(2)?;
        match self.widths() {
            None => ctx.draw_all(self.template.elements(&self.centerline)),
            Some(widths) => {
                if widths.len() != self.centerline.len() {
                    return Err(crate::error::ErrorSource::InvalidArgs(format!(
                        "{} core widths given for a centerline of {} points",
                        widths.len(),
                        self.centerline.len()
                    ))
                    .into());
                }
                ctx.draw_all(
                    self.template
                        .elements_with_widths(&self.centerline, &widths),
                )
            }
        }
        let (p_in, p_out) = self.ports();
        ctx.add_ports([p_in, p_out])?;
        ctx.set_metadata(Centerline {
            points: self.centerline.clone(),
            template: self.template.clone(),
        });
        Ok(())
    }

    /// Generates a cell holding only this waveguide.
    pub fn build(&self, ctx: &LumenCtx, name: &str) -> Result<Arc<Cell>> {
        ctx.generate_cell(name, |cell| self.draw(cell))
            .map_err(RouteError::from)
    }
}

fn warn_sharp_turns(route: &Polyline) {
    for (i, turn) in route.turns_deg().into_iter().enumerate() {
        if turn.abs() >= MAX_ROUNDABLE_TURN {
            warn!(
                "the route turns back on itself at {}; leaving the corner sharp",
                route.points[i + 1]
            );
        }
    }
}

/// Widens every straight section of `rounded` longer than twice `taper_length`.
///
/// Returns the refined centerline and the core width at each of its points. Widened
/// sections taper from `core_width` to `wide_width` over `taper_length` at each end.
pub fn expand_straights(
    rounded: &RoundedPolyline,
    core_width: f64,
    wide_width: f64,
    taper_length: f64,
) -> (Polyline, Vec<f64>) {
    let pts = &rounded.polyline.points;
    let in_bend = |i: usize| {
        rounded
            .bends
            .iter()
            .any(|b| b.start <= i && i + 1 <= b.end)
    };

    let mut points = Vec::with_capacity(pts.len());
    let mut widths = Vec::with_capacity(pts.len());
    if let Some(first) = pts.first() {
        points.push(*first);
        widths.push(core_width);
    }
    for (i, w) in pts.windows(2).enumerate() {
        let (a, b) = (w[0], w[1]);
        let len = a.distance(b);
        if !in_bend(i) && len > 2. * taper_length {
            let dir = (b - a) * (1. / len);
            points.push(a + dir * taper_length);
            widths.push(wide_width);
            points.push(b - dir * taper_length);
            widths.push(wide_width);
        }
        points.push(b);
        widths.push(core_width);
    }
    (Polyline::new(points), widths)
}
