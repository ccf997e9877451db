//! Connectors rounded with adiabatic splines.
//!
//! An adiabatic angle of zero gives circular bends. Larger angles spread the
//! curvature change over a longer section, at the cost of a larger footprint.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{prepare, Connect};
use crate::data::LumenCtx;
use crate::layout::cell::Cell;
use crate::layout::port::Port;
use crate::layout::routing::error::Result;
use crate::layout::routing::shapes::{
    bezier_bend_fixed_length, bezier_bend_fixed_radius, bezier_bend_max_radius,
    bezier_sbend_max_radius, rounding, ubend_fixed_radius, ubend_fixed_radius_fixed_length,
    ubend_max_radius, warn_min_radius, RoundedShape,
};
use crate::layout::routing::waveguide::Waveguide;
use crate::layout::trace::TraceTemplate;

fn build_shape(
    ctx: &LumenCtx,
    shape: RoundedShape,
    template: TraceTemplate,
    start: &Port,
    end: &Port,
    name: &str,
) -> Result<Arc<Cell>> {
    Waveguide::new(shape.points, template)
        .facing(start, end)
        .build(ctx, name)
}

/// An S-bend between two facing ports with the largest radius that fits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BezierSbend {
    pub adiabatic_angle: f64,
    /// Bend radii below this value are reported.
    pub min_bend_radius: Option<f64>,
}

impl Default for BezierSbend {
    fn default() -> Self {
        Self {
            adiabatic_angle: 15.,
            min_bend_radius: None,
        }
    }
}

impl Connect for BezierSbend {
    fn connect(&self, ctx: &LumenCtx, start: &Port, end: &Port, name: &str) -> Result<Arc<Cell>> {
        let template = prepare(ctx, start, end)?;
        let algo = rounding(self.adiabatic_angle, ctx.config().angle_step);
        let shape = bezier_sbend_max_radius(start, end, &algo, self.min_bend_radius)?;
        build_shape(ctx, shape, template, start, end, name)
    }
}

/// A [`BezierSbend`] whose core width tapers from the start port's to the end port's.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BezierSbendTapered {
    pub adiabatic_angle: f64,
    pub min_bend_radius: Option<f64>,
}

impl Default for BezierSbendTapered {
    fn default() -> Self {
        Self {
            adiabatic_angle: 15.,
            min_bend_radius: None,
        }
    }
}

impl Connect for BezierSbendTapered {
    fn connect(&self, ctx: &LumenCtx, start: &Port, end: &Port, name: &str) -> Result<Arc<Cell>> {
        let template = prepare(ctx, start, end)?;
        let algo = rounding(self.adiabatic_angle, ctx.config().angle_step);
        let shape = bezier_sbend_max_radius(start, end, &algo, self.min_bend_radius)?;
        let w_start = start.core_width().unwrap_or(template.core_width);
        let w_end = end.core_width().unwrap_or(template.core_width);
        Waveguide::tapered(shape.points, template, w_start, w_end)
            .facing(start, end)
            .build(ctx, name)
    }
}

/// A U-bend between two ports facing the same way, with the largest radius that fits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BezierUbend {
    pub adiabatic_angle: f64,
    pub min_bend_radius: Option<f64>,
}

impl Default for BezierUbend {
    fn default() -> Self {
        Self {
            adiabatic_angle: 45.,
            min_bend_radius: None,
        }
    }
}

impl Connect for BezierUbend {
    fn connect(&self, ctx: &LumenCtx, start: &Port, end: &Port, name: &str) -> Result<Arc<Cell>> {
        let template = prepare(ctx, start, end)?;
        let algo = rounding(self.adiabatic_angle, ctx.config().angle_step);
        let shape = ubend_max_radius(start, end, &algo, self.min_bend_radius)?;
        build_shape(ctx, shape, template, start, end, name)
    }
}

/// A U-bend with a fixed bend radius.
///
/// With a `length`, the legs are stretched so that the centerline has that
/// length. Lengths that cannot be reached produce a straight waveguide.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BezierUbendFixedRadius {
    pub adiabatic_angle: f64,
    pub bend_radius: f64,
    pub length: Option<f64>,
}

impl Default for BezierUbendFixedRadius {
    fn default() -> Self {
        Self {
            adiabatic_angle: 45.,
            bend_radius: 100.,
            length: None,
        }
    }
}

impl Connect for BezierUbendFixedRadius {
    fn connect(&self, ctx: &LumenCtx, start: &Port, end: &Port, name: &str) -> Result<Arc<Cell>> {
        let template = prepare(ctx, start, end)?;
        let algo = rounding(self.adiabatic_angle, ctx.config().angle_step);
        let shape = match self.length {
            Some(length) => {
                ubend_fixed_radius_fixed_length(start, end, &algo, self.bend_radius, length)
            }
            None => ubend_fixed_radius(start, end, &algo, self.bend_radius, 0.),
        };
        build_shape(ctx, shape, template, start, end, name)
    }
}

/// A single-corner bend between two ports whose rays intersect.
///
/// Without a `bend_radius`, the largest radius that fits both legs is used.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BezierBend {
    pub adiabatic_angle: f64,
    pub min_bend_radius: Option<f64>,
    pub bend_radius: Option<f64>,
}

impl Default for BezierBend {
    fn default() -> Self {
        Self {
            adiabatic_angle: 15.,
            min_bend_radius: None,
            bend_radius: None,
        }
    }
}

impl Connect for BezierBend {
    fn connect(&self, ctx: &LumenCtx, start: &Port, end: &Port, name: &str) -> Result<Arc<Cell>> {
        let template = prepare(ctx, start, end)?;
        let algo = rounding(self.adiabatic_angle, ctx.config().angle_step);
        let shape = match self.bend_radius {
            Some(radius) => {
                let shape = bezier_bend_fixed_radius(start, end, &algo, radius);
                warn_min_radius("bend", start, end, &shape, self.min_bend_radius);
                shape
            }
            None => bezier_bend_max_radius(start, end, &algo, self.min_bend_radius),
        };
        build_shape(ctx, shape, template, start, end, name)
    }
}

/// A single-corner bend whose adiabatic angle is tuned to reach `length`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BezierBendFixedLength {
    pub length: f64,
    pub min_bend_radius: Option<f64>,
}

impl Connect for BezierBendFixedLength {
    fn connect(&self, ctx: &LumenCtx, start: &Port, end: &Port, name: &str) -> Result<Arc<Cell>> {
        let template = prepare(ctx, start, end)?;
        let shape = bezier_bend_fixed_length(start, end, self.length, ctx.config().angle_step);
        warn_min_radius("bend", start, end, &shape, self.min_bend_radius);
        build_shape(ctx, shape, template, start, end, name)
    }
}
