//! Fixed devices used by the generators.
//!
//! Devices are drawn with their input at the origin, pointing west.

use arcstr::ArcStr;
use lumen::component::{Component, NoParams};
use lumen::data::LumenCtx;
use lumen::error::Result;
use lumen::layout::cell::Element;
use lumen::layout::context::LayoutCtx;
use lumen::layout::layers::Layer;
use lumen::layout::port::Port;
use lumengeom::{Point, Polygon, Rect};
use serde::{Deserialize, Serialize};

mod heated;

pub use heated::{HeatedWaveguide, HeatedWaveguideParams};

/// Geometry of a multimode interference coupler.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MmiParams {
    /// Length of the multimode section.
    pub length: f64,
    /// Width of the multimode section.
    pub width: f64,
    /// Length of the tapers between the access waveguides and the multimode section.
    pub taper_length: f64,
    /// Width of the tapers where they meet the multimode section.
    pub taper_width: f64,
    /// Distance between the centers of two access waveguides on the same side.
    pub port_spacing: f64,
}

impl Default for MmiParams {
    fn default() -> Self {
        Self {
            length: 30.,
            width: 6.,
            taper_length: 10.,
            taper_width: 1.5,
            port_spacing: 2.,
        }
    }
}

impl MmiParams {
    /// Total length, tapers included.
    pub fn total_length(&self) -> f64 {
        self.length + 2. * self.taper_length
    }

    fn draw_body(&self, ctx: &mut LayoutCtx, inputs: &[f64], outputs: &[f64]) -> Result<()> {
        let config = ctx.config();
        let template = &config.trace_template;
        let x0 = self.taper_length;
        let x1 = x0 + self.length;
        let xe = self.total_length();

        ctx.draw(Element::new(
            template.core_layer.clone(),
            Rect::new(
                Point::new(x0, -self.width / 2.),
                Point::new(x1, self.width / 2.),
            ),
        ));
        let taper = |tip: f64, base: f64, y: f64| Polygon {
            points: vec![
                Point::new(tip, y - template.core_width / 2.),
                Point::new(base, y - self.taper_width / 2.),
                Point::new(base, y + self.taper_width / 2.),
                Point::new(tip, y + template.core_width / 2.),
            ],
        };
        for &y in inputs {
            ctx.draw(Element::new(template.core_layer.clone(), taper(0., x0, y)));
        }
        for &y in outputs {
            ctx.draw(Element::new(template.core_layer.clone(), taper(xe, x1, y)));
        }
        let margin = (template.cladding_width - template.core_width) / 2.;
        ctx.draw(Element::new(
            template.cladding_layer.clone(),
            Rect::new(
                Point::new(0., -self.width / 2. - margin),
                Point::new(xe, self.width / 2. + margin),
            ),
        ));
        Ok(())
    }
}

/// A 1x2 splitter with ports `in_1`, `out_1` (north) and `out_2` (south).
pub struct Mmi1x2 {
    params: MmiParams,
}

impl Component for Mmi1x2 {
    type Params = MmiParams;
    fn new(params: &Self::Params, _ctx: &LumenCtx) -> Result<Self> {
        Ok(Self { params: *params })
    }

    fn name(&self) -> ArcStr {
        arcstr::literal!("mmi1x2")
    }

    fn layout(&self, ctx: &mut LayoutCtx) -> Result<()> {
        let p = &self.params;
        let dy = p.port_spacing / 2.;
        p.draw_body(ctx, &[0.], &[dy, -dy])?;

        let template = ctx.config().trace_template.clone();
        let xe = p.total_length();
        ctx.add_ports([
            Port::optical("in_1", (0., 0.), 180., template.clone()),
            Port::optical("out_1", (xe, dy), 0., template.clone()),
            Port::optical("out_2", (xe, -dy), 0., template),
        ])?;
        Ok(())
    }
}

/// A 2x2 coupler with ports `in1`, `out1` (north) and `in2`, `out2` (south).
pub struct Mmi2x2 {
    params: MmiParams,
}

impl Component for Mmi2x2 {
    type Params = MmiParams;
    fn new(params: &Self::Params, _ctx: &LumenCtx) -> Result<Self> {
        Ok(Self { params: *params })
    }

    fn name(&self) -> ArcStr {
        arcstr::literal!("mmi2x2")
    }

    fn layout(&self, ctx: &mut LayoutCtx) -> Result<()> {
        let p = &self.params;
        let dy = p.port_spacing / 2.;
        p.draw_body(ctx, &[dy, -dy], &[dy, -dy])?;

        let template = ctx.config().trace_template.clone();
        let xe = p.total_length();
        ctx.add_ports([
            Port::optical("in1", (0., dy), 180., template.clone()),
            Port::optical("in2", (0., -dy), 180., template.clone()),
            Port::optical("out1", (xe, dy), 0., template.clone()),
            Port::optical("out2", (xe, -dy), 0., template),
        ])?;
        Ok(())
    }
}

/// A grating coupler.
///
/// The waveguide port `wg` sits at the origin and faces east. `vertical_in`
/// marks the center of the grating, where light couples in from above.
pub struct GratingCoupler;

impl Component for GratingCoupler {
    type Params = NoParams;
    fn new(_params: &Self::Params, _ctx: &LumenCtx) -> Result<Self> {
        Ok(Self)
    }

    fn name(&self) -> ArcStr {
        arcstr::literal!("grating_coupler")
    }

    fn layout(&self, ctx: &mut LayoutCtx) -> Result<()> {
        const TAPER: f64 = 20.;
        const GRATING: f64 = 15.;
        const WIDTH: f64 = 12.;
        const PERIOD: f64 = 0.63;

        let template = ctx.config().trace_template.clone();
        ctx.draw(Element::new(
            template.core_layer.clone(),
            Polygon {
                points: vec![
                    Point::new(0., -template.core_width / 2.),
                    Point::new(-TAPER, -WIDTH / 2.),
                    Point::new(-TAPER, WIDTH / 2.),
                    Point::new(0., template.core_width / 2.),
                ],
            },
        ));
        let n_teeth = (GRATING / PERIOD).floor() as usize;
        for i in 0..n_teeth {
            let x = -TAPER - (i as f64 + 0.5) * PERIOD;
            ctx.draw(Element::new(
                template.core_layer.clone(),
                Rect::new(
                    Point::new(x - PERIOD / 4., -WIDTH / 2.),
                    Point::new(x + PERIOD / 4., WIDTH / 2.),
                ),
            ));
        }

        ctx.add_ports([
            Port::optical("wg", (0., 0.), 0., template.clone()),
            Port::optical("vertical_in", (-TAPER - GRATING / 2., 0.), 90., template),
        ])?;
        Ok(())
    }
}

/// A waveguide crossing.
///
/// `in1`/`out1` run along the x-axis and `in2`/`out2` along the y-axis,
/// each pair facing away from the center.
pub struct Crossing {
    length: f64,
}

impl Component for Crossing {
    /// Arm length, from port to port.
    type Params = f64;
    fn new(params: &Self::Params, _ctx: &LumenCtx) -> Result<Self> {
        Ok(Self { length: *params })
    }

    fn name(&self) -> ArcStr {
        arcstr::literal!("crossing")
    }

    fn layout(&self, ctx: &mut LayoutCtx) -> Result<()> {
        let template = ctx.config().trace_template.clone();
        let h = self.length / 2.;
        let w = template.core_width / 2.;
        ctx.draw_all([
            Element::new(
                template.core_layer.clone(),
                Rect::new(Point::new(-h, -w), Point::new(h, w)),
            ),
            Element::new(
                template.core_layer.clone(),
                Rect::new(Point::new(-w, -h), Point::new(w, h)),
            ),
        ]);
        ctx.add_ports([
            Port::optical("in1", (-h, 0.), 180., template.clone()),
            Port::optical("out1", (h, 0.), 0., template.clone()),
            Port::optical("in2", (0., -h), 270., template.clone()),
            Port::optical("out2", (0., h), 90., template),
        ])?;
        Ok(())
    }
}

/// A 50x50 bond pad on the first metal layer, centered on its electrical port `m1`.
pub struct BondPad;

impl Component for BondPad {
    type Params = NoParams;
    fn new(_params: &Self::Params, _ctx: &LumenCtx) -> Result<Self> {
        Ok(Self)
    }

    fn name(&self) -> ArcStr {
        arcstr::literal!("bond_pad")
    }

    fn layout(&self, ctx: &mut LayoutCtx) -> Result<()> {
        ctx.draw(Element::new(
            Layer::Metal1,
            Rect::from_center(Point::zero(), 50., 50.),
        ));
        ctx.add_port(Port::electrical("m1", (0., 0.), 90.))?;
        Ok(())
    }
}
