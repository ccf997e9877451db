use arcstr::ArcStr;
use lumen::component::Component;
use lumen::data::LumenCtx;
use lumen::error::{ErrorSource, Result};
use lumen::layout::cell::Element;
use lumen::layout::context::LayoutCtx;
use lumen::layout::layers::Layer;
use lumen::layout::port::Port;
use lumen::layout::routing::waveguide::{Waveguide, IN_PORT, OUT_PORT};
use lumengeom::polyline::Polyline;
use lumengeom::{Path, Point, Rect};
use serde::{Deserialize, Serialize};

/// A straight waveguide with a heater stripe on each side.
///
/// Metal contacts cover both ends of the heaters. The electrical ports `elec1`
/// and `elec2` sit at the centers of the contacts.
pub struct HeatedWaveguide {
    params: HeatedWaveguideParams,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeatedWaveguideParams {
    pub heater_width: f64,
    /// Distance from the waveguide center to the center of each heater.
    pub heater_offset: f64,
    pub heater_length: f64,
    pub m1_width: f64,
    pub m1_length: f64,
}

impl Default for HeatedWaveguideParams {
    fn default() -> Self {
        Self {
            heater_width: 0.6,
            heater_offset: 1.0,
            heater_length: 200.,
            m1_width: 1.0,
            m1_length: 3.0,
        }
    }
}

impl HeatedWaveguideParams {
    /// The heater used in the phase shifters of the generated circuits.
    pub fn phase_shifter() -> Self {
        Self {
            heater_width: 5.,
            heater_offset: 3.,
            m1_width: 10.,
            m1_length: 50.,
            ..Default::default()
        }
    }
}

impl Component for HeatedWaveguide {
    type Params = HeatedWaveguideParams;
    fn new(params: &Self::Params, _ctx: &LumenCtx) -> Result<Self> {
        if params.m1_length * 2. > params.heater_length {
            return Err(ErrorSource::InvalidArgs(format!(
                "metal contacts of length {} do not fit on a heater of length {}",
                params.m1_length, params.heater_length
            ))
            .into());
        }
        Ok(Self { params: *params })
    }

    fn name(&self) -> ArcStr {
        arcstr::literal!("heated_waveguide")
    }

    fn layout(&self, ctx: &mut LayoutCtx) -> Result<()> {
        let p = &self.params;
        let template = ctx.config().trace_template.clone();
        let centerline = Polyline::straight(Point::zero(), Point::new(p.heater_length, 0.));
        Waveguide::new(centerline.clone(), template).draw(ctx)?;

        for side in [-1., 1.] {
            let stripe = centerline.offset(side * p.heater_offset);
            ctx.draw(Element::new(
                Layer::Heater,
                Path::new(stripe.points, p.heater_width),
            ));
        }

        let half = p.heater_offset + p.m1_width / 2.;
        for x in [0., p.heater_length - p.m1_length] {
            ctx.draw(Element::new(
                Layer::Metal1,
                Rect::new(Point::new(x, -half), Point::new(x + p.m1_length, half)),
            ));
        }

        let mut ports = Vec::with_capacity(2);
        for (name, optical) in [("elec1", IN_PORT), ("elec2", OUT_PORT)] {
            let port = ctx.port(optical)?;
            let position = port
                .position()
                .move_polar(p.m1_length / 2., port.angle() + 180.);
            ports.push(Port::electrical(name, position, 90.));
        }
        ctx.add_ports(ports)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use float_eq::assert_float_eq;

    use super::*;

    #[test]
    fn contacts_sit_inside_the_ends() {
        let ctx = LumenCtx::default();
        let wg = ctx
            .instantiate_layout::<HeatedWaveguide>(&HeatedWaveguideParams::phase_shifter())
            .unwrap();
        assert_eq!(
            wg.cell().port_names(),
            vec!["in", "out", "elec1", "elec2"]
        );
        assert_float_eq!(wg.port("elec1").unwrap().position().x, 25., abs <= 1e-9);
        assert_float_eq!(wg.port("elec2").unwrap().position().x, 175., abs <= 1e-9);
    }

    #[test]
    fn oversized_contacts_are_rejected() {
        let ctx = LumenCtx::default();
        let params = HeatedWaveguideParams {
            heater_length: 50.,
            m1_length: 30.,
            ..Default::default()
        };
        ctx.instantiate_layout::<HeatedWaveguide>(&params)
            .expect_err("contacts overlap");
    }
}
