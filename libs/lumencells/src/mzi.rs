//! Mach-Zehnder interferometers.

use arcstr::ArcStr;
use lumen::circuit::CircuitSpec;
use lumen::component::Component;
use lumen::data::LumenCtx;
use lumen::error::{ErrorSource, Result};
use lumen::layout::cell::Instance;
use lumen::layout::context::LayoutCtx;
use lumen::layout::routing::connector::BezierSbend;
use lumen::layout::routing::waveguide::Waveguide;
use lumengeom::polyline::Polyline;
use lumengeom::Point;
use serde::{Deserialize, Serialize};

use crate::primitives::{HeatedWaveguide, HeatedWaveguideParams, Mmi2x2, MmiParams};

/// A splitter, two arms and a combiner.
///
/// Arm 1 is the northern arm. Each arm is a heated waveguide or, if not
/// heated, a plain waveguide of the same length.
pub struct Mzi {
    params: MziParams,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MziParams {
    pub coupler: MmiParams,
    pub arm: HeatedWaveguideParams,
    /// Which of the two arms carry heaters.
    pub heated: [bool; 2],
    /// Distance between the centers of the two arms.
    pub arm_spacing: f64,
    /// Horizontal room for the S-bends between the couplers and the arms.
    pub bend_length: f64,
}

impl Default for MziParams {
    fn default() -> Self {
        Self {
            coupler: MmiParams::default(),
            arm: HeatedWaveguideParams::phase_shifter(),
            heated: [true, true],
            arm_spacing: 40.,
            bend_length: 50.,
        }
    }
}

impl Mzi {
    fn arm(&self, ctx: &LayoutCtx, idx: usize) -> Result<Instance> {
        if self.params.heated[idx] {
            return ctx.inner().instantiate_layout::<HeatedWaveguide>(&self.params.arm);
        }
        let length = self.params.arm.heater_length;
        let template = ctx.config().trace_template.clone();
        let cell = ctx.inner().generate_cell(arcstr::literal!("mzi_arm"), |cell| {
            Waveguide::new(
                Polyline::straight(Point::zero(), Point::new(length, 0.)),
                template,
            )
            .draw(cell)
        })?;
        Ok(Instance::new(cell))
    }
}

impl Component for Mzi {
    type Params = MziParams;
    fn new(params: &Self::Params, _ctx: &LumenCtx) -> Result<Self> {
        if params.arm_spacing <= params.coupler.port_spacing {
            return Err(ErrorSource::InvalidArgs(format!(
                "arm spacing {} must exceed the coupler port spacing {}",
                params.arm_spacing, params.coupler.port_spacing
            ))
            .into());
        }
        Ok(Self { params: *params })
    }

    fn name(&self) -> ArcStr {
        arcstr::literal!("mzi")
    }

    fn layout(&self, ctx: &mut LayoutCtx) -> Result<()> {
        let p = &self.params;
        let coupler = ctx.instantiate::<Mmi2x2>(&p.coupler)?;
        let coupler_length = p.coupler.total_length();
        let arm_x = coupler_length + p.bend_length;
        let combiner_x = arm_x + p.arm.heater_length + p.bend_length;

        let mut spec = CircuitSpec::new("mzi");
        spec.add_instance("splitter", coupler.clone())?
            .add_instance("combiner", coupler)?
            .add_instance("arm1", self.arm(ctx, 0)?)?
            .add_instance("arm2", self.arm(ctx, 1)?)?;
        spec.place("splitter", (0., 0.))
            .place("arm1", (arm_x, p.arm_spacing / 2.))
            .place("arm2", (arm_x, -p.arm_spacing / 2.))
            .place("combiner", (combiner_x, 0.));

        for (arm, (split, comb)) in [("arm1", ("out1", "in1")), ("arm2", ("out2", "in2"))] {
            spec.connect_with(
                format!("splitter:{split}"),
                format!("{arm}:in"),
                BezierSbend::default(),
            )?;
            spec.connect_with(
                format!("{arm}:out"),
                format!("combiner:{comb}"),
                BezierSbend::default(),
            )?;
        }

        for (idx, arm) in ["arm1", "arm2"].into_iter().enumerate() {
            if !p.heated[idx] {
                continue;
            }
            for port in ["elec1", "elec2"] {
                let name = format!("{arm}_{port}");
                spec.external_port_name(format!("{arm}:{port}"), name.clone())?;
                spec.propagate(name);
            }
        }

        ctx.draw_circuit(&spec)?;
        Ok(())
    }
}

/// A phase-shifting MZI: an MZI heated on its southern arm, followed by a
/// heated waveguide on its northern output.
pub struct PhMzi {
    params: PhMziParams,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhMziParams {
    pub mzi: MziParams,
    pub heater: HeatedWaveguideParams,
    /// Gap between the MZI and the output heater.
    pub gap: f64,
    /// Northward shift of the output heater from the MZI output.
    pub shift: f64,
}

impl Default for PhMziParams {
    fn default() -> Self {
        Self {
            mzi: MziParams {
                heated: [false, true],
                ..Default::default()
            },
            heater: HeatedWaveguideParams::phase_shifter(),
            gap: 100.,
            shift: 10.,
        }
    }
}

impl Component for PhMzi {
    type Params = PhMziParams;
    fn new(params: &Self::Params, _ctx: &LumenCtx) -> Result<Self> {
        Ok(Self { params: *params })
    }

    fn name(&self) -> ArcStr {
        arcstr::literal!("ph_mzi")
    }

    fn layout(&self, ctx: &mut LayoutCtx) -> Result<()> {
        let p = &self.params;
        let mzi = ctx.instantiate::<Mzi>(&p.mzi)?;
        let out = mzi.port("combiner_out1")?.position();
        let ht = ctx.instantiate::<HeatedWaveguide>(&p.heater)?;

        let mut spec = CircuitSpec::new("ph_mzi");
        spec.add_instance("mzi", mzi)?.add_instance("ht", ht)?;
        spec.place("mzi", (0., 0.))
            .place("ht", (out.x + p.gap, out.y + p.shift));
        spec.connect_with("mzi:combiner_out1", "ht:in", BezierSbend::default())?;

        for (port, name) in [
            ("mzi:splitter_in1", "in1"),
            ("mzi:splitter_in2", "in2"),
            ("ht:out", "out1"),
            ("mzi:combiner_out2", "out2"),
        ] {
            spec.external_port_name(port, name)?;
        }
        for (port, name) in [
            ("mzi:arm2_elec1", "mzi_arm2_elec1"),
            ("mzi:arm2_elec2", "mzi_arm2_elec2"),
            ("ht:elec1", "ht_elec1"),
            ("ht:elec2", "ht_elec2"),
        ] {
            spec.external_port_name(port, name)?;
            spec.propagate(name);
        }

        ctx.draw_circuit(&spec)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mzi_ports() {
        let ctx = LumenCtx::default();
        let mzi = ctx.instantiate_layout::<Mzi>(&MziParams::default()).unwrap();
        assert_eq!(
            mzi.cell().port_names(),
            vec![
                "splitter_in1",
                "splitter_in2",
                "combiner_out1",
                "combiner_out2",
                "arm1_elec1",
                "arm1_elec2",
                "arm2_elec1",
                "arm2_elec2",
            ]
        );
    }

    #[test]
    fn unheated_arms_have_no_electrical_ports() {
        let ctx = LumenCtx::default();
        let params = MziParams {
            heated: [false, true],
            ..Default::default()
        };
        let mzi = ctx.instantiate_layout::<Mzi>(&params).unwrap();
        assert!(mzi.port("arm1_elec1").is_err());
        assert!(mzi.port("arm2_elec2").is_ok());
    }

    #[test]
    fn ph_mzi_ports() {
        let ctx = LumenCtx::default();
        let ph = ctx
            .instantiate_layout::<PhMzi>(&PhMziParams::default())
            .unwrap();
        let mut names: Vec<String> = ph.cell().port_names().iter().map(|n| n.to_string()).collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "ht_elec1",
                "ht_elec2",
                "in1",
                "in2",
                "mzi_arm2_elec1",
                "mzi_arm2_elec2",
                "out1",
                "out2",
            ]
        );
    }

    #[test]
    fn narrow_arms_are_rejected() {
        let ctx = LumenCtx::default();
        let params = MziParams {
            arm_spacing: 1.,
            ..Default::default()
        };
        ctx.instantiate_layout::<Mzi>(&params)
            .expect_err("arms overlap the coupler ports");
    }
}
