//! MZIs in series.

use arcstr::ArcStr;
use lumen::circuit::CircuitSpec;
use lumen::component::Component;
use lumen::data::LumenCtx;
use lumen::error::{ErrorSource, Result};
use lumen::layout::context::LayoutCtx;
use lumen::layout::routing::connector::BezierSbend;
use serde::{Deserialize, Serialize};

use crate::mzi::{Mzi, MziParams};

/// A row of MZIs, each feeding the next through its northern ports.
///
/// Exposes `in`, `out` and the heater contacts `mzi_{i}_arm{a}_elec{e}` of every MZI.
pub struct MziString {
    params: MziStringParams,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MziStringParams {
    pub mzi: MziParams,
    pub mzi_nums: usize,
    /// Distance between the origins of consecutive MZIs.
    pub spacing: f64,
    pub bend_radius: f64,
}

impl Default for MziStringParams {
    fn default() -> Self {
        Self {
            mzi: MziParams::default(),
            mzi_nums: 2,
            spacing: 500.,
            bend_radius: 30.,
        }
    }
}

impl Component for MziString {
    type Params = MziStringParams;
    fn new(params: &Self::Params, _ctx: &LumenCtx) -> Result<Self> {
        if params.mzi_nums == 0 {
            return Err(ErrorSource::InvalidArgs(
                "an MZI string needs at least one MZI".to_string(),
            )
            .into());
        }
        Ok(Self { params: *params })
    }

    fn name(&self) -> ArcStr {
        arcstr::format!("mzi_string_{}", self.params.mzi_nums)
    }

    fn layout(&self, ctx: &mut LayoutCtx) -> Result<()> {
        let p = &self.params;
        let mzi = ctx.instantiate::<Mzi>(&p.mzi)?;
        let connector = BezierSbend {
            min_bend_radius: Some(p.bend_radius),
            ..Default::default()
        };

        let mut spec = CircuitSpec::new("mzi_string");
        for i in 0..p.mzi_nums {
            let name = format!("mzi_{i}");
            spec.add_instance(name.clone(), mzi.clone())?;
            spec.place(name, (i as f64 * p.spacing, 0.));
        }
        for i in 1..p.mzi_nums {
            spec.connect_with(
                format!("mzi_{}:combiner_out1", i - 1),
                format!("mzi_{i}:splitter_in1"),
                connector,
            )?;
        }

        spec.external_port_name("mzi_0:splitter_in1", "in")?;
        spec.external_port_name(format!("mzi_{}:combiner_out1", p.mzi_nums - 1), "out")?;
        for i in 0..p.mzi_nums {
            for (arm, heated) in p.mzi.heated.iter().enumerate() {
                if !heated {
                    continue;
                }
                for e in 1..=2 {
                    let name = format!("mzi_{i}_arm{}_elec{e}", arm + 1);
                    spec.external_port_name(
                        format!("mzi_{i}:arm{}_elec{e}", arm + 1),
                        name.clone(),
                    )?;
                    spec.propagate(name);
                }
            }
        }

        ctx.draw_circuit(&spec)?;
        Ok(())
    }
}
