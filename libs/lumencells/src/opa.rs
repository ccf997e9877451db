//! Optical phased arrays.

use arcstr::ArcStr;
use lumen::circuit::CircuitSpec;
use lumen::component::Component;
use lumen::data::LumenCtx;
use lumen::error::{ErrorSource, Result};
use lumen::layout::context::LayoutCtx;
use lumen::layout::routing::connector::Manhattan;
use lumen::layout::routing::manhattan::ManhattanParams;
use serde::{Deserialize, Serialize};

use crate::primitives::{HeatedWaveguide, HeatedWaveguideParams, MmiParams};
use crate::splitter_tree::{SplitterTree, SplitterTreeParams};

/// A splitter tree feeding one heated waveguide per leaf.
///
/// Heater `ht{n}` is driven through `hti{n}` and `hto{n}` and emits at
/// `out{n}`, numbered from south to north.
pub struct Opa {
    params: OpaParams,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OpaParams {
    pub splitter: MmiParams,
    pub levels: usize,
    /// Distance between the tree levels, and between the tree and the heaters.
    pub spacing_x: f64,
    /// Distance between neighboring heaters.
    pub spacing_y: f64,
    pub bend_radius: f64,
    pub heater: HeatedWaveguideParams,
}

impl Default for OpaParams {
    fn default() -> Self {
        Self {
            splitter: MmiParams::default(),
            levels: 4,
            spacing_x: 100.,
            spacing_y: 50.,
            bend_radius: 5.,
            heater: HeatedWaveguideParams {
                heater_length: 1000.,
                ..HeatedWaveguideParams::phase_shifter()
            },
        }
    }
}

impl OpaParams {
    #[inline]
    pub fn n_channels(&self) -> usize {
        1 << self.levels
    }

    pub fn tree(&self) -> SplitterTreeParams {
        SplitterTreeParams {
            splitter: self.splitter,
            levels: self.levels,
            spacing_x: self.spacing_x,
            // Two leaves per splitter, one heater per leaf.
            spacing_y: 2. * self.spacing_y,
            bend_radius: self.bend_radius,
        }
    }

    /// Vertical position of heater `cnt`.
    pub fn heater_y(&self, cnt: usize) -> f64 {
        (cnt as f64 - (self.n_channels() - 1) as f64 / 2.) * self.spacing_y
    }
}

impl Component for Opa {
    type Params = OpaParams;
    fn new(params: &Self::Params, _ctx: &LumenCtx) -> Result<Self> {
        if params.levels == 0 {
            return Err(ErrorSource::InvalidArgs(
                "a phased array needs at least one splitter level".to_string(),
            )
            .into());
        }
        let offset = (params.spacing_y - params.splitter.port_spacing) / 2.;
        if offset < 2. * params.bend_radius {
            return Err(ErrorSource::InvalidArgs(format!(
                "heater spacing {} is too tight for bends of radius {}",
                params.spacing_y, params.bend_radius
            ))
            .into());
        }
        Ok(Self { params: *params })
    }

    fn name(&self) -> ArcStr {
        arcstr::format!("opa_{}", self.params.n_channels())
    }

    fn layout(&self, ctx: &mut LayoutCtx) -> Result<()> {
        let p = &self.params;
        let tree = ctx.instantiate::<SplitterTree>(&p.tree())?;
        let heater = ctx.instantiate::<HeatedWaveguide>(&p.heater)?;
        let heater_x = tree.cell().size_info().east + p.spacing_x;
        let connector = Manhattan::new(ManhattanParams {
            bend_radius: Some(p.bend_radius),
            ..Default::default()
        });

        let mut spec = CircuitSpec::new("opa");
        spec.add_instance("tree", tree)?;
        spec.place("tree", (0., 0.));
        spec.external_port_name("tree:in", "in")?;

        for cnt in 0..p.n_channels() {
            let ht = format!("ht{cnt}");
            spec.add_instance(ht.clone(), heater.clone())?;
            spec.place(ht.clone(), (heater_x, p.heater_y(cnt)));
            spec.connect_with(
                format!("tree:out_{}", cnt + 1),
                format!("{ht}:in"),
                connector.clone(),
            )?;
            spec.external_port_name(format!("{ht}:out"), format!("out{cnt}"))?;
            for (port, name) in [("elec1", format!("hti{cnt}")), ("elec2", format!("hto{cnt}"))] {
                spec.external_port_name(format!("{ht}:{port}"), name.clone())?;
                spec.propagate(name);
            }
        }

        ctx.draw_circuit(&spec)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use float_eq::assert_float_eq;

    use super::*;

    #[test]
    fn heaters_are_centered() {
        let p = OpaParams::default();
        assert_eq!(p.n_channels(), 16);
        assert_float_eq!(p.heater_y(0), -375., abs <= 1e-12);
        assert_float_eq!(p.heater_y(15), 375., abs <= 1e-12);
    }

    #[test]
    fn cramped_heaters_are_rejected() {
        let ctx = LumenCtx::default();
        let params = OpaParams {
            spacing_y: 20.,
            ..Default::default()
        };
        ctx.instantiate_layout::<Opa>(&params)
            .expect_err("bends do not fit");
    }
}
