//! Binary trees of 1x2 splitters.

use arcstr::ArcStr;
use lumen::circuit::CircuitSpec;
use lumen::component::Component;
use lumen::data::LumenCtx;
use lumen::error::{ErrorSource, Result};
use lumen::layout::context::LayoutCtx;
use lumen::layout::routing::connector::BezierSbend;
use serde::{Deserialize, Serialize};

use crate::primitives::{Mmi1x2, MmiParams};

/// A complete binary tree of splitters.
///
/// Level `l` holds `2^l` splitters named `sp_{l}_{n}`, numbered from south to
/// north. The tree exposes `in` and the `2^levels` leaf outputs `out_1` to
/// `out_{2^levels}`, also numbered from south to north.
pub struct SplitterTree {
    params: SplitterTreeParams,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitterTreeParams {
    pub splitter: MmiParams,
    pub levels: usize,
    /// Horizontal distance between consecutive levels.
    pub spacing_x: f64,
    /// Vertical distance between the splitters of the last level.
    pub spacing_y: f64,
    /// Smallest acceptable radius of the connecting S-bends.
    pub bend_radius: f64,
}

impl Default for SplitterTreeParams {
    fn default() -> Self {
        Self {
            splitter: MmiParams::default(),
            levels: 3,
            spacing_x: 100.,
            spacing_y: 50.,
            bend_radius: 5.,
        }
    }
}

impl SplitterTreeParams {
    #[inline]
    pub fn n_outputs(&self) -> usize {
        1 << self.levels
    }

    /// Position of splitter `sp` of level `lev`.
    pub fn position(&self, lev: usize, sp: usize) -> (f64, f64) {
        let y0 = -0.5 * self.spacing_y * (1 << (self.levels - 1)) as f64;
        let pitch = self.spacing_y * (1 << (self.levels - lev - 1)) as f64;
        (
            lev as f64 * self.spacing_x,
            y0 + (sp as f64 + 0.5) * pitch,
        )
    }
}

impl Component for SplitterTree {
    type Params = SplitterTreeParams;
    fn new(params: &Self::Params, _ctx: &LumenCtx) -> Result<Self> {
        if params.levels == 0 {
            return Err(ErrorSource::InvalidArgs(
                "a splitter tree needs at least one level".to_string(),
            )
            .into());
        }
        if params.spacing_x <= params.splitter.total_length() {
            return Err(ErrorSource::InvalidArgs(format!(
                "level spacing {} leaves no room after splitters of length {}",
                params.spacing_x,
                params.splitter.total_length()
            ))
            .into());
        }
        Ok(Self { params: *params })
    }

    fn name(&self) -> ArcStr {
        arcstr::format!("splitter_tree_{}", self.params.levels)
    }

    fn layout(&self, ctx: &mut LayoutCtx) -> Result<()> {
        let p = &self.params;
        let splitter = ctx.instantiate::<Mmi1x2>(&p.splitter)?;
        let connector = BezierSbend {
            min_bend_radius: Some(p.bend_radius),
            ..Default::default()
        };

        let mut spec = CircuitSpec::new("splitter_tree");
        for lev in 0..p.levels {
            for sp in 0..1usize << lev {
                let name = format!("sp_{lev}_{sp}");
                spec.add_instance(name.clone(), splitter.clone())?;
                spec.place(name, p.position(lev, sp));
            }
        }

        for lev in 1..p.levels {
            for sp in 0..1usize << lev {
                // Even children hang off the southern output of their parent.
                let parent_port = if sp % 2 == 0 { "out_2" } else { "out_1" };
                spec.connect_with(
                    format!("sp_{}_{}:{parent_port}", lev - 1, sp / 2),
                    format!("sp_{lev}_{sp}:in_1"),
                    connector,
                )?;
            }
        }

        spec.external_port_name("sp_0_0:in_1", "in")?;
        let last = p.levels - 1;
        for sp in 0..1usize << last {
            spec.external_port_name(
                format!("sp_{last}_{sp}:out_2"),
                format!("out_{}", 2 * sp + 1),
            )?;
            spec.external_port_name(
                format!("sp_{last}_{sp}:out_1"),
                format!("out_{}", 2 * sp + 2),
            )?;
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
    fn positions_are_centered() {
        let p = SplitterTreeParams::default();
        assert_eq!(p.position(0, 0), (0., 0.));
        assert_eq!(p.position(1, 0), (100., -50.));
        assert_eq!(p.position(1, 1), (100., 50.));
        let (x, y) = p.position(2, 3);
        assert_float_eq!(x, 200., abs <= 1e-12);
        assert_float_eq!(y, 75., abs <= 1e-12);
    }

    #[test]
    fn zero_levels_are_rejected() {
        let ctx = LumenCtx::default();
        let params = SplitterTreeParams {
            levels: 0,
            ..Default::default()
        };
        ctx.instantiate_layout::<SplitterTree>(&params)
            .expect_err("empty tree");
    }
}
