//! Triangular arrays of waveguide crossings.

use arcstr::ArcStr;
use lumen::circuit::CircuitSpec;
use lumen::component::Component;
use lumen::data::LumenCtx;
use lumen::error::{ErrorSource, Result};
use lumen::layout::context::LayoutCtx;
use serde::{Deserialize, Serialize};

use crate::primitives::Crossing;

/// A staircase of crossings.
///
/// Row `i`, counted from `levels` at the south down to 1 at the north, holds
/// `i` crossings `crossing_{i}_{j}`. Crossings are chained eastwards along
/// each row and northwards into the next row.
pub struct CrossingArray {
    params: CrossingArrayParams,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CrossingArrayParams {
    pub levels: usize,
    /// Distance between the centers of neighboring crossings.
    pub spacing: f64,
    /// Arm length of each crossing.
    pub crossing_length: f64,
}

impl Default for CrossingArrayParams {
    fn default() -> Self {
        Self {
            levels: 5,
            spacing: 30.,
            crossing_length: 10.,
        }
    }
}

impl CrossingArrayParams {
    pub fn n_crossings(&self) -> usize {
        self.levels * (self.levels + 1) / 2
    }

    fn position(&self, i: usize, j: usize) -> (f64, f64) {
        (
            j as f64 * self.spacing,
            (self.levels - i) as f64 * self.spacing,
        )
    }
}

fn crossing_name(i: usize, j: usize) -> String {
    format!("crossing_{i}_{j}")
}

impl Component for CrossingArray {
    type Params = CrossingArrayParams;
    fn new(params: &Self::Params, _ctx: &LumenCtx) -> Result<Self> {
        if params.levels == 0 {
            return Err(ErrorSource::InvalidArgs(
                "a crossing array needs at least one level".to_string(),
            )
            .into());
        }
        if params.spacing <= params.crossing_length {
            return Err(ErrorSource::InvalidArgs(format!(
                "crossings of length {} overlap at spacing {}",
                params.crossing_length, params.spacing
            ))
            .into());
        }
        Ok(Self { params: *params })
    }

    fn name(&self) -> ArcStr {
        arcstr::format!("crossing_array_{}", self.params.levels)
    }

    fn layout(&self, ctx: &mut LayoutCtx) -> Result<()> {
        let p = &self.params;
        let crossing = ctx.instantiate::<Crossing>(&p.crossing_length)?;

        let mut spec = CircuitSpec::new("crossing_array");
        for i in (1..=p.levels).rev() {
            for j in 0..i {
                spec.add_instance(crossing_name(i, j), crossing.clone())?;
                spec.place(crossing_name(i, j), p.position(i, j));
            }
        }
        for i in (2..=p.levels).rev() {
            for j in 0..i - 1 {
                spec.connect(
                    format!("{}:out1", crossing_name(i, j)),
                    format!("{}:in1", crossing_name(i, j + 1)),
                )?;
                spec.connect(
                    format!("{}:out2", crossing_name(i, j)),
                    format!("{}:in2", crossing_name(i - 1, j)),
                )?;
            }
        }

        ctx.draw_circuit(&spec)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_shrink_northwards() {
        let p = CrossingArrayParams::default();
        assert_eq!(p.n_crossings(), 15);
        assert_eq!(p.position(5, 0), (0., 0.));
        assert_eq!(p.position(1, 0), (0., 120.));
    }

    #[test]
    fn overlapping_crossings_are_rejected() {
        let ctx = LumenCtx::default();
        let params = CrossingArrayParams {
            spacing: 10.,
            ..Default::default()
        };
        ctx.instantiate_layout::<CrossingArray>(&params)
            .expect_err("no room between crossings");
    }
}
