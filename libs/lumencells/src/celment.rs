//! Rectangular meshes of phase-shifting MZIs.
//!
//! A mesh of dimension `n` guides `n` channels from west to east. Row `r`
//! holds the MZIs that couple channels `r` and `r + 1`. Along the x-axis the
//! mesh is divided into `n` slots, and the MZIs of a row sit in every other
//! slot, so that rows `r` and `r + 1` alternate. A channel therefore meets one
//! MZI per slot: through the southern ports of an MZI in row `r`, or the
//! northern ports of an MZI in row `r - 1`.

use arcstr::ArcStr;
use lumen::circuit::CircuitSpec;
use lumen::component::Component;
use lumen::data::LumenCtx;
use lumen::error::{ErrorSource, Result};
use lumen::layout::context::LayoutCtx;
use lumen::layout::routing::connector::Manhattan;
use lumen::layout::routing::manhattan::ManhattanParams;
use serde::{Deserialize, Serialize};

use crate::mzi::{PhMzi, PhMziParams};

/// Electrical ports of a [`PhMzi`], all of which a mesh propagates.
const UNIT_ELECTRICAL_PORTS: [&str; 4] =
    ["mzi_arm2_elec1", "mzi_arm2_elec2", "ht_elec1", "ht_elec2"];

pub struct Celment {
    params: CelmentParams,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CelmentParams {
    pub dim: usize,
    pub unit: PhMziParams,
    /// Distance between two MZIs of the same row; derived from the MZI size if omitted.
    pub spacing_x: Option<f64>,
    /// Distance between rows; derived from the MZI size if omitted.
    pub spacing_y: Option<f64>,
    pub bend_radius: f64,
}

impl Default for CelmentParams {
    fn default() -> Self {
        Self {
            dim: 4,
            unit: PhMziParams::default(),
            spacing_x: None,
            spacing_y: None,
            bend_radius: 10.,
        }
    }
}

/// One MZI of the mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unit {
    pub row: usize,
    /// Index of the MZI within its row.
    pub idx: usize,
    pub slot: usize,
}

impl Unit {
    pub fn name(&self) -> String {
        format!("block_{}_{}", self.row, self.idx)
    }
}

impl CelmentParams {
    /// The number of MZIs in `row` and the slot of the first one.
    pub fn row_layout(&self, row: usize) -> (usize, usize) {
        let n = self.dim;
        if n % 2 == 0 {
            (n / 2, row % 2)
        } else if row % 2 == 1 {
            ((n + 1) / 2, 0)
        } else {
            ((n - 1) / 2, 1)
        }
    }

    /// Every MZI of the mesh, row by row.
    pub fn units(&self) -> Vec<Unit> {
        let mut units = Vec::new();
        for row in 0..self.dim.saturating_sub(1) {
            let (count, offset) = self.row_layout(row);
            units.extend((0..count).map(|idx| Unit {
                row,
                idx,
                slot: offset + 2 * idx,
            }));
        }
        units
    }

    /// The MZIs met by `channel`, west to east, with the ports it enters and leaves through.
    pub fn channel(&self, channel: usize) -> Vec<(Unit, &'static str, &'static str)> {
        let mut path: Vec<(Unit, &str, &str)> = self
            .units()
            .into_iter()
            .filter_map(|unit| {
                if unit.row == channel {
                    Some((unit, "in2", "out2"))
                } else if unit.row + 1 == channel {
                    Some((unit, "in1", "out1"))
                } else {
                    None
                }
            })
            .collect();
        path.sort_by_key(|(unit, _, _)| unit.slot);
        path
    }
}

impl Component for Celment {
    type Params = CelmentParams;
    fn new(params: &Self::Params, _ctx: &LumenCtx) -> Result<Self> {
        if params.dim <= 1 {
            return Err(ErrorSource::InvalidArgs(format!(
                "mesh dimension must be greater than 1, got {}",
                params.dim
            ))
            .into());
        }
        Ok(Self { params: *params })
    }

    fn name(&self) -> ArcStr {
        arcstr::format!("celment_{}", self.params.dim)
    }

    fn layout(&self, ctx: &mut LayoutCtx) -> Result<()> {
        let p = &self.params;
        let unit = ctx.instantiate::<PhMzi>(&p.unit)?;
        let size = unit.cell().size_info();
        let spacing_x = p
            .spacing_x
            .unwrap_or(2. * size.east + 6. * p.bend_radius);
        let spacing_y = p
            .spacing_y
            .unwrap_or(size.height() + 4. * p.bend_radius);
        let connector = Manhattan::new(ManhattanParams {
            bend_radius: Some(p.bend_radius),
            ..Default::default()
        });

        let mut spec = CircuitSpec::new("celment");
        for u in p.units() {
            spec.add_instance(u.name(), unit.clone())?;
            spec.place(
                u.name(),
                (
                    u.slot as f64 * spacing_x / 2.,
                    spacing_y * (u.row as f64 + 0.5),
                ),
            );
            for port in UNIT_ELECTRICAL_PORTS {
                spec.propagate(format!("{}_{port}", u.name()));
            }
        }

        for channel in 0..p.dim {
            let path = p.channel(channel);
            for ((prev, _, out), (next, input, _)) in path.iter().zip(path.iter().skip(1)) {
                spec.connect_with(
                    format!("{}:{out}", prev.name()),
                    format!("{}:{input}", next.name()),
                    connector.clone(),
                )?;
            }
            if let (Some((first, input, _)), Some((last, _, out))) = (path.first(), path.last()) {
                spec.external_port_name(
                    format!("{}:{input}", first.name()),
                    format!("in{}", channel + 1),
                )?;
                spec.external_port_name(
                    format!("{}:{out}", last.name()),
                    format!("out{}", channel + 1),
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

    fn params(dim: usize) -> CelmentParams {
        CelmentParams {
            dim,
            ..Default::default()
        }
    }

    #[test]
    fn even_rows_alternate_offsets() {
        let p = params(4);
        assert_eq!(p.row_layout(0), (2, 0));
        assert_eq!(p.row_layout(1), (2, 1));
        assert_eq!(p.row_layout(2), (2, 0));
        assert_eq!(p.units().len(), 6);
    }

    #[test]
    fn odd_rows_alternate_counts() {
        let p = params(5);
        assert_eq!(p.row_layout(0), (2, 1));
        assert_eq!(p.row_layout(1), (3, 0));
        assert_eq!(p.units().len(), 10);
    }

    #[test]
    fn inner_channels_meet_one_unit_per_slot() {
        for dim in 2..8 {
            let p = params(dim);
            for channel in 0..dim {
                let slots: Vec<usize> = p.channel(channel).iter().map(|(u, _, _)| u.slot).collect();
                assert!(!slots.is_empty());
                if channel == 0 || channel == dim - 1 {
                    // Edge channels only meet the MZIs of one row.
                    assert!(slots.windows(2).all(|w| w[1] == w[0] + 2));
                } else {
                    assert_eq!(slots, (0..dim).collect::<Vec<_>>());
                }
            }
        }
    }

    #[test]
    fn every_unit_port_is_used_once() {
        for dim in 2..8 {
            let p = params(dim);
            let mut uses = Vec::new();
            for channel in 0..dim {
                for (unit, input, out) in p.channel(channel) {
                    uses.push(format!("{}:{input}", unit.name()));
                    uses.push(format!("{}:{out}", unit.name()));
                }
            }
            let n = uses.len();
            uses.sort();
            uses.dedup();
            assert_eq!(uses.len(), n);
            assert_eq!(n, 4 * p.units().len());
        }
    }
}
