//! Optical code-division circuits.

use arcstr::ArcStr;
use lumen::circuit::CircuitSpec;
use lumen::component::Component;
use lumen::data::LumenCtx;
use lumen::error::{ErrorSource, Result};
use lumen::layout::context::LayoutCtx;
use lumen::layout::placement::PlaceSpec;
use lumen::layout::routing::connector::BezierSbend;
use lumengeom::Point;
use serde::{Deserialize, Serialize};

use crate::mzi_string::{MziString, MziStringParams};
use crate::primitives::{HeatedWaveguide, HeatedWaveguideParams};
use crate::splitter_tree::{SplitterTree, SplitterTreeParams};

/// A splitter tree whose even outputs each run through an MZI string and a
/// heated waveguide into a mirrored combiner tree.
///
/// The last output carries only a heated waveguide. Odd outputs of both trees
/// stay unconnected and are exposed under their default names.
pub struct Ocdc {
    params: OcdcParams,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OcdcParams {
    pub tree: SplitterTreeParams,
    pub mzi_string: MziStringParams,
    pub heater: HeatedWaveguideParams,
}

impl Default for OcdcParams {
    fn default() -> Self {
        Self {
            tree: SplitterTreeParams {
                spacing_x: 150.,
                ..Default::default()
            },
            mzi_string: MziStringParams {
                mzi_nums: 3,
                ..Default::default()
            },
            heater: HeatedWaveguideParams::phase_shifter(),
        }
    }
}

impl OcdcParams {
    /// The number of MZI strings.
    pub fn n_strings(&self) -> usize {
        (1 << (self.tree.levels - 1)) - 1
    }
}

impl Component for Ocdc {
    type Params = OcdcParams;
    fn new(params: &Self::Params, _ctx: &LumenCtx) -> Result<Self> {
        if params.tree.levels < 2 {
            return Err(ErrorSource::InvalidArgs(format!(
                "an OCDC needs a splitter tree of at least 2 levels, got {}",
                params.tree.levels
            ))
            .into());
        }
        Ok(Self { params: *params })
    }

    fn name(&self) -> ArcStr {
        arcstr::literal!("ocdc")
    }

    fn layout(&self, ctx: &mut LayoutCtx) -> Result<()> {
        let p = &self.params;
        let tree = ctx.instantiate::<SplitterTree>(&p.tree)?;
        let string = ctx.instantiate::<MziString>(&p.mzi_string)?;
        let heater = ctx.instantiate::<HeatedWaveguide>(&p.heater)?;

        let gap = p.tree.spacing_x;
        let n_out = p.tree.n_outputs();
        let n_strings = p.n_strings();
        let string_length = string.port("out")?.position().x - string.port("in")?.position().x;
        let tree_out = tree.port(&format!("out_{n_out}"))?.position().x;
        let heater_x = tree_out + gap + string_length + gap / 2.;
        let combiner_x = heater_x + p.heater.heater_length + gap / 2. + tree_out;
        let connector = BezierSbend {
            min_bend_radius: Some(p.tree.bend_radius),
            ..Default::default()
        };

        let mut spec = CircuitSpec::new("ocdc");
        spec.add_instance("splitter", tree.clone())?
            .add_instance("combiner", tree)?;
        spec.place("splitter", (0., 0.));
        spec.place_spec(PlaceSpec::Place {
            inst: "combiner".into(),
            position: Point::new(combiner_x, 0.),
            angle: 0.,
            flip_h: true,
            flip_v: false,
        });

        let route = |spec: &mut CircuitSpec, tree_port: String, chain: &[&str]| -> Result<()> {
            let mut from = format!("splitter:{tree_port}");
            for inst in chain {
                spec.connect_with(from, format!("{inst}:in"), connector)?;
                from = format!("{inst}:out");
            }
            spec.connect_with(from, format!("combiner:{tree_port}"), connector)?;
            Ok(())
        };

        for i in 0..n_strings {
            let (mzis, ht) = (format!("mzis_{i}"), format!("ht_wg_{i}"));
            let tree_port = format!("out_{}", 2 * (i + 1));
            spec.add_instance(mzis.clone(), string.clone())?
                .add_instance(ht.clone(), heater.clone())?;
            spec.place_relative(
                format!("{mzis}:in"),
                format!("splitter:{tree_port}"),
                (gap, 0.),
                None,
            )?;
            spec.place_relative(
                format!("{ht}:in"),
                format!("{mzis}:out"),
                (gap / 2., 0.),
                None,
            )?;
            route(&mut spec, tree_port, &[mzis.as_str(), ht.as_str()])?;

            for j in 0..p.mzi_string.mzi_nums {
                for (arm, heated) in p.mzi_string.mzi.heated.iter().enumerate() {
                    if !heated {
                        continue;
                    }
                    for e in 1..=2 {
                        let name = format!("mzi_{i}_{j}_arm{}_elec{e}", arm + 1);
                        spec.external_port_name(
                            format!("{mzis}:mzi_{j}_arm{}_elec{e}", arm + 1),
                            name.clone(),
                        )?;
                        spec.propagate(name);
                    }
                }
            }
        }

        let ht = format!("ht_wg_{n_strings}");
        spec.add_instance(ht.clone(), heater)?;
        spec.place_relative(
            format!("{ht}:in"),
            format!("splitter:out_{n_out}"),
            (heater_x - tree_out, 0.),
            None,
        )?;
        route(&mut spec, format!("out_{n_out}"), &[ht.as_str()])?;

        for i in 0..=n_strings {
            for e in 1..=2 {
                let name = format!("ht_wg_{i}_elec{e}");
                spec.external_port_name(format!("ht_wg_{i}:elec{e}"), name.clone())?;
                spec.propagate(name);
            }
        }
        spec.external_port_name("splitter:in", "in")?;
        spec.external_port_name("combiner:in", "out")?;

        ctx.draw_circuit(&spec)?;
        Ok(())
    }
}
