//! Devices packaged with grating couplers for their optical I/O and bond pads
//! for their electrical ports.

use arcstr::ArcStr;
use lumen::circuit::CircuitSpec;
use lumen::component::{Component, NoParams};
use lumen::data::LumenCtx;
use lumen::error::Result;
use lumen::layout::cell::Instance;
use lumen::layout::context::LayoutCtx;
use serde::{Deserialize, Serialize};

use crate::ocdc::{Ocdc, OcdcParams};
use crate::opa::{Opa, OpaParams};
use crate::pads::{PadRow, PadRowParams, Side};
use crate::primitives::{BondPad, GratingCoupler};

/// Grating coupler port facing the device.
const GC_WG: &str = "wg";
/// Grating coupler port exposed by the packaged device.
const GC_VERTICAL: &str = "vertical_in";

/// Adds a grating coupler `gc_name` feeding `dut_port` from `gap` away.
///
/// Couplers on the west side face east and vice versa.
fn add_coupler(
    spec: &mut CircuitSpec,
    gc: &Instance,
    gc_name: &str,
    dut_port: &str,
    gap: f64,
    external: &str,
) -> Result<()> {
    let target = format!("dut:{dut_port}");
    let wg = format!("{gc_name}:{GC_WG}");
    spec.add_instance(gc_name, gc.clone())?;
    if gap < 0. {
        spec.place_relative(wg.clone(), target.clone(), (gap, 0.), Some(0.))?;
        spec.connect(wg, target)?;
    } else {
        spec.place_relative(wg.clone(), target.clone(), (gap, 0.), Some(180.))?;
        spec.connect(target, wg)?;
    }
    spec.external_port_name(format!("{gc_name}:{GC_VERTICAL}"), external)?;
    Ok(())
}

/// Pad rows for the electrical ports of `dut`, placed at the origin.
///
/// With `split`, ports north of the center of the device get a row to the
/// north and the others a row to the south. Otherwise all ports go north.
fn pad_rows(dut: &Instance, split: bool, params: PadRowParams) -> Vec<PadRow> {
    let size = dut.cell().size_info();
    let center = (size.north + size.south) / 2.;
    let (north, south): (Vec<_>, Vec<_>) = dut
        .ports()
        .filter(|p| !p.is_optical())
        .partition(|p| !split || p.position().y >= center);
    let mut rows = vec![PadRow::new(&north, Side::North, size.north, params)];
    if split {
        rows.push(PadRow::new(&south, Side::South, size.south, params));
    }
    rows
}

/// Adds `dut` at the origin with its pads, builds the circuit and draws the wires.
fn finish(
    ctx: &mut LayoutCtx,
    mut spec: CircuitSpec,
    dut: Instance,
    rows: &[PadRow],
) -> Result<()> {
    let pad = ctx.instantiate::<BondPad>(&NoParams)?;
    spec.add_instance("dut", dut)?;
    spec.place("dut", (0., 0.));
    for row in rows {
        row.add_to(&mut spec, "dut", &pad)?;
    }
    ctx.draw_circuit(&spec)?;
    for row in rows {
        row.draw(ctx)?;
    }
    Ok(())
}

/// An [`Opa`] with an input coupler, one output coupler per channel and a
/// row of pads to the north.
pub struct RoutedOpa {
    params: RoutedOpaParams,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoutedOpaParams {
    pub opa: OpaParams,
    pub pads: PadRowParams,
    /// Distance from the input of the array to its coupler.
    pub input_gap: f64,
    /// Distance from each output of the array to its coupler.
    pub output_gap: f64,
}

impl Default for RoutedOpaParams {
    fn default() -> Self {
        Self {
            opa: OpaParams::default(),
            pads: PadRowParams::default(),
            input_gap: 100.,
            output_gap: 300.,
        }
    }
}

impl Component for RoutedOpa {
    type Params = RoutedOpaParams;
    fn new(params: &Self::Params, _ctx: &LumenCtx) -> Result<Self> {
        Ok(Self { params: *params })
    }

    fn name(&self) -> ArcStr {
        arcstr::format!("routed_opa_{}", self.params.opa.n_channels())
    }

    fn layout(&self, ctx: &mut LayoutCtx) -> Result<()> {
        let p = &self.params;
        let dut = ctx.instantiate::<Opa>(&p.opa)?;
        let gc = ctx.instantiate::<GratingCoupler>(&NoParams)?;
        let rows = pad_rows(&dut, false, p.pads);

        let mut spec = CircuitSpec::new("routed_opa");
        add_coupler(&mut spec, &gc, "gr_in", "in", -p.input_gap, "in")?;
        for cnt in 0..p.opa.n_channels() {
            let out = format!("out{cnt}");
            add_coupler(&mut spec, &gc, &format!("gr_{out}"), &out, p.output_gap, &out)?;
        }
        finish(ctx, spec, dut, &rows)
    }
}

/// An [`Ocdc`] between two couplers, with pad rows to the north and south.
pub struct RoutedOcdc {
    params: RoutedOcdcParams,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoutedOcdcParams {
    pub ocdc: OcdcParams,
    pub pads: PadRowParams,
    /// Distance from each end of the circuit to its coupler.
    pub gap: f64,
}

impl Default for RoutedOcdcParams {
    fn default() -> Self {
        Self {
            ocdc: OcdcParams::default(),
            pads: PadRowParams::default(),
            gap: 100.,
        }
    }
}

impl Component for RoutedOcdc {
    type Params = RoutedOcdcParams;
    fn new(params: &Self::Params, _ctx: &LumenCtx) -> Result<Self> {
        Ok(Self { params: *params })
    }

    fn name(&self) -> ArcStr {
        arcstr::literal!("routed_ocdc")
    }

    fn layout(&self, ctx: &mut LayoutCtx) -> Result<()> {
        let p = &self.params;
        let dut = ctx.instantiate::<Ocdc>(&p.ocdc)?;
        let gc = ctx.instantiate::<GratingCoupler>(&NoParams)?;
        let rows = pad_rows(&dut, true, p.pads);

        let mut spec = CircuitSpec::new("routed_ocdc");
        add_coupler(&mut spec, &gc, "gr_in", "in", -p.gap, "in")?;
        add_coupler(&mut spec, &gc, "gr_out", "out", p.gap, "out")?;
        finish(ctx, spec, dut, &rows)
    }
}
