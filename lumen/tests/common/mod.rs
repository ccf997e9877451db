#![allow(dead_code)]

use std::sync::Arc;

use arcstr::ArcStr;
use lumen::circuit::{Circuit, CircuitSpec};
use lumen::component::Component;
use lumen::data::LumenCtx;
use lumen::layout::cell::{Cell, Element};
use lumen::layout::context::LayoutCtx;
use lumen::layout::layers::Layer;
use lumen::layout::port::Port;
use lumengeom::{Point, Rect};
use serde::{Deserialize, Serialize};

/// A straight two-port device with `in` on the left and `out` on the right.
pub struct Stub {
    params: StubParams,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StubParams {
    pub length: f64,
    /// Adds an electrical port `h` above the middle of the device.
    pub heater: bool,
}

impl StubParams {
    pub fn new(length: f64) -> Self {
        Self {
            length,
            heater: false,
        }
    }

    pub fn heated(length: f64) -> Self {
        Self {
            length,
            heater: true,
        }
    }
}

impl Component for Stub {
    type Params = StubParams;

    fn new(params: &Self::Params, _ctx: &LumenCtx) -> lumen::error::Result<Self> {
        Ok(Self { params: *params })
    }

    fn name(&self) -> ArcStr {
        if self.params.heater {
            arcstr::literal!("heated_stub")
        } else {
            arcstr::literal!("stub")
        }
    }

    fn layout(&self, ctx: &mut LayoutCtx) -> lumen::error::Result<()> {
        let template = ctx.config().trace_template.clone();
        let length = self.params.length;
        ctx.draw(Element::new(
            Layer::WgCore,
            Rect::new(Point::new(0., -0.25), Point::new(length, 0.25)),
        ));
        ctx.add_port(Port::optical("in", (0., 0.), 180., template.clone()))?;
        ctx.add_port(Port::optical("out", (length, 0.), 0., template))?;
        if self.params.heater {
            ctx.draw(Element::new(
                Layer::Heater,
                Rect::new(Point::new(0., 1.), Point::new(length, 3.)),
            ));
            ctx.add_port(Port::electrical("h", (length / 2., 3.), 90.))?;
        }
        Ok(())
    }
}

pub fn stub(ctx: &LumenCtx, length: f64) -> lumen::layout::cell::Instance {
    ctx.instantiate_layout::<Stub>(&StubParams::new(length))
        .expect("failed to instantiate stub")
}

pub fn heated_stub(ctx: &LumenCtx, length: f64) -> lumen::layout::cell::Instance {
    ctx.instantiate_layout::<Stub>(&StubParams::heated(length))
        .expect("failed to instantiate heated stub")
}

/// Builds `spec` into a fresh cell named after it.
pub fn build(ctx: &LumenCtx, spec: &CircuitSpec) -> lumen::error::Result<(Arc<Cell>, Circuit)> {
    let mut circuit = None;
    let cell = ctx.generate_cell(spec.name().clone(), |cell| {
        circuit = Some(cell.draw_circuit(spec)?);
        Ok(())
    })?;
    Ok((cell, circuit.expect("circuit was not built")))
}

pub fn port_names(circuit: &Circuit) -> Vec<String> {
    circuit.ports.iter().map(|p| p.name().to_string()).collect()
}
