use std::sync::Arc;

use lumengeom::polyline::Polyline;
use lumengeom::Point;

use super::{assemble, prepare, Connect, Connector};
use crate::data::LumenCtx;
use crate::layout::cell::{Cell, Instance};
use crate::layout::port::Port;
use crate::layout::routing::error::{Result, RouteError};
use crate::layout::routing::waveguide::Centerline;

/// Several connectors placed back to back.
///
/// Consecutive connectors meet at the intermediate ports given by `transforms`:
/// a position and the angle, in degrees, along which the route continues.
/// There must be exactly one more connector than intermediate port.
#[derive(Debug, Clone, Default)]
pub struct Combined {
    pub connectors: Vec<Connector>,
    pub transforms: Vec<(Point, f64)>,
}

impl Combined {
    pub fn new(connectors: Vec<Connector>, transforms: Vec<(Point, f64)>) -> Self {
        Self {
            connectors,
            transforms,
        }
    }
}

impl Connect for Combined {
    fn connect(&self, ctx: &LumenCtx, start: &Port, end: &Port, name: &str) -> Result<Arc<Cell>> {
        if self.connectors.len() != self.transforms.len() + 1 {
            return Err(RouteError::InvalidArgs(format!(
                "{} connectors cannot be chained through {} intermediate ports",
                self.connectors.len(),
                self.transforms.len()
            )));
        }
        let template = prepare(ctx, start, end)?;

        let intermediates: Vec<Port> = self
            .transforms
            .iter()
            .map(|(position, angle)| Port::optical("p", *position, *angle, template.clone()))
            .collect();
        let starts = std::iter::once(start.clone()).chain(intermediates.iter().cloned());
        let ends = intermediates
            .iter()
            .map(Port::flipped)
            .chain(std::iter::once(end.clone()));

        let mut parts = Vec::with_capacity(self.connectors.len());
        let mut centerline = Polyline::default();
        for (cnt, ((connector, sp), ep)) in self.connectors.iter().zip(starts).zip(ends).enumerate() {
            let cell = connector.connect(ctx, &sp, &ep, &format!("{name}_segment_{cnt}"))?;
            match cell.get_metadata::<Centerline>() {
                Some(line) => centerline.extend_with(&line.points),
                None => centerline.extend_with(&Polyline::straight(sp.position(), ep.position())),
            }
            parts.push(Instance::new(cell).with_name(format!("segment{cnt}")));
        }
        assemble(ctx, name, parts, &template, start, end, centerline)
    }
}
