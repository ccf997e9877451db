//! Connectors: cells that join two optical ports with a waveguide.
//!
//! A connector's `in` port sits on the start port and its `out` port on the end
//! port, each facing the port it joins.

use std::sync::Arc;

use enum_dispatch::enum_dispatch;
use indexmap::IndexMap;
use lumengeom::polyline::Polyline;

use super::error::{Result, RouteError};
use super::util::{check_domains, choose_template};
use super::waveguide::{Centerline, IN_PORT, OUT_PORT};
use crate::data::LumenCtx;
use crate::layout::cell::{Cell, Instance};
use crate::layout::port::Port;
use crate::layout::trace::TraceTemplate;

mod basic;
mod bezier;
mod combined;
mod manhattan;

pub use basic::{Sbend, Straight};
pub use bezier::{
    BezierBend, BezierBendFixedLength, BezierSbend, BezierSbendTapered, BezierUbend,
    BezierUbendFixedRadius,
};
pub use combined::Combined;
pub use manhattan::{FixedBend, Manhattan, ManhattanFixedBend, ManhattanOffset, WideManhattan};

/// Builds the cell joining two ports.
#[enum_dispatch]
pub trait Connect {
    /// Generates a connector cell named `name` from `start` to `end`.
    ///
    /// Both ports are given in the coordinates of the cell the connector
    /// will be instantiated in, at the origin.
    fn connect(&self, ctx: &LumenCtx, start: &Port, end: &Port, name: &str) -> Result<Arc<Cell>>;
}

/// Every connector known to the circuit engine.
#[enum_dispatch(Connect)]
#[derive(Debug, Clone)]
pub enum Connector {
    Straight,
    Sbend,
    BezierSbend,
    BezierSbendTapered,
    BezierUbend,
    BezierUbendFixedRadius,
    BezierBend,
    BezierBendFixedLength,
    Manhattan,
    ManhattanOffset,
    WideManhattan,
    ManhattanFixedBend,
    Combined,
}

impl Default for Connector {
    fn default() -> Self {
        Self::Manhattan(Manhattan::default())
    }
}

impl Connector {
    /// A short name identifying the kind of connector, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Straight(_) => "straight",
            Self::Sbend(_) => "sbend",
            Self::BezierSbend(_) => "bezier_sbend",
            Self::BezierSbendTapered(_) => "bezier_sbend_tapered",
            Self::BezierUbend(_) => "bezier_ubend",
            Self::BezierUbendFixedRadius(_) => "bezier_ubend_fixed_radius",
            Self::BezierBend(_) => "bezier_bend",
            Self::BezierBendFixedLength(_) => "bezier_bend_fixed_length",
            Self::Manhattan(_) => "manhattan",
            Self::ManhattanOffset(_) => "manhattan_offset",
            Self::WideManhattan(_) => "wide_manhattan",
            Self::ManhattanFixedBend(_) => "manhattan_fixed_bend",
            Self::Combined(_) => "combined",
        }
    }
}

/// Default connectors under their short names.
pub fn bend_table() -> IndexMap<&'static str, Connector> {
    IndexMap::from([
        ("BEZ_S", BezierSbend::default().into()),
        ("BEZ_B", BezierBend::default().into()),
        ("BEZ_U", BezierUbend::default().into()),
        ("SB", Sbend::default().into()),
    ])
}

/// Checks the port domains and picks the trace template of a connector.
fn prepare(ctx: &LumenCtx, start: &Port, end: &Port) -> Result<TraceTemplate> {
    check_domains(start, end)?;
    Ok(choose_template(start, end, &ctx.config().trace_template))
}

/// Generates a connector cell made of several sub-cells.
///
/// The sub-cells are drawn in the coordinates of the connector, so `parts` are
/// instantiated without a transformation unless they carry their own.
fn assemble(
    ctx: &LumenCtx,
    name: &str,
    parts: Vec<Instance>,
    template: &TraceTemplate,
    start: &Port,
    end: &Port,
    centerline: Polyline,
) -> Result<Arc<Cell>> {
    ctx.generate_cell(name, |cell| {
        for part in parts {
            cell.add_instance(part);
        }
        cell.add_ports([
            Port::optical(IN_PORT, start.position(), start.angle() + 180., template.clone()),
            Port::optical(OUT_PORT, end.position(), end.angle() + 180., template.clone()),
        ])?;
        cell.set_metadata(Centerline {
            points: centerline,
            template: template.clone(),
        });
        Ok(())
    })
    .map_err(RouteError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bend_table_names() {
        let table = bend_table();
        assert_eq!(
            table.keys().copied().collect::<Vec<_>>(),
            vec!["BEZ_S", "BEZ_B", "BEZ_U", "SB"]
        );
        assert_eq!(table["BEZ_U"].kind(), "bezier_ubend");
    }

    #[test]
    fn manhattan_is_the_default() {
        assert_eq!(Connector::default().kind(), "manhattan");
    }
}
