use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{prepare, Connect};
use crate::data::LumenCtx;
use crate::layout::cell::Cell;
use crate::layout::port::Port;
use crate::layout::routing::error::Result;
use crate::layout::routing::shapes::{route_line, route_sbend, rounding};
use crate::layout::routing::waveguide::Waveguide;

/// A straight waveguide between the two ports.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Straight;

impl Connect for Straight {
    fn connect(&self, ctx: &LumenCtx, start: &Port, end: &Port, name: &str) -> Result<Arc<Cell>> {
        let template = prepare(ctx, start, end)?;
        Waveguide::new(route_line(start, end), template)
            .facing(start, end)
            .build(ctx, name)
    }
}

/// A circular S-bend with a fixed bend radius.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sbend {
    /// Defaults to the technology bend radius.
    pub bend_radius: Option<f64>,
}

impl Connect for Sbend {
    fn connect(&self, ctx: &LumenCtx, start: &Port, end: &Port, name: &str) -> Result<Arc<Cell>> {
        let template = prepare(ctx, start, end)?;
        let config = ctx.config();
        let radius = self.bend_radius.unwrap_or(config.bend_radius);
        let route = route_sbend(start, end, radius);
        Waveguide::rounded(&route, template, &rounding(0., config.angle_step), radius)
            .facing(start, end)
            .build(ctx, name)
    }
}

#[cfg(test)]
mod tests {
    use float_eq::assert_float_eq;
    use lumengeom::Point;

    use super::*;
    use crate::layout::routing::error::RouteError;
    use crate::layout::routing::waveguide::{Centerline, IN_PORT, OUT_PORT};
    use crate::layout::trace::TraceTemplate;

    #[test]
    fn straight_ports_face_the_joined_ports() {
        let ctx = LumenCtx::default();
        let start = Port::optical("a", (0., 0.), 0., TraceTemplate::default());
        let end = Port::optical("b", (30., 0.), 180., TraceTemplate::default());
        let cell = Straight.connect(&ctx, &start, &end, "wg").unwrap();

        let p_in = cell.port(IN_PORT).unwrap();
        let p_out = cell.port(OUT_PORT).unwrap();
        assert_eq!(p_in.position(), start.position());
        assert_eq!(p_out.position(), end.position());
        assert_float_eq!(p_in.angle(), 180., abs <= 1e-9);
        assert_float_eq!(p_out.angle(), 0., abs <= 1e-9);
    }

    #[test]
    fn sbend_is_rounded_with_the_default_radius() {
        let ctx = LumenCtx::default();
        let start = Port::optical("a", (0., 0.), 0., TraceTemplate::default());
        let end = Port::optical("b", (100., 60.), 180., TraceTemplate::default());
        let cell = Sbend::default().connect(&ctx, &start, &end, "sb").unwrap();

        let line = &cell.get_metadata::<Centerline>().unwrap().points;
        assert!(line.len() > 4);
        assert_eq!(line.first(), Some(Point::new(0., 0.)));
        assert!(line.last().unwrap().approx_eq(Point::new(100., 60.), 1e-9));
    }

    #[test]
    fn electrical_ports_are_rejected() {
        let ctx = LumenCtx::default();
        let start = Port::electrical("a", (0., 0.), 0.);
        let end = Port::optical("b", (30., 0.), 180., TraceTemplate::default());
        let err = Straight.connect(&ctx, &start, &end, "wg").unwrap_err();
        assert!(matches!(err, RouteError::IncompatibleDomains(..)));
    }
}
