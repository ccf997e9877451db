//! Rows of bond pads wired to the electrical ports of a device.
//!
//! Each port gets its own pad and a Manhattan wire on [`Layer::Metal1`]. A wire
//! leaves its port sideways to a private column, runs to a private level
//! between the device and the pads, then across and up to its pad. Columns and
//! levels are assigned so that wires do not cross; clearance to the geometry
//! of the device is not checked.

use arcstr::ArcStr;
use lumen::circuit::CircuitSpec;
use lumen::error::Result;
use lumen::layout::cell::{Element, Instance};
use lumen::layout::context::LayoutCtx;
use lumen::layout::layers::Layer;
use lumen::layout::port::Port;
use lumengeom::polyline::Polyline;
use lumengeom::{Path, Point, EPSILON};
use serde::{Deserialize, Serialize};

/// Electrical port of the bond pad cell.
pub const PAD_PORT: &str = "m1";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PadRowParams {
    /// Distance between neighboring pads, and between the pads and the nearest wire level.
    pub pitch: f64,
    /// Distance between neighboring wires.
    pub wire_spacing: f64,
    pub wire_width: f64,
    /// Horizontal distance from a port to the nearest wire column.
    pub column_offset: f64,
}

impl Default for PadRowParams {
    fn default() -> Self {
        Self {
            pitch: 100.,
            wire_spacing: 10.,
            wire_width: 4.,
            column_offset: 50.,
        }
    }
}

/// Side of the device a pad row is placed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    North,
    South,
}

impl Side {
    #[inline]
    fn sign(self) -> f64 {
        match self {
            Self::North => 1.,
            Self::South => -1.,
        }
    }

    /// Angle of the pad ports.
    #[inline]
    fn angle(self) -> f64 {
        match self {
            Self::North => 90.,
            Self::South => 270.,
        }
    }
}

/// A device port wired to a pad.
#[derive(Debug, Clone, PartialEq)]
pub struct PadLink {
    /// Name of the device port, also used for the pad.
    pub name: ArcStr,
    pub start: Point,
    pub pad: Point,
    pub wire: Polyline,
}

impl PadLink {
    /// Name of the pad instance.
    pub fn pad_name(&self) -> String {
        format!("bp_{}", self.name)
    }
}

/// Pads and wires for a set of ports on one side of a device.
#[derive(Debug, Clone, PartialEq)]
pub struct PadRow {
    pub side: Side,
    /// Center line of the pads.
    pub y: f64,
    /// Links ordered from west to east by pad.
    pub links: Vec<PadLink>,
    params: PadRowParams,
}

impl PadRow {
    /// Lays out pads for `ports`, all lying on the inner side of `edge`.
    ///
    /// `edge` is the northern or southern extent of the device.
    pub fn new(ports: &[Port], side: Side, edge: f64, params: PadRowParams) -> Self {
        let s = side.sign();
        let d = params.wire_spacing;
        let n = ports.len();
        let y = edge + s * (params.pitch + n as f64 * d);
        if n == 0 {
            return Self {
                side,
                y,
                links: Vec::new(),
                params,
            };
        }

        let mut starts: Vec<(ArcStr, Point)> = ports
            .iter()
            .map(|p| (p.name().clone(), p.position()))
            .collect();
        starts.sort_by(|a, b| a.1.x.total_cmp(&b.1.x));

        let (west, east) = starts
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(w, e), (_, p)| {
                (w.min(p.x), e.max(p.x))
            });
        let center = (west + east) / 2.;
        let pad_x = |i: usize| center + (i as f64 - (n - 1) as f64 / 2.) * params.pitch;

        // Ports sharing a column jog the same way, the one farthest from the
        // pads to the outermost wire column.
        let mut columns = vec![0.; n];
        let mut i = 0;
        while i < n {
            let x = starts[i].1.x;
            let mut j = i + 1;
            while j < n && (starts[j].1.x - x).abs() <= EPSILON {
                j += 1;
            }
            let mean = (i..j).map(pad_x).sum::<f64>() / (j - i) as f64;
            let westward = mean < x;
            let run = &mut starts[i..j];
            run.sort_by(|a, b| {
                let (da, db) = ((y - a.1.y).abs(), (y - b.1.y).abs());
                if westward {
                    db.total_cmp(&da)
                } else {
                    da.total_cmp(&db)
                }
            });
            let m = j - i;
            for r in 0..m {
                columns[i + r] = if westward {
                    x - params.column_offset - (m - 1 - r) as f64 * d
                } else {
                    x + params.column_offset + r as f64 * d
                };
            }
            i = j;
        }

        // Westbound wires nearer the west run lower, eastbound ones nearer the
        // east run lower.
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| columns[a].total_cmp(&columns[b]));
        let (westbound, eastbound): (Vec<usize>, Vec<usize>) =
            order.into_iter().partition(|&k| pad_x(k) < columns[k]);
        let mut tracks = vec![0; n];
        for (q, &k) in westbound.iter().enumerate() {
            tracks[k] = q;
        }
        for (q, &k) in eastbound.iter().enumerate() {
            tracks[k] = eastbound.len() - 1 - q;
        }

        let links = starts
            .into_iter()
            .enumerate()
            .map(|(k, (name, start))| {
                let pad = Point::new(pad_x(k), y);
                let level = edge + s * d * (tracks[k] + 1) as f64;
                let wire = Polyline::new(vec![
                    start,
                    Point::new(columns[k], start.y),
                    Point::new(columns[k], level),
                    Point::new(pad.x, level),
                    pad,
                ])
                .remove_identicals();
                PadLink {
                    name,
                    start,
                    pad,
                    wire,
                }
            })
            .collect();

        Self {
            side,
            y,
            links,
            params,
        }
    }

    /// Adds a pad per link to `spec` and ties it to the port of `dut` it serves.
    ///
    /// The port and its pad share one external name, so the netlist joins
    /// them through a single external term.
    pub fn add_to(&self, spec: &mut CircuitSpec, dut: &str, pad: &Instance) -> Result<()> {
        for link in self.links.iter() {
            let bp = link.pad_name();
            spec.add_instance(bp.clone(), pad.clone())?;
            spec.place(bp.clone(), link.pad);
            spec.external_port_name(format!("{dut}:{}", link.name), link.name.clone())?;
            spec.external_port_name(format!("{bp}:{PAD_PORT}"), link.name.clone())?;
        }
        Ok(())
    }

    /// Draws the wires and exposes each pad under the name of its port.
    pub fn draw(&self, ctx: &mut LayoutCtx) -> Result<()> {
        for link in self.links.iter() {
            ctx.draw(Element::new(
                Layer::Metal1,
                Path::new(link.wire.points.clone(), self.params.wire_width),
            ));
            ctx.add_port(Port::electrical(
                link.name.clone(),
                link.pad,
                self.side.angle(),
            ))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;
    use lumengeom::line::segment_intersection;

    use super::*;

    fn ports(points: &[(f64, f64)]) -> Vec<Port> {
        points
            .iter()
            .enumerate()
            .map(|(i, &p)| Port::electrical(format!("e{i}"), p, 90.))
            .collect()
    }

    fn assert_no_crossings(row: &PadRow) {
        for (a, b) in row.links.iter().tuple_combinations() {
            for (a0, a1) in a.wire.points.iter().copied().tuple_windows() {
                for (b0, b1) in b.wire.points.iter().copied().tuple_windows() {
                    assert!(
                        segment_intersection(a0, a1, b0, b1).is_none(),
                        "wires to {} and {} cross",
                        a.pad_name(),
                        b.pad_name()
                    );
                }
            }
        }
    }

    fn assert_manhattan(row: &PadRow) {
        for link in row.links.iter() {
            assert_eq!(link.wire.points.first(), Some(&link.start));
            assert_eq!(link.wire.points.last(), Some(&link.pad));
            for (p, q) in link.wire.points.iter().tuple_windows() {
                assert!(
                    (p.x - q.x).abs() < 1e-9 || (p.y - q.y).abs() < 1e-9,
                    "{p} to {q} is not axis aligned"
                );
            }
        }
    }

    #[test]
    fn stacked_ports_fan_out_without_crossing() {
        let row = PadRow::new(
            &ports(&[(0., -20.), (0., 0.), (0., 20.)]),
            Side::North,
            30.,
            PadRowParams::default(),
        );
        assert!((row.y - 160.).abs() < 1e-9);
        let pads: Vec<f64> = row.links.iter().map(|l| l.pad.x).collect();
        assert_eq!(pads, vec![-100., 0., 100.]);
        // The nearest port takes the innermost column and the westmost pad.
        assert_eq!(row.links[0].name.as_str(), "e2");
        assert_eq!(row.links[0].wire.points[1], Point::new(50., 20.));
        assert_manhattan(&row);
        assert_no_crossings(&row);
    }

    #[test]
    fn two_columns_fan_out_without_crossing() {
        let points: Vec<(f64, f64)> = [0., 500.]
            .into_iter()
            .flat_map(|x| [-20., 0., 20.].map(|y| (x, y)))
            .collect();
        let row = PadRow::new(&ports(&points), Side::North, 30., PadRowParams::default());
        assert_eq!(row.links.len(), 6);
        assert_manhattan(&row);
        assert_no_crossings(&row);
        for link in row.links.iter() {
            let levels = &link.wire.points[1..link.wire.points.len() - 1];
            assert!(levels.iter().all(|p| p.y < row.y - 50.));
        }
    }

    #[test]
    fn southern_rows_mirror_northern_ones() {
        let points = [(0., -20.), (0., 0.), (0., 20.)];
        let north = PadRow::new(&ports(&points), Side::North, 30., PadRowParams::default());
        let mirrored: Vec<(f64, f64)> = points.iter().map(|&(x, y)| (x, -y)).collect();
        let south = PadRow::new(&ports(&mirrored), Side::South, -30., PadRowParams::default());
        assert!((south.y + north.y).abs() < 1e-9);
        for (n, s) in north.links.iter().zip(south.links.iter()) {
            assert_eq!(n.wire.len(), s.wire.len());
            for (p, q) in n.wire.points.iter().zip(s.wire.points.iter()) {
                assert!(p.approx_eq(Point::new(q.x, -q.y), 1e-9));
            }
        }
    }

    #[test]
    fn no_ports_give_an_empty_row() {
        let row = PadRow::new(&[], Side::South, 0., PadRowParams::default());
        assert!(row.links.is_empty());
    }
}
