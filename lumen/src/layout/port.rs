//! Directional connection points of cells.

use std::fmt::Display;

use indexmap::map::Entry;
use indexmap::IndexMap;
use lumengeom::orientation::wrap_angle;
use lumengeom::transform::{Transform, Transformation, Translate};
use lumengeom::Point;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::trace::TraceTemplate;
use crate::deps::arcstr::ArcStr;

/// The physical domain a port belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Domain {
    Optical,
    Electrical,
}

impl Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Optical => write!(f, "optical"),
            Self::Electrical => write!(f, "electrical"),
        }
    }
}

/// A named connection point.
///
/// `angle` is the direction, in degrees, in which signals leave the cell through the port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    name: ArcStr,
    position: Point,
    angle: f64,
    domain: Domain,
    trace_template: Option<TraceTemplate>,
    n_modes: usize,
}

impl Port {
    /// Creates an optical port carrying a single mode.
    pub fn optical(
        name: impl Into<ArcStr>,
        position: impl Into<Point>,
        angle: f64,
        trace_template: TraceTemplate,
    ) -> Self {
        Self {
            name: name.into(),
            position: position.into(),
            angle: wrap_angle(angle),
            domain: Domain::Optical,
            trace_template: Some(trace_template),
            n_modes: 1,
        }
    }

    /// Creates an electrical port.
    pub fn electrical(name: impl Into<ArcStr>, position: impl Into<Point>, angle: f64) -> Self {
        Self {
            name: name.into(),
            position: position.into(),
            angle: wrap_angle(angle),
            domain: Domain::Electrical,
            trace_template: None,
            n_modes: 1,
        }
    }

    #[inline]
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    #[inline]
    pub fn position(&self) -> Point {
        self.position
    }

    #[inline]
    pub fn angle(&self) -> f64 {
        self.angle
    }

    #[inline]
    pub fn domain(&self) -> Domain {
        self.domain
    }

    #[inline]
    pub fn trace_template(&self) -> Option<&TraceTemplate> {
        self.trace_template.as_ref()
    }

    #[inline]
    pub fn n_modes(&self) -> usize {
        self.n_modes
    }

    #[inline]
    pub fn is_optical(&self) -> bool {
        self.domain == Domain::Optical
    }

    pub fn core_width(&self) -> Option<f64> {
        self.trace_template.as_ref().map(|t| t.core_width)
    }

    /// A copy of this port under a different name.
    pub fn with_name(&self, name: impl Into<ArcStr>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }

    /// A copy of this port pointing at `angle`.
    pub fn with_angle(&self, angle: f64) -> Self {
        Self {
            angle: wrap_angle(angle),
            ..self.clone()
        }
    }

    pub fn with_n_modes(&self, n_modes: usize) -> Self {
        Self {
            n_modes,
            ..self.clone()
        }
    }

    /// A copy of this port facing the opposite direction.
    pub fn flipped(&self) -> Self {
        self.with_angle(self.angle + 180.)
    }
}

impl Transform for Port {
    fn transform(&self, trans: Transformation) -> Self {
        Self {
            position: self.position.transform(trans),
            angle: trans.apply_to_angle(self.angle),
            ..self.clone()
        }
    }
}

impl Translate for Port {
    fn translate(&mut self, p: Point) {
        self.position.translate(p);
    }
}

impl Display for Port {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({} port at {}, {}°)",
            self.name, self.domain, self.position, self.angle
        )
    }
}

/// Strategy for resolving conflicts in port names.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortConflictStrategy {
    /// Overwrite the conflicting port, will never error.
    Overwrite,
    /// Return an error on conflicting ports.
    #[default]
    Error,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PortError {
    #[error("port not found: {0}")]
    PortNotFound(ArcStr),

    #[error("port already exists: {0}")]
    PortAlreadyExists(ArcStr),
}

/// The ports of a cell, in insertion order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PortMap {
    ports: IndexMap<ArcStr, Port>,
}

impl PortMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_port(&mut self, port: Port) -> Result<(), PortError> {
        self.add_port_with_strategy(port, PortConflictStrategy::default())
    }

    pub fn add_port_with_strategy(
        &mut self,
        port: Port,
        port_conflict_strategy: PortConflictStrategy,
    ) -> Result<(), PortError> {
        match self.ports.entry(port.name.clone()) {
            Entry::Occupied(mut o) => match port_conflict_strategy {
                PortConflictStrategy::Error => {
                    return Err(PortError::PortAlreadyExists(port.name));
                }
                PortConflictStrategy::Overwrite => {
                    use crate::log::warn;
                    warn!("overwriting existing port {}", port.name);
                    *o.get_mut() = port;
                }
            },
            Entry::Vacant(v) => {
                v.insert(port);
            }
        }
        Ok(())
    }

    pub fn add_ports(&mut self, ports: impl IntoIterator<Item = Port>) -> Result<(), PortError> {
        for port in ports.into_iter() {
            self.add_port(port)?
        }
        Ok(())
    }

    /// Retrieves a reference to the [`Port`] named `name`.
    pub fn port(&self, name: &str) -> Result<&Port, PortError> {
        self.ports
            .get(name)
            .ok_or_else(|| PortError::PortNotFound(name.into()))
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.ports.contains_key(name)
    }

    /// Returns an iterator over the ports in insertion order.
    #[inline]
    pub fn ports(&self) -> impl Iterator<Item = &Port> {
        self.ports.values()
    }

    /// Returns a mutable iterator over the ports.
    #[inline]
    pub fn ports_mut(&mut self) -> impl Iterator<Item = &mut Port> {
        self.ports.values_mut()
    }

    #[inline]
    pub fn names(&self) -> impl Iterator<Item = &ArcStr> {
        self.ports.keys()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ports.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use float_eq::assert_float_eq;
    use lumengeom::orientation::Orientation;

    use super::*;

    #[test]
    fn ports_follow_reflection_and_rotation() {
        let port = Port::optical("out", (10., 2.), 0., TraceTemplate::default());
        let tf = Transformation::with_loc_and_orientation(
            Point::new(100., 0.),
            Orientation::new(true, 90.),
        );
        let placed = port.transform(tf);
        assert!(placed.position().approx_eq(Point::new(102., 10.), 1e-9));
        assert_float_eq!(placed.angle(), 90., abs <= 1e-9);
        assert_eq!(placed.name(), "out");
    }

    #[test]
    fn duplicate_ports_are_rejected() {
        let mut map = PortMap::new();
        map.add_port(Port::electrical("m1", (0., 0.), 90.)).unwrap();
        assert_eq!(
            map.add_port(Port::electrical("m1", (5., 0.), 90.)),
            Err(PortError::PortAlreadyExists(arcstr::literal!("m1")))
        );
        map.add_port_with_strategy(
            Port::electrical("m1", (5., 0.), 90.),
            PortConflictStrategy::Overwrite,
        )
        .unwrap();
        assert_eq!(map.port("m1").unwrap().position(), Point::new(5., 0.));
    }
}
