//! Declarative circuits: child instances, placements, joins and routed connectors.
//!
//! A [`CircuitSpec`] lists what a circuit contains. [`LayoutCtx::draw_circuit`]
//! resolves it into placed instances, connector cells, exposed ports and a
//! [`Netlist`](netlist::Netlist), in that order:
//!
//! 1. every port used by a join or connector is checked to be used only once;
//! 2. placements and joins are solved;
//! 3. each connector is routed, and a connector that fails is replaced by a
//!    straight line on the error layer;
//! 4. the ports left free are exposed;
//! 5. the netlist is derived.

use indexmap::{IndexMap, IndexSet};
use lumengeom::{Path, Point};
use serde::{Deserialize, Serialize};

use crate::deps::arcstr::ArcStr;
use crate::error::{with_err_context, ErrorContext, ErrorSource, Result};
use crate::layout::cell::{Element, Instance};
use crate::layout::context::LayoutCtx;
use crate::layout::layers::Layer;
use crate::layout::placement::{find_port, place_instances, PlaceSpec};
use crate::layout::port::{Domain, Port};
use crate::layout::routing::connector::{Connect, Connector};
use crate::layout::routing::waveguide::{IN_PORT, OUT_PORT};
use crate::log::{debug, warn};

use self::netlist::{Netlist, Term};
use self::port_id::{IntoPortRef, PortRef};
use self::validation::validate_connectivity;

pub mod netlist;
pub mod port_id;
pub mod validation;

/// A connection routed by a [`Connector`].
#[derive(Debug, Clone)]
pub struct Connection {
    pub start: PortRef,
    pub end: PortRef,
    pub connector: Connector,
}

/// The contents of a circuit.
#[derive(Debug, Clone, Default)]
pub struct CircuitSpec {
    name: ArcStr,
    instances: IndexMap<ArcStr, Instance>,
    placements: Vec<PlaceSpec>,
    connections: Vec<Connection>,
    external_port_names: IndexMap<PortRef, ArcStr>,
    propagated: IndexSet<ArcStr>,
}

impl CircuitSpec {
    /// Creates an empty circuit.
    ///
    /// Connector cells are named after the circuit.
    pub fn new(name: impl Into<ArcStr>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    #[inline]
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    /// Adds a child instance under `name`.
    pub fn add_instance(&mut self, name: impl Into<ArcStr>, inst: Instance) -> Result<&mut Self> {
        let name = name.into();
        if self.instances.contains_key(&name) {
            return Err(ErrorSource::AlreadyExists(name).into());
        }
        self.instances.insert(name.clone(), inst.with_name(name));
        Ok(self)
    }

    /// Places an instance at an absolute position, without rotation.
    pub fn place(&mut self, inst: impl Into<ArcStr>, position: impl Into<Point>) -> &mut Self {
        self.placements.push(PlaceSpec::place(inst, position));
        self
    }

    /// Adds an arbitrary placement constraint.
    pub fn place_spec(&mut self, spec: PlaceSpec) -> &mut Self {
        self.placements.push(spec);
        self
    }

    /// Places the instance owning `port` so that `port` sits at `target` plus `offset`.
    ///
    /// `angle`, if given, is the rotation of the placed instance.
    pub fn place_relative(
        &mut self,
        port: impl IntoPortRef,
        target: impl IntoPortRef,
        offset: impl Into<Point>,
        angle: Option<f64>,
    ) -> Result<&mut Self> {
        self.placements.push(PlaceSpec::PlaceRelative {
            port: port.into_port_ref()?,
            target: target.into_port_ref()?,
            offset: offset.into(),
            angle,
        });
        Ok(self)
    }

    /// Joins two ports without a waveguide, placing one instance against the other.
    pub fn join(&mut self, a: impl IntoPortRef, b: impl IntoPortRef) -> Result<&mut Self> {
        self.placements
            .push(PlaceSpec::Join(a.into_port_ref()?, b.into_port_ref()?));
        Ok(self)
    }

    /// Routes a Manhattan waveguide from `start` to `end`.
    pub fn connect(&mut self, start: impl IntoPortRef, end: impl IntoPortRef) -> Result<&mut Self> {
        self.connect_with(start, end, Connector::default())
    }

    /// Routes a waveguide from `start` to `end` with `connector`.
    pub fn connect_with(
        &mut self,
        start: impl IntoPortRef,
        end: impl IntoPortRef,
        connector: impl Into<Connector>,
    ) -> Result<&mut Self> {
        self.connections.push(Connection {
            start: start.into_port_ref()?,
            end: end.into_port_ref()?,
            connector: connector.into(),
        });
        Ok(self)
    }

    /// Exposes `port` under `name` instead of the default `{instance}_{port}`.
    pub fn external_port_name(
        &mut self,
        port: impl IntoPortRef,
        name: impl Into<ArcStr>,
    ) -> Result<&mut Self> {
        self.external_port_names
            .insert(port.into_port_ref()?, name.into());
        Ok(self)
    }

    /// Exposes the free electrical port whose external name is `name`.
    ///
    /// Free optical ports are always exposed; free electrical ports only when propagated.
    pub fn propagate(&mut self, name: impl Into<ArcStr>) -> &mut Self {
        self.propagated.insert(name.into());
        self
    }

    fn joins(&self) -> impl Iterator<Item = (&PortRef, &PortRef)> {
        self.placements.iter().filter_map(|spec| match spec {
            PlaceSpec::Join(a, b) => Some((a, b)),
            _ => None,
        })
    }

    /// Every port used by a join or connector, once per use.
    fn used_ports(&self) -> Vec<&PortRef> {
        self.joins()
            .flat_map(|(a, b)| [a, b])
            .chain(self.connections.iter().flat_map(|c| [&c.start, &c.end]))
            .collect()
    }

    fn external_name(&self, id: &PortRef) -> ArcStr {
        self.external_port_names
            .get(id)
            .cloned()
            .unwrap_or_else(|| id.default_external_name())
    }
}

/// A connector that could not be routed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorFailure {
    pub start: PortRef,
    pub end: PortRef,
    /// Kind of the connector that failed.
    pub connector: ArcStr,
    pub reason: String,
}

/// Problems found while building a circuit that did not stop the build.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub failures: Vec<ConnectorFailure>,
}

impl Diagnostics {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }
}

/// A routed connection.
#[derive(Debug, Clone)]
pub struct RoutedConnector {
    pub start: PortRef,
    pub end: PortRef,
    pub instance: Instance,
    /// Whether `instance` is the diagnostic line of a failed connector.
    pub failed: bool,
}

/// A built circuit.
#[derive(Debug, Clone)]
pub struct Circuit {
    pub instances: IndexMap<ArcStr, Instance>,
    pub connectors: Vec<RoutedConnector>,
    /// The exposed ports, under their external names.
    pub ports: Vec<Port>,
    pub netlist: Netlist,
    pub diagnostics: Diagnostics,
}

impl Circuit {
    /// Returns the exposed port named `name`.
    pub fn port(&self, name: &str) -> Option<&Port> {
        self.ports.iter().find(|p| p.name() == name)
    }
}

impl LayoutCtx {
    /// Builds `spec` into the cell being generated.
    ///
    /// Configuration errors abort the build. A connector that cannot be routed
    /// is drawn as a straight line on [`Layer::Error`] and reported in the
    /// returned [`Diagnostics`], which are also stored as cell metadata along
    /// with the [`Netlist`].
    pub fn draw_circuit(&mut self, spec: &CircuitSpec) -> Result<Circuit> {
        with_err_context(self.draw_circuit_inner(spec), || {
            ErrorContext::BuildCircuit(spec.name.clone())
        })
    }

    fn draw_circuit_inner(&mut self, spec: &CircuitSpec) -> Result<Circuit> {
        let config = self.config();

        let output = validate_connectivity(spec.used_ports());
        if output.has_errors() {
            output.log();
            let ports = output.errors().iter().map(|e| e.port().clone()).collect();
            return Err(ErrorSource::DuplicatePorts(ports).into());
        }

        let mut instances = spec.instances.clone();
        place_instances(&mut instances, &spec.placements, config.tolerance)?;

        let mut connectors = Vec::with_capacity(spec.connections.len());
        let mut diagnostics = Diagnostics::default();
        for (cnt, conn) in spec.connections.iter().enumerate() {
            let start = find_port(&instances, &conn.start)?;
            let end = find_port(&instances, &conn.end)?;
            let name = arcstr::format!("{}_connector{}", spec.name, cnt);
            let routed = match conn.connector.connect(self.inner(), &start, &end, &name) {
                Ok(cell) => RoutedConnector {
                    start: conn.start.clone(),
                    end: conn.end.clone(),
                    instance: Instance::new(cell).with_name(name),
                    failed: false,
                },
                Err(reason) => {
                    warn!(
                        "connector ({}, {}, {}) failed; drawing an error line instead\n\
                         \tstart port: {}\n\tend port: {}\n\terror: {reason}",
                        conn.start,
                        conn.end,
                        conn.connector.kind(),
                        start.position(),
                        end.position()
                    );
                    diagnostics.failures.push(ConnectorFailure {
                        start: conn.start.clone(),
                        end: conn.end.clone(),
                        connector: conn.connector.kind().into(),
                        reason: reason.to_string(),
                    });
                    let width = config.error_line_width;
                    let (p0, p1) = (start.position(), end.position());
                    let cell = self
                        .inner()
                        .generate_cell(arcstr::format!("{}_error", name), |cell| {
                            cell.draw(Element::new(Layer::Error, Path::new(vec![p0, p1], width)));
                            Ok(())
                        })?;
                    RoutedConnector {
                        start: conn.start.clone(),
                        end: conn.end.clone(),
                        instance: Instance::new(cell).with_name(name),
                        failed: true,
                    }
                }
            };
            connectors.push(routed);
        }

        let consumed: IndexSet<&PortRef> = spec.used_ports().into_iter().collect();
        let mut ports = Vec::new();
        let mut exposed = Vec::new();
        for (inst_name, inst) in instances.iter() {
            for port in inst.ports() {
                let id = PortRef::new(inst_name.clone(), port.name().clone());
                if consumed.contains(&id) {
                    continue;
                }
                let name = spec.external_name(&id);
                if port.domain() == Domain::Electrical && !spec.propagated.contains(&name) {
                    continue;
                }
                exposed.push(id);
                ports.push(port.with_name(name));
            }
        }
        for id in spec.external_port_names.keys() {
            // Names of unexposed electrical ports still name their netlist terms.
            if consumed.contains(id) || find_port(&instances, id).is_err() {
                warn!("external port name given for {id}, which is not a free port");
            }
        }
        debug!(
            "circuit {} exposes {} ports and routes {} connectors",
            spec.name,
            ports.len(),
            connectors.len()
        );

        let netlist = derive_netlist(spec, &instances, &connectors, &exposed);

        for inst in instances.values() {
            self.add_instance(inst.clone());
        }
        for conn in connectors.iter() {
            self.add_instance(conn.instance.clone());
        }
        self.add_ports(ports.iter().cloned())?;
        self.set_metadata(netlist.clone());
        self.set_metadata(diagnostics.clone());

        Ok(Circuit {
            instances,
            connectors,
            ports,
            netlist,
            diagnostics,
        })
    }
}

fn derive_netlist(
    spec: &CircuitSpec,
    instances: &IndexMap<ArcStr, Instance>,
    connectors: &[RoutedConnector],
    exposed: &[PortRef],
) -> Netlist {
    let mut netlist = Netlist::default();
    for inst in instances.values() {
        netlist.add_instance(inst);
    }
    for (a, b) in spec.joins() {
        let domain = instances
            .get(&a.instance)
            .and_then(|inst| inst.port(&a.port).ok())
            .map(|p| p.domain())
            .unwrap_or(Domain::Optical);
        netlist.link(a.clone(), b.clone(), domain);
    }
    for conn in connectors.iter().filter(|c| !c.failed) {
        netlist.add_instance(&conn.instance);
        let name = conn.instance.name();
        netlist.link(
            conn.start.clone(),
            PortRef::new(name.clone(), IN_PORT),
            Domain::Optical,
        );
        netlist.link(
            PortRef::new(name.clone(), OUT_PORT),
            conn.end.clone(),
            Domain::Optical,
        );
    }
    for id in exposed {
        if let Some(port) = instances
            .get(&id.instance)
            .and_then(|inst| inst.cell().port(&id.port).ok())
        {
            netlist.link_external(spec.external_name(id), id.clone(), Term::from(port));
        }
    }
    for (inst_name, inst) in instances.iter() {
        for port in inst.cell().ports().filter(|p| p.domain() == Domain::Electrical) {
            let id = PortRef::new(inst_name.clone(), port.name().clone());
            netlist.link_external(spec.external_name(&id), id, Term::from(port));
        }
    }
    netlist.propagate_modes();
    netlist
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_rejects_malformed_ids() {
        let mut spec = CircuitSpec::new("c");
        assert!(spec.connect("a:out", "b").is_err());
        assert!(spec.join("a", "b:in").is_err());
    }

    #[test]
    fn duplicate_instance_names_are_rejected() {
        let ctx = crate::data::LumenCtx::default();
        let cell = ctx.generate_cell("empty", |_| Ok(())).unwrap();
        let mut spec = CircuitSpec::new("c");
        spec.add_instance("a", Instance::new(cell.clone())).unwrap();
        let err = spec.add_instance("a", Instance::new(cell)).unwrap_err();
        assert!(matches!(err.source(), ErrorSource::AlreadyExists(name) if name == "a"));
    }

    #[test]
    fn used_ports_count_every_occurrence() {
        let mut spec = CircuitSpec::new("c");
        spec.join("a:out", "b:in").unwrap();
        spec.connect("b:out", "a:out").unwrap();
        let used: Vec<String> = spec.used_ports().iter().map(|p| p.to_string()).collect();
        assert_eq!(used, vec!["a:out", "b:in", "b:out", "a:out"]);
    }
}
