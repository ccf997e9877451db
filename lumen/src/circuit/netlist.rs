//! Connectivity of a built circuit, for simulation.

use std::fmt::Display;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::port_id::PortRef;
use crate::deps::arcstr::ArcStr;
use crate::layout::cell::Instance;
use crate::layout::port::{Domain, Port};
use crate::log::warn;

/// A terminal of the circuit or of one of its instances.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum TermRef {
    External(ArcStr),
    Instance(PortRef),
}

impl Display for TermRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::External(name) => write!(f, "{name}"),
            Self::Instance(id) => write!(f, "{id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Term {
    pub domain: Domain,
    pub n_modes: usize,
}

impl From<&Port> for Term {
    fn from(port: &Port) -> Self {
        Self {
            domain: port.domain(),
            n_modes: port.n_modes(),
        }
    }
}

/// An instance as seen by the netlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetlistInstance {
    /// Name of the instantiated cell.
    pub cell: ArcStr,
    pub terms: IndexMap<ArcStr, Term>,
}

/// A two-terminal net.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Net {
    pub terms: [TermRef; 2],
    pub domain: Domain,
}

/// Terms, instances and nets of a circuit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Netlist {
    /// External terms, keyed by name.
    pub terms: IndexMap<ArcStr, Term>,
    pub instances: IndexMap<ArcStr, NetlistInstance>,
    pub nets: Vec<Net>,
}

impl Netlist {
    pub(crate) fn add_instance(&mut self, inst: &Instance) {
        self.instances.insert(
            inst.name().clone(),
            NetlistInstance {
                cell: inst.cell().name().clone(),
                terms: inst
                    .cell()
                    .ports()
                    .map(|p| (p.name().clone(), Term::from(p)))
                    .collect(),
            },
        );
    }

    /// Links two instance terms.
    pub(crate) fn link(&mut self, a: PortRef, b: PortRef, domain: Domain) {
        self.push_net(TermRef::Instance(a), TermRef::Instance(b), domain);
    }

    /// Links an external term to an instance term, creating the external term if needed.
    pub(crate) fn link_external(&mut self, name: ArcStr, id: PortRef, term: Term) {
        let domain = term.domain;
        self.terms.entry(name.clone()).or_insert(term);
        self.push_net(TermRef::External(name), TermRef::Instance(id), domain);
    }

    fn push_net(&mut self, a: TermRef, b: TermRef, domain: Domain) {
        let net = Net {
            terms: [a, b],
            domain,
        };
        if !self.nets.contains(&net) {
            self.nets.push(net);
        }
    }

    /// Returns the term `t` refers to.
    pub fn term(&self, t: &TermRef) -> Option<&Term> {
        match t {
            TermRef::External(name) => self.terms.get(name),
            TermRef::Instance(id) => self.instances.get(&id.instance)?.terms.get(&id.port),
        }
    }

    fn term_mut(&mut self, t: &TermRef) -> Option<&mut Term> {
        match t {
            TermRef::External(name) => self.terms.get_mut(name),
            TermRef::Instance(id) => self
                .instances
                .get_mut(&id.instance)?
                .terms
                .get_mut(&id.port),
        }
    }

    /// Makes both terms of every optical net carry the same number of modes.
    ///
    /// An external term takes the mode count of the instance term it is linked
    /// to. Two instance terms with different counts both take the larger one.
    pub(crate) fn propagate_modes(&mut self) {
        for i in 0..self.nets.len() {
            let net = self.nets[i].clone();
            if net.domain != Domain::Optical {
                continue;
            }
            let [a, b] = &net.terms;
            let (Some(na), Some(nb)) = (
                self.term(a).map(|t| t.n_modes),
                self.term(b).map(|t| t.n_modes),
            ) else {
                continue;
            };
            let n = match (a, b) {
                (TermRef::External(_), _) => nb,
                (_, TermRef::External(_)) => na,
                _ => {
                    if na != nb {
                        warn!("terms {a} and {b} carry {na} and {nb} modes; using {}", na.max(nb));
                    }
                    na.max(nb)
                }
            };
            for t in [a, b] {
                if let Some(term) = self.term_mut(t) {
                    term.n_modes = n;
                }
            }
        }
    }
}
