#![allow(dead_code)]

use lumen::circuit::netlist::{Netlist, TermRef};
use lumen::circuit::port_id::PortRef;
use lumen::circuit::Diagnostics;
use lumen::layout::cell::{Cell, Instance};

/// Names of the optical ports of `inst`, sorted.
pub fn optical_ports(inst: &Instance) -> Vec<String> {
    sorted(inst.cell().ports().filter(|p| p.is_optical()).map(|p| p.name().to_string()))
}

/// Names of the electrical ports of `inst`, sorted.
pub fn electrical_ports(inst: &Instance) -> Vec<String> {
    sorted(inst.cell().ports().filter(|p| !p.is_optical()).map(|p| p.name().to_string()))
}

pub fn sorted(names: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut names: Vec<String> = names.into_iter().collect();
    names.sort();
    names
}

pub fn netlist(cell: &Cell) -> &Netlist {
    cell.get_metadata::<Netlist>().expect("cell carries a netlist")
}

/// Asserts that every terminal of every child of `cell` belongs to a net.
pub fn assert_every_term_is_linked(cell: &Cell) {
    let netlist = netlist(cell);
    for (inst, child) in netlist.instances.iter() {
        for port in child.terms.keys() {
            let term = TermRef::Instance(PortRef::new(inst.clone(), port.clone()));
            assert!(
                netlist.nets.iter().any(|net| net.terms.contains(&term)),
                "{term} of cell {} is dangling",
                cell.name()
            );
        }
    }
}

pub fn assert_routed(cell: &Cell) {
    let diagnostics = cell
        .get_metadata::<Diagnostics>()
        .expect("cell carries diagnostics");
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
}
