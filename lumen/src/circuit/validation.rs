//! Checks that every port carries at most one connection.

use std::fmt::Display;

use indexmap::IndexMap;

use super::port_id::PortRef;
use crate::log::Log;
use crate::validation::{Empty, ValidatorOutput};

pub type ConnectivityValidatorOutput = ValidatorOutput<Empty, Empty, Error, Empty>;

/// Validates the ports used by the joins and connectors of a circuit.
///
/// Every occurrence of a port counts, including both ends of a connector that
/// loops back onto the same port.
pub fn validate_connectivity<'a>(
    uses: impl IntoIterator<Item = &'a PortRef>,
) -> ConnectivityValidatorOutput {
    let mut counts: IndexMap<&PortRef, usize> = IndexMap::new();
    for port in uses {
        *counts.entry(port).or_default() += 1;
    }

    let mut output = ConnectivityValidatorOutput::default();
    for (port, count) in counts {
        if count > 1 {
            output.errors.push(Error {
                port: port.clone(),
                count,
            });
        }
    }
    output
}

/// A port used by more than one connection.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Error {
    port: PortRef,
    count: usize,
}

impl Error {
    #[inline]
    pub fn port(&self) -> &PortRef {
        &self.port
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "port {} appears {} times in connectors and joins",
            self.port, self.count
        )
    }
}

impl Log for Error {
    fn log(&self) {
        use crate::log::error;
        error!("{self}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicates_are_listed_once_in_order() {
        let ids = [
            PortRef::new("a", "out"),
            PortRef::new("b", "in"),
            PortRef::new("c", "in"),
            PortRef::new("b", "in"),
            PortRef::new("a", "out"),
            PortRef::new("a", "out"),
        ];
        let output = validate_connectivity(ids.iter());
        let dups: Vec<String> = output.errors().iter().map(|e| e.port().to_string()).collect();
        assert_eq!(dups, vec!["a:out", "b:in"]);
        assert_eq!(output.errors()[0].count(), 3);
    }

    #[test]
    fn unique_ports_pass() {
        let ids = [PortRef::new("a", "out"), PortRef::new("b", "in")];
        assert!(!validate_connectivity(ids.iter()).has_errors());
    }
}
