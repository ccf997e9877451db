//! Textual `instance:port` addressing.

use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::deps::arcstr::ArcStr;
use crate::error::{ErrorSource, LumenError, Result};

/// A reference to a port of a named instance, written `instance:port`.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct PortRef {
    pub instance: ArcStr,
    pub port: ArcStr,
}

impl PortRef {
    pub fn new(instance: impl Into<ArcStr>, port: impl Into<ArcStr>) -> Self {
        Self {
            instance: instance.into(),
            port: port.into(),
        }
    }

    /// Parses a port id of the form `instance:port`.
    ///
    /// Both halves must be non-empty and the id must contain exactly one colon.
    pub fn parse(id: &str) -> Result<Self> {
        let mut parts = id.split(':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(instance), Some(port), None) if !instance.is_empty() && !port.is_empty() => {
                Ok(Self::new(instance, port))
            }
            _ => Err(ErrorSource::MalformedPortId(id.to_string()).into()),
        }
    }

    /// The name a port receives when exposed without an explicit mapping.
    pub fn default_external_name(&self) -> ArcStr {
        arcstr::format!("{}_{}", self.instance, self.port)
    }
}

impl FromStr for PortRef {
    type Err = LumenError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Display for PortRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.instance, self.port)
    }
}

/// Conversion into a [`PortRef`], accepting either a parsed reference or a string id.
pub trait IntoPortRef {
    fn into_port_ref(self) -> Result<PortRef>;
}

impl IntoPortRef for PortRef {
    fn into_port_ref(self) -> Result<PortRef> {
        Ok(self)
    }
}

impl IntoPortRef for &PortRef {
    fn into_port_ref(self) -> Result<PortRef> {
        Ok(self.clone())
    }
}

impl IntoPortRef for &str {
    fn into_port_ref(self) -> Result<PortRef> {
        PortRef::parse(self)
    }
}

impl IntoPortRef for String {
    fn into_port_ref(self) -> Result<PortRef> {
        PortRef::parse(&self)
    }
}

impl IntoPortRef for &String {
    fn into_port_ref(self) -> Result<PortRef> {
        PortRef::parse(self)
    }
}

impl IntoPortRef for ArcStr {
    fn into_port_ref(self) -> Result<PortRef> {
        PortRef::parse(&self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_ids() {
        let id: PortRef = "mmi:out_1".parse().unwrap();
        assert_eq!(id, PortRef::new("mmi", "out_1"));
        assert_eq!(id.to_string(), "mmi:out_1");
        assert_eq!(id.default_external_name(), "mmi_out_1");
    }

    #[test]
    fn rejects_malformed_ids() {
        for bad in ["mmi", "mmi:", ":out", "a:b:c", ""] {
            let err = PortRef::parse(bad).expect_err("id should be rejected");
            assert!(matches!(err.source(), ErrorSource::MalformedPortId(s) if s == bad));
        }
    }
}
