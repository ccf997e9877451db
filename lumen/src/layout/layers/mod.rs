//! Layers on which cell geometry is drawn.

use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::deps::arcstr::ArcStr;

/// A drawing layer.
///
/// The enumerated layers are the ones the routing and building-block code draws on;
/// [`Layer::Named`] is an escape hatch for anything else.
#[derive(Debug, Clone, Serialize, Deserialize, Ord, PartialOrd, PartialEq, Eq, Hash)]
pub enum Layer {
    /// Waveguide core.
    WgCore,
    /// Waveguide cladding / exclusion region.
    WgCladding,
    /// Resistive heater.
    Heater,
    /// First metal layer.
    Metal1,
    /// Diagnostic markers for geometry that could not be realized.
    Error,
    /// Named layer, not first-class supported.
    Named(ArcStr),
}

impl Layer {
    /// Returns `true` for layers that carry light.
    pub fn is_optical(&self) -> bool {
        matches!(self, Layer::WgCore | Layer::WgCladding)
    }
}

impl Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WgCore => write!(f, "wg_core"),
            Self::WgCladding => write!(f, "wg_cladding"),
            Self::Heater => write!(f, "heater"),
            Self::Metal1 => write!(f, "m1"),
            Self::Error => write!(f, "error"),
            Self::Named(name) => write!(f, "{name}"),
        }
    }
}

#[derive(Debug, Error)]
#[error("empty layer name")]
pub struct FromStrError;

impl FromStr for Layer {
    type Err = FromStrError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "" => return Err(FromStrError),
            "wg_core" => Self::WgCore,
            "wg_cladding" => Self::WgCladding,
            "heater" => Self::Heater,
            "m1" => Self::Metal1,
            "error" => Self::Error,
            other => Self::Named(ArcStr::from(other)),
        })
    }
}
