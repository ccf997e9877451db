//! APIs for creating components.

use std::any::Any;
use std::fmt::Display;

use arcstr::ArcStr;
use serde::{Deserialize, Serialize};

use crate::data::LumenCtx;
use crate::error::{ErrorSource, Result};
use crate::layout::context::LayoutCtx;

pub mod error;

/// A view of a [`Component`].
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum View {
    /// A physical layout.
    Layout,
    /// The connectivity of a circuit.
    Netlist,
    /// A custom view, identified by a [`String`] name.
    Other(String),
}

impl Display for View {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use View::*;
        match *self {
            Layout => write!(f, "layout"),
            Netlist => write!(f, "netlist"),
            Other(ref name) => write!(f, "{name}"),
        }
    }
}

/// The trait that all components must implement.
///
/// Components are generated once per distinct set of parameters;
/// later instantiations with equal parameters reuse the same cell.
pub trait Component: Any {
    /// The parameter type.
    type Params: Serialize;

    /// Creates a new instance of this component with the given parameters.
    fn new(params: &Self::Params, ctx: &LumenCtx) -> Result<Self>
    where
        Self: Sized;

    /// Returns the desired name of this component.
    ///
    /// If two components with the same name are generated in the same context,
    /// one of them is renamed. So this name should be thought of as a suggestion.
    fn name(&self) -> ArcStr {
        arcstr::literal!("unnamed")
    }

    /// Creates a layout view of this component.
    #[allow(unused_variables)]
    fn layout(&self, ctx: &mut LayoutCtx) -> Result<()> {
        Err(ErrorSource::Component(error::Error::ViewUnsupported(View::Layout)).into())
    }
}

/// An empty type for components that are not parametrized.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Default, Serialize, Deserialize)]
pub struct NoParams;

/// Uses [`flexbuffers`] to serialize component parameters.
///
/// For caching purposes.
pub(crate) fn serialize_params<T>(x: &T) -> Result<Vec<u8>>
where
    T: Serialize,
{
    let mut s = flexbuffers::FlexbufferSerializer::new();
    x.serialize(&mut s)
        .map_err(|err| ErrorSource::Component(error::Error::InvalidParams(err.to_string())))?;
    Ok(s.take_buffer())
}
