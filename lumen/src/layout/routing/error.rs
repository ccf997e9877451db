//! Failures of individual routes.
//!
//! A [`RouteError`] concerns a single connection. The circuit engine replaces the
//! connector with a diagnostic cell instead of aborting the build.

use thiserror::Error;

use crate::error::LumenError;
use crate::layout::port::{Domain, PortError};

pub type Result<T> = std::result::Result<T, RouteError>;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RouteError {
    #[error("port angles do not match: expected the end port at {expected}°, found {found}°")]
    AnglesMismatch { expected: f64, found: f64 },

    #[error("ports do not face each other")]
    NotFacing,

    #[error("not enough space for segment {segment}: requires {required:.3}, {available:.3} available")]
    Infeasible {
        segment: usize,
        required: f64,
        available: f64,
    },

    #[error("port angle {0}° is not a multiple of 90°")]
    NonManhattanAngle(f64),

    #[error("degenerate route: {0}")]
    Degenerate(String),

    #[error("connectors join two optical ports, found {0} and {1}")]
    IncompatibleDomains(Domain, Domain),

    #[error("invalid connector arguments: {0}")]
    InvalidArgs(String),

    #[error("error building connector cell: {0}")]
    Build(Box<LumenError>),
}

impl From<LumenError> for RouteError {
    fn from(value: LumenError) -> Self {
        Self::Build(Box::new(value))
    }
}

impl From<PortError> for RouteError {
    fn from(value: PortError) -> Self {
        Self::Build(Box::new(value.into()))
    }
}
