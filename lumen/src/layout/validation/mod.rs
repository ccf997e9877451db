use std::fmt::Display;

use super::cell::{Cell, CellKey};
use super::port::Port;
use crate::deps::arcstr::ArcStr;
use crate::log::Log;
use crate::validation::{Empty, ValidatorOutput};

/// Validates a layout cell.
pub fn validate_cell(cell: &Cell) -> LayoutValidatorOutput {
    LayoutValidator { cell }.validate()
}

pub struct LayoutValidator<'a> {
    cell: &'a Cell,
}

pub type LayoutValidatorOutput = ValidatorOutput<Empty, Empty, Error, Empty>;

/// An error location.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Location {
    cell: CellKey,
    cell_name: ArcStr,
    port: ArcStr,
}

impl Location {
    /// Creates a new [`Location`].
    pub fn new(cell: CellKey, cell_name: impl Into<ArcStr>, port: impl Into<ArcStr>) -> Self {
        Self {
            cell,
            cell_name: cell_name.into(),
            port: port.into(),
        }
    }
}

impl Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "cell {}, port {}", self.cell_name, self.port)
    }
}

/// Data for an error.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Error {
    loc: Location,
    cause: ErrorCause,
}

impl Log for Error {
    fn log(&self) {
        use crate::log::error;
        error!("{self}");
    }
}

/// An enumeration of causes for an error.
#[non_exhaustive]
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum ErrorCause {
    /// The port position has a NaN or infinite coordinate.
    NonFinitePosition,
    /// The port angle is NaN or infinite.
    NonFiniteAngle,
    /// An optical port carries zero modes.
    NoModes,
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.cause {
            ErrorCause::NonFinitePosition => {
                write!(f, "port position is not finite: {}", self.loc)
            }
            ErrorCause::NonFiniteAngle => {
                write!(f, "port angle is not finite: {}", self.loc)
            }
            ErrorCause::NoModes => {
                write!(f, "optical port carries no modes: {}", self.loc)
            }
        }
    }
}

impl Error {
    /// Creates a new [`Error`].
    pub fn new(loc: Location, cause: ErrorCause) -> Self {
        Self { loc, cause }
    }

    #[inline]
    pub fn cause(&self) -> &ErrorCause {
        &self.cause
    }
}

impl<'a> LayoutValidator<'a> {
    fn validate(&self) -> LayoutValidatorOutput {
        let mut output = LayoutValidatorOutput::default();
        for port in self.cell.ports() {
            self.validate_port(port, &mut output);
        }
        output
    }

    fn validate_port(&self, port: &Port, output: &mut LayoutValidatorOutput) {
        let loc = || Location::new(self.cell.id(), self.cell.name(), port.name());
        if !port.position().is_finite() {
            output
                .errors
                .push(Error::new(loc(), ErrorCause::NonFinitePosition));
        }
        if !port.angle().is_finite() {
            output
                .errors
                .push(Error::new(loc(), ErrorCause::NonFiniteAngle));
        }
        if port.is_optical() && port.n_modes() == 0 {
            output.errors.push(Error::new(loc(), ErrorCause::NoModes));
        }
    }
}
