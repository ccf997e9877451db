use std::fmt::{Debug, Display};
use std::path::PathBuf;

use itertools::Itertools;
use lumengeom::GeometryError;
use thiserror::Error;

use crate::circuit::port_id::PortRef;
use crate::component::{self, View};
use crate::deps::arcstr::ArcStr;
use crate::layout::port::PortError;
use crate::layout::routing::error::RouteError;

pub type Result<T> = std::result::Result<T, LumenError>;

pub struct LumenError {
    pub(crate) source: ErrorSource,
    pub(crate) context: Vec<ErrorContext>,
}

impl LumenError {
    pub fn source(&self) -> &ErrorSource {
        &self.source
    }

    pub fn context(&self) -> &[ErrorContext] {
        &self.context
    }
}

impl std::error::Error for LumenError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

impl Display for LumenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Error:\n{}", self.source)?;
        if !self.context.is_empty() {
            writeln!(f, "\nError occurred:")?;
            for item in self.context.iter() {
                writeln!(f, "\twhile {}", item)?;
            }
        }
        Ok(())
    }
}

impl Debug for LumenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.source)?;
        if !self.context.is_empty() {
            writeln!(f, "\nError occurred:")?;
            for (i, item) in self.context.iter().enumerate() {
                writeln!(f, "\t{}: {:?}", i, item)?;
            }
        }
        Ok(())
    }
}

impl<T> From<T> for LumenError
where
    T: Into<ErrorSource>,
{
    fn from(value: T) -> Self {
        Self {
            source: value.into(),
            context: Vec::new(),
        }
    }
}

impl LumenError {
    pub fn new(source: impl Into<ErrorSource>) -> Self {
        Self {
            source: source.into(),
            context: Vec::new(),
        }
    }

    pub fn from_context(source: impl Into<ErrorSource>, ctx: impl Into<ErrorContext>) -> Self {
        Self {
            source: source.into(),
            context: vec![ctx.into()],
        }
    }

    pub fn with_context(mut self, ctx: impl Into<ErrorContext>) -> Self {
        self.context.push(ctx.into());
        self
    }

    #[inline]
    pub fn into_inner(self) -> ErrorSource {
        self.source
    }
}

#[inline]
pub fn with_err_context<T, E, C>(result: std::result::Result<T, E>, ctx: C) -> Result<T>
where
    C: FnOnce() -> ErrorContext,
    E: Into<LumenError>,
{
    result.map_err(|err| err.into().with_context(ctx()))
}

#[derive(Debug, Clone, Eq, PartialEq)]
#[non_exhaustive]
pub enum ErrorContext {
    GenComponent {
        name: ArcStr,
        type_name: ArcStr,
        view: View,
    },
    InitComponent {
        type_name: ArcStr,
    },
    BuildCircuit(ArcStr),
    ReadFile(PathBuf),
    Task(ArcStr),
}

impl Display for ErrorContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use ErrorContext::*;
        match self {
            GenComponent {
                name,
                type_name,
                view,
            } => write!(
                f,
                "generating {view} view of component {type_name} ({name})"
            ),
            InitComponent { type_name } => write!(f, "initializing component {type_name}"),
            BuildCircuit(name) => write!(f, "building circuit {name}"),
            ReadFile(path) => write!(f, "reading file {path:?}"),
            Task(task) => write!(f, "{task}"),
        }
    }
}

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ErrorSource {
    #[error("error generating component: {0}")]
    Component(#[from] component::error::Error),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("invalid layout (enable logging for details): {0}")]
    InvalidLayout(String),

    #[error(
        "the following ports appear multiple times in connectors and joins: {}",
        .0.iter().join(", ")
    )]
    DuplicatePorts(Vec<PortRef>),

    #[error("malformed port id `{0}`: expected `instance:port`")]
    MalformedPortId(String),

    #[error(
        "instance {instance} does not exist; the available instances are [{}]",
        .available.iter().join(", ")
    )]
    InstanceNotFound {
        instance: ArcStr,
        available: Vec<ArcStr>,
    },

    #[error(
        "port {port} does not exist on instance {instance}; the available ports are [{}]",
        .available.iter().join(", ")
    )]
    PortNotFound {
        instance: ArcStr,
        port: ArcStr,
        available: Vec<ArcStr>,
    },

    #[error(
        "circular relative placement between instances [{}]",
        .0.iter().join(", ")
    )]
    CircularPlacement(Vec<ArcStr>),

    #[error("conflicting placement constraints for instance {0}")]
    ConflictingPlacement(ArcStr),

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("already exists: {0}")]
    AlreadyExists(ArcStr),

    #[error("error accessing layout port: {0}")]
    LayoutPort(#[from] PortError),

    #[error("error routing connector: {0}")]
    Route(#[from] RouteError),

    #[error("invalid geometry: {0}")]
    Geometry(#[from] GeometryError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("error parsing TOML: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("unexpected error: {0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),

    #[error("unexpected error: {0}")]
    Anyhow(#[from] anyhow::Error),
}
