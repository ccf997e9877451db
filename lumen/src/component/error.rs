//! Error types for creating components.

use thiserror::Error;

use super::View;

/// An error for the component API.
#[derive(Debug, Error, Clone)]
pub enum Error {
    #[error("unsupported view: {0}")]
    ViewUnsupported(View),

    #[error("invalid params: {0}")]
    InvalidParams(String),
}

/// A result for the component API.
pub type Result<T> = std::result::Result<T, Error>;
