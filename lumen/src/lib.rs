//! Placement, routing and connectivity for photonic circuit layouts.

pub mod circuit;
pub mod component;
pub mod config;
pub mod data;
pub mod deps;
pub mod error;
pub mod layout;
pub mod validation;

pub(crate) mod generation;
pub(crate) mod log;
