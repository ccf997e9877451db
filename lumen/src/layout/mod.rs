//! APIs for layout generation.

pub mod cell;
pub mod context;
pub mod layers;
pub mod placement;
pub mod port;
pub mod routing;
pub mod trace;
pub mod validation;
