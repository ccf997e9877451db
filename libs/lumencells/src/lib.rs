//! Photonic building blocks and the circuits generated from them.
//!
//! Every generator is a [`Component`](lumen::component::Component) whose layout
//! describes its children, placements and connections as a
//! [`CircuitSpec`](lumen::circuit::CircuitSpec).

pub mod celment;
pub mod crossing_array;
pub mod mzi;
pub mod mzi_string;
pub mod ocdc;
pub mod opa;
pub mod pads;
pub mod primitives;
pub mod routed;
pub mod splitter_tree;
