//! Waveguide routing between ports.
//!
//! Routing happens in three stages:
//! * [`shapes`] and [`manhattan`] compute corner polylines from two ports;
//! * the polylines are rounded and drawn as a [`waveguide::Waveguide`];
//! * [`connector`] wraps the first two stages into one cell per connection.

pub mod connector;
pub mod crossing;
pub mod error;
pub mod manhattan;
pub mod shapes;
pub mod util;
pub mod waveguide;
