//! Re-exports of crates that appear in the public API.

pub use arcstr;
pub use lumengeom;
