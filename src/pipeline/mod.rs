//! Pipeline module - global and local pairwise sampling.

mod sampling;
mod local;

pub use sampling::*;
pub use local::*;
