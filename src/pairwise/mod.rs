//! Pairwise module - pair enumeration and probe construction.

mod pairs;
mod probe;

pub use pairs::*;
pub use probe::*;
