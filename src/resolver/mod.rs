//! Resolver module - file listing and symbol cross-referencing.

mod listing;
mod xref;

pub use listing::*;
pub use xref::*;
