//! Session module for one sampling run.
//!
//! Provides:
//! - `ArtifactStore`: persistence of satisfying configurations
//! - `SamplingSession`: sequence number and valid/invalid tallies

mod artifact;
mod state;

pub use artifact::*;
pub use state::*;
