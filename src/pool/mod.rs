//! Pool module - parse workers, probe evaluator and cancellation.

mod cancel;
mod evaluator;
mod worker;

pub use cancel::*;
pub use evaluator::*;
pub use worker::*;
